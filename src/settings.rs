/// User settings kept in the sync area, and the transport they select

use crate::config::DEFAULT_TAB_NAME;
use crate::errors::{SendError, StorageError};
use crate::storage::{Area, Storage};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

pub const SHEET_URL_KEY: &str = "sheetUrl";
pub const TAB_NAME_KEY: &str = "tabName";
pub const WEBHOOK_URL_KEY: &str = "webhookUrl";
pub const FLOATING_BUTTON_KEY: &str = "floatingButtonEnabled";
pub const MIGRATED_KEY: &str = "migrated";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub sheet_url: Option<String>,
    pub tab_name: Option<String>,
    pub webhook_url: Option<String>,
    pub floating_button_enabled: bool,
    pub migrated: bool,
}

impl Settings {
    pub async fn load<S: Storage>(storage: &S) -> Result<Settings, StorageError> {
        let all = storage.get_all(Area::Sync).await?;
        serde_json::from_value(Value::Object(all)).map_err(|e| StorageError::Decode {
            key: "settings".to_string(),
            message: e.to_string(),
        })
    }

    /// Tab name to write to, falling back to the default
    pub fn effective_tab_name(&self) -> &str {
        self.tab_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_TAB_NAME)
    }

    /// Resolve the active transport; the Sheets API wins when both are configured
    pub fn transport(&self) -> Result<TransportConfig, SendError> {
        if let Some(sheet_url) = non_empty(&self.sheet_url) {
            let sheet_id = parse_sheet_id(sheet_url)
                .ok_or_else(|| SendError::InvalidSheetUrl(sheet_url.to_string()))?;
            return Ok(TransportConfig::Sheets(SheetTarget {
                sheet_id,
                tab_name: self.effective_tab_name().to_string(),
            }));
        }

        if let Some(webhook_url) = non_empty(&self.webhook_url) {
            if !is_valid_webhook_url(webhook_url) {
                return Err(SendError::InvalidWebhookUrl(webhook_url.to_string()));
            }
            return Ok(TransportConfig::Webhook(WebhookTarget {
                url: webhook_url.to_string(),
            }));
        }

        Err(SendError::ConfigurationMissing)
    }

    /// A legacy webhook is configured and the user has not been told about the API yet
    pub fn needs_migration_notice(&self) -> bool {
        non_empty(&self.webhook_url).is_some() && !self.migrated
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportConfig {
    Sheets(SheetTarget),
    Webhook(WebhookTarget),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetTarget {
    pub sheet_id: String,
    pub tab_name: String,
}

impl SheetTarget {
    /// A1 range for appended rows (date + link)
    pub fn append_range(&self) -> String {
        format!("'{}'!A:B", escape_sheet_name(&self.tab_name))
    }

    /// A1 range holding the date column
    pub fn date_column_range(&self) -> String {
        format!("'{}'!A:A", escape_sheet_name(&self.tab_name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookTarget {
    pub url: String,
}

fn sheet_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"/spreadsheets/d/([a-zA-Z0-9_-]+)").expect("sheet id pattern is valid")
    })
}

fn webhook_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^https://script\.google\.com/macros/s/[A-Za-z0-9_-]+/exec$")
            .expect("webhook pattern is valid")
    })
}

/// Extract the spreadsheet id from a Google Sheets URL
pub fn parse_sheet_id(url: &str) -> Option<String> {
    sheet_id_pattern()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Apps Script execution endpoint: https://script.google.com/macros/s/{id}/exec
pub fn is_valid_webhook_url(url: &str) -> bool {
    webhook_pattern().is_match(url.trim())
}

/// Quote-escape a sheet name for A1 notation
pub fn escape_sheet_name(name: &str) -> String {
    name.replace('\'', "''")
}
