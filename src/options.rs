/// Options page operations: settings form, floating button toggle, stats, auth probe

use crate::auth::TokenProvider;
use crate::config::DEFAULT_TAB_NAME;
use crate::counter;
use crate::errors::{OptionsError, SendError};
use crate::queue::PendingQueue;
use crate::settings::{self, FLOATING_BUTTON_KEY, SHEET_URL_KEY, TAB_NAME_KEY, WEBHOOK_URL_KEY};
use crate::storage::{self, Area, Storage};
use chrono::NaiveDateTime;
use log::info;
use serde::Serialize;

/// Store the sheet URL and tab name entered on the options page
pub async fn save_sheet_settings<S: Storage>(
    storage: &S,
    sheet_url: &str,
    tab_name: &str,
) -> Result<(), OptionsError> {
    let sheet_url = sheet_url.trim();
    if sheet_url.is_empty() {
        return Err(OptionsError::MissingSheetUrl);
    }
    let tab_name = match tab_name.trim() {
        "" => DEFAULT_TAB_NAME,
        name => name,
    };

    storage::save(storage, Area::Sync, SHEET_URL_KEY, &sheet_url).await?;
    storage::save(storage, Area::Sync, TAB_NAME_KEY, &tab_name).await?;
    info!("Sheet settings saved");
    Ok(())
}

/// Store an Apps Script webhook URL after checking its shape
pub async fn save_webhook_url<S: Storage>(storage: &S, webhook_url: &str) -> Result<(), OptionsError> {
    let webhook_url = webhook_url.trim();
    if !settings::is_valid_webhook_url(webhook_url) {
        return Err(SendError::InvalidWebhookUrl(webhook_url.to_string()).into());
    }
    storage::save(storage, Area::Sync, WEBHOOK_URL_KEY, &webhook_url).await?;
    Ok(())
}

pub async fn set_floating_button<S: Storage>(storage: &S, enabled: bool) -> Result<(), OptionsError> {
    storage::save(storage, Area::Sync, FLOATING_BUTTON_KEY, &enabled).await?;
    Ok(())
}

/// Numbers shown in the options page stats box
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub today_key: String,
    pub today_count: u64,
    pub pending_uploads: usize,
}

pub async fn load_stats<S: Storage>(storage: &S, today_key: &str) -> Result<StatsSummary, OptionsError> {
    let today_count = counter::cached_count(storage, today_key).await?;
    let pending_uploads = PendingQueue::load(storage).await?.len();
    Ok(StatsSummary {
        today_key: today_key.to_string(),
        today_count,
        pending_uploads,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthStatus {
    Connected,
    NotAuthenticated,
}

/// Silent token probe; never prompts the user
pub async fn auth_status<P: TokenProvider>(provider: &P) -> AuthStatus {
    match provider.fetch_token(false).await {
        Ok(token) if !token.is_empty() => AuthStatus::Connected,
        _ => AuthStatus::NotAuthenticated,
    }
}

/// Payload recorded by the "Test connection" button
pub fn test_payload(now: NaiveDateTime) -> String {
    format!("Test from options: {}", now.format("%-m/%-d/%Y, %-I:%M:%S %p"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AuthError;
    use crate::queue::{OfflineQueue, QueueEntry};
    use crate::settings::Settings;
    use crate::storage::MemoryStorage;
    use crate::testing::FakeTokens;
    use chrono::NaiveDate;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_sheet_settings_defaults_tab() {
        let storage = MemoryStorage::new();

        save_sheet_settings(&storage, "  https://docs.google.com/spreadsheets/d/ABC123/edit ", "")
            .await
            .unwrap();

        let settings = Settings::load(&storage).await.unwrap();
        assert_eq!(
            settings.sheet_url.as_deref(),
            Some("https://docs.google.com/spreadsheets/d/ABC123/edit")
        );
        assert_eq!(settings.tab_name.as_deref(), Some("Production Tracker"));
    }

    #[tokio::test]
    async fn test_save_sheet_settings_requires_url() {
        let storage = MemoryStorage::new();

        let result = save_sheet_settings(&storage, "   ", "Leads").await;

        assert_eq!(result, Err(OptionsError::MissingSheetUrl));
        assert!(storage.get_all(Area::Sync).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_webhook_url_validates() {
        let storage = MemoryStorage::new();

        assert!(save_webhook_url(&storage, "https://example.com/hook").await.is_err());
        save_webhook_url(&storage, "https://script.google.com/macros/s/X/exec").await.unwrap();

        let settings = Settings::load(&storage).await.unwrap();
        assert_eq!(settings.webhook_url.as_deref(), Some("https://script.google.com/macros/s/X/exec"));
    }

    #[tokio::test]
    async fn test_floating_button_toggle() {
        let storage = MemoryStorage::new();

        set_floating_button(&storage, true).await.unwrap();
        assert!(Settings::load(&storage).await.unwrap().floating_button_enabled);

        set_floating_button(&storage, false).await.unwrap();
        assert!(!Settings::load(&storage).await.unwrap().floating_button_enabled);
    }

    #[tokio::test]
    async fn test_load_stats() {
        let storage = MemoryStorage::new();
        storage.set(Area::Local, "01/05/26", json!(7)).await.unwrap();
        let queue = OfflineQueue::new(50);
        queue.enqueue(&storage, QueueEntry::new("a", "s")).await.unwrap();
        queue.enqueue(&storage, QueueEntry::new("b", "s")).await.unwrap();

        let stats = load_stats(&storage, "01/05/26").await.unwrap();

        assert_eq!(
            stats,
            StatsSummary {
                today_key: "01/05/26".to_string(),
                today_count: 7,
                pending_uploads: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_auth_status_is_silent() {
        let connected = FakeTokens::always("tok");
        assert_eq!(auth_status(&connected).await, AuthStatus::Connected);
        assert_eq!(connected.interactive_flags(), vec![false]);

        let missing = FakeTokens::with(vec![Err(AuthError::NotAuthenticated)]);
        assert_eq!(auth_status(&missing).await, AuthStatus::NotAuthenticated);
    }

    #[test]
    fn test_test_payload_format() {
        let now = NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(14, 3, 9)
            .unwrap();
        assert_eq!(test_payload(now), "Test from options: 1/5/2026, 2:03:09 PM");
    }
}
