/// Data handed over by the browser for tabs and context-menu clicks
use serde::{Deserialize, Serialize};

/// The parts of a browser tab the extension reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabInfo {
    pub id: Option<i32>,
    pub url: Option<String>,
}

impl TabInfo {
    pub fn new(id: i32, url: &str) -> TabInfo {
        TabInfo {
            id: Some(id),
            url: Some(url.to_string()),
        }
    }

    /// Tab URL if the browser exposed a non-empty one
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }
}

/// `chrome.contextMenus.OnClickData`, reduced to what the payload rules use
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextMenuInfo {
    pub link_url: Option<String>,
    pub selection_text: Option<String>,
    pub page_url: Option<String>,
}
