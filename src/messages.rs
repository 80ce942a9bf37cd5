/// Runtime message contract between the page, the options page and the background
use serde::{Deserialize, Serialize};

/// Requests arriving over `chrome.runtime.onMessage`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RuntimeMessage {
    /// Floating button / options "test": record this URL
    SaveToSheet { url: String },
    /// Background asking a content script for the page selection
    GetSelection,
    /// Options page saved settings
    UpdateBadge,
    /// Options page "sync now"
    SyncCounter,
}

impl RuntimeMessage {
    pub fn from_json(value: serde_json::Value) -> Option<RuntimeMessage> {
        serde_json::from_value(value).ok()
    }
}

/// Reply to `getSelection`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionReply {
    pub selection: Option<String>,
}

impl SelectionReply {
    /// Trimmed selection, `None` when empty
    pub fn from_text(text: &str) -> SelectionReply {
        let trimmed = text.trim();
        SelectionReply {
            selection: (!trimmed.is_empty()).then(|| trimmed.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_save_to_sheet() {
        let message = RuntimeMessage::from_json(json!({ "action": "saveToSheet", "url": "https://a.dev" }));
        assert_eq!(
            message,
            Some(RuntimeMessage::SaveToSheet { url: "https://a.dev".to_string() })
        );
    }

    #[test]
    fn test_parse_bare_actions() {
        assert_eq!(
            RuntimeMessage::from_json(json!({ "action": "getSelection" })),
            Some(RuntimeMessage::GetSelection)
        );
        assert_eq!(
            RuntimeMessage::from_json(json!({ "action": "syncCounter" })),
            Some(RuntimeMessage::SyncCounter)
        );
        assert_eq!(
            RuntimeMessage::from_json(json!({ "action": "updateBadge" })),
            Some(RuntimeMessage::UpdateBadge)
        );
    }

    #[test]
    fn test_unknown_messages_are_ignored() {
        assert_eq!(RuntimeMessage::from_json(json!({ "action": "dance" })), None);
        assert_eq!(RuntimeMessage::from_json(json!({ "url": "https://a.dev" })), None);
    }

    #[test]
    fn test_selection_reply() {
        assert_eq!(SelectionReply::from_text("  picked  ").selection.as_deref(), Some("picked"));
        assert_eq!(SelectionReply::from_text("   ").selection, None);
        assert_eq!(
            serde_json::to_value(SelectionReply::from_text("")).unwrap(),
            json!({ "selection": null })
        );
    }
}
