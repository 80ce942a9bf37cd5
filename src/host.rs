/// Browser-side surfaces the background drives: badge, notifications, tabs

use crate::config::BADGE_COLOR;
use crate::tab_data::TabInfo;
use serde::Serialize;

/// What the toolbar icon shows
#[derive(Debug, Clone, PartialEq)]
pub struct Badge {
    pub text: String,
    pub color: String,
    pub title: String,
}

impl Badge {
    pub fn for_count(count: u64) -> Badge {
        Badge {
            text: count.to_string(),
            color: BADGE_COLOR.to_string(),
            title: format!("Click to save current URL | Cases today: {}", count),
        }
    }
}

/// A desktop notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub silent: bool,
}

impl Notice {
    fn new(title: &str, message: String) -> Notice {
        Notice {
            title: title.to_string(),
            message,
            silent: false,
        }
    }

    pub fn setup_required() -> Notice {
        Notice::new("Setup Required", "Please configure your Google Sheet URL".to_string())
    }

    pub fn invalid_sheet_url() -> Notice {
        Notice::new("Invalid Sheet URL", "Please check your Sheet URL in options".to_string())
    }

    pub fn invalid_webhook_url() -> Notice {
        Notice::new("Invalid Webhook URL", "Please check your webhook URL in options".to_string())
    }

    pub fn queued() -> Notice {
        Notice::new("Queued", "Will retry when connection restored".to_string())
    }

    pub fn saved(source: &str, count: u64) -> Notice {
        Notice {
            silent: true,
            ..Notice::new("Saved", format!("Saved via {} ({} cases today)", source, count))
        }
    }

    /// Counter could not be updated after the row was written
    pub fn saved_uncounted(source: &str) -> Notice {
        Notice {
            silent: true,
            ..Notice::new("Saved", format!("Saved via {}", source))
        }
    }

    /// Send failed and the payload could not be kept for a retry
    pub fn not_saved(reason: &str) -> Notice {
        Notice::new("Not Saved", format!("Could not save or queue this item: {}", reason))
    }

    pub fn migration_available() -> Notice {
        Notice::new(
            "Migration Available",
            "Update to direct Google Sheets integration in options".to_string(),
        )
    }
}

/// The extension runtime as seen from the background logic
#[allow(async_fn_in_trait)]
pub trait ExtensionHost {
    fn show_badge(&self, badge: &Badge);

    fn notify(&self, notice: &Notice);

    fn open_options_page(&self);

    /// Active tab of the focused window
    async fn active_tab(&self) -> Option<TabInfo>;

    /// Ask the page's content script for its selection
    async fn page_selection(&self, tab_id: i32) -> Option<String>;
}
