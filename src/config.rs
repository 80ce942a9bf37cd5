/// Fixed tuning values for the extension
use std::time::Duration;

/// Tab used when the user leaves the tab name blank
pub const DEFAULT_TAB_NAME: &str = "Production Tracker";

/// Badge background colour
pub const BADGE_COLOR: &str = "#4285f4";

/// Alarm names registered with the browser
pub const SYNC_ALARM: &str = "syncCounter";
pub const RETRY_ALARM: &str = "retryQueue";

/// Context menu entry id
pub const MENU_ID: &str = "send-to-sheet";
pub const MENU_TITLE: &str = "Send to Google Sheet";

/// Contexts the menu entry appears in; payload rules fall back to the page URL
pub const MENU_CONTEXTS: &[&str] = &["all"];

#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionConfig {
    /// Maximum number of entries kept in the offline queue
    pub queue_cap: usize,
    /// Daily counters older than this many days are pruned
    pub retention_days: i64,
    pub token_lifetime: Duration,
    /// A cached token is reused only while it has at least this much life left
    pub token_refresh_margin: Duration,
    pub webhook_timeout: Duration,
    /// Delay before the authoritative resync that follows a successful send
    pub resync_delay: Duration,
    pub sync_period_minutes: u32,
    pub retry_period_minutes: u32,
    /// How many trailing sheet rows the remote count looks at
    pub count_scan_rows: usize,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        ExtensionConfig {
            queue_cap: 50,
            retention_days: 7,
            token_lifetime: Duration::from_secs(60 * 60),
            token_refresh_margin: Duration::from_secs(60),
            webhook_timeout: Duration::from_secs(3),
            resync_delay: Duration::from_secs(3),
            sync_period_minutes: 5,
            retry_period_minutes: 1,
            count_scan_rows: 100,
        }
    }
}
