/// Background service: maps browser triggers to payloads and runs the
/// submit -> count / queue pipeline.

use crate::auth::{AuthSession, TokenProvider};
use crate::config::ExtensionConfig;
use crate::counter::DailyCounter;
use crate::date_key;
use crate::errors::SendError;
use crate::host::{ExtensionHost, Notice};
use crate::http::HttpClient;
use crate::messages::RuntimeMessage;
use crate::queue::{DrainReport, OfflineQueue, QueueEntry};
use crate::settings::{MIGRATED_KEY, Settings, TransportConfig};
use crate::storage::{self, Area, Storage};
use crate::tab_data::{ContextMenuInfo, TabInfo};
use crate::transport::{Delivery, SheetsTransport, Transport, WebhookTransport};
use log::{debug, error, info, warn};

pub const SOURCE_CONTEXT_MENU: &str = "right-click";
pub const SOURCE_SAVE_SELECTION: &str = "Ctrl+I";
pub const SOURCE_SAVE_URL: &str = "Ctrl+Shift+I";
pub const SOURCE_ICON: &str = "icon click";
pub const SOURCE_FLOATING_BUTTON: &str = "floating button";

/// Keyboard commands declared in the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    SaveSelection,
    SaveCurrentUrl,
}

impl Shortcut {
    pub fn parse(command: &str) -> Option<Shortcut> {
        match command {
            "save-selection" => Some(Shortcut::SaveSelection),
            "save-current-url" => Some(Shortcut::SaveCurrentUrl),
            _ => None,
        }
    }
}

/// Periodic alarms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alarm {
    SyncCounter,
    RetryQueue,
}

impl Alarm {
    pub fn parse(name: &str) -> Option<Alarm> {
        match name {
            crate::config::SYNC_ALARM => Some(Alarm::SyncCounter),
            crate::config::RETRY_ALARM => Some(Alarm::RetryQueue),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    ContextMenu {
        info: ContextMenuInfo,
        tab: Option<TabInfo>,
    },
    Shortcut(Shortcut),
    IconClick(Option<TabInfo>),
    FloatingButton { url: String },
    Alarm(Alarm),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Row written (or presumed written) and counted
    Saved { count: u64, delivery: Delivery },
    /// Transport failed; payload waits in the offline queue
    Queued,
    /// Configuration problem; nothing queued
    Rejected,
    /// Send failed and the payload could not be queued either
    Failed,
}

impl SubmitOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SubmitOutcome::Saved { .. })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Context menu payload: link, then trimmed selection, then page, then tab URL
pub fn context_menu_payload(info: &ContextMenuInfo, tab: Option<&TabInfo>) -> Option<String> {
    non_empty(info.link_url.as_deref())
        .or_else(|| non_empty(info.selection_text.as_deref().map(str::trim)))
        .or_else(|| non_empty(info.page_url.as_deref()))
        .or_else(|| tab.and_then(TabInfo::url))
        .map(str::to_string)
}

/// `chrome.contextMenus.create` properties for the "Send to Google Sheet" entry
pub fn context_menu_properties() -> serde_json::Value {
    serde_json::json!({
        "id": crate::config::MENU_ID,
        "title": crate::config::MENU_TITLE,
        "contexts": crate::config::MENU_CONTEXTS,
    })
}

pub struct Background<S, H, C, P> {
    storage: S,
    host: H,
    http: C,
    auth: AuthSession<P>,
    counter: DailyCounter,
    queue: OfflineQueue,
    config: ExtensionConfig,
}

impl<S, H, C, P> Background<S, H, C, P>
where
    S: Storage,
    H: ExtensionHost,
    C: HttpClient,
    P: TokenProvider,
{
    pub fn new(storage: S, host: H, http: C, tokens: P, config: ExtensionConfig) -> Self {
        Background {
            auth: AuthSession::new(tokens, &config),
            queue: OfflineQueue::new(config.queue_cap),
            counter: DailyCounter::new(),
            storage,
            host,
            http,
            config,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn http(&self) -> &C {
        &self.http
    }

    pub fn auth(&self) -> &AuthSession<P> {
        &self.auth
    }

    pub fn config(&self) -> &ExtensionConfig {
        &self.config
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    pub fn counter(&self) -> &DailyCounter {
        &self.counter
    }

    // ---------------------------
    // Lifecycle
    // ---------------------------

    pub async fn on_installed(&self) {
        info!("Extension installed");
        self.sync_badge().await;
        self.prune_counters().await;
        self.check_migration().await;
    }

    pub async fn on_startup(&self) {
        info!("Browser started");
        self.sync_badge().await;
        self.drain_queue().await;
    }

    // ---------------------------
    // Event dispatch
    // ---------------------------

    /// Run one browser trigger; returns the submit outcome when something was sent
    pub async fn handle(&self, trigger: Trigger) -> Option<SubmitOutcome> {
        match trigger {
            Trigger::ContextMenu { info, tab } => {
                let payload = context_menu_payload(&info, tab.as_ref())?;
                Some(self.submit(&payload, SOURCE_CONTEXT_MENU).await)
            }
            Trigger::Shortcut(shortcut) => self.handle_shortcut(shortcut).await,
            Trigger::IconClick(tab) => {
                let url = tab.as_ref().and_then(TabInfo::url)?.to_string();
                Some(self.submit(&url, SOURCE_ICON).await)
            }
            Trigger::FloatingButton { url } => {
                let url = non_empty(Some(url.as_str()))?.to_string();
                Some(self.submit(&url, SOURCE_FLOATING_BUTTON).await)
            }
            Trigger::Alarm(Alarm::SyncCounter) => {
                self.sync_badge().await;
                self.prune_counters().await;
                None
            }
            Trigger::Alarm(Alarm::RetryQueue) => {
                self.drain_queue().await;
                None
            }
        }
    }

    async fn handle_shortcut(&self, shortcut: Shortcut) -> Option<SubmitOutcome> {
        let tab = self.host.active_tab().await?;
        match shortcut {
            Shortcut::SaveSelection => {
                let selection = match tab.id {
                    Some(id) => self.host.page_selection(id).await,
                    None => None,
                };
                let selection = selection
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty());
                let payload = selection.or_else(|| tab.url().map(str::to_string))?;
                Some(self.submit(&payload, SOURCE_SAVE_SELECTION).await)
            }
            Shortcut::SaveCurrentUrl => {
                let url = tab.url()?.to_string();
                Some(self.submit(&url, SOURCE_SAVE_URL).await)
            }
        }
    }

    /// Handle a runtime message; `Some(reply)` when the sender expects an answer
    pub async fn handle_message(&self, message: RuntimeMessage) -> Option<bool> {
        match message {
            RuntimeMessage::SaveToSheet { url } => {
                let outcome = self.handle(Trigger::FloatingButton { url }).await;
                Some(outcome.is_some_and(|o| o.is_saved()))
            }
            RuntimeMessage::UpdateBadge | RuntimeMessage::SyncCounter => {
                self.sync_badge().await;
                Some(true)
            }
            // Answered by content scripts
            RuntimeMessage::GetSelection => None,
        }
    }

    // ---------------------------
    // Submit pipeline
    // ---------------------------

    /// Send one payload; failures are queued or reported, never propagated
    pub async fn submit(&self, payload: &str, source: &str) -> SubmitOutcome {
        match self.deliver(payload, source).await {
            Ok(outcome) => outcome,
            Err(e) => self.handle_failure(payload, source, e).await,
        }
    }

    async fn deliver(&self, payload: &str, source: &str) -> Result<SubmitOutcome, SendError> {
        let settings = Settings::load(&self.storage).await?;
        let transport = settings.transport()?;
        let key = date_key::today();

        let delivery = self.append(&transport, payload, &key).await?;

        // The row is in the sheet; a counting failure must not queue it again
        let count = match self.counter.increment(&self.storage, &self.host, &key).await {
            Ok(count) => {
                self.host.notify(&Notice::saved(source, count));
                count
            }
            Err(e) => {
                error!("Row saved but today's count could not be updated: {}", e);
                self.host.notify(&Notice::saved_uncounted(source));
                self.counter.get(&self.storage, &key).await.unwrap_or(0)
            }
        };
        info!("Saved via {} ({} today)", source, count);

        Ok(SubmitOutcome::Saved { count, delivery })
    }

    async fn append(&self, transport: &TransportConfig, payload: &str, key: &str) -> Result<Delivery, SendError> {
        match transport {
            TransportConfig::Sheets(target) => {
                SheetsTransport::new(&self.http, &self.auth, target, self.config.count_scan_rows)
                    .append(payload, key)
                    .await
            }
            TransportConfig::Webhook(target) => {
                WebhookTransport::new(&self.http, target, self.config.webhook_timeout)
                    .append(payload, key)
                    .await
            }
        }
    }

    async fn handle_failure(&self, payload: &str, source: &str, e: SendError) -> SubmitOutcome {
        match e {
            SendError::ConfigurationMissing => {
                warn!("Submit from {} with no sheet configured", source);
                self.host.open_options_page();
                self.host.notify(&Notice::setup_required());
                SubmitOutcome::Rejected
            }
            SendError::InvalidSheetUrl(url) => {
                warn!("Configured sheet URL has no sheet id: {}", url);
                self.host.notify(&Notice::invalid_sheet_url());
                SubmitOutcome::Rejected
            }
            SendError::InvalidWebhookUrl(url) => {
                warn!("Configured webhook URL is malformed: {}", url);
                self.host.notify(&Notice::invalid_webhook_url());
                SubmitOutcome::Rejected
            }
            // Unreadable settings are as temporary as a dropped connection
            e if e.is_retryable() || matches!(e, SendError::Storage(_)) => {
                warn!("Send failed ({}); queueing for retry", e);
                match self.queue.enqueue(&self.storage, QueueEntry::new(payload, source)).await {
                    Ok(_) => {
                        self.host.notify(&Notice::queued());
                        SubmitOutcome::Queued
                    }
                    Err(qe) => {
                        error!("Could not queue failed submission: {}", qe);
                        self.host.notify(&Notice::not_saved(&qe.to_string()));
                        SubmitOutcome::Failed
                    }
                }
            }
            e => {
                error!("Send failed: {}", e);
                self.host.notify(&Notice::not_saved(&e.to_string()));
                SubmitOutcome::Failed
            }
        }
    }

    /// Replay the offline queue through the transport
    pub async fn drain_queue(&self) -> DrainReport {
        // Without a usable configuration every replay would fail anyway
        match Settings::load(&self.storage).await.map(|s| s.transport()) {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                debug!("Skipping queue drain: {}", e);
                return DrainReport::default();
            }
            Err(e) => {
                error!("Skipping queue drain, settings unreadable: {}", e);
                return DrainReport::default();
            }
        }

        match self.queue.drain(&self.storage, |entry| self.replay(entry)).await {
            Ok(report) => report,
            Err(e) => {
                error!("Queue drain failed: {}", e);
                DrainReport::default()
            }
        }
    }

    async fn replay(&self, entry: QueueEntry) -> bool {
        let source = format!("{} (retry)", entry.source);
        match self.deliver(&entry.payload, &source).await {
            Ok(_) => true,
            Err(e) => {
                debug!("Retry of queued entry {} failed: {}", entry.id, e);
                false
            }
        }
    }

    // ---------------------------
    // Counter upkeep
    // ---------------------------

    /// Authoritative count for today, from the sheet when possible
    pub async fn remote_count(&self, key: &str) -> Result<u64, SendError> {
        let settings = Settings::load(&self.storage).await?;
        match settings.transport()? {
            TransportConfig::Sheets(target) => {
                SheetsTransport::new(&self.http, &self.auth, &target, self.config.count_scan_rows)
                    .count_rows_for(key)
                    .await
            }
            TransportConfig::Webhook(target) => {
                WebhookTransport::new(&self.http, &target, self.config.webhook_timeout)
                    .count_rows_for(key)
                    .await
            }
        }
    }

    /// Recount today's rows and refresh the badge; returns the count shown
    pub async fn sync_badge(&self) -> u64 {
        let key = date_key::today();
        let remote = self.remote_count(&key).await;
        match self.counter.reconcile(&self.storage, &self.host, &key, remote).await {
            Ok(count) => count,
            Err(e) => {
                error!("Badge sync failed: {}", e);
                0
            }
        }
    }

    pub async fn prune_counters(&self) {
        let today = date_key::today_date();
        if let Err(e) = self.counter.prune(&self.storage, today, self.config.retention_days).await {
            error!("Pruning old counters failed: {}", e);
        }
    }

    /// Tell webhook users once that the direct Sheets integration exists
    pub async fn check_migration(&self) {
        let settings = match Settings::load(&self.storage).await {
            Ok(settings) => settings,
            Err(e) => {
                error!("Migration check skipped: {}", e);
                return;
            }
        };
        if settings.needs_migration_notice() {
            self.host.notify(&Notice::migration_available());
            if let Err(e) = storage::save(&self.storage, Area::Sync, MIGRATED_KEY, &true).await {
                error!("Could not record migration notice: {}", e);
            }
        }
    }
}
