use super::{js_error, to_js};
use crate::host::{Badge, ExtensionHost, Notice};
use crate::messages::{RuntimeMessage, SelectionReply};
use crate::tab_data::TabInfo;
use log::{debug, warn};
use serde_json::json;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

const NOTIFICATION_ICON: &str = "icon128.png";

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["chrome", "action"], js_name = setBadgeText, catch)]
    async fn set_badge_text(details: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "action"], js_name = setBadgeBackgroundColor, catch)]
    async fn set_badge_background_color(details: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "action"], js_name = setTitle, catch)]
    async fn set_title(details: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "notifications"], js_name = create, catch)]
    async fn create_notification(options: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "runtime"], js_name = openOptionsPage, catch)]
    async fn open_options_page() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "tabs"], js_name = query, catch)]
    async fn query_tabs(query: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "tabs"], js_name = sendMessage, catch)]
    async fn send_tab_message(tab_id: i32, message: JsValue) -> Result<JsValue, JsValue>;
}

/// Toolbar action, notifications and tabs of the running browser
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeHost;

/// Fire a chrome call without waiting on it; failures only get logged
fn detach<F>(what: &'static str, call: F)
where
    F: std::future::Future<Output = Result<JsValue, JsValue>> + 'static,
{
    spawn_local(async move {
        if let Err(e) = call.await {
            warn!("{} failed: {}", what, js_error(&e));
        }
    });
}

impl ExtensionHost for ChromeHost {
    fn show_badge(&self, badge: &Badge) {
        let details = (
            to_js(&json!({ "text": badge.text })),
            to_js(&json!({ "color": badge.color })),
            to_js(&json!({ "title": badge.title })),
        );
        match details {
            (Ok(text), Ok(color), Ok(title)) => {
                detach("setBadgeText", set_badge_text(text));
                detach("setBadgeBackgroundColor", set_badge_background_color(color));
                detach("setTitle", set_title(title));
            }
            _ => warn!("Could not encode badge {:?}", badge),
        }
    }

    fn notify(&self, notice: &Notice) {
        let options = json!({
            "type": "basic",
            "iconUrl": NOTIFICATION_ICON,
            "title": notice.title,
            "message": notice.message,
            "silent": notice.silent,
        });
        match to_js(&options) {
            Ok(options) => detach("notifications.create", create_notification(options)),
            Err(e) => warn!("Could not encode notification: {}", e),
        }
    }

    fn open_options_page(&self) {
        detach("openOptionsPage", open_options_page());
    }

    async fn active_tab(&self) -> Option<TabInfo> {
        let query = to_js(&json!({ "active": true, "currentWindow": true })).ok()?;
        let tabs = match query_tabs(query).await {
            Ok(tabs) => tabs,
            Err(e) => {
                warn!("tabs.query failed: {}", js_error(&e));
                return None;
            }
        };
        serde_wasm_bindgen::from_value::<Vec<TabInfo>>(tabs)
            .ok()?
            .into_iter()
            .next()
    }

    async fn page_selection(&self, tab_id: i32) -> Option<String> {
        let message = to_js(&RuntimeMessage::GetSelection).ok()?;
        match send_tab_message(tab_id, message).await {
            Ok(reply) => serde_wasm_bindgen::from_value::<SelectionReply>(reply)
                .ok()
                .and_then(|reply| reply.selection),
            Err(e) => {
                // No content script on chrome:// pages and the like
                debug!("No selection from tab {}: {}", tab_id, js_error(&e));
                None
            }
        }
    }
}
