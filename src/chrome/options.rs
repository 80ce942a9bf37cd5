/// Exports used by the options page and the floating button script
use super::{ChromeIdentity, ChromeStorage, js_error, to_js};
use crate::date_key;
use crate::messages::RuntimeMessage;
use crate::options::{self, AuthStatus};
use crate::position::{self, Point};
use chrono::Local;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["chrome", "runtime"], js_name = sendMessage, catch)]
    async fn send_runtime_message(message: JsValue) -> Result<JsValue, JsValue>;
}

fn err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Ask the background to resync the badge after settings change
async fn notify_background(message: RuntimeMessage) {
    if let Ok(message) = to_js(&message) {
        if let Err(e) = send_runtime_message(message).await {
            log::debug!("Background did not answer: {}", js_error(&e));
        }
    }
}

#[wasm_bindgen(js_name = saveSheetSettings)]
pub async fn save_sheet_settings(sheet_url: String, tab_name: String) -> Result<(), JsValue> {
    options::save_sheet_settings(&ChromeStorage, &sheet_url, &tab_name)
        .await
        .map_err(err)?;
    notify_background(RuntimeMessage::UpdateBadge).await;
    Ok(())
}

#[wasm_bindgen(js_name = saveWebhookUrl)]
pub async fn save_webhook_url(webhook_url: String) -> Result<(), JsValue> {
    options::save_webhook_url(&ChromeStorage, &webhook_url).await.map_err(err)
}

#[wasm_bindgen(js_name = setFloatingButton)]
pub async fn set_floating_button(enabled: bool) -> Result<(), JsValue> {
    options::set_floating_button(&ChromeStorage, enabled).await.map_err(err)
}

/// `{ todayKey, todayCount, pendingUploads }`
#[wasm_bindgen(js_name = loadStats)]
pub async fn load_stats() -> Result<JsValue, JsValue> {
    let stats = options::load_stats(&ChromeStorage, &date_key::today())
        .await
        .map_err(err)?;
    to_js(&stats).map_err(err)
}

/// `"connected"` or `"notAuthenticated"`
#[wasm_bindgen(js_name = authStatus)]
pub async fn auth_status() -> JsValue {
    match options::auth_status(&ChromeIdentity).await {
        AuthStatus::Connected => JsValue::from_str("connected"),
        AuthStatus::NotAuthenticated => JsValue::from_str("notAuthenticated"),
    }
}

/// Send a timestamped test row through the background; resolves to its success flag
#[wasm_bindgen(js_name = sendTestSubmission)]
pub async fn send_test_submission() -> Result<JsValue, JsValue> {
    let message = RuntimeMessage::SaveToSheet {
        url: options::test_payload(Local::now().naive_local()),
    };
    send_runtime_message(to_js(&message).map_err(err)?).await
}

#[wasm_bindgen(js_name = syncNow)]
pub async fn sync_now() {
    notify_background(RuntimeMessage::SyncCounter).await;
}

/// Saved `{ x, y }` for the page's host, or `null`
#[wasm_bindgen(js_name = buttonPosition)]
pub async fn button_position(page_url: String) -> Result<JsValue, JsValue> {
    let Some(host) = position::hostname_of(&page_url) else {
        return Ok(JsValue::NULL);
    };
    let point = position::position_for(&ChromeStorage, &host).await.map_err(err)?;
    to_js(&point).map_err(err)
}

#[wasm_bindgen(js_name = rememberButtonPosition)]
pub async fn remember_button_position(page_url: String, x: i32, y: i32) -> Result<(), JsValue> {
    let Some(host) = position::hostname_of(&page_url) else {
        return Ok(());
    };
    position::remember_position(&ChromeStorage, &host, Point { x, y })
        .await
        .map_err(err)
}
