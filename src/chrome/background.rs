/// Service-worker wiring: browser events in, `Background` service calls out
use super::{ChromeHost, ChromeIdentity, ChromeStorage, FetchClient, add_listener, after, js_error, to_js};
use crate::background::{Alarm, Background, Shortcut, SubmitOutcome, Trigger, context_menu_properties};
use crate::config::{ExtensionConfig, MENU_ID, RETRY_ALARM, SYNC_ALARM};
use crate::messages::RuntimeMessage;
use crate::tab_data::{ContextMenuInfo, TabInfo};
use js_sys::Reflect;
use log::{debug, info, warn};
use serde_json::json;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

type ChromeBackground = Background<ChromeStorage, ChromeHost, FetchClient, ChromeIdentity>;

thread_local! {
    static BACKGROUND: Rc<ChromeBackground> = Rc::new(Background::new(
        ChromeStorage,
        ChromeHost,
        FetchClient,
        ChromeIdentity,
        ExtensionConfig::default(),
    ));
}

fn background() -> Rc<ChromeBackground> {
    BACKGROUND.with(Rc::clone)
}

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["chrome", "contextMenus"], js_name = removeAll, catch)]
    async fn remove_all_menus() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "contextMenus"], js_name = create, catch)]
    fn create_menu(properties: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "alarms"], js_name = create, catch)]
    async fn create_alarm(name: &str, info: JsValue) -> Result<JsValue, JsValue>;
}

async fn install_context_menu() {
    if let Err(e) = remove_all_menus().await {
        warn!("contextMenus.removeAll failed: {}", js_error(&e));
    }
    match to_js(&context_menu_properties()).map_err(JsValue::from).and_then(create_menu) {
        Ok(_) => debug!("Context menu created"),
        Err(e) => warn!("contextMenus.create failed: {}", js_error(&e)),
    }
}

async fn install_alarms(config: &ExtensionConfig) {
    for (name, period) in [
        (SYNC_ALARM, config.sync_period_minutes),
        (RETRY_ALARM, config.retry_period_minutes),
    ] {
        let info = match to_js(&json!({ "periodInMinutes": period })) {
            Ok(info) => info,
            Err(e) => {
                warn!("Could not encode alarm {}: {}", name, e);
                continue;
            }
        };
        if let Err(e) = create_alarm(name, info).await {
            warn!("alarms.create({}) failed: {}", name, js_error(&e));
        }
    }
}

/// Run a trigger; a saved row is followed by a delayed recount from the sheet
async fn dispatch(trigger: Trigger) -> Option<SubmitOutcome> {
    let service = background();
    let outcome = service.handle(trigger).await;
    if outcome.is_some_and(|o| o.is_saved()) {
        schedule_resync(&service);
    }
    outcome
}

fn schedule_resync(service: &ChromeBackground) {
    after(service.config().resync_delay, || {
        spawn_local(async {
            background().sync_badge().await;
        });
    });
}

fn decode<T: serde::de::DeserializeOwned + Default>(value: JsValue) -> T {
    if value.is_undefined() || value.is_null() {
        return T::default();
    }
    serde_wasm_bindgen::from_value(value).unwrap_or_default()
}

/// Register every background listener
pub fn start() {
    info!("Background service starting");

    add_listener(
        &["runtime", "onInstalled"],
        Closure::<dyn FnMut(JsValue)>::new(|_details: JsValue| {
            spawn_local(async {
                let service = background();
                install_context_menu().await;
                install_alarms(service.config()).await;
                service.on_installed().await;
            });
        }),
    );

    add_listener(
        &["runtime", "onStartup"],
        Closure::<dyn FnMut()>::new(|| {
            spawn_local(async {
                let service = background();
                install_context_menu().await;
                install_alarms(service.config()).await;
                service.on_startup().await;
            });
        }),
    );

    add_listener(
        &["contextMenus", "onClicked"],
        Closure::<dyn FnMut(JsValue, JsValue)>::new(|info: JsValue, tab: JsValue| {
            let is_ours = Reflect::get(&info, &"menuItemId".into())
                .ok()
                .and_then(|id| id.as_string())
                .is_some_and(|id| id == MENU_ID);
            if !is_ours {
                return;
            }
            let info: ContextMenuInfo = decode(info);
            let tab: Option<TabInfo> = (!tab.is_undefined()).then(|| decode(tab));
            spawn_local(async move {
                dispatch(Trigger::ContextMenu { info, tab }).await;
            });
        }),
    );

    add_listener(
        &["commands", "onCommand"],
        Closure::<dyn FnMut(JsValue)>::new(|command: JsValue| {
            let Some(shortcut) = command.as_string().as_deref().and_then(Shortcut::parse) else {
                debug!("Ignoring command {:?}", command);
                return;
            };
            spawn_local(async move {
                dispatch(Trigger::Shortcut(shortcut)).await;
            });
        }),
    );

    add_listener(
        &["action", "onClicked"],
        Closure::<dyn FnMut(JsValue)>::new(|tab: JsValue| {
            let tab: Option<TabInfo> = (!tab.is_undefined()).then(|| decode(tab));
            spawn_local(async move {
                dispatch(Trigger::IconClick(tab)).await;
            });
        }),
    );

    add_listener(
        &["alarms", "onAlarm"],
        Closure::<dyn FnMut(JsValue)>::new(|alarm: JsValue| {
            let name = Reflect::get(&alarm, &"name".into())
                .ok()
                .and_then(|name| name.as_string());
            let Some(alarm) = name.as_deref().and_then(Alarm::parse) else {
                return;
            };
            spawn_local(async move {
                dispatch(Trigger::Alarm(alarm)).await;
            });
        }),
    );

    add_listener(
        &["runtime", "onMessage"],
        Closure::<dyn FnMut(JsValue, JsValue, js_sys::Function) -> JsValue>::new(
            |message: JsValue, _sender: JsValue, send_response: js_sys::Function| -> JsValue {
                let message = serde_wasm_bindgen::from_value(message)
                    .ok()
                    .and_then(RuntimeMessage::from_json);
                let Some(message) = message else {
                    return JsValue::FALSE;
                };
                if message == RuntimeMessage::GetSelection {
                    return JsValue::FALSE;
                }

                spawn_local(async move {
                    let saving = matches!(message, RuntimeMessage::SaveToSheet { .. });
                    let service = background();
                    let reply = service.handle_message(message).await;
                    if saving && reply == Some(true) {
                        schedule_resync(&service);
                    }
                    let reply = JsValue::from_bool(reply.unwrap_or(false));
                    if let Err(e) = send_response.call1(&JsValue::UNDEFINED, &reply) {
                        debug!("sendResponse failed: {}", js_error(&e));
                    }
                });
                // Keep the channel open for the async reply
                JsValue::TRUE
            },
        ),
    );
}
