/// Content-script side: answers the background's `getSelection` requests
use super::{add_listener, js_error, to_js};
use crate::messages::{RuntimeMessage, SelectionReply};
use log::debug;
use wasm_bindgen::prelude::*;

/// Current page selection, trimmed
pub fn current_selection() -> SelectionReply {
    let text = web_sys::window()
        .and_then(|window| window.get_selection().ok().flatten())
        .and_then(|selection| selection.to_string().as_string())
        .unwrap_or_default();
    SelectionReply::from_text(&text)
}

pub fn start() {
    add_listener(
        &["runtime", "onMessage"],
        Closure::<dyn FnMut(JsValue, JsValue, js_sys::Function) -> JsValue>::new(
            |message: JsValue, _sender: JsValue, send_response: js_sys::Function| -> JsValue {
                let message = serde_wasm_bindgen::from_value(message)
                    .ok()
                    .and_then(RuntimeMessage::from_json);
                if message != Some(RuntimeMessage::GetSelection) {
                    return JsValue::FALSE;
                }

                let reply = match to_js(&current_selection()) {
                    Ok(reply) => reply,
                    Err(e) => {
                        debug!("Could not encode selection: {}", e);
                        return JsValue::FALSE;
                    }
                };
                if let Err(e) = send_response.call1(&JsValue::UNDEFINED, &reply) {
                    debug!("sendResponse failed: {}", js_error(&e));
                }
                JsValue::FALSE
            },
        ),
    );
}
