/// Bindings of the service traits to the `chrome.*` extension APIs and `fetch`
///
/// Only compiled for the browser. Every promise-returning API is imported as a
/// `catch` async function so rejections come back as `Err(JsValue)`.

pub mod background;
pub mod content;
mod fetch;
mod host;
mod identity;
pub mod options;
mod storage;

pub use fetch::FetchClient;
pub use host::ChromeHost;
pub use identity::ChromeIdentity;
pub use storage::ChromeStorage;

use js_sys::{Function, Reflect};
use serde::Serialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::WasmClosure;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = setTimeout)]
    fn set_timeout(handler: &JsValue, millis: i32) -> JsValue;
}

/// Human-readable text for a rejected promise or thrown value
pub(crate) fn js_error(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    Reflect::get(value, &"message".into())
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}

/// Convert a Rust value into a plain JS object (maps become objects, not `Map`s)
pub(crate) fn to_js<T: Serialize>(value: &T) -> Result<JsValue, String> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| e.to_string())
}

/// Resolve `chrome.<path...>` from the global scope
pub(crate) fn chrome_object(path: &[&str]) -> Option<JsValue> {
    let mut current = Reflect::get(&js_sys::global(), &"chrome".into()).ok()?;
    for segment in path {
        if current.is_undefined() || current.is_null() {
            return None;
        }
        current = Reflect::get(&current, &(*segment).into()).ok()?;
    }
    (!current.is_undefined()).then_some(current)
}

/// `chrome.<path>.addListener(callback)`; the closure is leaked for the worker lifetime
pub(crate) fn add_listener<T: ?Sized + WasmClosure>(path: &[&str], callback: Closure<T>) {
    let Some(event) = chrome_object(path) else {
        log::warn!("chrome.{} is not available", path.join("."));
        return;
    };
    let added = Reflect::get(&event, &"addListener".into())
        .ok()
        .and_then(|f| f.dyn_into::<Function>().ok())
        .map(|add| add.call1(&event, callback.as_ref()));
    match added {
        Some(Ok(_)) => callback.forget(),
        _ => log::error!("Could not register listener on chrome.{}", path.join(".")),
    }
}

/// Run `f` once after `delay`
pub(crate) fn after(delay: std::time::Duration, f: impl FnOnce() + 'static) {
    let handler = Closure::once_into_js(f);
    set_timeout(&handler, delay.as_millis().min(i32::MAX as u128) as i32);
}
