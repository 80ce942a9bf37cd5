/// Sheet Logger - Chrome Extension that logs URLs and selections to a Google Sheet
/// Built with Rust + WASM

pub mod auth;
pub mod background;
pub mod config;
pub mod counter;
pub mod date_key;
pub mod errors;
pub mod host;
pub mod http;
pub mod messages;
pub mod options;
pub mod position;
pub mod queue;
pub mod settings;
pub mod storage;
pub mod tab_data;
pub mod transport;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub mod chrome;

#[cfg(test)]
mod testing;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Register the service worker listeners
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
#[wasm_bindgen(js_name = startBackground)]
pub fn start_background() {
    chrome::background::start();
}

// Answer selection requests from the background
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
#[wasm_bindgen(js_name = startContentScript)]
pub fn start_content_script() {
    chrome::content::start();
}

// Floating button geometry for the content script
#[wasm_bindgen(js_name = exceedsDragThreshold)]
pub fn exceeds_drag_threshold(start_x: f64, start_y: f64, x: f64, y: f64) -> bool {
    position::exceeds_drag_threshold((start_x, start_y), (x, y))
}

#[wasm_bindgen(js_name = clampToViewport)]
pub fn clamp_to_viewport(x: f64, y: f64, viewport_width: f64, viewport_height: f64) -> Vec<i32> {
    let point = position::clamp_to_viewport(x, y, viewport_width, viewport_height);
    vec![point.x, point.y]
}

// Today's counter key, as stored
#[wasm_bindgen(js_name = todayKey)]
pub fn today_key() -> String {
    date_key::today()
}
