//! Tests run in a headless browser with `wasm-pack test --headless --chrome`

#![cfg(all(target_arch = "wasm32", target_os = "unknown"))]

use sheet_logger::chrome::content::current_selection;
use sheet_logger::date_key;
use sheet_logger::messages::SelectionReply;
use sheet_logger::position;
use sheet_logger::storage::{Area, MemoryStorage, Storage};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn test_today_key_uses_browser_clock() {
    let key = sheet_logger::today_key();
    assert_eq!(key.len(), 8);
    assert_eq!(date_key::parse(&key), Some(date_key::today_date()));
}

#[wasm_bindgen_test]
fn test_empty_page_has_no_selection() {
    assert_eq!(current_selection(), SelectionReply { selection: None });
}

#[wasm_bindgen_test]
fn test_clamp_export() {
    assert_eq!(sheet_logger::clamp_to_viewport(-5.0, 900.0, 800.0, 600.0), vec![0, 552]);
    assert!(sheet_logger::exceeds_drag_threshold(0.0, 0.0, 6.0, 0.0));
}

#[wasm_bindgen_test]
async fn test_positions_round_trip_in_memory() {
    let storage = MemoryStorage::new();
    let host = position::hostname_of("https://docs.rs/serde").unwrap();

    position::remember_position(&storage, &host, position::Point { x: 3, y: 4 })
        .await
        .unwrap();

    assert_eq!(
        position::position_for(&storage, "docs.rs").await.unwrap(),
        Some(position::Point { x: 3, y: 4 })
    );
    assert!(storage.get(Area::Local, position::POSITIONS_KEY).await.unwrap().is_some());
}
