use super::{js_error, to_js};
use crate::errors::StorageError;
use crate::storage::{Area, Storage};
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["chrome", "storage", "sync"], js_name = get, catch)]
    async fn sync_get(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "sync"], js_name = set, catch)]
    async fn sync_set(items: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "sync"], js_name = remove, catch)]
    async fn sync_remove(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"], js_name = get, catch)]
    async fn local_get(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"], js_name = set, catch)]
    async fn local_set(items: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"], js_name = remove, catch)]
    async fn local_remove(keys: JsValue) -> Result<JsValue, JsValue>;
}

/// `chrome.storage.sync` / `chrome.storage.local`
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeStorage;

fn backend(e: JsValue) -> StorageError {
    StorageError::Backend(js_error(&e))
}

async fn area_get(area: Area, keys: JsValue) -> Result<Map<String, Value>, StorageError> {
    let items = match area {
        Area::Sync => sync_get(keys).await,
        Area::Local => local_get(keys).await,
    }
    .map_err(backend)?;

    match serde_wasm_bindgen::from_value::<Value>(items) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Ok(Map::new()),
        Err(e) => Err(StorageError::Backend(e.to_string())),
    }
}

impl Storage for ChromeStorage {
    async fn get(&self, area: Area, key: &str) -> Result<Option<Value>, StorageError> {
        let mut items = area_get(area, JsValue::from_str(key)).await?;
        Ok(items.remove(key))
    }

    async fn set(&self, area: Area, key: &str, value: Value) -> Result<(), StorageError> {
        let mut items = Map::new();
        items.insert(key.to_string(), value);
        let items = to_js(&items).map_err(|message| StorageError::Encode {
            key: key.to_string(),
            message,
        })?;
        match area {
            Area::Sync => sync_set(items).await,
            Area::Local => local_set(items).await,
        }
        .map(|_| ())
        .map_err(backend)
    }

    async fn remove(&self, area: Area, keys: &[String]) -> Result<(), StorageError> {
        let keys = to_js(&keys).map_err(StorageError::Backend)?;
        match area {
            Area::Sync => sync_remove(keys).await,
            Area::Local => local_remove(keys).await,
        }
        .map(|_| ())
        .map_err(backend)
    }

    async fn get_all(&self, area: Area) -> Result<Map<String, Value>, StorageError> {
        area_get(area, JsValue::NULL).await
    }
}
