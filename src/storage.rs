/// Storage adapter over the extension's two key-value areas (sync + local)

use crate::errors::StorageError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::cell::RefCell;

/// Which storage area a key lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    /// Synced across the user's browsers (settings)
    Sync,
    /// This browser only (counters, queue, button positions)
    Local,
}

/// Async key-value storage, one JSON value per key
#[allow(async_fn_in_trait)]
pub trait Storage {
    async fn get(&self, area: Area, key: &str) -> Result<Option<Value>, StorageError>;

    async fn set(&self, area: Area, key: &str, value: Value) -> Result<(), StorageError>;

    async fn remove(&self, area: Area, keys: &[String]) -> Result<(), StorageError>;

    async fn get_all(&self, area: Area) -> Result<Map<String, Value>, StorageError>;
}

/// Read and decode a typed value
pub async fn load<S, T>(storage: &S, area: Area, key: &str) -> Result<Option<T>, StorageError>
where
    S: Storage,
    T: DeserializeOwned,
{
    match storage.get(area, key).await? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StorageError::Decode {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}

/// Encode and write a typed value
pub async fn save<S, T>(storage: &S, area: Area, key: &str, value: &T) -> Result<(), StorageError>
where
    S: Storage,
    T: Serialize,
{
    let value = serde_json::to_value(value).map_err(|e| StorageError::Encode {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    storage.set(area, key, value).await
}

/// In-process storage; backs native builds and tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    sync: RefCell<Map<String, Value>>,
    local: RefCell<Map<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn area(&self, area: Area) -> &RefCell<Map<String, Value>> {
        match area {
            Area::Sync => &self.sync,
            Area::Local => &self.local,
        }
    }
}

impl Storage for MemoryStorage {
    async fn get(&self, area: Area, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.area(area).borrow().get(key).cloned())
    }

    async fn set(&self, area: Area, key: &str, value: Value) -> Result<(), StorageError> {
        self.area(area).borrow_mut().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, area: Area, keys: &[String]) -> Result<(), StorageError> {
        let mut map = self.area(area).borrow_mut();
        for key in keys {
            map.remove(key);
        }
        Ok(())
    }

    async fn get_all(&self, area: Area) -> Result<Map<String, Value>, StorageError> {
        Ok(self.area(area).borrow().clone())
    }
}
