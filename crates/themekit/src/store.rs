//! Process-wide key/value store for lazily loaded theme descriptors.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde_json::Value;

/// Shared cache keyed by strings such as `theme_shop_info`.
///
/// Values live until [`remove`](ConfigStore::remove) or process exit.
#[derive(Debug, Default)]
pub struct ConfigStore {
    values: RwLock<HashMap<String, Value>>,
}

impl ConfigStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the value under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value);
    }

    /// Removes and returns the value under `key`.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_get_remove() {
        let store = ConfigStore::new();
        assert!(store.get("theme_shop_info").is_none());
        store.set("theme_shop_info", json!({"status": true}));
        assert_eq!(store.get("theme_shop_info"), Some(json!({"status": true})));
        store.set("theme_shop_info", json!({}));
        assert_eq!(store.remove("theme_shop_info"), Some(json!({})));
        assert!(store.get("theme_shop_info").is_none());
    }
}
