//! Client-side object cache fed by successful responses.
//!
//! # Design
//! The cache is keyed by each record's `id`. Ids are normalized to their
//! string form so `5`, `5.0` and `"5"` address the same entry, which is how the
//! rest of a frontend usually looks records up (from route parameters).

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use crate::error::CacheError;
use crate::types::{json_type_name, Payload};

/// Store that receives decoded response payloads.
pub trait ObjectCache: Send + Sync {
    /// Cache every record of a collection.
    fn cache_many(&self, items: &[Value]) -> Result<(), CacheError>;

    /// Cache one record under `id`.
    fn cache_one(&self, id: &Value, item: &Value) -> Result<(), CacheError>;
}

/// Route a classified payload to the matching cache operation.
pub fn cache_payload(cache: &dyn ObjectCache, payload: Payload<'_>) -> Result<(), CacheError> {
    match payload {
        Payload::Collection(items) => cache.cache_many(items),
        Payload::Entity { id, item } => cache.cache_one(id, item),
    }
}

/// Cache key for an id: strings verbatim, numbers and booleans by their JSON
/// text. Integral floats are written without a fraction.
pub fn cache_key(id: &Value) -> Result<String, CacheError> {
    match id {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(number_key(n)),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err(CacheError::MissingId),
        other => Err(CacheError::UnsupportedShape(json_type_name(other))),
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn number_key(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
            (f as i64).to_string()
        }
        _ => n.to_string(),
    }
}

/// In-process `ObjectCache`.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look a record up by id (`json!(5)` and `json!("5")` are equivalent).
    pub fn get(&self, id: &Value) -> Option<Value> {
        let key = cache_key(id).ok()?;
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl ObjectCache for MemoryCache {
    fn cache_many(&self, items: &[Value]) -> Result<(), CacheError> {
        // Resolve every key first so a bad record leaves the cache untouched.
        let keyed = items
            .iter()
            .map(|item| {
                let id = item.get("id").ok_or(CacheError::MissingId)?;
                Ok((cache_key(id)?, item.clone()))
            })
            .collect::<Result<Vec<_>, CacheError>>()?;

        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .extend(keyed);
        Ok(())
    }

    fn cache_one(&self, id: &Value, item: &Value) -> Result<(), CacheError> {
        let key = cache_key(id)?;
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, item.clone());
        Ok(())
    }
}
