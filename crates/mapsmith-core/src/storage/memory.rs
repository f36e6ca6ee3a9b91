//! In-memory storage.

use super::{BoxFuture, Storage, StorageError, StorageResult, validate_id};
use crate::document::MapDocument;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Keeps maps as serialized JSON, so a load behaves like reading a file:
/// runtime-only fields come back empty.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    maps: RwLock<BTreeMap<String, String>>,
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, document: &MapDocument) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        let json = document.to_json();
        Box::pin(async move {
            validate_id(&id)?;
            let json = json.map_err(|e| StorageError::Serialization(e.to_string()))?;
            self.maps.write().map_err(lock_error)?.insert(id, json);
            Ok(())
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<MapDocument>> {
        let id = id.to_string();
        Box::pin(async move {
            let maps = self.maps.read().map_err(lock_error)?;
            let json = maps.get(&id).ok_or_else(|| StorageError::NotFound(id.clone()))?;
            MapDocument::from_json(json)
                .map_err(|e| StorageError::Serialization(format!("{}: {}", id, e)))
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            self.maps.write().map_err(lock_error)?.remove(&id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let maps = self.maps.read().map_err(lock_error)?;
            Ok(maps.keys().cloned().collect())
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let id = id.to_string();
        Box::pin(async move {
            let maps = self.maps.read().map_err(lock_error)?;
            Ok(maps.contains_key(&id))
        })
    }
}
