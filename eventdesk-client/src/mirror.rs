use crate::record::Record;
use async_trait::async_trait;
use eventdesk_common::collection::{Collection, FallbackPolicy};
use eyre::{bail, Result};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Local persistent copy of remote collections, one named slot per collection.
/// An absent slot is an empty collection, never an error.
#[async_trait]
pub trait Mirror: Send + Sync {
    async fn read(&self, slot: &str) -> Result<Option<String>>;
    async fn write(&self, slot: &str, value: &str) -> Result<()>;
    async fn remove(&self, slot: &str) -> Result<()>;
}

/// Mirror that lives as long as the process. Useful for ephemeral sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryMirror {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Mirror for MemoryMirror {
    async fn read(&self, slot: &str) -> Result<Option<String>> {
        Ok(self.slots.lock().await.get(slot).cloned())
    }

    async fn write(&self, slot: &str, value: &str) -> Result<()> {
        self.slots
            .lock()
            .await
            .insert(slot.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, slot: &str) -> Result<()> {
        self.slots.lock().await.remove(slot);
        Ok(())
    }
}

/// Reads the slot of `T`. Missing, unreadable or malformed slots all give an empty collection.
pub async fn load_slot<T: Record>(mirror: &dyn Mirror) -> Vec<T> {
    let slot = T::COLLECTION.slot();
    let raw = match mirror.read(slot).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return vec![],
        Err(err) => {
            warn!("failed to read mirror slot {slot}: {err}");
            return vec![];
        }
    };

    match serde_json::from_str::<Vec<T>>(&raw) {
        Ok(records) => {
            debug!("loaded {} records from mirror slot {slot}", records.len());
            records
        }
        Err(err) => {
            warn!("ignoring malformed mirror slot {slot}: {err}");
            vec![]
        }
    }
}

/// Overwrites the slot of `T` with `records`.
pub async fn store_slot<T: Record>(mirror: &dyn Mirror, records: &[T]) -> Result<()> {
    let collection = T::COLLECTION;
    if !is_mirrored(collection) {
        bail!("{collection} records are never stored locally");
    }

    let raw = serde_json::to_string(records)?;
    mirror.write(collection.slot(), &raw).await
}

pub fn is_mirrored(collection: Collection) -> bool {
    collection.policy() == FallbackPolicy::Mirror
}
