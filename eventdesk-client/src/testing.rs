//! In-process collection server for unit tests.

use crate::api_client::RemoteStore;
use crate::error::RemoteError;
use crate::mirror::{MemoryMirror, Mirror};
use async_trait::async_trait;
use eventdesk_common::api::{CurrentUser, LoginRequest};
use eventdesk_common::collection::Collection;
use eventdesk_common::domain::RecordId;
use eyre::bail;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

pub(crate) struct FakeRemote {
    online: AtomicBool,
    next_id: AtomicU64,
    data: Mutex<HashMap<Collection, Vec<Value>>>,
}

fn id_of(value: &Value) -> Option<RecordId> {
    serde_json::from_value(value.get("id")?.clone()).ok()
}

impl FakeRemote {
    pub(crate) fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
            next_id: AtomicU64::new(100),
            data: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub(crate) fn seed(&self, collection: Collection, records: Vec<Value>) {
        self.data.lock().unwrap().insert(collection, records);
    }

    pub(crate) fn records(&self, collection: Collection) -> Vec<Value> {
        self.data
            .lock()
            .unwrap()
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    fn check(&self) -> Result<(), RemoteError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::Unavailable)
        }
    }

    fn strip(collection: Collection, mut value: Value) -> Value {
        if collection == Collection::Users {
            if let Value::Object(map) = &mut value {
                map.remove("password");
            }
        }
        value
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn list(&self, collection: Collection) -> Result<Vec<Value>, RemoteError> {
        self.check()?;
        Ok(self
            .records(collection)
            .into_iter()
            .map(|x| Self::strip(collection, x))
            .collect())
    }

    async fn create(&self, collection: Collection, mut body: Value) -> Result<Value, RemoteError> {
        self.check()?;
        // Numeric ids, so callers see the lenient id decoding at work.
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        body["id"] = json!(id);
        self.data
            .lock()
            .unwrap()
            .entry(collection)
            .or_default()
            .push(body.clone());
        Ok(Self::strip(collection, body))
    }

    // Same as the bundled server: PUT lays the body over the stored record.
    async fn replace(
        &self,
        collection: Collection,
        id: &RecordId,
        body: Value,
    ) -> Result<Value, RemoteError> {
        self.patch(collection, id, body).await
    }

    async fn patch(
        &self,
        collection: Collection,
        id: &RecordId,
        mut body: Value,
    ) -> Result<Value, RemoteError> {
        self.check()?;
        if let Value::Object(fields) = &mut body {
            fields.remove("id");
        }
        let mut data = self.data.lock().unwrap();
        let records = data.entry(collection).or_default();
        let slot = records
            .iter_mut()
            .find(|x| id_of(x).as_ref() == Some(id))
            .ok_or(RemoteError::Status(StatusCode::NOT_FOUND))?;
        if let (Value::Object(target), Value::Object(fields)) = (&mut *slot, body) {
            target.extend(fields);
        }
        Ok(Self::strip(collection, slot.clone()))
    }

    async fn delete(&self, collection: Collection, id: &RecordId) -> Result<(), RemoteError> {
        self.check()?;
        let mut data = self.data.lock().unwrap();
        let records = data.entry(collection).or_default();
        let before = records.len();
        records.retain(|x| id_of(x).as_ref() != Some(id));
        if records.len() == before {
            return Err(RemoteError::Status(StatusCode::NOT_FOUND));
        }
        Ok(())
    }

    async fn login(&self, request: &LoginRequest) -> Result<CurrentUser, RemoteError> {
        self.check()?;
        let user = self
            .records(Collection::Users)
            .into_iter()
            .find(|x| x["email"] == request.email.as_str() && x["password"] == request.password.as_str())
            .ok_or(RemoteError::Status(StatusCode::UNAUTHORIZED))?;
        Ok(serde_json::from_value(Self::strip(Collection::Users, user))?)
    }
}

/// `MemoryMirror` whose writes and removals can be made to fail.
#[derive(Default)]
pub(crate) struct FlakyMirror {
    inner: MemoryMirror,
    pub(crate) fail_writes: AtomicBool,
    pub(crate) fail_removes: AtomicBool,
}

#[async_trait]
impl Mirror for FlakyMirror {
    async fn read(&self, slot: &str) -> eyre::Result<Option<String>> {
        self.inner.read(slot).await
    }

    async fn write(&self, slot: &str, value: &str) -> eyre::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("disk full");
        }
        self.inner.write(slot, value).await
    }

    async fn remove(&self, slot: &str) -> eyre::Result<()> {
        if self.fail_removes.load(Ordering::SeqCst) {
            bail!("read-only storage");
        }
        self.inner.remove(slot).await
    }
}
