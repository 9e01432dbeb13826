use eventdesk_common::collection::Collection;
use eventdesk_common::domain::{
    Event, EventPatch, NewEvent, NewRegistration, NewUnregistrationRequest, NewUser, RecordId,
    Registration, RegistrationPatch, UnregistrationRequest, UnregistrationRequestPatch, User,
    UserPatch,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A record kept in one of the synchronized collections.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The record without its id, as sent in a create request.
    type Draft: Serialize + Send + Sync;
    /// Partial update where absent fields are left alone.
    type Patch: Serialize + Send + Sync;

    const COLLECTION: Collection;

    fn id(&self) -> &RecordId;

    /// Applied to every record before it is held in memory.
    fn sanitize(self) -> Self {
        self
    }
}

impl Record for Event {
    type Draft = NewEvent;
    type Patch = EventPatch;
    const COLLECTION: Collection = Collection::Events;

    fn id(&self) -> &RecordId {
        &self.id
    }
}

impl Record for Registration {
    type Draft = NewRegistration;
    type Patch = RegistrationPatch;
    const COLLECTION: Collection = Collection::Registrations;

    fn id(&self) -> &RecordId {
        &self.id
    }
}

impl Record for UnregistrationRequest {
    type Draft = NewUnregistrationRequest;
    type Patch = UnregistrationRequestPatch;
    const COLLECTION: Collection = Collection::UnregistrationRequests;

    fn id(&self) -> &RecordId {
        &self.id
    }
}

impl Record for User {
    type Draft = NewUser;
    type Patch = UserPatch;
    const COLLECTION: Collection = Collection::Users;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn sanitize(self) -> Self {
        self.without_password()
    }
}

/// Builds the record the server would have created from `draft`, using a locally generated id.
pub fn synthesize<T: Record>(id: RecordId, draft: &T::Draft) -> serde_json::Result<T> {
    let mut value = serde_json::to_value(draft)?;
    if let Value::Object(map) = &mut value {
        map.insert("id".into(), serde_json::to_value(&id)?);
    }
    serde_json::from_value(value)
}

/// Deep merges `patch` over `record`. The id is never touched since patches carry none.
pub fn merge<T: Record>(record: &T, patch: &T::Patch) -> serde_json::Result<T> {
    let mut value = serde_json::to_value(record)?;
    merge_value(&mut value, serde_json::to_value(patch)?);
    serde_json::from_value(value)
}

fn merge_value(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                merge_value(target.entry(key).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch,
    }
}
