use crate::api_client::{self, HttpRemote, RemoteStore};
use crate::database::Database;
use crate::error::{RemoteError, SyncError};
use crate::ids::{IdGenerator, UuidIds};
use crate::mirror::{is_mirrored, load_slot, store_slot, Mirror};
use crate::reconcile::{reconcile, Reconciled};
use crate::record::{merge, synthesize, Record};
use crate::settings::Settings;
use eventdesk_common::collection::Collection;
use eventdesk_common::domain::{
    today, Event, EventPatch, NewEvent, NewRegistration, NewUnregistrationRequest, NewUser,
    RecordId, Registration, RegistrationPatch, RequestStatus, Resolution, UnregistrationRequest,
    UnregistrationRequestPatch, User, UserPatch,
};
use eyre::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The four in-memory collections.
#[derive(Debug, Default, Clone)]
pub struct Collections {
    pub events: Vec<Event>,
    pub registrations: Vec<Registration>,
    pub unregistration_requests: Vec<UnregistrationRequest>,
    pub users: Vec<User>,
}

/// Gives generic code access to the vector holding a record type.
pub(crate) trait Held: Record {
    fn held(c: &Collections) -> &Vec<Self>;
    fn held_mut(c: &mut Collections) -> &mut Vec<Self>;
}

impl Held for Event {
    fn held(c: &Collections) -> &Vec<Self> {
        &c.events
    }
    fn held_mut(c: &mut Collections) -> &mut Vec<Self> {
        &mut c.events
    }
}

impl Held for Registration {
    fn held(c: &Collections) -> &Vec<Self> {
        &c.registrations
    }
    fn held_mut(c: &mut Collections) -> &mut Vec<Self> {
        &mut c.registrations
    }
}

impl Held for UnregistrationRequest {
    fn held(c: &Collections) -> &Vec<Self> {
        &c.unregistration_requests
    }
    fn held_mut(c: &mut Collections) -> &mut Vec<Self> {
        &mut c.unregistration_requests
    }
}

impl Held for User {
    fn held(c: &Collections) -> &Vec<Self> {
        &c.users
    }
    fn held_mut(c: &mut Collections) -> &mut Vec<Self> {
        &mut c.users
    }
}

/// Where a collection's in-memory state came from after a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Remote,
    Mirror,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitReport {
    pub events: Source,
    pub registrations: Source,
    pub unregistration_requests: Source,
    pub users: Source,
}

impl InitReport {
    pub fn reached_server(&self) -> bool {
        [
            self.events,
            self.registrations,
            self.unregistration_requests,
            self.users,
        ]
        .contains(&Source::Remote)
    }
}

/// Which verb carries an update to the server.
#[derive(Debug, Clone, Copy)]
enum UpdateVerb {
    Put,
    Patch,
}

/// Keeps the in-memory collections, the local mirror and the collection server in step.
///
/// Every mutation tries the server first. For collections with a mirror policy a failed call is
/// logged and the change is applied locally instead; the caller still sees success. Users have
/// no such fallback and any failure is reported. Operations take `&mut self`, so one session
/// never runs two of them at the same time.
pub struct Synchronizer {
    remote: Arc<dyn RemoteStore>,
    mirror: Arc<dyn Mirror>,
    ids: Arc<dyn IdGenerator>,
    state: Collections,
    error: Option<String>,
    /// Whether the users slot of the mirror is known to be gone.
    users_purged: bool,
}

impl Synchronizer {
    pub fn new(remote: Arc<dyn RemoteStore>, mirror: Arc<dyn Mirror>) -> Self {
        Self {
            remote,
            mirror,
            ids: Arc::new(UuidIds),
            state: Collections::default(),
            error: None,
            users_purged: false,
        }
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Synchronizer over HTTP with the SQLite mirror at `settings.db_path`.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let db = Database::new(&settings.db_path).await?;
        let remote = HttpRemote::new(&settings.server_address);
        Ok(Self::new(Arc::new(remote), Arc::new(db)))
    }

    /// Last error message, for the presentation layer.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub(crate) fn fail(&mut self, err: SyncError) -> SyncError {
        debug!("operation failed: {err}");
        self.error = Some(err.to_string());
        err
    }

    /// 1. Purge any mirrored users. When that fails user writes are refused until a later
    ///    attempt succeeds.
    /// 2. Fill memory from the mirror.
    /// 3. Load all four collections from the server at once. Every collection that answers
    ///    overwrites memory and mirror; the others keep what the mirror gave.
    pub async fn initialize(&mut self) -> Result<InitReport, SyncError> {
        self.error = None;
        self.purge_users().await;

        self.state.events = load_slot(self.mirror.as_ref()).await;
        self.state.registrations = load_slot(self.mirror.as_ref()).await;
        self.state.unregistration_requests = load_slot(self.mirror.as_ref()).await;
        self.state.users.clear();

        let remote = self.remote.as_ref();
        let (events, registrations, requests, users) = tokio::join!(
            api_client::fetch::<Event>(remote),
            api_client::fetch::<Registration>(remote),
            api_client::fetch::<UnregistrationRequest>(remote),
            api_client::fetch::<User>(remote),
        );

        let report = InitReport {
            events: self.apply_loaded(events).await,
            registrations: self.apply_loaded(registrations).await,
            unregistration_requests: self.apply_loaded(requests).await,
            users: self.apply_loaded(users).await,
        };
        info!("synchronizer initialized: {report:?}");

        Ok(report)
    }

    async fn apply_loaded<T: Held>(&mut self, loaded: Result<Vec<T>, RemoteError>) -> Source {
        let collection = T::COLLECTION;
        match loaded {
            Ok(records) => {
                debug!("loaded {} {collection} from server", records.len());
                *T::held_mut(&mut self.state) = records.into_iter().map(T::sanitize).collect();
                if is_mirrored(collection) {
                    if let Err(err) = store_slot(self.mirror.as_ref(), T::held(&self.state)).await {
                        warn!("failed to mirror {collection}: {err}");
                    }
                }
                Source::Remote
            }
            Err(err) if is_mirrored(collection) => {
                warn!("failed to load {collection} from server, keeping local copy: {err}");
                Source::Mirror
            }
            Err(err) => {
                warn!("failed to load {collection} from server: {err}");
                T::held_mut(&mut self.state).clear();
                Source::Unavailable
            }
        }
    }

    async fn load<T: Held>(&mut self) -> Result<Source, SyncError> {
        match api_client::fetch::<T>(self.remote.as_ref()).await {
            Err(err) if !is_mirrored(T::COLLECTION) => {
                warn!("failed to load {} from server: {err}", T::COLLECTION);
                T::held_mut(&mut self.state).clear();
                Err(self.rejected(err))
            }
            loaded => Ok(self.apply_loaded(loaded).await),
        }
    }

    async fn purge_users(&mut self) {
        match self.mirror.remove(Collection::Users.slot()).await {
            Ok(()) => self.users_purged = true,
            Err(err) => {
                warn!("failed to remove mirrored users: {err}");
                self.users_purged = false;
            }
        }
    }

    async fn ensure_users_purged(&mut self) -> Result<(), SyncError> {
        if !self.users_purged {
            self.purge_users().await;
        }
        if self.users_purged {
            Ok(())
        } else {
            Err(self.fail(SyncError::UsersNotPurged))
        }
    }

    /// Writes the in-memory collection to the mirror. Memory already holds the change, so a
    /// failed write is only logged.
    async fn persist<T: Held>(&self) {
        if !is_mirrored(T::COLLECTION) {
            return;
        }
        if let Err(err) = store_slot(self.mirror.as_ref(), T::held(&self.state)).await {
            warn!("failed to mirror {}: {err}", T::COLLECTION);
        }
    }

    fn rejected(&mut self, err: RemoteError) -> SyncError {
        self.fail(SyncError::ServerRequired(err))
    }

    async fn create_record<T: Held>(&mut self, draft: T::Draft) -> Result<T, SyncError> {
        let remote = api_client::post::<T>(self.remote.as_ref(), &draft).await;
        let record = match reconcile(remote, T::COLLECTION.policy()) {
            Reconciled::Remote(record) => record,
            Reconciled::Local => match synthesize::<T>(self.ids.next_id(), &draft) {
                Ok(record) => record,
                Err(err) => return Err(self.fail(SyncError::local(err))),
            },
            Reconciled::Rejected(err) => return Err(self.rejected(err)),
        }
        .sanitize();

        debug!("created {} {}", T::COLLECTION, record.id());
        T::held_mut(&mut self.state).push(record.clone());
        self.persist::<T>().await;
        Ok(record)
    }

    /// Returns the updated record, or `None` when the server failed and the record is not known
    /// locally.
    async fn update_record<T: Held>(
        &mut self,
        id: &RecordId,
        patch: T::Patch,
        verb: UpdateVerb,
    ) -> Result<Option<T>, SyncError> {
        let current = T::held(&self.state).iter().find(|x| x.id() == id).cloned();
        let merged = match current.as_ref().map(|x| merge::<T>(x, &patch)).transpose() {
            Ok(merged) => merged,
            Err(err) => return Err(self.fail(SyncError::local(err))),
        };

        let remote = self.remote.as_ref();
        let answer = match (verb, &merged) {
            (UpdateVerb::Patch, _) => api_client::patch::<T>(remote, id, &patch).await,
            // Send the whole record when we have it so a replacing server keeps every field.
            (UpdateVerb::Put, Some(full)) => api_client::put::<T, _>(remote, id, full).await,
            (UpdateVerb::Put, None) => api_client::put::<T, _>(remote, id, &patch).await,
        };

        let record = match reconcile(answer, T::COLLECTION.policy()) {
            Reconciled::Remote(record) => Some(record.sanitize()),
            Reconciled::Local => merged,
            Reconciled::Rejected(err) => return Err(self.rejected(err)),
        };

        let Some(record) = record else {
            return Ok(None);
        };

        let held = T::held_mut(&mut self.state);
        match held.iter_mut().find(|x| x.id() == id) {
            Some(slot) => *slot = record.clone(),
            None => held.push(record.clone()),
        }
        self.persist::<T>().await;
        Ok(Some(record))
    }

    async fn delete_record<T: Held>(&mut self, id: &RecordId) -> Result<(), SyncError> {
        let remote = api_client::delete::<T>(self.remote.as_ref(), id).await;
        if let Reconciled::Rejected(err) = reconcile(remote, T::COLLECTION.policy()) {
            return Err(self.rejected(err));
        }

        T::held_mut(&mut self.state).retain(|x| x.id() != id);
        self.persist::<T>().await;
        Ok(())
    }

    // Events

    pub fn events(&self) -> &[Event] {
        &self.state.events
    }

    pub fn event(&self, id: &RecordId) -> Option<&Event> {
        self.state.events.iter().find(|x| &x.id == id)
    }

    pub async fn load_events(&mut self) -> Result<Source, SyncError> {
        self.load::<Event>().await
    }

    /// `available` starts out equal to `capacity` unless given. A capacity of 0 is refused.
    pub async fn create_event(&mut self, mut event: NewEvent) -> Result<Event, SyncError> {
        if event.capacity == 0 {
            return Err(self.fail(SyncError::InvalidCapacity));
        }
        event.available.get_or_insert(event.capacity);
        self.create_record(event).await
    }

    pub async fn update_event(
        &mut self,
        id: &RecordId,
        patch: EventPatch,
    ) -> Result<Option<Event>, SyncError> {
        if patch.capacity == Some(0) {
            return Err(self.fail(SyncError::InvalidCapacity));
        }
        self.update_record(id, patch, UpdateVerb::Put).await
    }

    /// Registrations of the event are left in place.
    pub async fn delete_event(&mut self, id: &RecordId) -> Result<(), SyncError> {
        self.delete_record::<Event>(id).await
    }

    // Registrations

    pub fn registrations(&self) -> &[Registration] {
        &self.state.registrations
    }

    pub fn registrations_for_user(&self, user_id: &RecordId) -> Vec<&Registration> {
        self.state
            .registrations
            .iter()
            .filter(|x| &x.user_id == user_id)
            .collect()
    }

    pub fn confirmed_count(&self, event_id: &RecordId) -> usize {
        self.state
            .registrations
            .iter()
            .filter(|x| &x.event_id == event_id && x.is_confirmed())
            .count()
    }

    /// Capacity minus confirmed registrations, derived from memory rather than the cached field.
    pub fn available_slots(&self, event_id: &RecordId) -> Option<u32> {
        let event = self.event(event_id)?;
        let taken = u32::try_from(self.confirmed_count(event_id)).unwrap_or(u32::MAX);
        Some(event.capacity.saturating_sub(taken))
    }

    pub async fn load_registrations(&mut self) -> Result<Source, SyncError> {
        self.load::<Registration>().await
    }

    pub async fn create_registration(
        &mut self,
        registration: NewRegistration,
    ) -> Result<Registration, SyncError> {
        self.create_record(registration).await
    }

    pub async fn update_registration(
        &mut self,
        id: &RecordId,
        patch: RegistrationPatch,
    ) -> Result<Option<Registration>, SyncError> {
        self.update_record(id, patch, UpdateVerb::Put).await
    }

    pub async fn delete_registration(&mut self, id: &RecordId) -> Result<(), SyncError> {
        self.delete_record::<Registration>(id).await
    }

    // Unregistration requests

    pub fn unregistration_requests(&self) -> &[UnregistrationRequest] {
        &self.state.unregistration_requests
    }

    pub fn pending_requests(&self) -> Vec<&UnregistrationRequest> {
        self.state
            .unregistration_requests
            .iter()
            .filter(|x| x.status.is_pending())
            .collect()
    }

    pub async fn load_unregistration_requests(&mut self) -> Result<Source, SyncError> {
        self.load::<UnregistrationRequest>().await
    }

    pub async fn create_unregistration_request(
        &mut self,
        request: NewUnregistrationRequest,
    ) -> Result<UnregistrationRequest, SyncError> {
        self.create_record(request).await
    }

    /// Status changes go out as PATCH.
    pub async fn update_unregistration_request(
        &mut self,
        id: &RecordId,
        patch: UnregistrationRequestPatch,
    ) -> Result<Option<UnregistrationRequest>, SyncError> {
        self.update_record(id, patch, UpdateVerb::Patch).await
    }

    // Users

    /// Users as last loaded from the server, without passwords.
    pub fn users(&self) -> &[User] {
        &self.state.users
    }

    pub async fn load_users(&mut self) -> Result<Source, SyncError> {
        self.load::<User>().await
    }

    pub async fn create_user(&mut self, user: NewUser) -> Result<User, SyncError> {
        self.ensure_users_purged().await?;
        self.create_record(user).await
    }

    pub async fn update_user(
        &mut self,
        id: &RecordId,
        patch: UserPatch,
    ) -> Result<Option<User>, SyncError> {
        self.ensure_users_purged().await?;
        self.update_record(id, patch, UpdateVerb::Put).await
    }

    pub async fn delete_user(&mut self, id: &RecordId) -> Result<(), SyncError> {
        self.ensure_users_purged().await?;
        self.delete_record::<User>(id).await
    }

    // Workflows

    /// Confirmed registration of `user_id` to `event_id`, if the user is not registered yet and
    /// the event has room.
    pub async fn enroll(
        &mut self,
        event_id: &RecordId,
        user_id: &RecordId,
    ) -> Result<Registration, SyncError> {
        let already = self
            .state
            .registrations
            .iter()
            .any(|x| &x.event_id == event_id && &x.user_id == user_id && x.is_confirmed());
        if already {
            return Err(self.fail(SyncError::AlreadyRegistered));
        }

        let Some(capacity) = self.event(event_id).map(|x| x.capacity as usize) else {
            return Err(self.fail(SyncError::EventNotFound));
        };

        if self.confirmed_count(event_id) >= capacity {
            return Err(self.fail(SyncError::NoSlotsAvailable));
        }

        self.create_registration(NewRegistration::confirmed(user_id.clone(), event_id.clone()))
            .await
    }

    /// Opens a pending unregistration request for a registration owned by `user_id`.
    pub async fn request_unenrollment(
        &mut self,
        registration_id: &RecordId,
        user_id: &RecordId,
        reason: Option<String>,
    ) -> Result<UnregistrationRequest, SyncError> {
        let Some(registration) = self
            .state
            .registrations
            .iter()
            .find(|x| &x.id == registration_id)
            .cloned()
        else {
            return Err(self.fail(SyncError::RegistrationNotFound));
        };

        if &registration.user_id != user_id {
            return Err(self.fail(SyncError::NotOwner));
        }

        let pending = self
            .state
            .unregistration_requests
            .iter()
            .any(|x| &x.registration_id == registration_id && x.status.is_pending());
        if pending {
            return Err(self.fail(SyncError::PendingRequestExists));
        }

        self.create_unregistration_request(NewUnregistrationRequest {
            registration_id: registration_id.clone(),
            user_id: user_id.clone(),
            event_id: registration.event_id,
            requested_on: today(),
            status: RequestStatus::Pending,
            reason,
        })
        .await
    }

    /// Approves or rejects a request. Approval also deletes the referenced registration. That
    /// deletion is best effort: when it fails the request stays approved.
    pub async fn resolve_unenrollment(
        &mut self,
        request_id: &RecordId,
        resolution: Resolution,
    ) -> Result<UnregistrationRequest, SyncError> {
        let known = self
            .state
            .unregistration_requests
            .iter()
            .find(|x| &x.id == request_id)
            .cloned();
        if let Some(request) = &known {
            if !request.status.is_pending() {
                return Err(self.fail(SyncError::AlreadyResolved(request.status)));
            }
        }

        let patch = UnregistrationRequestPatch {
            status: Some(resolution.into()),
            reason: None,
        };
        let Some(updated) = self.update_unregistration_request(request_id, patch).await? else {
            return Err(self.fail(SyncError::RequestNotFound));
        };

        if resolution == Resolution::Approved {
            let registration_id = known
                .map(|x| x.registration_id)
                .unwrap_or_else(|| updated.registration_id.clone());
            if let Err(err) = self.delete_registration(&registration_id).await {
                warn!("request {request_id} approved but registration {registration_id} was kept: {err}");
            }
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::mirror::MemoryMirror;
    use crate::testing::{FakeRemote, FlakyMirror};
    use std::sync::atomic::Ordering;
    use eventdesk_common::domain::RegistrationStatus;
    use serde_json::json;
    use time::macros::date;

    struct Fixture {
        remote: Arc<FakeRemote>,
        mirror: Arc<MemoryMirror>,
        sync: Synchronizer,
    }

    fn fixture() -> Fixture {
        let remote = Arc::new(FakeRemote::new());
        let mirror = Arc::new(MemoryMirror::new());
        let sync = Synchronizer::new(remote.clone(), mirror.clone())
            .with_ids(Arc::new(SequentialIds::new("local-")));
        Fixture {
            remote,
            mirror,
            sync,
        }
    }

    fn workshop(capacity: u32) -> NewEvent {
        NewEvent::new("Rust workshop", date!(2025 - 06 - 01), "Ownership", capacity)
    }

    #[tokio::test]
    async fn enrolling_twice_is_refused() {
        let mut f = fixture();
        let event = f.sync.create_event(workshop(5)).await.unwrap();
        let user: RecordId = "u1".into();

        f.sync.enroll(&event.id, &user).await.unwrap();
        let err = f.sync.enroll(&event.id, &user).await.unwrap_err();

        assert!(matches!(err, SyncError::AlreadyRegistered));
        assert_eq!(
            f.sync.error(),
            Some("You are already registered for this event")
        );
        assert_eq!(f.sync.confirmed_count(&event.id), 1);
    }

    #[tokio::test]
    async fn capacity_is_respected() {
        let mut f = fixture();
        let event = f.sync.create_event(workshop(2)).await.unwrap();

        f.sync.enroll(&event.id, &"u1".into()).await.unwrap();
        f.sync.enroll(&event.id, &"u2".into()).await.unwrap();
        let err = f.sync.enroll(&event.id, &"u3".into()).await.unwrap_err();

        assert!(matches!(err, SyncError::NoSlotsAvailable));
        assert_eq!(f.sync.confirmed_count(&event.id), 2);
        assert_eq!(f.sync.available_slots(&event.id), Some(0));
        assert_eq!(f.remote.records(Collection::Registrations).len(), 2);
    }

    #[tokio::test]
    async fn cancelled_registrations_free_the_slot() {
        let mut f = fixture();
        let event = f.sync.create_event(workshop(1)).await.unwrap();
        let user: RecordId = "u1".into();

        let registration = f.sync.enroll(&event.id, &user).await.unwrap();
        let patch = RegistrationPatch {
            status: Some(RegistrationStatus::Cancelled),
            ..Default::default()
        };
        f.sync
            .update_registration(&registration.id, patch)
            .await
            .unwrap();

        f.sync.enroll(&event.id, &user).await.unwrap();
        assert_eq!(f.sync.confirmed_count(&event.id), 1);
        assert_eq!(f.sync.registrations().len(), 2);
    }

    #[tokio::test]
    async fn enrolling_in_unknown_event_is_refused() {
        let mut f = fixture();
        let err = f
            .sync
            .enroll(&"missing".into(), &"u1".into())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::EventNotFound));
        assert!(f.remote.records(Collection::Registrations).is_empty());
    }

    #[tokio::test]
    async fn unenrollment_requires_ownership_and_no_pending_request() {
        let mut f = fixture();
        let event = f.sync.create_event(workshop(5)).await.unwrap();
        let owner: RecordId = "u1".into();
        let registration = f.sync.enroll(&event.id, &owner).await.unwrap();

        let err = f
            .sync
            .request_unenrollment(&registration.id, &"u2".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotOwner));

        let err = f
            .sync
            .request_unenrollment(&"nope".into(), &owner, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::RegistrationNotFound));

        let request = f
            .sync
            .request_unenrollment(&registration.id, &owner, Some("moving away".into()))
            .await
            .unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.event_id, event.id);
        assert_eq!(request.requested_on, today());

        let err = f
            .sync
            .request_unenrollment(&registration.id, &owner, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::PendingRequestExists));
        assert_eq!(f.sync.pending_requests().len(), 1);
    }

    #[tokio::test]
    async fn approving_removes_the_registration() {
        let mut f = fixture();
        let event = f.sync.create_event(workshop(5)).await.unwrap();
        let owner: RecordId = "u1".into();
        let registration = f.sync.enroll(&event.id, &owner).await.unwrap();
        let request = f
            .sync
            .request_unenrollment(&registration.id, &owner, None)
            .await
            .unwrap();

        let resolved = f
            .sync
            .resolve_unenrollment(&request.id, Resolution::Approved)
            .await
            .unwrap();

        assert_eq!(resolved.status, RequestStatus::Approved);
        assert!(f.sync.registrations().is_empty());
        assert!(f.remote.records(Collection::Registrations).is_empty());
        assert_eq!(
            f.remote.records(Collection::UnregistrationRequests)[0]["status"],
            "approved"
        );

        let err = f
            .sync
            .resolve_unenrollment(&request.id, Resolution::Rejected)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::AlreadyResolved(RequestStatus::Approved)
        ));
    }

    #[tokio::test]
    async fn rejecting_keeps_the_registration() {
        let mut f = fixture();
        let event = f.sync.create_event(workshop(5)).await.unwrap();
        let owner: RecordId = "u1".into();
        let registration = f.sync.enroll(&event.id, &owner).await.unwrap();
        let request = f
            .sync
            .request_unenrollment(&registration.id, &owner, None)
            .await
            .unwrap();

        let resolved = f
            .sync
            .resolve_unenrollment(&request.id, Resolution::Rejected)
            .await
            .unwrap();

        assert_eq!(resolved.status, RequestStatus::Rejected);
        assert_eq!(f.sync.registrations(), &[registration]);
        // A rejected request no longer blocks a new one.
        f.sync
            .request_unenrollment(&resolved.registration_id, &owner, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn approving_offline_applies_locally() {
        let mut f = fixture();
        let event = f.sync.create_event(workshop(5)).await.unwrap();
        let owner: RecordId = "u1".into();
        let registration = f.sync.enroll(&event.id, &owner).await.unwrap();
        let request = f
            .sync
            .request_unenrollment(&registration.id, &owner, None)
            .await
            .unwrap();

        f.remote.set_online(false);
        let resolved = f
            .sync
            .resolve_unenrollment(&request.id, Resolution::Approved)
            .await
            .unwrap();

        assert_eq!(resolved.status, RequestStatus::Approved);
        assert!(f.sync.registrations().is_empty());
        assert!(f.sync.error().is_none());
    }

    #[tokio::test]
    async fn resolving_unknown_request_fails() {
        let mut f = fixture();
        let err = f
            .sync
            .resolve_unenrollment(&"ghost".into(), Resolution::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::RequestNotFound));
    }

    #[tokio::test]
    async fn offline_event_survives_a_restart() {
        let mut f = fixture();
        f.remote.set_online(false);

        let mut draft = workshop(12);
        draft.instructor = Some("Ferris".into());
        draft.price = Some(19.5);
        draft.category = Some("programming".into());
        let created = f.sync.create_event(draft).await.unwrap();
        assert_eq!(created.id.as_str(), "local-1");
        assert_eq!(created.available, Some(12));

        let mut restarted = Synchronizer::new(f.remote.clone(), f.mirror.clone());
        let report = restarted.initialize().await.unwrap();

        assert_eq!(report.events, Source::Mirror);
        assert!(!report.reached_server());
        assert_eq!(restarted.events(), &[created]);
    }

    #[tokio::test]
    async fn users_have_no_offline_fallback() {
        let mut f = fixture();
        f.remote.set_online(false);

        let user = NewUser {
            name: "Ana".into(),
            email: "ana@example.com".into(),
            phone: None,
            password: "secret".into(),
            is_admin: false,
            registered_on: None,
        };
        let err = f.sync.create_user(user).await.unwrap_err();
        assert!(matches!(err, SyncError::ServerRequired(_)));
        assert_eq!(f.sync.error(), Some("Users require a connection to the server"));
        assert!(f.sync.users().is_empty());
        assert!(f.mirror.read("users").await.unwrap().is_none());

        f.sync.clear_error();
        f.sync.create_event(workshop(3)).await.unwrap();
        assert_eq!(f.sync.events().len(), 1);
        assert!(f.sync.error().is_none());
    }

    #[tokio::test]
    async fn user_updates_and_deletes_need_the_server() {
        let mut f = fixture();
        f.remote.seed(
            Collection::Users,
            vec![json!({"id": 1, "name": "Ana", "email": "ana@example.com", "password": "x", "isAdmin": false})],
        );
        f.sync.load_users().await.unwrap();
        assert!(f.sync.users()[0].password.is_none());

        f.remote.set_online(false);
        let patch = UserPatch {
            name: Some("Ana María".into()),
            ..Default::default()
        };
        assert!(f.sync.update_user(&"1".into(), patch).await.is_err());
        assert!(f.sync.delete_user(&"1".into()).await.is_err());
        assert_eq!(f.sync.users()[0].name, "Ana");

        assert!(f.sync.load_users().await.is_err());
        assert!(f.sync.users().is_empty());
    }

    #[tokio::test]
    async fn initialize_purges_mirrored_users() {
        let mut f = fixture();
        f.mirror
            .write("users", r#"[{"id":"1","name":"x","email":"x@y","password":"p"}]"#)
            .await
            .unwrap();

        f.sync.initialize().await.unwrap();

        assert!(f.mirror.read("users").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn initialize_tolerates_one_corrupt_slot() {
        let mut f = fixture();
        f.remote.set_online(false);
        let event = f.sync.create_event(workshop(4)).await.unwrap();
        f.mirror.write("registrations", "][").await.unwrap();

        let report = f.sync.initialize().await.unwrap();

        assert_eq!(report.users, Source::Unavailable);
        assert_eq!(f.sync.events(), &[event]);
        assert!(f.sync.registrations().is_empty());
    }

    #[tokio::test]
    async fn initialize_prefers_server_data() {
        let mut f = fixture();
        f.mirror
            .write(
                "events",
                r#"[{"id":"old","name":"Stale","date":"2024-01-01","description":"","capacity":1}]"#,
            )
            .await
            .unwrap();
        f.remote.seed(
            Collection::Events,
            vec![json!({"id": 7, "name": "Fresh", "date": "2025-01-01", "description": "", "capacity": 3})],
        );

        let report = f.sync.initialize().await.unwrap();

        assert!(report.reached_server());
        assert_eq!(report.events, Source::Remote);
        assert_eq!(f.sync.events().len(), 1);
        assert_eq!(f.sync.events()[0].name, "Fresh");
        let mirrored: Vec<Event> = load_slot(f.mirror.as_ref()).await;
        assert_eq!(mirrored[0].id.as_str(), "7");
    }

    #[tokio::test]
    async fn offline_update_merges_fields() {
        let mut f = fixture();
        let event = f.sync.create_event(workshop(4)).await.unwrap();
        f.remote.set_online(false);

        let patch = EventPatch {
            capacity: Some(8),
            ..Default::default()
        };
        let updated = f.sync.update_event(&event.id, patch).await.unwrap().unwrap();

        assert_eq!(updated.capacity, 8);
        assert_eq!(updated.name, event.name);
        let mirrored: Vec<Event> = load_slot(f.mirror.as_ref()).await;
        assert_eq!(mirrored, vec![updated]);

        let missing = f
            .sync
            .update_event(&"ghost".into(), EventPatch::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn online_update_keeps_remote_fields() {
        let mut f = fixture();
        let mut draft = workshop(4);
        draft.instructor = Some("Ferris".into());
        let event = f.sync.create_event(draft).await.unwrap();

        let patch = EventPatch {
            name: Some("Async Rust".into()),
            ..Default::default()
        };
        f.sync.update_event(&event.id, patch).await.unwrap();

        let stored = &f.remote.records(Collection::Events)[0];
        assert_eq!(stored["name"], "Async Rust");
        assert_eq!(stored["instructor"], "Ferris");
    }

    #[tokio::test]
    async fn events_need_room_for_someone() {
        let mut f = fixture();
        let err = f.sync.create_event(workshop(0)).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidCapacity));
        assert_eq!(f.sync.error(), Some("Event capacity must be at least 1"));
        assert!(f.remote.records(Collection::Events).is_empty());

        let event = f.sync.create_event(workshop(3)).await.unwrap();
        f.sync.clear_error();
        let patch = EventPatch {
            capacity: Some(0),
            ..Default::default()
        };
        let err = f.sync.update_event(&event.id, patch).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidCapacity));
        assert_eq!(f.sync.events()[0].capacity, 3);
        assert_eq!(f.remote.records(Collection::Events)[0]["capacity"], 3);
    }

    fn flaky_fixture() -> (Arc<FakeRemote>, Arc<FlakyMirror>, Synchronizer) {
        let remote = Arc::new(FakeRemote::new());
        let mirror = Arc::new(FlakyMirror::default());
        let sync = Synchronizer::new(remote.clone(), mirror.clone());
        (remote, mirror, sync)
    }

    #[tokio::test]
    async fn mirror_write_failures_do_not_fail_the_operation() {
        let (remote, mirror, mut sync) = flaky_fixture();
        mirror.fail_writes.store(true, Ordering::SeqCst);

        let event = sync.create_event(workshop(4)).await.unwrap();
        let patch = EventPatch {
            name: Some("Async Rust".into()),
            ..Default::default()
        };
        let updated = sync.update_event(&event.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.name, "Async Rust");
        sync.delete_event(&event.id).await.unwrap();

        assert!(sync.error().is_none());
        assert!(sync.events().is_empty());
        assert!(remote.records(Collection::Events).is_empty());
    }

    #[tokio::test]
    async fn failed_user_purge_only_blocks_user_writes() {
        let (remote, mirror, mut sync) = flaky_fixture();
        mirror
            .write("users", r#"[{"id":"1","name":"x","email":"x@y","password":"p"}]"#)
            .await
            .unwrap();
        mirror.fail_removes.store(true, Ordering::SeqCst);

        let report = sync.initialize().await.unwrap();
        assert_eq!(report.events, Source::Remote);

        sync.create_event(workshop(2)).await.unwrap();
        let user = NewUser {
            name: "Ana".into(),
            email: "ana@example.com".into(),
            phone: None,
            password: "s3cret".into(),
            is_admin: false,
            registered_on: None,
        };
        let err = sync.create_user(user.clone()).await.unwrap_err();
        assert!(matches!(err, SyncError::UsersNotPurged));
        assert!(remote.records(Collection::Users).is_empty());

        mirror.fail_removes.store(false, Ordering::SeqCst);
        sync.create_user(user).await.unwrap();
        assert!(mirror.read("users").await.unwrap().is_none());
        assert_eq!(remote.records(Collection::Users).len(), 1);
    }

    #[tokio::test]
    async fn deleting_an_event_leaves_registrations() {
        let mut f = fixture();
        let event = f.sync.create_event(workshop(4)).await.unwrap();
        f.sync.enroll(&event.id, &"u1".into()).await.unwrap();

        f.sync.delete_event(&event.id).await.unwrap();

        assert!(f.sync.events().is_empty());
        assert_eq!(f.sync.registrations().len(), 1);
    }

    #[tokio::test]
    async fn offline_delete_applies_locally() {
        let mut f = fixture();
        let event = f.sync.create_event(workshop(4)).await.unwrap();
        f.remote.set_online(false);

        f.sync.delete_event(&event.id).await.unwrap();

        assert!(f.sync.events().is_empty());
        let mirrored: Vec<Event> = load_slot(f.mirror.as_ref()).await;
        assert!(mirrored.is_empty());
        assert_eq!(f.remote.records(Collection::Events).len(), 1);
    }
}
