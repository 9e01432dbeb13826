use eventdesk_common::domain::RequestStatus;
use reqwest::StatusCode;

/// Why a call to the collection server did not produce a usable answer.
#[derive(thiserror::Error, Debug)]
pub enum RemoteError {
    #[error("Service unavailable.")]
    Unavailable,

    #[error("There was an error with the service: Status {0}.")]
    Status(StatusCode),

    #[error("Failed to reach the service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response from the service: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RemoteError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RemoteError::Unavailable => Some(StatusCode::SERVICE_UNAVAILABLE),
            RemoteError::Status(s) => Some(*s),
            RemoteError::Transport(e) => e.status(),
            RemoteError::Decode(_) => None,
        }
    }
}

/// Every way an operation of the synchronizer can be refused. The `Display` text is what ends up
/// in the shared error channel.
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("You are already registered for this event")]
    AlreadyRegistered,

    #[error("Event not found")]
    EventNotFound,

    #[error("No slots available for this event")]
    NoSlotsAvailable,

    #[error("Registration not found")]
    RegistrationNotFound,

    #[error("You do not have permission to unregister from this registration")]
    NotOwner,

    #[error("You already have a pending unregistration request for this event")]
    PendingRequestExists,

    #[error("Unregistration request not found")]
    RequestNotFound,

    #[error("Unregistration request was already {0}")]
    AlreadyResolved(RequestStatus),

    #[error("Event capacity must be at least 1")]
    InvalidCapacity,

    #[error("A user with this email already exists")]
    EmailTaken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Users require a connection to the server")]
    ServerRequired(#[source] RemoteError),

    #[error("Users stored locally by an older session could not be removed")]
    UsersNotPurged,

    #[error("Failed to update local storage: {0}")]
    Local(String),
}

impl SyncError {
    pub(crate) fn local(err: impl std::fmt::Display) -> Self {
        SyncError::Local(err.to_string())
    }
}
