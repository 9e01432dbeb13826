use crate::error::RemoteError;
use eventdesk_common::collection::FallbackPolicy;
use tracing::warn;

/// What to do with the answer of a remote write.
#[derive(Debug)]
pub enum Reconciled<T> {
    /// The server accepted the change. Apply its canonical record.
    Remote(T),
    /// The server failed but the collection may be served locally. Apply the local record.
    Local,
    /// The server failed and the collection has no local fallback.
    Rejected(RemoteError),
}

pub fn reconcile<T>(remote: Result<T, RemoteError>, policy: FallbackPolicy) -> Reconciled<T> {
    match (remote, policy) {
        (Ok(value), _) => Reconciled::Remote(value),
        (Err(err), FallbackPolicy::Mirror) => {
            warn!("remote store failed, applying change locally: {err}");
            Reconciled::Local
        }
        (Err(err), FallbackPolicy::ServerOnly) => Reconciled::Rejected(err),
    }
}
