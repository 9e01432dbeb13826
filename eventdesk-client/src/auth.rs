use crate::api_client::RemoteStore;
use crate::error::SyncError;
use crate::settings::Settings;
use crate::sync::Synchronizer;
use eventdesk_common::api::{CurrentUser, LoginRequest};
use eventdesk_common::domain::{today, NewUser};
use reqwest::StatusCode;
use tracing::info;

/// Verifies the credentials with the server and stores the session. There is no offline login.
pub async fn login(
    remote: &dyn RemoteStore,
    settings: &Settings,
    email: &str,
    password: &str,
) -> Result<CurrentUser, SyncError> {
    let request = LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    };

    let user = match remote.login(&request).await {
        Ok(user) => user,
        Err(err)
            if err.status() == Some(StatusCode::UNAUTHORIZED)
                || err.status() == Some(StatusCode::BAD_REQUEST) =>
        {
            return Err(SyncError::InvalidCredentials)
        }
        Err(err) => return Err(SyncError::ServerRequired(err)),
    };

    settings.save_session(&user).map_err(SyncError::local)?;
    info!("logged in as {}", user.email);
    Ok(user)
}

/// Creates a regular (non admin) account and logs it in. Emails are unique, checked against a
/// fresh copy of the users held by the server.
pub async fn register(
    sync: &mut Synchronizer,
    settings: &Settings,
    mut user: NewUser,
) -> Result<CurrentUser, SyncError> {
    sync.load_users().await?;

    let taken = sync
        .users()
        .iter()
        .any(|x| x.email.eq_ignore_ascii_case(&user.email));
    if taken {
        return Err(sync.fail(SyncError::EmailTaken));
    }

    user.is_admin = false;
    user.registered_on.get_or_insert_with(today);

    let created = sync.create_user(user).await?;
    let current = CurrentUser::from(created);
    if let Err(err) = settings.save_session(&current) {
        return Err(sync.fail(SyncError::local(err)));
    }

    info!("registered {}", current.email);
    Ok(current)
}
