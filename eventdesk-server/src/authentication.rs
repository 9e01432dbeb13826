use crate::database::{Database, Document};
use crate::error::ServerError;
use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordVerifier, Version};
use eventdesk_common::collection::Collection;
use eyre::{eyre, Context};
use tracing::error;

// Verified against when the email is unknown, so both paths cost the same.
const DUMMY_HASH: &str = "$argon2id$v=19$m=15000,t=2,p=1$\
    gZiV/M1gPc22ElAH/Jh1Hw$\
    CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno";

pub(crate) fn hash_password(value: &str) -> eyre::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let params = Params::new(15000, 2, 1, None).map_err(|err| eyre!("bad argon2 params: {err}"))?;
    let password_hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(value.as_bytes(), &salt)?
        .to_string();
    Ok(password_hash)
}

pub(crate) fn verify_password_hash(expected: &str, provided: &str) -> Result<(), ServerError> {
    let expected_password_hash = PasswordHash::new(expected).map_err(|err| {
        error!("Failed to parse hash in PHC string format. {err}");
        ServerError::UnexpectedError("Failed to parse hash")
    })?;

    Argon2::default()
        .verify_password(provided.as_bytes(), &expected_password_hash)
        .context("Invalid password.")
        .map_err(|_| ServerError::InvalidCredentials)
}

/// Finds the user document whose email matches (ignoring ASCII case) and whose stored hash
/// accepts `password`.
pub(crate) async fn validate_credentials(
    db: &Database,
    email: &str,
    password: &str,
) -> Result<Document, ServerError> {
    let users = db.list(Collection::Users).await.map_err(|err| {
        error!("failed query {err}");
        ServerError::UnexpectedError("Failed to execute query")
    })?;

    let user = users.into_iter().find(|x| {
        x.get("email")
            .and_then(|v| v.as_str())
            .is_some_and(|v| v.eq_ignore_ascii_case(email))
    });

    let stored_hash = user
        .as_ref()
        .and_then(|x| x.get("password"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    verify_password_hash(stored_hash.as_deref().unwrap_or(DUMMY_HASH), password)?;

    match (user, stored_hash) {
        (Some(user), Some(_)) => Ok(user),
        _ => Err(ServerError::InvalidCredentials),
    }
}
