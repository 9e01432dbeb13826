use crate::authentication::validate_credentials;
use crate::error::ServerError;
use crate::router::AppState;
use axum::extract::State;
use axum::response::Json;
use eventdesk_common::api::{CurrentUser, LoginRequest};
use eventdesk_common::domain::User;
use serde_json::Value;
use tracing::{error, info};

pub async fn login(
    state: State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<CurrentUser>, ServerError> {
    let document = validate_credentials(&state.database, &req.email, &req.password).await?;

    let user: User = serde_json::from_value(Value::Object(document)).map_err(|err| {
        error!("Stored user does not decode: {err}");
        ServerError::UnexpectedError("Failed to read user")
    })?;
    info!("user {} logged in", user.id);

    Ok(Json(CurrentUser::from(user)))
}
