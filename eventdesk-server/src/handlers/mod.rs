use axum::response::Json;
use eventdesk_common::api::HealthCheckResponse;

pub mod collection;
pub mod user;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn index() -> Json<HealthCheckResponse> {
    let version = VERSION.to_string();

    Json(HealthCheckResponse {
        status: "Ok".to_string(),
        version,
    })
}
