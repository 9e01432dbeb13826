use super::handlers;
use crate::database::Database;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub database: Database,
}

pub fn router(database: Database) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/login", post(handlers::user::login))
        .route(
            "/:collection",
            get(handlers::collection::list).post(handlers::collection::create),
        )
        .route(
            "/:collection/:id",
            get(handlers::collection::get)
                .put(handlers::collection::replace)
                .patch(handlers::collection::patch)
                .delete(handlers::collection::delete),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { database })
}
