pub mod api_client;
pub mod auth;
pub mod database;
pub mod error;
pub mod ids;
pub mod mirror;
pub mod reconcile;
pub mod record;
pub mod settings;
pub mod sync;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
