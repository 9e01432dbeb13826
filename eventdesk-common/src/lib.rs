pub mod api;
pub mod collection;
pub mod domain;
pub mod utils;
