//! Data layer for a recipe-management application: user identity records
//! and a catalog of recipes, tags and ingredients owned by those users.

pub mod config;
pub mod db;
pub mod error;
pub mod fields;
pub mod images;
pub mod memory;
pub mod recipes;
pub mod state;
pub mod storage;
pub mod users;

pub use db::{PgStore, Store};
pub use error::{ModelError, ModelResult};
pub use memory::MemoryStore;
pub use state::AppState;
