use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::config::AppConfig;
use crate::error::ModelError;
use crate::recipes::repo::CatalogStore;
use crate::users::repo::UserStore;

/// Both persistence seams behind one handle.
pub trait Store: UserStore + CatalogStore {}

impl<T: UserStore + CatalogStore + ?Sized> Store for T {}

/// Postgres-backed store for users and the recipe catalog.
#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        info!("migrations applied");
        Ok(())
    }
}

const UNIQUE_VIOLATION: &str = "23505";
const STRING_TOO_LONG: &str = "22001";
const NUMERIC_OUT_OF_RANGE: &str = "22003";
const CHECK_VIOLATION: &str = "23514";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Column named by a default `<table>_<column>_fkey` constraint.
fn foreign_key_column(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(c) if c.ends_with("user_id_fkey") => "user_id",
        Some(c) if c.ends_with("recipe_id_fkey") => "recipe_id",
        Some(c) if c.ends_with("tag_id_fkey") => "tag_id",
        Some(c) if c.ends_with("ingredient_id_fkey") => "ingredient_id",
        _ => "reference",
    }
}

/// Maps Postgres constraint failures onto `ModelError::Constraint`.
pub(crate) fn map_write_error(err: sqlx::Error, field: &'static str) -> ModelError {
    let code = err
        .as_database_error()
        .and_then(|e| e.code())
        .map(|c| c.into_owned());
    match code.as_deref() {
        Some(UNIQUE_VIOLATION) => ModelError::unique(field),
        Some(STRING_TOO_LONG) | Some(NUMERIC_OUT_OF_RANGE) | Some(CHECK_VIOLATION) => {
            let message = err
                .as_database_error()
                .map(|e| e.message().to_string())
                .unwrap_or_default();
            ModelError::constraint("fields.invalid", field, message)
        }
        Some(FOREIGN_KEY_VIOLATION) => {
            let (column, message) = err
                .as_database_error()
                .map(|e| (foreign_key_column(e.constraint()), e.message().to_string()))
                .unwrap_or(("reference", String::new()));
            ModelError::constraint("fields.foreign_key", column, message)
        }
        _ => ModelError::Database(err),
    }
}
