use async_trait::async_trait;
use tracing::debug;

use crate::db::{map_write_error, PgStore};
use crate::error::{ModelError, ModelResult};
use crate::fields::{check_max_length, MAX_CHAR_LENGTH};
use crate::users::repo_types::{NewUser, User};

/// Persistence seam for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a new user. Fails if the email is already taken.
    async fn insert_user(&self, new: NewUser) -> ModelResult<User>;

    /// Writes every mutable field of `user` back to its row.
    async fn save_user(&self, user: &User) -> ModelResult<User>;

    async fn get_user(&self, id: i64) -> ModelResult<Option<User>>;

    /// Looks a user up by its already-normalized email.
    async fn find_user_by_email(&self, email: &str) -> ModelResult<Option<User>>;

    /// Deletes the user along with their recipes and tags. Ingredients keep
    /// the dangling owner id.
    async fn delete_user(&self, id: i64) -> ModelResult<()>;
}

pub(crate) fn check_user_columns(email: &str, name: &str) -> ModelResult<()> {
    check_max_length("email", email, MAX_CHAR_LENGTH)?;
    check_max_length("name", name, MAX_CHAR_LENGTH)
}

const USER_COLUMNS: &str =
    "id, email, name, password_hash, is_active, is_staff, is_superuser, permissions, last_login";

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, new: NewUser) -> ModelResult<User> {
        check_user_columns(&new.email, &new.name)?;
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash, is_active, is_staff, is_superuser, permissions)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.password_hash)
        .bind(new.is_active)
        .bind(new.is_staff)
        .bind(new.is_superuser)
        .bind(&new.permissions)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "email"))?;
        debug!(user_id = user.id, "user row inserted");
        Ok(user)
    }

    async fn save_user(&self, user: &User) -> ModelResult<User> {
        check_user_columns(&user.email, &user.name)?;
        let saved = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET email = $2, name = $3, password_hash = $4, is_active = $5,
                   is_staff = $6, is_superuser = $7, permissions = $8, last_login = $9
             WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(&user.permissions)
        .bind(user.last_login)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "email"))?
        .ok_or_else(|| ModelError::not_found("user", user.id))?;
        Ok(saved)
    }

    async fn get_user(&self, id: i64) -> ModelResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> ModelResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> ModelResult<()> {
        // recipes, tags and link rows go through ON DELETE CASCADE
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(ModelError::not_found("user", id));
        }
        debug!(user_id = id, "user row deleted");
        Ok(())
    }
}
