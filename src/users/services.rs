use tracing::{info, instrument, warn};

use crate::error::{ModelError, ModelResult};
use crate::users::password::{hash_password, make_unusable_password};
use crate::users::repo::UserStore;
use crate::users::repo_types::{ExtraFields, NewUser, User};

/// Trims and lowercases an email address.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Creates and saves a new user.
///
/// The email is normalized first and must not be blank; a blank email fails
/// before anything is written. `None` for the password stores an unusable
/// password marker.
#[instrument(skip(store, password, extra))]
pub async fn create_user<S>(
    store: &S,
    email: &str,
    password: Option<&str>,
    extra: ExtraFields,
) -> ModelResult<User>
where
    S: UserStore + ?Sized,
{
    let email = normalize_email(email);
    if email.is_empty() {
        warn!("user creation rejected: empty email");
        return Err(ModelError::email_required());
    }

    let password_hash = match password {
        Some(p) => hash_password(p)?,
        None => make_unusable_password(),
    };

    let user = store
        .insert_user(NewUser::from_extra(email, password_hash, extra))
        .await?;
    info!(user_id = user.id, email = %user.email, "user created");
    Ok(user)
}

/// Creates a user through `create_user`, then raises the staff and superuser
/// flags with a second save.
///
/// The two writes are not atomic: if the second save fails, the user row
/// already exists without the elevated flags and the error is returned.
#[instrument(skip(store, password, extra))]
pub async fn create_superuser<S>(
    store: &S,
    email: &str,
    password: Option<&str>,
    extra: ExtraFields,
) -> ModelResult<User>
where
    S: UserStore + ?Sized,
{
    let mut user = create_user(store, email, password, extra).await?;
    user.is_staff = true;
    user.is_superuser = true;
    let user = store.save_user(&user).await?;
    info!(user_id = user.id, "superuser flags set");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::memory::MemoryStore;

    /// Inserts succeed, every later save fails.
    #[derive(Default)]
    struct SaveFailsStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl UserStore for SaveFailsStore {
        async fn insert_user(&self, new: NewUser) -> ModelResult<User> {
            self.inner.insert_user(new).await
        }
        async fn save_user(&self, _user: &User) -> ModelResult<User> {
            Err(ModelError::Database(sqlx::Error::PoolTimedOut))
        }
        async fn get_user(&self, id: i64) -> ModelResult<Option<User>> {
            self.inner.get_user(id).await
        }
        async fn find_user_by_email(&self, email: &str) -> ModelResult<Option<User>> {
            self.inner.find_user_by_email(email).await
        }
        async fn delete_user(&self, id: i64) -> ModelResult<()> {
            self.inner.delete_user(id).await
        }
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_email("  Chef@Example.COM \n"), "chef@example.com");
        assert_eq!(normalize_email("plain@example.com"), "plain@example.com");
        assert_eq!(normalize_email("   "), "");
    }

    #[tokio::test]
    async fn create_user_stores_normalized_email() {
        let store = MemoryStore::new();
        let user = create_user(&store, "  MiXeD@Example.Com ", Some("pw123456"), ExtraFields::named("Mix"))
            .await
            .expect("create user");

        assert_eq!(user.email, "mixed@example.com");
        assert_eq!(user.name, "Mix");
        assert!(user.is_active);
        assert!(!user.is_staff);
        assert!(!user.is_superuser);
        assert!(user.check_password("pw123456"));
        assert_ne!(user.password_hash, "pw123456");

        let found = store
            .find_user_by_email("mixed@example.com")
            .await
            .unwrap()
            .expect("user persisted");
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn create_user_rejects_empty_email_without_writing() {
        let store = MemoryStore::new();

        let err = create_user(&store, "", Some("pw"), ExtraFields::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Users must have an email address.");

        let err = create_user(&store, "   ", Some("pw"), ExtraFields::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());

        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn create_user_without_password_is_unusable() {
        let store = MemoryStore::new();
        let user = create_user(&store, "nopw@example.com", None, ExtraFields::default())
            .await
            .unwrap();
        assert!(!user.has_usable_password());
        assert!(!user.check_password(""));
    }

    #[tokio::test]
    async fn create_user_applies_extra_fields() {
        let store = MemoryStore::new();
        let extra = ExtraFields {
            name: "Inactive".into(),
            is_active: false,
            is_staff: true,
            ..ExtraFields::default()
        };
        let user = create_user(&store, "staff@example.com", Some("pw"), extra)
            .await
            .unwrap();
        assert!(!user.is_active);
        assert!(user.is_staff);
        assert!(!user.is_superuser);
    }

    #[tokio::test]
    async fn create_user_rejects_duplicate_normalized_email() {
        let store = MemoryStore::new();
        create_user(&store, "dup@example.com", Some("pw"), ExtraFields::default())
            .await
            .unwrap();
        let err = create_user(&store, " DUP@example.com", Some("pw"), ExtraFields::default())
            .await
            .unwrap_err();
        assert_eq!(err.message_key(), "fields.unique");
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn create_superuser_sets_both_flags() {
        let store = MemoryStore::new();
        let extra = ExtraFields {
            is_staff: false,
            is_superuser: false,
            ..ExtraFields::named("Root")
        };
        let user = create_superuser(&store, "Root@Example.com", Some("pw"), extra)
            .await
            .expect("create superuser");

        assert_eq!(user.email, "root@example.com");
        assert!(user.is_staff);
        assert!(user.is_superuser);

        let stored = store.get_user(user.id).await.unwrap().unwrap();
        assert!(stored.is_staff);
        assert!(stored.is_superuser);
    }

    #[tokio::test]
    async fn create_superuser_failed_save_leaves_plain_user() {
        let store = SaveFailsStore::default();
        let err = create_superuser(&store, "Half@Example.com", Some("pw"), ExtraFields::default())
            .await
            .unwrap_err();
        assert_eq!(err.message_key(), "database.error");

        assert_eq!(store.inner.user_count(), 1);
        let stored = store
            .find_user_by_email("half@example.com")
            .await
            .unwrap()
            .expect("first write kept");
        assert!(!stored.is_staff);
        assert!(!stored.is_superuser);
        assert!(stored.check_password("pw"));
    }

    #[tokio::test]
    async fn create_superuser_propagates_validation_error() {
        let store = MemoryStore::new();
        let err = create_superuser(&store, "", Some("pw"), ExtraFields::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(store.user_count(), 0);
    }
}
