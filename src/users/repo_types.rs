use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database. Identified by its normalized email.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash or unusable marker, not exposed in JSON
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub permissions: Vec<String>, // granted codenames, e.g. "core.add_recipe"
    pub last_login: Option<OffsetDateTime>,
}

impl User {
    /// Stamps `last_login` with the current time. Persist with
    /// `UserStore::save_user`.
    pub fn record_login(&mut self) {
        self.last_login = Some(OffsetDateTime::now_utc());
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.email)
    }
}

/// Attributes accepted by `create_user` besides email and password.
#[derive(Debug, Clone)]
pub struct ExtraFields {
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub permissions: Vec<String>,
}

impl Default for ExtraFields {
    fn default() -> Self {
        Self {
            name: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            permissions: Vec::new(),
        }
    }
}

impl ExtraFields {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Row handed to the store on insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub permissions: Vec<String>,
}

impl NewUser {
    pub(crate) fn from_extra(email: String, password_hash: String, extra: ExtraFields) -> Self {
        Self {
            email,
            name: extra.name,
            password_hash,
            is_active: extra.is_active,
            is_staff: extra.is_staff,
            is_superuser: extra.is_superuser,
            permissions: extra.permissions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_not_serialized() {
        let user = User {
            id: 9,
            email: "json@example.com".into(),
            name: "Json".into(),
            password_hash: "$argon2id$secret".into(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            permissions: vec!["core.view_recipe".into()],
            last_login: None,
        };
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["email"], "json@example.com");
        assert_eq!(user.to_string(), "json@example.com");
        assert!(value["last_login"].is_null());
    }

    #[test]
    fn extra_fields_defaults() {
        let extra = ExtraFields::default();
        assert!(extra.is_active);
        assert!(!extra.is_staff);
        assert!(!extra.is_superuser);
        assert!(extra.name.is_empty());
        assert_eq!(ExtraFields::named("Ann").name, "Ann");
    }
}
