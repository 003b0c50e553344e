use thiserror::Error;

/// Errors surfaced by the user store and the recipe catalog.
///
/// `Display` yields the default English text; `message_key` gives the
/// stable key a localization layer can translate.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{message}")]
    Validation {
        key: &'static str,
        message: &'static str,
    },

    #[error("{field}: {message}")]
    Constraint {
        key: &'static str,
        field: &'static str,
        message: String,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("file storage error: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type ModelResult<T> = Result<T, ModelError>;

pub(crate) const EMAIL_REQUIRED: &str = "Users must have an email address.";

impl ModelError {
    pub fn email_required() -> Self {
        Self::Validation {
            key: "users.email_required",
            message: EMAIL_REQUIRED,
        }
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub(crate) fn max_length(field: &'static str, max: usize, actual: usize) -> Self {
        Self::Constraint {
            key: "fields.max_length",
            field,
            message: format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, actual
            ),
        }
    }

    pub(crate) fn unique(field: &'static str) -> Self {
        Self::Constraint {
            key: "fields.unique",
            field,
            message: format!("A record with this {} already exists.", field),
        }
    }

    pub(crate) fn foreign_key(field: &'static str, id: i64) -> Self {
        Self::Constraint {
            key: "fields.foreign_key",
            field,
            message: format!("No related row with id {} exists.", id),
        }
    }

    pub(crate) fn constraint(key: &'static str, field: &'static str, message: impl Into<String>) -> Self {
        Self::Constraint {
            key,
            field,
            message: message.into(),
        }
    }

    /// Localization key for this error.
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::Validation { key, .. } | Self::Constraint { key, .. } => key,
            Self::NotFound { .. } => "records.not_found",
            Self::PasswordHash(_) => "users.password_hash_failed",
            Self::Storage(_) => "files.storage_failed",
            Self::Database(_) => "database.error",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_required_has_key_and_default_text() {
        let err = ModelError::email_required();
        assert!(err.is_validation());
        assert_eq!(err.message_key(), "users.email_required");
        assert_eq!(err.to_string(), "Users must have an email address.");
    }

    #[test]
    fn max_length_mentions_field_and_limit() {
        let err = ModelError::max_length("title", 255, 300);
        assert_eq!(err.message_key(), "fields.max_length");
        let msg = err.to_string();
        assert!(msg.starts_with("title:"));
        assert!(msg.contains("255"));
        assert!(msg.contains("300"));
    }

    #[test]
    fn foreign_key_is_a_constraint() {
        let err = ModelError::foreign_key("tag_id", 12);
        assert_eq!(err.message_key(), "fields.foreign_key");
        assert_eq!(err.to_string(), "tag_id: No related row with id 12 exists.");
    }

    #[test]
    fn not_found_names_entity() {
        let err = ModelError::not_found("recipe", 7);
        assert_eq!(err.to_string(), "recipe 7 not found");
        assert!(!err.is_validation());
    }
}
