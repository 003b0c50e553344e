pub mod password;
pub mod permissions;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use permissions::{has_module_perms, has_perm, has_permission, Action, Resource};
pub use repo::UserStore;
pub use repo_types::{ExtraFields, NewUser, User};
pub use services::{create_superuser, create_user, normalize_email};
