//! Flag- and codename-based authorization on user records.
//!
//! Codenames follow `<app_label>.<verb>_<model>`, e.g. `core.change_recipe`.
//! Inactive users hold no permissions; active superusers hold all of them.

use crate::users::repo_types::User;

pub const APP_LABEL: &str = "core";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Change,
    Delete,
    View,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::Change => "change",
            Action::Delete => "delete",
            Action::View => "view",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User,
    Recipe,
    Tag,
    Ingredient,
}

impl Resource {
    fn model(self) -> &'static str {
        match self {
            Resource::User => "user",
            Resource::Recipe => "recipe",
            Resource::Tag => "tag",
            Resource::Ingredient => "ingredient",
        }
    }
}

pub fn codename(action: Action, resource: Resource) -> String {
    format!("{}.{}_{}", APP_LABEL, action.verb(), resource.model())
}

pub fn has_permission(user: &User, action: Action, resource: Resource) -> bool {
    has_perm(user, &codename(action, resource))
}

pub fn has_perm(user: &User, perm: &str) -> bool {
    if !user.is_active {
        return false;
    }
    if user.is_superuser {
        return true;
    }
    user.permissions.iter().any(|p| p == perm)
}

/// Whether the user holds any permission under `app_label`.
pub fn has_module_perms(user: &User, app_label: &str) -> bool {
    if !user.is_active {
        return false;
    }
    if user.is_superuser {
        return true;
    }
    user.permissions
        .iter()
        .any(|p| p.split_once('.').map(|(app, _)| app) == Some(app_label))
}

impl User {
    /// Adds the codename for `action` on `resource` if not already granted.
    /// Persist with `UserStore::save_user`.
    pub fn grant(&mut self, action: Action, resource: Resource) {
        let perm = codename(action, resource);
        if !self.permissions.contains(&perm) {
            self.permissions.push(perm);
        }
    }

    pub fn revoke(&mut self, action: Action, resource: Resource) {
        let perm = codename(action, resource);
        self.permissions.retain(|p| *p != perm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 3,
            email: "perm@example.com".into(),
            name: String::new(),
            password_hash: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            permissions: Vec::new(),
            last_login: None,
        }
    }

    #[test]
    fn codename_format() {
        assert_eq!(codename(Action::Add, Resource::Recipe), "core.add_recipe");
        assert_eq!(codename(Action::View, Resource::Ingredient), "core.view_ingredient");
    }

    #[test]
    fn plain_user_needs_explicit_grant() {
        let mut u = user();
        assert!(!has_permission(&u, Action::Add, Resource::Tag));
        assert!(!has_module_perms(&u, APP_LABEL));

        u.grant(Action::Add, Resource::Tag);
        u.grant(Action::Add, Resource::Tag);
        assert_eq!(u.permissions, vec!["core.add_tag".to_string()]);
        assert!(has_permission(&u, Action::Add, Resource::Tag));
        assert!(!has_permission(&u, Action::Delete, Resource::Tag));
        assert!(has_module_perms(&u, APP_LABEL));
        assert!(!has_module_perms(&u, "billing"));

        u.revoke(Action::Add, Resource::Tag);
        assert!(!has_permission(&u, Action::Add, Resource::Tag));
    }

    #[test]
    fn superuser_has_everything_while_active() {
        let mut u = user();
        u.is_superuser = true;
        assert!(has_permission(&u, Action::Delete, Resource::User));
        assert!(has_perm(&u, "anything.at_all"));
        assert!(has_module_perms(&u, "billing"));

        u.is_active = false;
        assert!(!has_permission(&u, Action::Delete, Resource::User));
        assert!(!has_module_perms(&u, APP_LABEL));
    }

    #[test]
    fn staff_flag_alone_grants_nothing() {
        let mut u = user();
        u.is_staff = true;
        assert!(!has_permission(&u, Action::View, Resource::Recipe));
    }

    #[test]
    fn inactive_user_loses_grants() {
        let mut u = user();
        u.grant(Action::View, Resource::Recipe);
        u.is_active = false;
        assert!(!has_permission(&u, Action::View, Resource::Recipe));
    }
}
