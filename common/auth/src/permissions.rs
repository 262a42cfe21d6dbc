use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::roles::is_super_admin_role;

/// How a list of required permissions is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionMode {
    #[default]
    Any,
    All,
}

/// Answers permission questions from the snapshot delivered at login.
///
/// The snapshot is never refreshed mid-session: a change made by an
/// administrator shows up after the affected user signs in again.
#[derive(Debug, Clone, Copy)]
pub struct PermissionResolver<'a> {
    unrestricted: bool,
    granted: &'a [String],
}

impl<'a> PermissionResolver<'a> {
    pub fn new(
        role: Option<&str>,
        granted: &'a [String],
        is_owner: bool,
        is_super_admin: bool,
    ) -> Self {
        Self {
            unrestricted: is_super_admin_role(role) || is_owner || is_super_admin,
            granted,
        }
    }

    /// Resolver that denies everything (signed-out visitors).
    pub fn deny_all() -> Self {
        Self {
            unrestricted: false,
            granted: &[],
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.unrestricted
    }

    pub fn has_permission(&self, code: &str) -> bool {
        self.unrestricted || self.granted.iter().any(|granted| granted == code)
    }

    pub fn has_any_permission<S: AsRef<str>>(&self, codes: &[S]) -> bool {
        self.unrestricted || codes.iter().any(|code| self.has_permission(code.as_ref()))
    }

    pub fn has_all_permissions<S: AsRef<str>>(&self, codes: &[S]) -> bool {
        self.unrestricted || codes.iter().all(|code| self.has_permission(code.as_ref()))
    }

    /// An empty requirement list always passes.
    pub fn check<S: AsRef<str>>(&self, required: &[S], mode: PermissionMode) -> bool {
        if required.is_empty() {
            return true;
        }
        match mode {
            PermissionMode::Any => self.has_any_permission(required),
            PermissionMode::All => self.has_all_permissions(required),
        }
    }
}

/// Module part of a `module.action` code. Codes without a dot are their own module.
pub fn module_of(code: &str) -> &str {
    code.split_once('.').map(|(module, _)| module).unwrap_or(code)
}

/// Group permission codes by module for display.
pub fn group_codes_by_module<'c, I>(codes: I) -> BTreeMap<&'c str, Vec<&'c str>>
where
    I: IntoIterator<Item = &'c str>,
{
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for code in codes {
        grouped.entry(module_of(code)).or_default().push(code);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::ROLE_EMPLOYEE;

    fn employee(granted: &[String]) -> PermissionResolver<'_> {
        PermissionResolver::new(Some(ROLE_EMPLOYEE), granted, false, false)
    }

    #[test]
    fn employee_is_limited_to_snapshot() {
        let granted = vec!["inventory.view".to_string()];
        let resolver = employee(&granted);

        assert!(resolver.has_permission("inventory.view"));
        assert!(!resolver.has_permission("users.delete"));
        assert!(resolver.has_any_permission(&["users.delete", "inventory.view"]));
        assert!(!resolver.has_all_permissions(&["users.delete", "inventory.view"]));
    }

    #[test]
    fn owners_and_super_admins_get_everything() {
        let resolvers = [
            PermissionResolver::new(Some("owner"), &[], true, false),
            PermissionResolver::new(Some(ROLE_EMPLOYEE), &[], false, true),
            PermissionResolver::new(Some("super_admin"), &[], false, false),
        ];

        for resolver in resolvers {
            assert!(resolver.is_unrestricted());
            for code in ["users.delete", "made.up", "", "no-dot"] {
                assert!(resolver.has_permission(code), "missing {code:?}");
            }
            assert!(resolver.has_all_permissions(&["a.b", "c.d"]));
        }
    }

    #[test]
    fn empty_requirements_pass_in_both_modes() {
        let resolver = PermissionResolver::deny_all();
        let none: [&str; 0] = [];
        assert!(resolver.check(&none, PermissionMode::Any));
        assert!(resolver.check(&none, PermissionMode::All));
        assert!(!resolver.check(&["products.view"], PermissionMode::Any));
    }

    #[test]
    fn codes_group_by_module() {
        let grouped =
            group_codes_by_module(["products.view", "products.edit", "units.view", "reports"]);
        assert_eq!(grouped["products"], vec!["products.view", "products.edit"]);
        assert_eq!(grouped["units"], vec!["units.view"]);
        assert_eq!(grouped["reports"], vec!["reports"]);
    }
}
