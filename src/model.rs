//! Typed records for the three asset files
//!
//! These are the validated forms. The raw YAML shapes live in
//! [`crate::loader`].

use crate::error::{Error, Result};
use crate::secret::Secret;
use serde::Serialize;
use std::collections::BTreeSet;
use url::Url;

/// User account desired in every tenant it is scoped to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub enabled: bool,
    /// Log in through the tenant's SSO provider instead of a local password
    pub sso: bool,
    /// Overrides the configured default time zone
    pub time_zone: Option<String>,
    /// Role names, merged from `roles.yaml` and the user's own `roles` list
    pub roles: BTreeSet<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Role and the users bound to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub name: String,
    pub users: BTreeSet<String>,
}

/// Tenant instance of the platform
#[derive(Debug, Clone)]
pub struct Tenant {
    pub name: String,
    pub api_url: Url,
    pub access_key: String,
    pub secret_key: Secret,
    /// When set, only these users are synced to the tenant
    pub users: Option<BTreeSet<String>>,
}

impl Tenant {
    /// Base URL without a trailing slash, ready for path concatenation
    pub fn base_url(&self) -> &str {
        self.api_url.as_str().trim_end_matches('/')
    }
}

/// Everything loaded from the asset directory, already cross-checked
#[derive(Debug, Clone, Default)]
pub struct DesiredState {
    pub users: Vec<User>,
    pub roles: Vec<Role>,
    pub tenants: Vec<Tenant>,
}

impl DesiredState {
    pub fn tenant(&self, name: &str) -> Option<&Tenant> {
        self.tenants.iter().find(|t| t.name == name)
    }

    /// Users intended for a tenant, in `users.yaml` order
    pub fn users_for(&self, tenant: &Tenant) -> Vec<&User> {
        self.users
            .iter()
            .filter(|u| match &tenant.users {
                Some(scope) => scope.contains(&u.email),
                None => true,
            })
            .collect()
    }

    /// Resolve sync targets. An empty target list selects every tenant.
    pub fn select_tenants(&self, targets: &[String]) -> Result<Vec<&Tenant>> {
        if targets.is_empty() {
            return Ok(self.tenants.iter().collect());
        }

        if let Some(unknown) = targets.iter().find(|t| self.tenant(t).is_none()) {
            return Err(Error::config(format!(
                "sync target '{}' is not defined in tenants.yaml",
                unknown
            )));
        }

        // Keep file order so runs are reproducible
        Ok(self
            .tenants
            .iter()
            .filter(|t| targets.contains(&t.name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(name: &str, users: Option<&[&str]>) -> Tenant {
        Tenant {
            name: name.into(),
            api_url: Url::parse("https://api.example.com/").unwrap(),
            access_key: "key".into(),
            secret_key: Secret::new("secret"),
            users: users.map(|u| u.iter().map(|s| s.to_string()).collect()),
        }
    }

    fn user(email: &str) -> User {
        User {
            email: email.into(),
            first_name: "A".into(),
            last_name: "B".into(),
            enabled: true,
            sso: true,
            time_zone: None,
            roles: BTreeSet::new(),
        }
    }

    #[test]
    fn test_users_for_respects_tenant_scope() {
        let state = DesiredState {
            users: vec![user("alice@example.com"), user("bob@example.com")],
            roles: vec![],
            tenants: vec![tenant("prod", Some(&["bob@example.com"])), tenant("dev", None)],
        };

        let prod: Vec<_> = state
            .users_for(&state.tenants[0])
            .iter()
            .map(|u| u.email.clone())
            .collect();
        assert_eq!(prod, vec!["bob@example.com"]);
        assert_eq!(state.users_for(&state.tenants[1]).len(), 2);
    }

    #[test]
    fn test_select_tenants_keeps_file_order() {
        let state = DesiredState {
            tenants: vec![tenant("a", None), tenant("b", None), tenant("c", None)],
            ..Default::default()
        };

        let picked = state.select_tenants(&["c".into(), "a".into()]).unwrap();
        let names: Vec<_> = picked.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_select_unknown_tenant_is_config_error() {
        let state = DesiredState {
            tenants: vec![tenant("prod", None)],
            ..Default::default()
        };
        let err = state.select_tenants(&["staging".into()]).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_base_url_strips_trailing_slash() {
        assert_eq!(tenant("prod", None).base_url(), "https://api.example.com");
    }
}
