//! Asset file loader
//!
//! Parses `users.yaml`, `roles.yaml` and `tenants.yaml` and validates them
//! into a [`DesiredState`]. Nothing here touches the network, so every
//! configuration problem surfaces before the first tenant is contacted.

use crate::error::{Error, Result};
use crate::model::{DesiredState, Role, Tenant, User};
use crate::secret::Secret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use url::Url;

pub const USERS_FILE: &str = "users.yaml";
pub const ROLES_FILE: &str = "roles.yaml";
pub const TENANTS_FILE: &str = "tenants.yaml";

/// Entry of `users.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sso: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

/// Entry of `roles.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub users: Vec<String>,
}

/// Entry of `tenants.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TenantRecord {
    pub name: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub prisma_cloud_api: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<String>>,
}

/// Load and validate the three asset files in `dir`
pub fn load_desired_state(dir: &Path) -> Result<DesiredState> {
    if !dir.is_dir() {
        return Err(Error::config(format!(
            "asset directory {} not found, run user_init first",
            dir.display()
        )));
    }

    let users: Vec<UserRecord> = read_records(&dir.join(USERS_FILE))?;
    let roles: Vec<RoleRecord> = read_records(&dir.join(ROLES_FILE))?;
    let tenants: Vec<TenantRecord> = read_records(&dir.join(TENANTS_FILE))?;

    let state = validate(users, roles, tenants)?;
    tracing::debug!(
        users = state.users.len(),
        roles = state.roles.len(),
        tenants = state.tenants.len(),
        "Loaded desired state from {}",
        dir.display()
    );
    Ok(state)
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::config(format!("cannot read {}: {}", path.display(), e)))?;
    parse_records(&content).map_err(|e| Error::config(format!("{}: {}", path.display(), e)))
}

/// An empty document is an empty list
fn parse_records<T: DeserializeOwned>(
    content: &str,
) -> std::result::Result<Vec<T>, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let records: Option<Vec<T>> = serde_yaml::from_str(content)?;
    Ok(records.unwrap_or_default())
}

/// Cross-check raw records into typed entities
pub fn validate(
    users: Vec<UserRecord>,
    roles: Vec<RoleRecord>,
    tenants: Vec<TenantRecord>,
) -> Result<DesiredState> {
    let mut users = validate_users(users)?;
    let roles = validate_roles(roles, &mut users)?;
    let tenants = validate_tenants(tenants, &users)?;

    // Back to users.yaml order
    let mut users: Vec<(usize, User)> = users.into_values().collect();
    users.sort_by_key(|(position, _)| *position);

    Ok(DesiredState {
        users: users.into_iter().map(|(_, u)| u).collect(),
        roles,
        tenants,
    })
}

/// Users keyed by normalized email, remembering file position
type UserIndex = BTreeMap<String, (usize, User)>;

fn validate_users(records: Vec<UserRecord>) -> Result<UserIndex> {
    let mut index = UserIndex::new();

    for (i, record) in records.into_iter().enumerate() {
        let email = required(record.email, || {
            format!("{} entry #{} has no email", USERS_FILE, i + 1)
        })?
        .to_lowercase();
        let first_name = required(record.first_name, || {
            format!("{}: user {} has no firstName", USERS_FILE, email)
        })?;
        let last_name = required(record.last_name, || {
            format!("{}: user {} has no lastName", USERS_FILE, email)
        })?;

        if index.contains_key(&email) {
            return Err(Error::config(format!("{}: duplicate user {}", USERS_FILE, email)));
        }

        let user = User {
            email: email.clone(),
            first_name,
            last_name,
            enabled: record.enabled.unwrap_or(true),
            sso: record.sso.unwrap_or(true),
            time_zone: record.time_zone.filter(|tz| !tz.trim().is_empty()),
            roles: record.roles.into_iter().map(|r| r.trim().to_string()).collect(),
        };
        index.insert(email, (i, user));
    }

    Ok(index)
}

fn validate_roles(records: Vec<RoleRecord>, users: &mut UserIndex) -> Result<Vec<Role>> {
    let mut roles: Vec<Role> = Vec::with_capacity(records.len());

    for (i, record) in records.into_iter().enumerate() {
        let name = required(record.name, || {
            format!("{} entry #{} has no name", ROLES_FILE, i + 1)
        })?;
        if roles.iter().any(|r| r.name == name) {
            return Err(Error::config(format!("{}: duplicate role '{}'", ROLES_FILE, name)));
        }

        let mut members = BTreeSet::new();
        for email in record.users {
            let email = email.trim().to_lowercase();
            let Some((_, user)) = users.get_mut(&email) else {
                return Err(Error::config(format!(
                    "{}: role '{}' references undefined user {}",
                    ROLES_FILE, name, email
                )));
            };
            user.roles.insert(name.clone());
            members.insert(email);
        }

        roles.push(Role { name, users: members });
    }

    // Inverse mapping declared on the user side must name a known role
    for (email, (_, user)) in users.iter() {
        for role_name in &user.roles {
            let Some(role) = roles.iter_mut().find(|r| &r.name == role_name) else {
                return Err(Error::config(format!(
                    "{}: user {} references undefined role '{}'",
                    USERS_FILE, email, role_name
                )));
            };
            role.users.insert(email.clone());
        }
    }

    Ok(roles)
}

fn validate_tenants(records: Vec<TenantRecord>, users: &UserIndex) -> Result<Vec<Tenant>> {
    let mut tenants: Vec<Tenant> = Vec::with_capacity(records.len());

    for (i, record) in records.into_iter().enumerate() {
        let name = required(record.name, || {
            format!("{} entry #{} has no name", TENANTS_FILE, i + 1)
        })?;
        if tenants.iter().any(|t| t.name == name) {
            return Err(Error::config(format!("{}: duplicate tenant '{}'", TENANTS_FILE, name)));
        }

        let raw_url = required(record.prisma_cloud_api, || {
            format!("{}: tenant '{}' has no prisma_cloud_api URL", TENANTS_FILE, name)
        })?;
        let api_url = Url::parse(&raw_url)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or_else(|| {
                Error::config(format!(
                    "{}: tenant '{}' has an invalid API URL '{}'",
                    TENANTS_FILE, name, raw_url
                ))
            })?;

        let access_key = required(record.access_key, || {
            format!("{}: tenant '{}' has no access_key", TENANTS_FILE, name)
        })?;
        let secret_key = Secret::new(required_verbatim(record.secret_key, || {
            format!("{}: tenant '{}' has no secret_key", TENANTS_FILE, name)
        })?);

        let scope = match record.users {
            Some(list) => {
                let mut scope = BTreeSet::new();
                for email in list {
                    let email = email.trim().to_lowercase();
                    if !users.contains_key(&email) {
                        return Err(Error::config(format!(
                            "{}: tenant '{}' references undefined user {}",
                            TENANTS_FILE, name, email
                        )));
                    }
                    scope.insert(email);
                }
                Some(scope)
            }
            None => None,
        };

        tenants.push(Tenant {
            name,
            api_url,
            access_key,
            secret_key,
            users: scope,
        });
    }

    Ok(tenants)
}

/// Credentials are passed through untouched; only blank values are rejected
fn required_verbatim(value: Option<String>, msg: impl FnOnce() -> String) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::config(msg()))
}

fn required(value: Option<String>, msg: impl FnOnce() -> String) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::config(msg()))
}

/// Names of all three asset files
pub fn asset_files() -> [&'static str; 3] {
    [USERS_FILE, ROLES_FILE, TENANTS_FILE]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const USERS: &str = r#"
- email: alice@example.com
  firstName: Alice
  lastName: Liddell
- email: Carol@Example.com
  firstName: Carol
  lastName: Danvers
  enabled: false
  sso: false
  roles: [Auditor]
"#;

    const ROLES: &str = r#"
- name: admin
  users: [alice@example.com]
- name: Auditor
  users: []
"#;

    const TENANTS: &str = r#"
- name: prod
  access_key: ak-prod
  secret_key: sk-prod
  prisma_cloud_api: https://api.ca.prismacloud.io
- name: dev
  access_key: ak-dev
  secret_key: sk-dev
  prisma_cloud_api: https://api2.prismacloud.io
  users: [carol@example.com]
"#;

    fn write_assets(users: &str, roles: &str, tenants: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(USERS_FILE), users).unwrap();
        fs::write(dir.path().join(ROLES_FILE), roles).unwrap();
        fs::write(dir.path().join(TENANTS_FILE), tenants).unwrap();
        dir
    }

    #[test]
    fn test_load_valid_assets() {
        let dir = write_assets(USERS, ROLES, TENANTS);
        let state = load_desired_state(dir.path()).unwrap();

        assert_eq!(state.users.len(), 2);
        assert_eq!(state.users[0].email, "alice@example.com");
        assert!(state.users[0].roles.contains("admin"));
        assert!(state.users[0].sso);
        assert!(state.users[0].enabled);

        // Emails are normalized and the inverse mapping lands on the role too
        let carol = &state.users[1];
        assert_eq!(carol.email, "carol@example.com");
        assert!(!carol.enabled);
        assert!(!carol.sso);
        let auditor = state.roles.iter().find(|r| r.name == "Auditor").unwrap();
        assert!(auditor.users.contains("carol@example.com"));

        let dev = state.tenant("dev").unwrap();
        assert_eq!(state.users_for(dev).len(), 1);
        assert_eq!(dev.secret_key.expose(), "sk-dev");
    }

    #[test]
    fn test_role_referencing_undefined_user_is_rejected() {
        let roles = "- name: admin\n  users: [bob@example.com]\n";
        let dir = write_assets(USERS, roles, TENANTS);

        let err = load_desired_state(dir.path()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("bob@example.com"));
    }

    #[test]
    fn test_user_referencing_undefined_role_is_rejected() {
        let roles = "- name: admin\n  users: [alice@example.com]\n";
        let dir = write_assets(USERS, roles, TENANTS);

        let err = load_desired_state(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Auditor"));
    }

    #[test]
    fn test_tenant_without_url_is_rejected() {
        let tenants = "- name: prod\n  access_key: a\n  secret_key: s\n  prisma_cloud_api: ''\n";
        let dir = write_assets(USERS, ROLES, tenants);

        let err = load_desired_state(dir.path()).unwrap_err();
        assert!(err.to_string().contains("prisma_cloud_api"));
    }

    #[test]
    fn test_tenant_without_key_is_rejected() {
        let tenants = concat!(
            "- name: prod\n",
            "  secret_key: s\n",
            "  prisma_cloud_api: https://api.example.com\n",
        );
        let dir = write_assets(USERS, ROLES, tenants);

        let err = load_desired_state(dir.path()).unwrap_err();
        assert!(err.to_string().contains("access_key"));
    }

    #[test]
    fn test_secret_key_is_kept_verbatim() {
        let tenants = concat!(
            "- name: prod\n",
            "  access_key: a\n",
            "  secret_key: ' sk padded '\n",
            "  prisma_cloud_api: https://api.example.com\n",
        );
        let dir = write_assets(USERS, ROLES, tenants);

        let state = load_desired_state(dir.path()).unwrap();
        assert_eq!(state.tenants[0].secret_key.expose(), " sk padded ");
    }

    #[test]
    fn test_blank_secret_key_is_rejected() {
        let tenants = concat!(
            "- name: prod\n",
            "  access_key: a\n",
            "  secret_key: '   '\n",
            "  prisma_cloud_api: https://api.example.com\n",
        );
        let dir = write_assets(USERS, ROLES, tenants);

        let err = load_desired_state(dir.path()).unwrap_err();
        assert!(err.to_string().contains("secret_key"));
    }

    #[test]
    fn test_user_without_email_is_rejected() {
        let users = "- firstName: Nobody\n  lastName: Here\n";
        let dir = write_assets(users, "[]", TENANTS);

        let err = load_desired_state(dir.path()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("no email"));
    }

    #[test]
    fn test_duplicate_user_is_rejected() {
        let users = concat!(
            "- {email: a@x.io, firstName: A, lastName: A}\n",
            "- {email: A@x.io, firstName: B, lastName: B}\n",
        );
        let dir = write_assets(users, "[]", "[]");

        let err = load_desired_state(dir.path()).unwrap_err();
        assert!(err.to_string().contains("duplicate user"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let users = "- {email: a@x.io, firstName: A, lastName: A, frstName: typo}\n";
        let dir = write_assets(users, "[]", "[]");

        assert!(load_desired_state(dir.path()).unwrap_err().is_configuration());
    }

    #[test]
    fn test_empty_documents_load_as_empty_lists() {
        let dir = write_assets("", "", "");
        let state = load_desired_state(dir.path()).unwrap();
        assert!(state.users.is_empty());
        assert!(state.tenants.is_empty());
    }

    #[test]
    fn test_missing_directory_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = load_desired_state(&dir.path().join("nope")).unwrap_err();
        assert!(err.is_configuration());
    }
}
