//! Reconciliation planner
//!
//! Compares the desired users of one tenant with what the tenant reports and
//! decides, per user, whether to create, update or leave it alone. Pure: the
//! synchronizer applies the plan.

use crate::client::{RemoteRole, RemoteUser, UserPayload};
use crate::error::{Error, Result};
use crate::model::User;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// How role bindings that exist only in the tenant are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RolePolicy {
    /// Only add missing roles, keep anything else the tenant has
    #[default]
    Additive,
    /// Make the tenant's role set match the declared set exactly
    Prune,
}

/// Decision for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Create(UserPayload),
    Update {
        payload: UserPayload,
        changes: Vec<String>,
    },
    Unchanged {
        email: String,
    },
    Skip {
        email: String,
        reason: String,
    },
}

impl UserAction {
    pub fn email(&self) -> &str {
        match self {
            UserAction::Create(p) | UserAction::Update { payload: p, .. } => &p.email,
            UserAction::Unchanged { email } | UserAction::Skip { email, .. } => email,
        }
    }
}

/// Ordered list of actions for a tenant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub actions: Vec<UserAction>,
}

impl Plan {
    /// Number of create/update calls the plan will issue
    pub fn writes(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, UserAction::Create(_) | UserAction::Update { .. }))
            .count()
    }
}

/// Map every role name used by `users` to the tenant's role ID
pub fn resolve_role_ids(
    users: &[&User],
    roles: &[RemoteRole],
) -> Result<BTreeMap<String, String>> {
    let wanted: BTreeSet<&str> = users
        .iter()
        .flat_map(|u| u.roles.iter().map(String::as_str))
        .collect();

    let mut ids = BTreeMap::new();
    for name in wanted {
        let role = roles
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| Error::UnknownRole(name.to_string()))?;
        ids.insert(name.to_string(), role.id.clone());
    }
    Ok(ids)
}

/// Build the plan for one tenant
pub fn plan(
    users: &[&User],
    roles: &[RemoteRole],
    remote: &[RemoteUser],
    policy: RolePolicy,
    default_time_zone: &str,
) -> Result<Plan> {
    let role_ids = resolve_role_ids(users, roles)?;
    let remote_by_email: HashMap<String, &RemoteUser> = remote
        .iter()
        .map(|r| (r.email.to_lowercase(), r))
        .collect();

    let mut actions = Vec::with_capacity(users.len());
    for user in users {
        // Declared role names are already validated against the tenant above
        let desired_ids: Vec<String> = user
            .roles
            .iter()
            .filter_map(|name| role_ids.get(name).cloned())
            .collect();
        let time_zone = user
            .time_zone
            .clone()
            .unwrap_or_else(|| default_time_zone.to_string());

        let action = match remote_by_email.get(&user.email) {
            None => plan_create(user, desired_ids, time_zone),
            Some(existing) => plan_update(user, existing, desired_ids, time_zone, policy),
        };
        actions.push(action);
    }

    Ok(Plan { actions })
}

fn plan_create(user: &User, desired_ids: Vec<String>, time_zone: String) -> UserAction {
    let Some(default_role_id) = desired_ids.first().cloned() else {
        return UserAction::Skip {
            email: user.email.clone(),
            reason: "no roles assigned, a default role is required to create the user".into(),
        };
    };

    UserAction::Create(UserPayload {
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        enabled: user.enabled,
        role_ids: desired_ids,
        default_role_id,
        time_zone,
        sso_bypass_allowed: !user.sso,
    })
}

fn plan_update(
    user: &User,
    existing: &RemoteUser,
    desired_ids: Vec<String>,
    time_zone: String,
    policy: RolePolicy,
) -> UserAction {
    let target_ids: Vec<String> = match policy {
        RolePolicy::Additive => {
            let mut ids = existing.role_ids.clone();
            for id in desired_ids {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            ids
        }
        RolePolicy::Prune => desired_ids,
    };

    let mut changes = Vec::new();
    let current: BTreeSet<&String> = existing.role_ids.iter().collect();
    let target: BTreeSet<&String> = target_ids.iter().collect();
    let added: Vec<&str> = target.difference(&current).map(|s| s.as_str()).collect();
    let removed: Vec<&str> = current.difference(&target).map(|s| s.as_str()).collect();
    if !added.is_empty() {
        changes.push(format!("add roles {}", added.join(",")));
    }
    if !removed.is_empty() {
        changes.push(format!("remove roles {}", removed.join(",")));
    }
    if existing.first_name != user.first_name || existing.last_name != user.last_name {
        changes.push("name".to_string());
    }
    if existing.enabled != user.enabled {
        changes.push(format!("enabled={}", user.enabled));
    }
    // Tenants that do not report a time zone or SSO setting are not compared on it
    if existing.time_zone.as_deref().is_some_and(|tz| tz != time_zone) {
        changes.push(format!("timeZone={}", time_zone));
    }
    if existing.sso_bypass_allowed.is_some_and(|bypass| bypass == user.sso) {
        changes.push(format!("sso={}", user.sso));
    }

    if changes.is_empty() {
        return UserAction::Unchanged {
            email: user.email.clone(),
        };
    }

    // Keep the tenant's default role while it is still bound
    let default_role_id = existing
        .default_role_id
        .clone()
        .filter(|id| target_ids.contains(id))
        .or_else(|| target_ids.first().cloned());
    let Some(default_role_id) = default_role_id else {
        return UserAction::Skip {
            email: user.email.clone(),
            reason: "update would leave the user without any role".into(),
        };
    };

    UserAction::Update {
        payload: UserPayload {
            email: existing.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            enabled: user.enabled,
            role_ids: target_ids,
            default_role_id,
            time_zone,
            sso_bypass_allowed: !user.sso,
        },
        changes,
    }
}
