//! Multi-tenant synchronizer
//!
//! Tenants are processed one at a time in `tenants.yaml` order. Each one moves
//! through `pending -> authenticated -> reconciled`, or stops in
//! `auth_failed` / `reconcile_failed`. A failed tenant never stops the run;
//! failures are collected into the [`SyncReport`].

use crate::client::{PrismaCloudClient, TenantApi};
use crate::config::SyncConfig;
use crate::error::Result;
use crate::loader;
use crate::model::{DesiredState, Tenant, User};
use crate::reconcile::{self, UserAction};
use serde::Serialize;
use std::fmt;

/// Per-tenant progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantState {
    Pending,
    Authenticated,
    Reconciled,
    AuthFailed,
    ReconcileFailed,
}

impl TenantState {
    pub fn is_failure(self) -> bool {
        matches!(self, TenantState::AuthFailed | TenantState::ReconcileFailed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TenantState::Pending => "pending",
            TenantState::Authenticated => "authenticated",
            TenantState::Reconciled => "reconciled",
            TenantState::AuthFailed => "auth_failed",
            TenantState::ReconcileFailed => "reconcile_failed",
        }
    }
}

impl fmt::Display for TenantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of syncing one tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantOutcome {
    pub tenant: String,
    pub state: TenantState,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TenantOutcome {
    fn pending(tenant: &str) -> Self {
        Self {
            tenant: tenant.to_string(),
            state: TenantState::Pending,
            created: 0,
            updated: 0,
            unchanged: 0,
            skipped: 0,
            error: None,
        }
    }

    fn fail(&mut self, state: TenantState, error: &crate::error::Error) {
        tracing::error!("Tenant {}: {}", self.tenant, error);
        self.state = state;
        self.error = Some(error.to_string());
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Counts are what would have been written
    pub dry_run: bool,
    pub tenants: Vec<TenantOutcome>,
}

impl SyncReport {
    /// True when every selected tenant reconciled
    pub fn is_success(&self) -> bool {
        self.tenants.iter().all(|t| t.state == TenantState::Reconciled)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TenantOutcome> {
        self.tenants.iter().filter(|t| t.state.is_failure())
    }

    /// Create and update calls issued (or planned, in a dry run)
    pub fn writes(&self) -> usize {
        self.tenants.iter().map(|t| t.created + t.updated).sum()
    }
}

/// Drives reconciliation across tenants
pub struct Synchronizer<'a> {
    config: &'a SyncConfig,
}

impl<'a> Synchronizer<'a> {
    pub fn new(config: &'a SyncConfig) -> Self {
        Self { config }
    }

    /// Sync every selected tenant. `connect` builds the API client for a tenant.
    ///
    /// Only an unknown sync target is returned as an error; tenant failures
    /// are recorded in the report.
    pub async fn run<F, A>(&self, state: &DesiredState, mut connect: F) -> Result<SyncReport>
    where
        F: FnMut(&Tenant) -> Result<A>,
        A: TenantApi,
    {
        let tenants = state.select_tenants(&self.config.targets)?;
        let mut report = SyncReport {
            dry_run: self.config.dry_run,
            tenants: Vec::with_capacity(tenants.len()),
        };

        for tenant in tenants {
            tracing::info!("=== Starting sync for tenant {}", tenant.name);
            let mut outcome = TenantOutcome::pending(&tenant.name);

            let authenticated = match connect(tenant) {
                Ok(mut api) => match api.login().await {
                    Ok(()) => Some(api),
                    Err(e) => {
                        outcome.fail(TenantState::AuthFailed, &e);
                        None
                    }
                },
                Err(e) => {
                    outcome.fail(TenantState::AuthFailed, &e);
                    None
                }
            };

            if let Some(api) = authenticated {
                outcome.state = TenantState::Authenticated;
                let users = state.users_for(tenant);
                match self.reconcile(&api, &users, &mut outcome).await {
                    Ok(()) => {
                        outcome.state = TenantState::Reconciled;
                        tracing::info!(
                            created = outcome.created,
                            updated = outcome.updated,
                            unchanged = outcome.unchanged,
                            skipped = outcome.skipped,
                            "Sync for tenant {} done, {} users checked",
                            tenant.name,
                            users.len()
                        );
                    }
                    Err(e) => outcome.fail(TenantState::ReconcileFailed, &e),
                }
            }

            report.tenants.push(outcome);
        }

        Ok(report)
    }

    async fn reconcile<A: TenantApi>(
        &self,
        api: &A,
        users: &[&User],
        outcome: &mut TenantOutcome,
    ) -> Result<()> {
        let roles = api.list_roles().await?;
        let remote = api.list_users().await?;
        let plan = reconcile::plan(
            users,
            &roles,
            &remote,
            self.config.role_policy,
            &self.config.default_time_zone,
        )?;

        let prefix = if self.config.dry_run { "[dry-run] " } else { "" };
        for action in &plan.actions {
            match action {
                UserAction::Create(payload) => {
                    tracing::info!(
                        "{}Tenant {}: creating user {}",
                        prefix,
                        outcome.tenant,
                        payload.email
                    );
                    if !self.config.dry_run {
                        api.create_user(payload).await?;
                    }
                    outcome.created += 1;
                }
                UserAction::Update { payload, changes } => {
                    tracing::info!(
                        "{}Tenant {}: updating user {} ({})",
                        prefix,
                        outcome.tenant,
                        payload.email,
                        changes.join("; ")
                    );
                    if !self.config.dry_run {
                        api.update_user(payload).await?;
                    }
                    outcome.updated += 1;
                }
                UserAction::Unchanged { email } => {
                    tracing::debug!("Tenant {}: user {} already in sync", outcome.tenant, email);
                    outcome.unchanged += 1;
                }
                UserAction::Skip { email, reason } => {
                    tracing::warn!(
                        "Tenant {}: skipping user {}: {}",
                        outcome.tenant,
                        email,
                        reason
                    );
                    outcome.skipped += 1;
                }
            }
        }

        Ok(())
    }
}

/// Load the asset files and sync them against the real tenant APIs
pub async fn sync_from_assets(config: &SyncConfig) -> Result<SyncReport> {
    let state = loader::load_desired_state(&config.assets_dir)?;
    Synchronizer::new(config)
        .run(&state, |tenant| PrismaCloudClient::for_tenant(tenant, config.timeout))
        .await
}
