//! Tenant user sync
//!
//! Provisions user accounts and role bindings across the tenants of a cloud
//! security platform. Desired state lives in three YAML files in an asset
//! directory:
//!
//! ```text
//! assets/
//! ├── users.yaml     email, firstName, lastName, enabled, sso, timeZone, roles
//! ├── roles.yaml     role name -> user emails
//! └── tenants.yaml   name, prisma_cloud_api, access_key, secret_key, users
//! ```
//!
//! `user_init` writes templates for these files, `user_sync` reconciles every
//! tenant against them:
//!
//! ```text
//! loader ──▶ DesiredState ──▶ Synchronizer ──▶ per tenant:
//!                                  login ─▶ list roles/users ─▶ plan ─▶ create/update
//! ```

pub mod assets;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod output;
pub mod reconcile;
pub mod secret;
pub mod sync;

pub use client::{PrismaCloudClient, TenantApi};
pub use config::{Settings, SyncConfig};
pub use error::{Error, Result};
pub use model::{DesiredState, Role, Tenant, User};
pub use reconcile::RolePolicy;
pub use sync::{SyncReport, Synchronizer, TenantOutcome, TenantState};
