//! Sync users and role assignments across all tenants
//!
//! ```bash
//! user_sync --assets-dir assets
//! user_sync -t prod --dry-run --format json
//! RUST_LOG=debug user_sync --prune-roles
//! ```

use clap::Parser;
use std::process::ExitCode;
use tenant_user_sync::cli::{self, SyncCli};

// Tenants are synced one after another
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    cli::init_tracing();
    ExitCode::from(cli::run_sync(SyncCli::parse()).await)
}
