//! Command-line entry points shared by the `user_init` and `user_sync` binaries

use crate::assets;
use crate::config::{Settings, SyncConfig, DEFAULT_ASSETS_DIR};
use crate::output::{self, OutputFormat};
use crate::reconcile::RolePolicy;
use crate::sync;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Every selected tenant reconciled
pub const EXIT_OK: u8 = 0;
/// A tenant failed, or the asset directory could not be written
pub const EXIT_FAILURE: u8 = 1;
/// Asset files are invalid; nothing was attempted
pub const EXIT_CONFIG: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "user_init")]
#[command(version)]
#[command(
    about = "Create the asset directory and template files used by user_sync",
    long_about = None
)]
pub struct InitCli {
    /// Asset directory holding users.yaml, roles.yaml and tenants.yaml
    #[arg(long, short, env = "ASSETS_DIR")]
    pub assets_dir: Option<PathBuf>,

    /// Profile name from config file
    #[arg(long, short)]
    pub profile: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
#[command(name = "user_sync")]
#[command(version)]
#[command(
    about = "Sync users and role assignments to every tenant in tenants.yaml",
    long_about = None
)]
pub struct SyncCli {
    /// Asset directory holding users.yaml, roles.yaml and tenants.yaml
    #[arg(long, short, env = "ASSETS_DIR")]
    pub assets_dir: Option<PathBuf>,

    /// Only sync these tenants (repeatable)
    #[arg(long = "tenant", short = 't')]
    pub tenants: Vec<String>,

    /// Remove tenant roles that are not declared locally
    #[arg(long)]
    pub prune_roles: bool,

    /// Plan and report without creating or updating users
    #[arg(long)]
    pub dry_run: bool,

    /// Time zone for users that do not set one
    #[arg(long)]
    pub time_zone: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Profile name from config file
    #[arg(long, short)]
    pub profile: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: OutputFormat,
}

impl SyncCli {
    /// Merge flags over file settings
    pub fn to_config(&self, settings: &Settings) -> SyncConfig {
        let mut config = SyncConfig::from_settings(settings);
        if let Some(dir) = &self.assets_dir {
            config.assets_dir = dir.clone();
        }
        if self.prune_roles {
            config.role_policy = RolePolicy::Prune;
        }
        if let Some(tz) = &self.time_zone {
            config.default_time_zone = tz.clone();
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        config.targets = self.tenants.clone();
        config.dry_run = self.dry_run;
        config
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`)
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Returns the process exit code
pub fn run_init(cli: InitCli) -> u8 {
    let settings = match Settings::load(cli.profile.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_CONFIG;
        }
    };
    let dir = cli
        .assets_dir
        .or(settings.assets_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSETS_DIR));

    match assets::init_assets(&dir) {
        Ok(report) => {
            println!("{}", output::render_init_report(&report, cli.format));
            EXIT_OK
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_FAILURE
        }
    }
}

/// Returns the process exit code
pub async fn run_sync(cli: SyncCli) -> u8 {
    let settings = match Settings::load(cli.profile.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_CONFIG;
        }
    };
    let config = cli.to_config(&settings);
    tracing::info!(
        "Syncing from {} ({:?} roles{})",
        config.assets_dir.display(),
        config.role_policy,
        if config.dry_run { ", dry run" } else { "" }
    );

    match sync::sync_from_assets(&config).await {
        Ok(report) => {
            println!("{}", output::render_sync_report(&report, cli.format));
            if report.is_success() {
                EXIT_OK
            } else {
                EXIT_FAILURE
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.is_configuration() {
                EXIT_CONFIG
            } else {
                EXIT_FAILURE
            }
        }
    }
}
