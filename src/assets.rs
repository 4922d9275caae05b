//! Asset directory initializer
//!
//! Writes starter `users.yaml`, `roles.yaml` and `tenants.yaml` files. Existing
//! files are never touched, so running the initializer again is harmless.

use crate::error::{Error, Result};
use crate::loader::{RoleRecord, TenantRecord, UserRecord, ROLES_FILE, TENANTS_FILE, USERS_FILE};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Default API endpoint written into the tenant template
pub const DEFAULT_API_URL: &str = "https://api.ca.prismacloud.io";

/// What the initializer did
#[derive(Debug, Clone, Default, Serialize)]
pub struct InitReport {
    pub dir: PathBuf,
    pub created_dir: bool,
    pub written: Vec<PathBuf>,
    pub kept: Vec<PathBuf>,
}

/// Create `dir` if needed and write any missing template files
pub fn init_assets(dir: &Path) -> Result<InitReport> {
    let mut report = InitReport {
        dir: dir.to_path_buf(),
        ..Default::default()
    };

    if dir.exists() {
        if !dir.is_dir() {
            return Err(Error::fs(
                dir,
                io::Error::new(io::ErrorKind::AlreadyExists, "path exists and is not a directory"),
            ));
        }
    } else {
        tracing::info!("Creating the asset directory {}", dir.display());
        fs::create_dir_all(dir).map_err(|e| Error::fs(dir, e))?;
        report.created_dir = true;
    }

    for (name, content) in templates() {
        let path = dir.join(name);
        if write_if_absent(&path, &content)? {
            tracing::info!("Writing {}", name);
            report.written.push(path);
        } else {
            tracing::info!("Keeping existing {}", name);
            report.kept.push(path);
        }
    }

    Ok(report)
}

/// Returns false when the file already exists
fn write_if_absent(path: &Path, content: &str) -> Result<bool> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(Error::fs(path, e)),
    };
    file.write_all(content.as_bytes()).map_err(|e| Error::fs(path, e))?;
    Ok(true)
}

fn templates() -> [(&'static str, String); 3] {
    [
        (USERS_FILE, render(USERS_HEADER, &default_users())),
        (ROLES_FILE, render(ROLES_HEADER, &default_roles())),
        (TENANTS_FILE, render(TENANTS_HEADER, &default_tenants())),
    ]
}

const USERS_HEADER: &str = "\
# Users synced to every tenant (unless a tenant lists its own `users`).
# Keys: email, firstName, lastName, enabled (default true),
#       sso (default true), timeZone, roles (role names from roles.yaml)
";

const ROLES_HEADER: &str = "\
# Tenant roles and the users bound to them. Role names must match the
# role names defined in each tenant.
";

const TENANTS_HEADER: &str = "\
# Tenants to sync. Keys are stored in plaintext until a secret store is wired in.
# Optional `users` restricts a tenant to the listed emails.
";

fn render<T: Serialize>(header: &str, records: &[T]) -> String {
    format!("{}{}", header, serde_yaml::to_string(records).unwrap_or_default())
}

fn default_users() -> Vec<UserRecord> {
    vec![UserRecord {
        email: Some("jdoe@example.com".into()),
        first_name: Some("John".into()),
        last_name: Some("Doe".into()),
        enabled: Some(true),
        ..Default::default()
    }]
}

fn default_roles() -> Vec<RoleRecord> {
    vec![RoleRecord {
        name: Some("System Admin".into()),
        users: vec!["jdoe@example.com".into()],
    }]
}

fn default_tenants() -> Vec<TenantRecord> {
    vec![TenantRecord {
        name: Some(String::new()),
        access_key: Some(String::new()),
        secret_key: Some(String::new()),
        prisma_cloud_api: Some(DEFAULT_API_URL.into()),
        users: None,
    }]
}
