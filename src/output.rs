//! Output formatting

use crate::assets::InitReport;
use crate::sync::{SyncReport, TenantState};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn render<T: Serialize>(&self, data: &T) -> String {
        match self {
            OutputFormat::Yaml => serde_yaml::to_string(data).unwrap_or_default(),
            OutputFormat::Json | OutputFormat::Table => {
                serde_json::to_string_pretty(data).unwrap_or_default()
            }
        }
    }
}

#[derive(Tabled)]
struct TenantRow {
    #[tabled(rename = "TENANT")]
    tenant: String,
    #[tabled(rename = "STATE")]
    state: String,
    #[tabled(rename = "CREATED")]
    created: usize,
    #[tabled(rename = "UPDATED")]
    updated: usize,
    #[tabled(rename = "UNCHANGED")]
    unchanged: usize,
    #[tabled(rename = "SKIPPED")]
    skipped: usize,
}

/// Render a sync report. Per-tenant errors are always listed in table mode.
pub fn render_sync_report(report: &SyncReport, format: OutputFormat) -> String {
    if format != OutputFormat::Table {
        return format.render(report);
    }

    let rows: Vec<TenantRow> = report
        .tenants
        .iter()
        .map(|t| TenantRow {
            tenant: t.tenant.clone(),
            state: t.state.to_string(),
            created: t.created,
            updated: t.updated,
            unchanged: t.unchanged,
            skipped: t.skipped,
        })
        .collect();

    let mut out = Table::new(rows).to_string();
    out.push('\n');

    for failed in report.failures() {
        out.push_str(&format!(
            "{} {}: {}\n",
            failed.state.to_string().red().bold(),
            failed.tenant,
            failed.error.as_deref().unwrap_or("unknown error")
        ));
    }

    let total = report.tenants.len();
    let ok = report
        .tenants
        .iter()
        .filter(|t| t.state == TenantState::Reconciled)
        .count();
    let summary = format!(
        "{}{}/{} tenants reconciled",
        if report.dry_run { "[dry-run] " } else { "" },
        ok,
        total
    );
    if report.is_success() {
        out.push_str(&summary.green().to_string());
    } else {
        out.push_str(&summary.yellow().to_string());
    }
    out
}

pub fn render_init_report(report: &InitReport, format: OutputFormat) -> String {
    if format != OutputFormat::Table {
        return format.render(report);
    }

    let mut out = String::new();
    if report.created_dir {
        out.push_str(&format!("Created asset directory {}\n", report.dir.display()));
    }
    for path in &report.written {
        out.push_str(&format!("{} {}\n", "wrote".green(), path.display()));
    }
    for path in &report.kept {
        out.push_str(&format!("{} {} (already exists)\n", "kept".yellow(), path.display()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::TenantOutcome;

    fn report() -> SyncReport {
        SyncReport {
            dry_run: false,
            tenants: vec![
                TenantOutcome {
                    tenant: "prod".into(),
                    state: TenantState::Reconciled,
                    created: 1,
                    updated: 0,
                    unchanged: 2,
                    skipped: 0,
                    error: None,
                },
                TenantOutcome {
                    tenant: "broken".into(),
                    state: TenantState::AuthFailed,
                    created: 0,
                    updated: 0,
                    unchanged: 0,
                    skipped: 0,
                    error: Some("authentication failed: bad key".into()),
                },
            ],
        }
    }

    #[test]
    fn test_table_lists_tenants_and_errors() {
        colored::control::set_override(false);
        let out = render_sync_report(&report(), OutputFormat::Table);
        assert!(out.contains("TENANT"));
        assert!(out.contains("prod"));
        assert!(out.contains("auth_failed broken: authentication failed: bad key"));
        assert!(out.contains("1/2 tenants reconciled"));
    }

    #[test]
    fn test_json_report() {
        let out = render_sync_report(&report(), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["tenants"][1]["state"], "auth_failed");
        assert!(value["tenants"][0].get("error").is_none());
    }
}
