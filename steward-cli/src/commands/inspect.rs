//! `steward inspect`: read-only view of the desired state.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use steward_core::{CheckReport, DesiredState, FileSource, LocalTree, RepoOwners, WatchedBranch};
use steward_daemon::{init_tracing, DEFAULT_CONCURRENT_SIZE};

use super::{Desired, SourceArgs};

/// Arguments for `steward inspect`.
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl InspectArgs {
    pub fn run(self) -> Result<()> {
        init_tracing(false);

        let config = self.source.config(DEFAULT_CONCURRENT_SIZE, 0, false);
        let source: Arc<dyn FileSource> = match self.source.resolve(&config)? {
            Desired::Local(dir) => Arc::new(LocalTree::new(dir)),
            Desired::Watched(target) => Arc::new(WatchedBranch::new(self.source.client()?, target)),
        };

        let mut desired = DesiredState::init(source, &config.paths())
            .context("failed to load repository catalog")?;
        let check = desired.check(|| false, |_, _| {});
        let report = build_report(&desired, &check);

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize inspect JSON")?
            );
            return Ok(());
        }
        print_table(report, &check);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct InspectReport {
    org: String,
    repositories: usize,
    sigs: Vec<SigRow>,
    unclaimed: usize,
    unknown: usize,
    multi_sig: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize, Tabled)]
struct SigRow {
    #[tabled(rename = "sig")]
    name: String,
    #[tabled(rename = "repositories")]
    repositories: usize,
    #[tabled(rename = "owners", display_with = "display_owners")]
    owners: Option<usize>,
}

fn display_owners(owners: &Option<usize>) -> String {
    match owners {
        Some(count) => count.to_string(),
        None => "not loaded".to_string(),
    }
}

fn build_report(desired: &DesiredState, check: &CheckReport) -> InspectReport {
    let sigs = desired
        .sig_catalog()
        .map(|catalog| {
            catalog
                .sigs
                .iter()
                .map(|sig| SigRow {
                    name: sig.name.clone(),
                    repositories: sig.repositories.len(),
                    owners: desired
                        .owners_of(&sig.name)
                        .map(|owners| RepoOwners::owners(owners).len()),
                })
                .collect()
        })
        .unwrap_or_default();

    InspectReport {
        org: desired.org().to_string(),
        repositories: desired
            .catalog()
            .map(|catalog| catalog.repositories.len())
            .unwrap_or_default(),
        sigs,
        unclaimed: check.unclaimed,
        unknown: check.unknown,
        multi_sig: desired.multi_sig_repositories(),
    }
}

fn print_table(report: InspectReport, check: &CheckReport) {
    println!(
        "{} | {} repositories | {} sigs | {} unclaimed",
        report.org.bold(),
        report.repositories,
        report.sigs.len(),
        report.unclaimed,
    );
    if check.listing_failed {
        println!("{}", "could not list desired-state files; figures may be stale".red());
    }

    if report.sigs.is_empty() {
        println!("No SIGs declared.");
    } else {
        let mut table = Table::new(report.sigs);
        table.with(Style::rounded());
        println!("{table}");
    }

    if report.unknown > 0 {
        println!(
            "{} SIG entries name repositories the catalog does not declare",
            report.unknown.to_string().yellow().bold()
        );
    }
    if !report.multi_sig.is_empty() {
        println!("{}", "Repositories claimed by more than one SIG:".yellow().bold());
        for (repo, count) in &report.multi_sig {
            println!("  {repo} ({count} SIGs)");
        }
    }
}
