//! Sync command - fetch bank data and write exports

use std::process::ExitCode;

use anyhow::Result;
use bankdata_core::{BankKey, SyncOutcome, SyncRequest};
use colored::Colorize;

use super::get_context;
use crate::output;

pub async fn run(bank: Option<String>, dry_run: bool, json: bool) -> Result<ExitCode> {
    // Validate the bank before touching configuration or the network
    let request = match bank.as_deref() {
        Some(key) => SyncRequest::SyncOne(key.parse::<BankKey>()?),
        None => SyncRequest::SyncAll,
    };

    let ctx = get_context(dry_run)?;
    let reports = ctx.sync_service.handle(request).await;
    let failed = reports.iter().any(|r| r.outcome.is_failure());

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        if dry_run {
            println!("{}", "DRY RUN - nothing written to storage".yellow());
            println!();
        }

        for report in &reports {
            match &report.outcome {
                SyncOutcome::Uploaded { count, key } => {
                    output::success(&report.message);
                    println!("  Accounts exported: {}", count);
                    println!("  Object: {}", key);
                }
                outcome if outcome.is_failure() => output::error(&report.message),
                _ => output::warning(&report.message),
            }
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
