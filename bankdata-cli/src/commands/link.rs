//! Link command - start bank authorization

use std::process::ExitCode;

use anyhow::Result;
use bankdata_core::config::ENV_REQUISITION_PREFIX;
use bankdata_core::BankKey;

use super::get_authorization_service;
use crate::output;

pub async fn run(bank: &str, json: bool) -> Result<ExitCode> {
    let bank: BankKey = bank.parse()?;
    let service = get_authorization_service()?;
    let link = service.create_link(bank).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&link)?);
        return Ok(ExitCode::SUCCESS);
    }

    output::success(&format!("Created requisition {} for {}", link.requisition_id, bank));
    println!();
    println!("Open this link to grant access:");
    println!("  {}", link.link);
    println!();
    output::info(&format!(
        "Then store the requisition id as {}{} or under bankAuthorizationIds in settings.json",
        ENV_REQUISITION_PREFIX,
        bank.config_key()
    ));

    Ok(ExitCode::SUCCESS)
}
