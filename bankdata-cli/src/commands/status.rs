//! Status command - requisition status per bank

use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;

use super::get_authorization_service;
use crate::output;

pub async fn run(json: bool) -> Result<ExitCode> {
    let service = get_authorization_service()?;
    let statuses = service.status().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", "Bank Authorization Status".bold());
    println!();

    let mut table = output::create_table();
    table.set_header(vec!["Bank", "Requisition", "Status", "Created", "Days Left"]);

    for status in &statuses {
        let days = match (status.days_remaining, &status.error) {
            (_, Some(_)) => "error".red().to_string(),
            (Some(days), None) if days <= 0 => "expired".red().to_string(),
            (Some(days), None) if days <= 7 => days.to_string().yellow().to_string(),
            (Some(days), None) => days.to_string(),
            (None, None) => "-".to_string(),
        };

        table.add_row(vec![
            status.bank.to_string(),
            status.requisition_id.clone().unwrap_or_else(|| "not linked".to_string()),
            status.status.clone().unwrap_or_else(|| "-".to_string()),
            status.created.clone().unwrap_or_else(|| "-".to_string()),
            days,
        ]);
    }
    println!("{}", table);

    for status in &statuses {
        if let Some(error) = &status.error {
            output::error(&format!("{}: {}", status.bank, error));
        }
    }

    Ok(ExitCode::SUCCESS)
}
