//! Banks command - list supported banks

use std::process::ExitCode;

use anyhow::Result;
use bankdata_core::config::Config;
use bankdata_core::BankKey;
use serde::Serialize;

use super::get_data_dir;
use crate::output;

#[derive(Serialize)]
struct BankRow {
    bank: BankKey,
    institution_id: &'static str,
    linked: bool,
}

pub fn run(json: bool) -> Result<ExitCode> {
    let config = Config::load(&get_data_dir()?)?;
    let registry = config.registry();

    let rows: Vec<BankRow> = BankKey::ALL
        .iter()
        .map(|bank| {
            let resolved = registry.resolve_key(*bank);
            BankRow {
                bank: *bank,
                institution_id: resolved.institution_id,
                linked: resolved.authorization_record_id.is_some(),
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(ExitCode::SUCCESS);
    }

    let mut table = output::create_table();
    table.set_header(vec!["Bank", "Institution", "Linked"]);
    for row in &rows {
        table.add_row(vec![
            row.bank.to_string(),
            row.institution_id.to_string(),
            if row.linked { "yes" } else { "no" }.to_string(),
        ]);
    }
    println!("{}", table);

    Ok(ExitCode::SUCCESS)
}
