use std::path::Path;

use colored::Colorize;
use dialoguer::Confirm;

use crate::archive;
use crate::error::Result;
use crate::fmt::money;

pub fn run(ledger_dir: Option<&Path>, yes: bool) -> Result<()> {
    let conn = super::open(ledger_dir)?;

    if !yes {
        let proceed = Confirm::new()
            .with_prompt("Archive every transaction and reset to opening balances?")
            .default(false)
            .interact()
            .unwrap_or(false);
        if !proceed {
            println!("{}", "Archive cancelled.".yellow());
            return Ok(());
        }
    }

    let summary = archive::rollover(&conn)?;
    println!(
        "Archived {} transactions; wrote {} opening entries (total {})",
        summary.archived,
        summary.opening_entries,
        money(&summary.total).bold()
    );
    Ok(())
}
