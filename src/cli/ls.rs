use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::amount::Amount;
use crate::clearance;
use crate::error::{PurseError, Result};
use crate::fmt::money;
use crate::ledger;
use crate::models::Category;
use crate::posting::{self, PostSummary};

fn print_balances(cats: &[Category]) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Updated", "Category", "Balance"]);
    for cat in cats {
        table.add_row(vec![
            Cell::new(cat.num),
            Cell::new(&cat.last_updated),
            Cell::new(&cat.name),
            Cell::new(money(&cat.balance)),
        ]);
    }
    let total: Amount = cats.iter().map(|c| &c.balance).sum();
    table.add_row(vec![
        Cell::new(""),
        Cell::new(""),
        Cell::new("Total".bold()),
        Cell::new(money(&total)),
    ]);
    println!("{table}");
}

fn print_summary(summary: &PostSummary) {
    if summary.transactions_posted == 0 {
        println!("Nothing to post.");
    } else {
        println!(
            "Posted {} transactions to {} categories",
            summary.transactions_posted, summary.categories_updated
        );
    }
}

/// Posts pending transactions, then shows balances with any pending
/// clearance amounts folded in.
pub fn run(
    ledger_dir: Option<&Path>,
    nclr: Option<&Path>,
    tot: Option<&str>,
    quiet: bool,
) -> Result<()> {
    let conn = super::open(ledger_dir)?;
    let summary = posting::post_unposted(&conn)?;
    // A single-balance lookup is meant for scripts, so it stays quiet.
    if !quiet && tot.is_none() {
        print_summary(&summary);
    }

    let mut cats = ledger::list_categories(&conn)?;
    if let Some(path) = nclr {
        if let Err(e) = clearance::apply_file(&mut cats, path) {
            eprintln!("{} {e}; showing posted balances only", "Warning:".yellow());
        }
    }

    if let Some(name) = tot {
        let cat = cats
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| PurseError::UnknownCategory(name.to_string()))?;
        println!("{}", cat.balance);
        return Ok(());
    }

    print_balances(&cats);
    Ok(())
}

pub fn recalc(ledger_dir: Option<&Path>) -> Result<()> {
    let conn = super::open(ledger_dir)?;
    let summary = posting::recalculate(&conn)?;
    println!(
        "Recalculated; {} categories changed",
        summary.categories_updated
    );
    print_balances(&ledger::list_categories(&conn)?);
    Ok(())
}
