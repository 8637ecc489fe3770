use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::money;
use crate::reports::{self, NumRange, ReportKind};

fn range_label(range: &NumRange) -> String {
    match (range.beg, range.end) {
        (Some(b), Some(e)) => format!(" (transactions {b}-{e})"),
        (Some(b), None) => format!(" (from transaction {b})"),
        (None, Some(e)) => format!(" (through transaction {e})"),
        (None, None) => String::new(),
    }
}

pub fn run(
    ledger_dir: Option<&Path>,
    kind: ReportKind,
    beg: Option<i64>,
    end: Option<i64>,
) -> Result<()> {
    let conn = super::open(ledger_dir)?;
    let report = reports::category_totals(&conn, kind, NumRange::new(beg, end)?)?;

    let mut table = Table::new();
    table.set_header(vec!["#", "Category", "Amount"]);
    for item in &report.items {
        table.add_row(vec![
            Cell::new(item.num),
            Cell::new(&item.name),
            Cell::new(money(&item.total)),
        ]);
    }
    let total_label = if report.total.is_negative() {
        "Total".red().bold()
    } else {
        "Total".green().bold()
    };
    table.add_row(vec![
        Cell::new(""),
        Cell::new(total_label),
        Cell::new(money(&report.total)),
    ]);

    println!(
        "{}{} ({} transactions)\n{table}",
        report.kind.title(),
        range_label(&report.range),
        report.transactions
    );
    Ok(())
}
