use std::path::Path;

use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::money;
use crate::ledger::{self, Query};

pub fn run(ledger_dir: Option<&Path>, text: &str) -> Result<()> {
    let conn = super::open(ledger_dir)?;
    let query = Query::parse(text)?;
    let rows = ledger::query(&conn, &query.filter)?;

    if query.machine_readable {
        for row in &rows {
            println!("{}", ledger::machine_line(row));
        }
        return Ok(());
    }

    if rows.is_empty() {
        println!("No matching transactions.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Date", "Status", "Category", "Amount", "To", "Comment"]);
    for row in &rows {
        table.add_row(vec![
            Cell::new(row.num),
            Cell::new(&row.timestamp),
            Cell::new(row.status),
            Cell::new(&row.category_name),
            Cell::new(money(&row.amount)),
            Cell::new(&row.payee),
            Cell::new(&row.comment),
        ]);
    }
    println!("{table}");
    println!("{} transactions", rows.len());
    Ok(())
}
