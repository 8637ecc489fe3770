use std::path::Path;

use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::money;
use crate::ledger;

pub fn add(ledger_dir: Option<&Path>, name: &str, comment: Option<&str>) -> Result<()> {
    let conn = super::open(ledger_dir)?;
    let num = ledger::new_category(&conn, name, comment)?;
    println!("Added category {num}: {}", name.trim());
    Ok(())
}

pub fn list(ledger_dir: Option<&Path>) -> Result<()> {
    let conn = super::open(ledger_dir)?;
    let cats = ledger::list_categories(&conn)?;
    if cats.is_empty() {
        println!("No categories yet. Add one with `purse category add NAME`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Name", "Balance", "Updated", "Comment"]);
    for cat in &cats {
        table.add_row(vec![
            Cell::new(cat.num),
            Cell::new(&cat.name),
            Cell::new(money(&cat.balance)),
            Cell::new(&cat.last_updated),
            Cell::new(&cat.comment),
        ]);
    }
    println!("Categories\n{table}");
    Ok(())
}
