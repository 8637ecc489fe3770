use std::path::Path;

use colored::Colorize;

use crate::amount::Amount;
use crate::error::{PurseError, Result};
use crate::ledger;
use crate::models::{CategoryRef, NewTransaction, TransactionEdit};

fn category_ref(cat: Option<i64>, catt: Option<String>) -> Option<CategoryRef> {
    match (cat, catt) {
        (Some(num), _) => Some(CategoryRef::Num(num)),
        (None, Some(name)) => Some(CategoryRef::Name(name)),
        (None, None) => None,
    }
}

pub fn add(
    ledger_dir: Option<&Path>,
    cat: Option<i64>,
    catt: Option<String>,
    amt: &str,
    to: String,
    cmt: String,
    date: Option<String>,
) -> Result<()> {
    let conn = super::open(ledger_dir)?;
    let category = category_ref(cat, catt).ok_or(PurseError::MissingField("category"))?;
    let new = NewTransaction {
        category,
        amount: Amount::parse(amt)?,
        payee: to,
        comment: cmt,
        timestamp: date,
    };
    let num = ledger::add_transaction(&conn, &new)?;
    println!("Added transaction {num} ({})", new.amount);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn edit(
    ledger_dir: Option<&Path>,
    tran: i64,
    amt: Option<String>,
    cat: Option<i64>,
    catt: Option<String>,
    to: Option<String>,
    cmt: Option<String>,
    date: Option<String>,
) -> Result<()> {
    let conn = super::open(ledger_dir)?;
    let changes = TransactionEdit {
        amount: amt.as_deref().map(Amount::parse).transpose()?,
        category: category_ref(cat, catt),
        payee: to,
        comment: cmt,
        timestamp: date,
    };
    ledger::edit_transaction(&conn, tran, &changes)?;
    if changes.is_monetary() {
        println!("Updated transaction {tran}; balances recalculated");
    } else {
        println!("Updated transaction {tran}");
    }
    Ok(())
}

pub fn rm(ledger_dir: Option<&Path>, tran: i64) -> Result<()> {
    let conn = super::open(ledger_dir)?;
    let removed = ledger::remove_transaction(&conn, tran)?;
    println!(
        "{} transaction {tran} ({} to '{}'); balances recalculated",
        "Removed".yellow(),
        removed.amount,
        removed.payee
    );
    Ok(())
}
