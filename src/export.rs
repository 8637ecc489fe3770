use std::io::Write;
use std::path::Path;

use rusqlite::Connection;

use crate::db;
use crate::error::Result;
use crate::fmt::{purse_command, shell_quote};
use crate::models::Transaction;
use crate::reports::NumRange;

fn live_transactions(conn: &Connection, range: NumRange) -> Result<Vec<Transaction>> {
    let (clause, params) = range.clause();
    let mut stmt = conn.prepare(&format!(
        "SELECT t.num, t.cat_num, t.dtime, t.amt, t.status, t.to_who, t.comment \
         FROM tran t WHERE {clause} ORDER BY t.num"
    ))?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params), db::row_to_transaction)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Writes live transactions as CSV: the fixed columns, then one column per
/// category holding the amount on rows that belong to it. Returns the number
/// of data rows.
pub fn write_csv<W: Write>(conn: &Connection, range: NumRange, out: W) -> Result<usize> {
    let categories = db::get_categories(conn)?;
    let txns = live_transactions(conn, range)?;

    let mut wtr = csv::Writer::from_writer(out);
    let mut header = vec![
        "Transaction".to_string(),
        "Date/time".to_string(),
        "To field".to_string(),
        "Comment".to_string(),
        "Amount".to_string(),
    ];
    header.extend(categories.iter().map(|c| c.name.clone()));
    wtr.write_record(&header)?;

    for txn in &txns {
        let amount = txn.amount.to_string();
        let mut record = vec![
            txn.num.to_string(),
            txn.timestamp.clone(),
            txn.payee.clone(),
            txn.comment.clone(),
            amount.clone(),
        ];
        record.extend(categories.iter().map(|c| {
            if c.num == txn.category {
                amount.clone()
            } else {
                String::new()
            }
        }));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(txns.len())
}

// ---------------------------------------------------------------------------
// Rebuild script
// ---------------------------------------------------------------------------

/// Shell commands that recreate every category and live transaction in a
/// fresh ledger. Commands target `ledger` when one is given.
pub fn script(conn: &Connection, ledger: Option<&Path>) -> Result<String> {
    let purse = purse_command(ledger);
    let categories = db::get_categories(conn)?;
    let mut out = String::new();

    for cat in &categories {
        out.push_str(&format!("# cat {} created {}\n", cat.num, cat.last_updated));
        out.push_str(&format!(
            "{purse} category add {} --comment {}\n",
            shell_quote(&cat.name),
            shell_quote(&cat.comment)
        ));
    }

    for txn in live_transactions(conn, NumRange::default())? {
        let name = categories
            .iter()
            .find(|c| c.num == txn.category)
            .map(|c| c.name.as_str())
            .unwrap_or_default();
        out.push_str(&format!(
            "# tran {} {} {}\n",
            txn.num,
            txn.timestamp,
            txn.status.code()
        ));
        out.push_str(&format!(
            "{purse} add --amt {} --catt {} --to {} --cmt {} --date {}\n",
            txn.amount,
            shell_quote(name),
            shell_quote(&txn.payee),
            shell_quote(&txn.comment),
            shell_quote(&txn.timestamp)
        ));
    }
    Ok(out)
}
