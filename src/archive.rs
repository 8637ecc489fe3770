use rusqlite::Connection;
use tracing::{debug, info};

use crate::amount::Amount;
use crate::db;
use crate::error::Result;
use crate::models::{ActivityEntry, ActivityKind, Transaction};
use crate::posting::{self, PostMode};
use crate::status::TxStatus;

pub const OPENING_PAYEE: &str = "Initial";
pub const OPENING_COMMENT: &str = "Initial balance for category.";

#[derive(Debug, Default)]
pub struct ArchiveSummary {
    pub archived: usize,
    pub opening_entries: usize,
    pub total: Amount,
}

/// Rolls the live journal into the archive and replaces it with one opening
/// entry per category with a non-zero balance. Runs as a single SQLite
/// transaction; category totals are the same before and after.
pub fn rollover(conn: &Connection) -> Result<ArchiveSummary> {
    let tx = conn.unchecked_transaction()?;

    posting::post_in(&tx, PostMode::Full)?;

    let live = db::get_transactions(&tx, false)?;
    for txn in &live {
        txn.status.transition(txn.num, TxStatus::Archived)?;
    }
    tx.execute("UPDATE tran SET status = ?1", [TxStatus::Archived])?;
    tx.execute("INSERT INTO arch SELECT * FROM tran ORDER BY num", [])?;
    tx.execute("DELETE FROM tran", [])?;

    // Numbering continues past everything just archived.
    let mut next = db::next_transaction_num(&tx)?;
    let now = db::now_stamp();
    let mut summary = ArchiveSummary {
        archived: live.len(),
        ..Default::default()
    };
    for cat in db::get_categories(&tx)? {
        summary.total = &summary.total + &cat.balance;
        if cat.balance.is_zero() {
            continue;
        }
        db::insert_transaction(
            &tx,
            &Transaction {
                num: next,
                category: cat.num,
                timestamp: now.clone(),
                amount: cat.balance,
                status: TxStatus::Posted,
                payee: OPENING_PAYEE.to_string(),
                comment: OPENING_COMMENT.to_string(),
            },
        )?;
        next += 1;
        summary.opening_entries += 1;
    }

    db::log_activity(
        &tx,
        &ActivityEntry::new(ActivityKind::Archived).comment("Archived everything."),
    )?;
    tx.commit()?;

    debug!(next_num = next, "archive numbering");
    info!(
        archived = summary.archived,
        opening = summary.opening_entries,
        "rollover complete"
    );
    Ok(summary)
}
