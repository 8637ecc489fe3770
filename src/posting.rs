use std::collections::BTreeMap;

use rusqlite::Connection;
use tracing::debug;

use crate::amount::Amount;
use crate::db;
use crate::error::{PurseError, Result};
use crate::status::TxStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostMode {
    /// Fold only `Unposted` transactions into the stored balances.
    Incremental,
    /// Rebuild every balance from zero over the whole live journal.
    Full,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PostSummary {
    pub transactions_posted: usize,
    pub categories_updated: usize,
}

struct Slot {
    stored: Amount,
    running: Amount,
    touched: bool,
}

pub fn post_unposted(conn: &Connection) -> Result<PostSummary> {
    post(conn, PostMode::Incremental)
}

pub fn recalculate(conn: &Connection) -> Result<PostSummary> {
    post(conn, PostMode::Full)
}

pub fn post(conn: &Connection, mode: PostMode) -> Result<PostSummary> {
    let tx = conn.unchecked_transaction()?;
    let summary = post_in(&tx, mode)?;
    tx.commit()?;
    Ok(summary)
}

/// Posting pass without its own SQLite transaction, for callers that already
/// hold one.
pub(crate) fn post_in(conn: &Connection, mode: PostMode) -> Result<PostSummary> {
    let mut slots: BTreeMap<i64, Slot> = db::get_categories(conn)?
        .into_iter()
        .map(|c| {
            let running = match mode {
                PostMode::Incremental => c.balance.clone(),
                PostMode::Full => Amount::zero(),
            };
            (
                c.num,
                Slot {
                    stored: c.balance,
                    running,
                    touched: false,
                },
            )
        })
        .collect();

    let txns = db::get_transactions(conn, mode == PostMode::Incremental)?;
    let mut summary = PostSummary::default();

    for txn in &txns {
        if !txn.status.can_transition_to(TxStatus::Posted) {
            debug!(num = txn.num, status = %txn.status, "skipping transaction");
            continue;
        }
        let slot = slots.get_mut(&txn.category).ok_or_else(|| {
            PurseError::Configuration(format!(
                "transaction {} refers to unknown category {}",
                txn.num, txn.category
            ))
        })?;
        slot.running = &slot.running + &txn.amount;
        slot.touched = true;

        if txn.status != TxStatus::Posted {
            let next = txn.status.transition(txn.num, TxStatus::Posted)?;
            conn.execute(
                "UPDATE tran SET status = ?1 WHERE num = ?2",
                rusqlite::params![next, txn.num],
            )?;
            summary.transactions_posted += 1;
        }
    }

    let now = db::now_stamp();
    let mut update = conn.prepare("UPDATE cat SET amt = ?1, dtime = ?2 WHERE num = ?3")?;
    for (num, slot) in &slots {
        let write = match mode {
            PostMode::Incremental => slot.touched,
            PostMode::Full => slot.touched || slot.running != slot.stored,
        };
        if write {
            update.execute(rusqlite::params![slot.running, now, num])?;
            summary.categories_updated += 1;
        }
    }

    debug!(
        ?mode,
        posted = summary.transactions_posted,
        updated = summary.categories_updated,
        "posting pass complete"
    );
    Ok(summary)
}
