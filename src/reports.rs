use std::collections::BTreeMap;

use rusqlite::Connection;

use crate::amount::Amount;
use crate::db;
use crate::error::{PurseError, Result};

// ---------------------------------------------------------------------------
// Transaction-number range
// ---------------------------------------------------------------------------

/// Inclusive bounds on transaction numbers. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NumRange {
    pub beg: Option<i64>,
    pub end: Option<i64>,
}

impl NumRange {
    pub fn new(beg: Option<i64>, end: Option<i64>) -> Result<Self> {
        if let (Some(b), Some(e)) = (beg, end) {
            if b > e {
                return Err(PurseError::InvalidQuery(format!(
                    "range start {b} is after range end {e}"
                )));
            }
        }
        Ok(Self { beg, end })
    }

    /// SQL condition on `t.num` plus its parameters, numbered from `?1`.
    pub(crate) fn clause(&self) -> (String, Vec<i64>) {
        match (self.beg, self.end) {
            (Some(b), Some(e)) => ("t.num BETWEEN ?1 AND ?2".to_string(), vec![b, e]),
            (Some(b), None) => ("t.num >= ?1".to_string(), vec![b]),
            (None, Some(e)) => ("t.num <= ?1".to_string(), vec![e]),
            (None, None) => ("1 = 1".to_string(), vec![]),
        }
    }
}

// ---------------------------------------------------------------------------
// Category totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Negative amounts only.
    Expenses,
    /// Zero and positive amounts.
    Income,
    Net,
}

impl ReportKind {
    fn includes(&self, amount: &Amount) -> bool {
        match self {
            Self::Expenses => amount.is_negative(),
            Self::Income => !amount.is_negative(),
            Self::Net => true,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Expenses => "Expenses",
            Self::Income => "Income",
            Self::Net => "Net",
        }
    }
}

pub struct ReportItem {
    pub num: i64,
    pub name: String,
    pub total: Amount,
}

pub struct CategoryReport {
    pub kind: ReportKind,
    pub range: NumRange,
    pub items: Vec<ReportItem>,
    pub transactions: usize,
    pub total: Amount,
}

/// Per-category totals over live transactions. Payees mentioning "adjust"
/// are balance corrections and never count.
pub fn category_totals(
    conn: &Connection,
    kind: ReportKind,
    range: NumRange,
) -> Result<CategoryReport> {
    let mut totals: BTreeMap<i64, ReportItem> = db::get_categories(conn)?
        .into_iter()
        .map(|c| {
            (
                c.num,
                ReportItem {
                    num: c.num,
                    name: c.name,
                    total: Amount::zero(),
                },
            )
        })
        .collect();

    let (clause, params) = range.clause();
    let sql = format!(
        "SELECT t.num, t.cat_num, t.amt FROM tran t \
         WHERE {clause} AND COALESCE(t.to_who, '') NOT LIKE '%adjust%' \
         ORDER BY t.num"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<(i64, i64, Amount)> = stmt
        .query_map(rusqlite::params_from_iter(params), |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut transactions = 0usize;
    for (num, cat_num, amount) in rows {
        if !kind.includes(&amount) {
            continue;
        }
        let item = totals.get_mut(&cat_num).ok_or_else(|| {
            PurseError::Configuration(format!(
                "transaction {num} refers to unknown category {cat_num}"
            ))
        })?;
        item.total = &item.total + &amount;
        transactions += 1;
    }

    let items: Vec<ReportItem> = totals.into_values().collect();
    let total: Amount = items.iter().map(|i| &i.total).sum();
    Ok(CategoryReport {
        kind,
        range,
        items,
        transactions,
        total,
    })
}
