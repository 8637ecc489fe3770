use crate::amount::Amount;
use crate::status::TxStatus;

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub num: i64,
    pub name: String,
    pub balance: Amount,
    pub last_updated: String,
    pub comment: String,
}

/// A journal entry. Rows in the `arch` table share this shape, keyed by the
/// original `num`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub num: i64,
    pub category: i64,
    pub timestamp: String,
    pub amount: Amount,
    pub status: TxStatus,
    pub payee: String,
    pub comment: String,
}

/// A transaction joined with its category name, as returned by queries.
#[derive(Debug, Clone)]
pub struct TransactionRow {
    pub num: i64,
    pub category_name: String,
    pub timestamp: String,
    pub amount: Amount,
    pub status: TxStatus,
    pub payee: String,
    pub comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    CategoryCreated,
    TransactionAdded,
    TransactionEdited,
    TransactionRemoved,
    Archived,
}

impl ActivityKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::CategoryCreated => "CAT",
            Self::TransactionAdded => "TRN",
            Self::TransactionEdited => "EDT",
            Self::TransactionRemoved => "RMV",
            Self::Archived => "ARC",
        }
    }
}

/// Append-only audit record. Every field but `kind` is optional.
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub kind: ActivityKind,
    pub category: Option<i64>,
    pub transaction: Option<i64>,
    pub amount: Option<Amount>,
    pub payee: Option<String>,
    pub comment: Option<String>,
}

impl ActivityEntry {
    pub fn new(kind: ActivityKind) -> Self {
        Self {
            kind,
            category: None,
            transaction: None,
            amount: None,
            payee: None,
            comment: None,
        }
    }

    pub fn category(mut self, num: i64) -> Self {
        self.category = Some(num);
        self
    }

    pub fn transaction(mut self, num: i64) -> Self {
        self.transaction = Some(num);
        self
    }

    pub fn amount(mut self, amount: &Amount) -> Self {
        self.amount = Some(amount.clone());
        self
    }

    pub fn payee(mut self, payee: impl Into<String>) -> Self {
        self.payee = Some(payee.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// How a caller names a category.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryRef {
    Num(i64),
    Name(String),
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub category: CategoryRef,
    pub amount: Amount,
    pub payee: String,
    pub comment: String,
    /// Defaults to now when absent.
    pub timestamp: Option<String>,
}

/// Fields to change on an existing transaction. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct TransactionEdit {
    pub amount: Option<Amount>,
    pub category: Option<CategoryRef>,
    pub payee: Option<String>,
    pub comment: Option<String>,
    pub timestamp: Option<String>,
}

impl TransactionEdit {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.category.is_none()
            && self.payee.is_none()
            && self.comment.is_none()
            && self.timestamp.is_none()
    }

    /// Amount or category changes invalidate stored balances.
    pub fn is_monetary(&self) -> bool {
        self.amount.is_some() || self.category.is_some()
    }
}
