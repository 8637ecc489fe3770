use thiserror::Error;

use crate::status::TxStatus;

#[derive(Error, Debug)]
pub enum PurseError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid amount: '{0}'")]
    InvalidAmount(String),

    #[error("Invalid date: '{0}'")]
    InvalidDate(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown category number: {0}")]
    UnknownCategoryNum(i64),

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(i64),

    #[error("A category named '{0}' already exists")]
    DuplicateCategory(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Nothing to edit on transaction {0}")]
    NothingToEdit(i64),

    #[error("Invalid query: '{0}'")]
    InvalidQuery(String),

    #[error("Transaction {num} cannot move from {from} to {to}")]
    IllegalTransition { num: i64, from: TxStatus, to: TxStatus },

    #[error("QIF parse error at line {line}: {reason}")]
    ImportParse { line: usize, reason: String },

    #[error("Clearance overlay line {line}: {reason}")]
    Overlay { line: usize, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, PurseError>;
