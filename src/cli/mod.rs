pub mod archive;
pub mod categories;
pub mod export;
pub mod import;
pub mod init;
pub mod ls;
pub mod query;
pub mod report;
pub mod transactions;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::filter::LevelFilter;

use crate::db::open_ledger;
use crate::error::Result;
use crate::settings::resolve_ledger_dir;

#[derive(Parser)]
#[command(name = "purse", version, about = "Command-line personal budget ledger.")]
pub struct Cli {
    /// Ledger directory (default: saved data dir, else ~/.purse)
    #[arg(long, global = true, env = "PURSE_HOME")]
    pub ledger: Option<PathBuf>,

    /// Log verbosity written to stderr; RUST_LOG overrides it
    #[arg(long, global = true, default_value_t = LevelFilter::WARN)]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the ledger database, optionally saving a default data directory.
    Init {
        /// Directory to remember as the default ledger location
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage categories.
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Add an unposted transaction.
    Add {
        #[command(flatten)]
        category: CategoryArg,
        /// Signed amount, e.g. -12.50
        #[arg(long, allow_hyphen_values = true)]
        amt: String,
        /// Payee or payer
        #[arg(long)]
        to: String,
        /// Comment
        #[arg(long)]
        cmt: String,
        /// YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS" (default: now)
        #[arg(long)]
        date: Option<String>,
    },
    /// Change fields of a transaction.
    Edit {
        /// Transaction number
        tran: i64,
        #[arg(long, allow_hyphen_values = true)]
        amt: Option<String>,
        /// Move to category number
        #[arg(long, conflicts_with = "catt")]
        cat: Option<i64>,
        /// Move to category name
        #[arg(long)]
        catt: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        cmt: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Remove a transaction (a copy is kept in the archive).
    Rm {
        /// Transaction number
        tran: i64,
    },
    /// Post unposted transactions and list category balances.
    Ls {
        /// Pending-clearance file of `Category:amount` lines
        #[arg(long)]
        nclr: Option<PathBuf>,
        /// Print only this category's balance
        #[arg(long)]
        tot: Option<String>,
        /// Skip the posting summary
        #[arg(long, short)]
        quiet: bool,
    },
    /// Recalculate every balance from the full journal.
    Recalc,
    /// Query transactions: dt:, st:, to:, cat:, cmt:, amt:, or mr.
    Qry {
        /// Query string
        #[arg(default_value = "all")]
        query: String,
    },
    /// Per-category totals.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Export live transactions as CSV.
    Csv {
        #[command(flatten)]
        range: RangeArgs,
        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print shell commands that rebuild this ledger.
    Script,
    /// Archive the journal, keeping one opening entry per category.
    Archive {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Turn a QIF bank export into `purse add` commands.
    Qif {
        /// Path to the QIF file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Create a category.
    Add {
        name: String,
        #[arg(long)]
        comment: Option<String>,
    },
    /// List categories with their stored balances.
    List,
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Negative amounts by category.
    Expenses {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Zero and positive amounts by category.
    Income {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// All amounts by category.
    Net {
        #[command(flatten)]
        range: RangeArgs,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct CategoryArg {
    /// Category number
    #[arg(long)]
    pub cat: Option<i64>,
    /// Category name
    #[arg(long)]
    pub catt: Option<String>,
}

#[derive(Args)]
pub struct RangeArgs {
    /// First transaction number
    #[arg(long)]
    pub beg: Option<i64>,
    /// Last transaction number
    #[arg(long)]
    pub end: Option<i64>,
}

/// Opens (and on first use creates) the ledger this run points at.
pub(crate) fn open(ledger: Option<&Path>) -> Result<Connection> {
    open_ledger(&resolve_ledger_dir(ledger))
}
