mod amount;
mod archive;
mod clearance;
mod cli;
mod db;
mod error;
mod export;
mod fmt;
mod ledger;
mod models;
mod posting;
mod qif;
mod reports;
mod settings;
mod status;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::{CategoryCommands, Cli, Commands, ReportCommands};
use reports::ReportKind;

fn main() {
    let cli = Cli::parse();
    init_logger(cli.log_level);

    let ledger = cli.ledger.as_deref();
    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(ledger, data_dir),
        Commands::Category { command } => match command {
            CategoryCommands::Add { name, comment } => {
                cli::categories::add(ledger, &name, comment.as_deref())
            }
            CategoryCommands::List => cli::categories::list(ledger),
        },
        Commands::Add {
            category,
            amt,
            to,
            cmt,
            date,
        } => cli::transactions::add(ledger, category.cat, category.catt, &amt, to, cmt, date),
        Commands::Edit {
            tran,
            amt,
            cat,
            catt,
            to,
            cmt,
            date,
        } => cli::transactions::edit(ledger, tran, amt, cat, catt, to, cmt, date),
        Commands::Rm { tran } => cli::transactions::rm(ledger, tran),
        Commands::Ls { nclr, tot, quiet } => {
            cli::ls::run(ledger, nclr.as_deref(), tot.as_deref(), quiet)
        }
        Commands::Recalc => cli::ls::recalc(ledger),
        Commands::Qry { query } => cli::query::run(ledger, &query),
        Commands::Report { command } => match command {
            ReportCommands::Expenses { range } => {
                cli::report::run(ledger, ReportKind::Expenses, range.beg, range.end)
            }
            ReportCommands::Income { range } => {
                cli::report::run(ledger, ReportKind::Income, range.beg, range.end)
            }
            ReportCommands::Net { range } => {
                cli::report::run(ledger, ReportKind::Net, range.beg, range.end)
            }
        },
        Commands::Csv { range, output } => cli::export::csv(ledger, range.beg, range.end, output),
        Commands::Script => cli::export::script(ledger),
        Commands::Archive { yes } => cli::archive::run(ledger, yes),
        Commands::Qif { file } => cli::import::run(ledger, &file),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr. `RUST_LOG`, when set, replaces the `--log-level`
/// default for this crate.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        None => EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
