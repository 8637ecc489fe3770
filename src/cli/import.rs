use std::path::Path;

use colored::Colorize;

use crate::error::Result;
use crate::qif;

/// Prints one `purse add` command per importable QIF line. Warnings go to
/// stderr so the commands can be piped straight into a shell.
pub fn run(ledger_dir: Option<&Path>, file: &Path) -> Result<()> {
    let conn = super::open(ledger_dir)?;
    let result = qif::import_file(&conn, file)?;

    for line in &result.lines {
        println!("{}", line.command(ledger_dir));
    }
    for warning in &result.warnings {
        eprintln!("{} {warning}", "Warning:".yellow());
    }
    eprintln!(
        "{} commands, {} warnings",
        result.lines.len(),
        result.warnings.len()
    );
    Ok(())
}
