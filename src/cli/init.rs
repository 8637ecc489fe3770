use std::path::{Path, PathBuf};

use crate::db::{open_ledger, DB_FILE};
use crate::error::Result;
use crate::settings::{load_settings, resolve_ledger_dir, save_settings, shellexpand_path};

/// Creates the ledger. With `--data-dir`, that directory also becomes the
/// saved default for later runs.
pub fn run(ledger_dir: Option<&Path>, data_dir: Option<String>) -> Result<()> {
    let dir = match data_dir {
        Some(raw) => {
            let dir = PathBuf::from(shellexpand_path(&raw));
            let mut settings = load_settings();
            settings.data_dir = dir.to_string_lossy().to_string();
            save_settings(&settings)?;
            println!("Saved data directory: {}", dir.display());
            dir
        }
        None => resolve_ledger_dir(ledger_dir),
    };

    let conn = open_ledger(&dir)?;
    let categories: i64 = conn.query_row("SELECT count(*) FROM cat", [], |r| r.get(0))?;
    let transactions: i64 = conn.query_row("SELECT count(*) FROM tran", [], |r| r.get(0))?;
    println!("Ledger ready at {}", dir.join(DB_FILE).display());
    println!("Categories:    {categories}");
    println!("Transactions:  {transactions}");
    Ok(())
}
