use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::export;
use crate::reports::NumRange;

pub fn csv(
    ledger_dir: Option<&Path>,
    beg: Option<i64>,
    end: Option<i64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let conn = super::open(ledger_dir)?;
    let range = NumRange::new(beg, end)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::File::create(&path)?;
            let rows = export::write_csv(&conn, range, file)?;
            eprintln!("Wrote {rows} transactions to {}", path.display());
        }
        None => {
            export::write_csv(&conn, range, std::io::stdout().lock())?;
        }
    }
    Ok(())
}

pub fn script(ledger_dir: Option<&Path>) -> Result<()> {
    let conn = super::open(ledger_dir)?;
    print!("{}", export::script(&conn, ledger_dir)?);
    Ok(())
}
