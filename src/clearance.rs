//! Pending-clearance overlay.
//!
//! A side file lists amounts that have left the bank but are not yet in the
//! journal, one `CategoryName:Amount` per line. They are added to the posted
//! balances for display only and never written back.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, warn};

use crate::amount::Amount;
use crate::error::{PurseError, Result};
use crate::models::Category;

#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    pub line: usize,
    pub category: String,
    pub amount: Amount,
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with("//")
}

/// Parses every entry, resolving names against `categories`. The first bad
/// line fails the whole overlay.
pub fn parse(text: &str, categories: &[Category]) -> Result<Vec<Adjustment>> {
    let known: HashSet<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    let mut entries = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || is_comment(line) {
            continue;
        }
        let overlay_err = |reason: String| PurseError::Overlay {
            line: line_no,
            reason,
        };
        let (name, amount) = line
            .rsplit_once(':')
            .ok_or_else(|| overlay_err(format!("missing ':' in '{line}'")))?;
        let name = name.trim();
        if !known.contains(name) {
            return Err(overlay_err(format!("unknown category '{name}'")));
        }
        let amount = Amount::parse(amount.trim())
            .map_err(|_| overlay_err(format!("invalid amount '{}'", amount.trim())))?;
        entries.push(Adjustment {
            line: line_no,
            category: name.to_string(),
            amount,
        });
    }
    Ok(entries)
}

/// Adds the overlay to `categories` in place. On any error the balances are
/// left exactly as they were and the error is returned for the caller to
/// report.
pub fn apply(categories: &mut [Category], text: &str) -> Result<usize> {
    let entries = match parse(text, categories) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("clearance overlay ignored: {e}");
            return Err(e);
        }
    };
    for entry in &entries {
        debug!(line = entry.line, category = %entry.category, amount = %entry.amount, "overlay entry");
        if let Some(cat) = categories.iter_mut().find(|c| c.name == entry.category) {
            cat.balance = &cat.balance + &entry.amount;
        }
    }
    Ok(entries.len())
}

pub fn apply_file(categories: &mut [Category], path: &Path) -> Result<usize> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        warn!(path = %path.display(), "clearance overlay unreadable: {e}");
        PurseError::Io(e)
    })?;
    apply(categories, &text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cats() -> Vec<Category> {
        [("Food", "100.00"), ("Rent", "-50.25")]
            .iter()
            .enumerate()
            .map(|(i, (name, bal))| Category {
                num: i as i64 + 1,
                name: name.to_string(),
                balance: Amount::parse(bal).unwrap(),
                last_updated: "2024-01-01 00:00:00".into(),
                comment: String::new(),
            })
            .collect()
    }

    fn balances(cats: &[Category]) -> Vec<String> {
        cats.iter().map(|c| c.balance.to_string()).collect()
    }

    #[test]
    fn test_apply_adds_pending_amounts() {
        let mut cats = cats();
        let text = "# pending\n\nFood:-10.50\n// rent cheque\nRent:-0.75\nFood:+0.50\n";
        assert_eq!(apply(&mut cats, text).unwrap(), 3);
        assert_eq!(balances(&cats), vec!["90.00", "-51.00"]);
    }

    #[test]
    fn test_unknown_category_aborts_without_partial_application() {
        let mut cats = cats();
        let posted = balances(&cats);
        let err = apply(&mut cats, "Food:-10.00\nTravel:-5.00\n").unwrap_err();
        assert!(matches!(err, PurseError::Overlay { line: 2, .. }));
        assert_eq!(balances(&cats), posted);
    }

    #[test]
    fn test_malformed_lines_abort() {
        for bad in ["Food -10.00", "Food:ten", "Food:"] {
            let mut cats = cats();
            assert!(apply(&mut cats, bad).is_err(), "accepted {bad:?}");
            assert_eq!(balances(&cats), vec!["100.00", "-50.25"]);
        }
    }

    #[test]
    fn test_apply_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nclr.txt");
        std::fs::write(&path, "Rent:0.25\n").unwrap();
        let mut cats = cats();
        apply_file(&mut cats, &path).unwrap();
        assert_eq!(cats[1].balance.to_string(), "-50.00");
        assert!(apply_file(&mut cats, &dir.path().join("missing.txt")).is_err());
    }
}
