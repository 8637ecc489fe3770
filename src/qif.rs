//! QIF (Quicken Interchange Format) import.
//!
//! The importer never touches the journal. It reads a bank register export,
//! checks category names against the ledger and produces one `purse add`
//! command per transaction (or per split line) for the operator to review and
//! run.
//!
//! Parsing happens in two steps: every line becomes a [`QifField`], and the
//! fields between two `^` terminators are folded into a [`QifRecord`].

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::amount::Amount;
use crate::db;
use crate::error::{PurseError, Result};
use crate::fmt::{purse_command, shell_quote};

/// Field lines allowed in one record before the import is abandoned.
pub const MAX_RECORD_FIELDS: usize = 63;
/// Split lines allowed in one record.
pub const MAX_SPLITS: usize = 30;

const SELF_TRANSFER: &str = "[Checking]";
const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2025;

// ---------------------------------------------------------------------------
// Field events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum QifField {
    Date(String),
    Amount(String),
    Payee(String),
    Memo(String),
    Category(String),
    Check(String),
    SplitCategory(String),
    SplitMemo(String),
    SplitAmount(String),
    /// Recognised but unused (`C`, `R`, `I`, `B`, `U`).
    Ignored(char),
    Unknown(String),
}

impl QifField {
    pub fn parse(line: &str) -> Self {
        let mut chars = line.chars();
        let Some(tag) = chars.next() else {
            return Self::Unknown(String::new());
        };
        let value = chars.as_str().to_string();
        match tag {
            'D' => Self::Date(value),
            'T' => Self::Amount(strip_commas(&value)),
            'P' => Self::Payee(value),
            'M' => Self::Memo(value),
            'L' => Self::Category(value),
            'N' => Self::Check(value),
            'S' => Self::SplitCategory(value),
            'E' => Self::SplitMemo(value),
            '$' => Self::SplitAmount(strip_commas(&value)),
            'C' | 'R' | 'I' | 'B' | 'U' => Self::Ignored(tag),
            _ => Self::Unknown(line.to_string()),
        }
    }
}

fn strip_commas(text: &str) -> String {
    text.chars().filter(|c| *c != ',').collect()
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

fn dotted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d{1,2})\.(\d{1,2})\.(\d{1,4})\s*$").expect("dotted date regex"))
}

fn apostrophe_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d{1,2})/\s*(\d{1,2})'([ \d]\d)\s*$").expect("apostrophe date regex")
    })
}

fn slashed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d{1,2})/\s*(\d{1,2})/\s*(\d{1,4})\s*$").expect("slashed date regex")
    })
}

fn capture_num(caps: &regex::Captures<'_>, idx: usize) -> i32 {
    caps.get(idx)
        .map(|m| m.as_str().replace(' ', "0"))
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Parses a QIF `D` value.
///
/// Formats are tried by the separator they contain: `DD.MM.YYYY` when there
/// is a `.`, `M/D'YY` (always 20YY) when there is an apostrophe, otherwise
/// `M/D/[YY]YY` where two-digit years 50-99 mean 19xx and 2-49 mean 20xx.
pub fn parse_date(text: &str) -> std::result::Result<NaiveDate, String> {
    let (day, month, year) = if text.contains('.') {
        let caps = dotted_re()
            .captures(text)
            .ok_or_else(|| "malformed DD.MM.YYYY date".to_string())?;
        (capture_num(&caps, 1), capture_num(&caps, 2), capture_num(&caps, 3))
    } else if text.contains('\'') {
        let caps = apostrophe_re()
            .captures(text)
            .ok_or_else(|| "malformed M/D'YY date".to_string())?;
        (
            capture_num(&caps, 2),
            capture_num(&caps, 1),
            2000 + capture_num(&caps, 3),
        )
    } else {
        let caps = slashed_re()
            .captures(text)
            .ok_or_else(|| "malformed M/D/YY date".to_string())?;
        let year = match capture_num(&caps, 3) {
            y @ 50..=99 => y + 1900,
            y @ 2..=49 => y + 2000,
            y => y,
        };
        (capture_num(&caps, 2), capture_num(&caps, 1), year)
    };

    if !(1..=31).contains(&day) {
        return Err(format!("day {day} out of range"));
    }
    if !(1..=12).contains(&month) {
        return Err(format!("month {month} out of range"));
    }
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(format!("year {year} out of range"));
    }
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .ok_or_else(|| format!("{year:04}-{month:02}-{day:02} is not a calendar date"))
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QifSplit {
    pub category: String,
    pub amount: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QifRecord {
    /// Line of the record's `^` terminator.
    pub line: usize,
    pub date: Option<NaiveDate>,
    pub amount: Option<String>,
    pub payee: String,
    pub memo: String,
    pub category: String,
    pub check: String,
    pub splits: Vec<QifSplit>,
}

impl QifRecord {
    pub fn is_split(&self) -> bool {
        !self.splits.is_empty()
    }
}

/// A problem with one record or line. The rest of the file still imports.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

#[derive(Default)]
struct Warnings(Vec<Warning>);

impl Warnings {
    fn push(&mut self, line: usize, message: String) {
        warn!(line, "qif: {message}");
        self.0.push(Warning { line, message });
    }
}

/// Folds one record's fields. `Ok(None)` means the record was dropped with a
/// warning.
fn reduce(
    fields: &[(usize, QifField)],
    end_line: usize,
    warnings: &mut Warnings,
) -> Result<Option<QifRecord>> {
    let mut rec = QifRecord {
        line: end_line,
        ..Default::default()
    };
    for (line, field) in fields {
        match field {
            QifField::Date(text) => match parse_date(text) {
                Ok(date) => rec.date = Some(date),
                Err(reason) => {
                    warnings.push(*line, format!("bad date '{text}' ({reason}), record dropped"));
                    return Ok(None);
                }
            },
            QifField::Amount(text) => rec.amount = Some(text.clone()),
            QifField::Payee(text) => rec.payee = text.clone(),
            QifField::Memo(text) => rec.memo = text.clone(),
            QifField::Category(text) => rec.category = text.clone(),
            QifField::Check(text) => rec.check = text.clone(),
            QifField::SplitCategory(text) => {
                if rec.splits.len() == MAX_SPLITS {
                    return Err(PurseError::ImportParse {
                        line: *line,
                        reason: format!("more than {MAX_SPLITS} split lines in one record"),
                    });
                }
                rec.splits.push(QifSplit {
                    category: text.clone(),
                    amount: None,
                });
            }
            QifField::SplitMemo(memo) => debug!(line = *line, %memo, "split memo ignored"),
            QifField::Ignored(tag) => debug!(line = *line, %tag, "field ignored"),
            QifField::SplitAmount(text) => match rec.splits.last_mut() {
                Some(split) => split.amount = Some(text.clone()),
                None => warnings.push(*line, "split amount without a split category".into()),
            },
            QifField::Unknown(raw) => {
                warnings.push(*line, format!("unrecognised field '{raw}'"));
            }
        }
    }
    if rec.date.is_none() {
        warnings.push(end_line, "record has no date, dropped".into());
        return Ok(None);
    }
    Ok(Some(rec))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Start,
    Bank,
    Skipped,
}

fn is_bank_header(line: &str) -> bool {
    line[1..]
        .split_once(':')
        .map(|(_, kind)| kind.starts_with("Bank"))
        .unwrap_or(false)
}

/// Splits QIF text into bank records. Structural problems abort; bad records
/// are dropped and reported through `warnings`.
fn parse_records(text: &str, warnings: &mut Warnings) -> Result<Vec<QifRecord>> {
    let mut section = Section::Start;
    let mut pending: Vec<(usize, QifField)> = Vec::new();
    let mut records = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with('!') {
            if !pending.is_empty() {
                warnings.push(line_no, "record not terminated by '^', dropped".into());
                pending.clear();
            }
            section = if is_bank_header(line) {
                Section::Bank
            } else {
                debug!(line = line_no, header = line, "skipping qif section");
                Section::Skipped
            };
            continue;
        }

        match section {
            Section::Start => {
                return Err(PurseError::ImportParse {
                    line: line_no,
                    reason: "expected a '!Type:' header".into(),
                })
            }
            Section::Skipped => {}
            Section::Bank if line.starts_with('^') => {
                if !pending.is_empty() {
                    if let Some(rec) = reduce(&pending, line_no, warnings)? {
                        records.push(rec);
                    }
                    pending.clear();
                }
            }
            Section::Bank => {
                if pending.len() == MAX_RECORD_FIELDS {
                    return Err(PurseError::ImportParse {
                        line: line_no,
                        reason: format!("more than {MAX_RECORD_FIELDS} fields in one record"),
                    });
                }
                pending.push((line_no, QifField::parse(line)));
            }
        }
    }

    if section == Section::Start {
        return Err(PurseError::ImportParse {
            line: 0,
            reason: "no '!Type:' header found".into(),
        });
    }
    if !pending.is_empty() {
        let line = pending.last().map(|(l, _)| *l).unwrap_or(0);
        warnings.push(line, "record not terminated by '^' at end of file, dropped".into());
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Emission
// ---------------------------------------------------------------------------

/// One transaction ready to be added to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportLine {
    pub category: String,
    pub amount: Amount,
    pub payee: String,
    pub comment: String,
}

impl ImportLine {
    /// Renders the `purse add` command that records this line.
    pub fn command(&self, ledger: Option<&Path>) -> String {
        format!(
            "{} add --amt {} --catt {} --to {} --cmt {}",
            purse_command(ledger),
            self.amount,
            shell_quote(&self.category),
            shell_quote(&self.payee),
            shell_quote(&self.comment)
        )
    }
}

#[derive(Debug, Default)]
pub struct QifImport {
    pub lines: Vec<ImportLine>,
    pub warnings: Vec<Warning>,
}

fn scrub(text: &str) -> String {
    text.chars().filter(|c| *c != '\'' && *c != '&').collect()
}

pub fn import(conn: &Connection, text: &str) -> Result<QifImport> {
    let mut warnings = Warnings::default();
    let records = parse_records(text, &mut warnings)?;
    let mut lines = Vec::new();

    for rec in records {
        if rec.category == SELF_TRANSFER {
            debug!(line = rec.line, "skipping self-transfer record");
            continue;
        }
        let Some(date) = rec.date else { continue };
        let payee = scrub(&rec.payee);
        let prefix = format!("{}:{}:{}", date.format("%Y%m%d"), rec.check, scrub(&rec.memo));

        let mut items: Vec<(String, Option<String>, String)> = Vec::new();
        if rec.is_split() {
            for (i, split) in rec.splits.iter().enumerate() {
                items.push((split.category.clone(), split.amount.clone(), format!("{prefix}-{i}")));
            }
        } else {
            items.push((rec.category.clone(), rec.amount.clone(), prefix));
        }

        for (category, amount, comment) in items {
            let Some(amount) = amount else {
                warnings.push(rec.line, format!("no amount for category '{category}', skipped"));
                continue;
            };
            let amount = match Amount::parse(&amount) {
                Ok(a) => a,
                Err(_) => {
                    warnings.push(rec.line, format!("invalid amount '{amount}', skipped"));
                    continue;
                }
            };
            if db::category_num_by_name(conn, &category)?.is_none() {
                warnings.push(rec.line, format!("unknown category '{category}', skipped"));
                continue;
            }
            lines.push(ImportLine {
                category,
                amount,
                payee: payee.clone(),
                comment,
            });
        }
    }

    debug!(lines = lines.len(), warnings = warnings.0.len(), "qif import parsed");
    Ok(QifImport {
        lines,
        warnings: warnings.0,
    })
}

/// Bank exports are often Latin-1 or CP1252; bytes that are not UTF-8 are
/// replaced rather than failing the import.
pub fn import_file(conn: &Connection, path: &Path) -> Result<QifImport> {
    let bytes = std::fs::read(path)?;
    import(conn, &String::from_utf8_lossy(&bytes))
}
