use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use tracing::debug;

use crate::db;
use crate::error::{PurseError, Result};
use crate::models::{
    ActivityEntry, ActivityKind, Category, NewTransaction, Transaction, TransactionEdit,
    TransactionRow,
};
use crate::posting::{self, PostMode};
use crate::status::TxStatus;

const DEFAULT_CATEGORY_COMMENT: &str = "New category.";
const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub fn new_category(conn: &Connection, name: &str, comment: Option<&str>) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PurseError::MissingField("name"));
    }
    if db::category_num_by_name(conn, name)?.is_some() {
        return Err(PurseError::DuplicateCategory(name.to_string()));
    }
    let comment = comment
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CATEGORY_COMMENT);

    let tx = conn.unchecked_transaction()?;
    let num = db::next_category_num(&tx)?;
    tx.execute(
        "INSERT INTO cat (num, dtime, name, amt, comment) VALUES (?1, ?2, ?3, '0.00', ?4)",
        rusqlite::params![num, db::now_stamp(), name, comment],
    )?;
    db::log_activity(
        &tx,
        &ActivityEntry::new(ActivityKind::CategoryCreated)
            .category(num)
            .comment(format!("Add cat {num}, {name}")),
    )?;
    tx.commit()?;
    debug!(num, name, "category created");
    Ok(num)
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    db::get_categories(conn)
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Normalises an operator-supplied date to the stored timestamp format.
/// Accepts `YYYY-MM-DD` (midnight) or `YYYY-MM-DD HH:MM:SS`.
pub fn normalize_timestamp(text: &str) -> Result<String> {
    let text = text.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, STAMP_FORMAT) {
        return Ok(dt.format(STAMP_FORMAT).to_string());
    }
    if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(format!("{} 00:00:00", d.format("%Y-%m-%d")));
    }
    Err(PurseError::InvalidDate(text.to_string()))
}

fn required(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        Err(PurseError::MissingField(field))
    } else {
        Ok(())
    }
}

pub fn add_transaction(conn: &Connection, new: &NewTransaction) -> Result<i64> {
    required(&new.payee, "to")?;
    required(&new.comment, "comment")?;
    let (category, _) = db::resolve_category(conn, &new.category)?;
    let timestamp = match &new.timestamp {
        Some(text) => normalize_timestamp(text)?,
        None => db::now_stamp(),
    };

    let tx = conn.unchecked_transaction()?;
    let num = db::next_transaction_num(&tx)?;
    db::insert_transaction(
        &tx,
        &Transaction {
            num,
            category,
            timestamp,
            amount: new.amount.clone(),
            status: TxStatus::Unposted,
            payee: new.payee.clone(),
            comment: new.comment.clone(),
        },
    )?;
    db::log_activity(
        &tx,
        &ActivityEntry::new(ActivityKind::TransactionAdded)
            .category(category)
            .transaction(num)
            .amount(&new.amount)
            .payee(new.payee.as_str())
            .comment(new.comment.as_str()),
    )?;
    tx.commit()?;
    debug!(num, category, amount = %new.amount, "transaction added");
    Ok(num)
}

/// Applies `changes` to transaction `num`. Amount or category changes are
/// followed by a full recalculation inside the same SQLite transaction.
pub fn edit_transaction(conn: &Connection, num: i64, changes: &TransactionEdit) -> Result<()> {
    if changes.is_empty() {
        return Err(PurseError::NothingToEdit(num));
    }

    let tx = conn.unchecked_transaction()?;
    let current = db::get_transaction(&tx, num)?.ok_or(PurseError::UnknownTransaction(num))?;

    let edited = |column: &str, value: &dyn rusqlite::ToSql, note: String| -> Result<()> {
        tx.execute(
            &format!("UPDATE tran SET {column} = ?1 WHERE num = ?2"),
            rusqlite::params![value, num],
        )?;
        db::log_activity(
            &tx,
            &ActivityEntry::new(ActivityKind::TransactionEdited)
                .category(current.category)
                .transaction(num)
                .comment(note),
        )
    };

    if let Some(amount) = &changes.amount {
        edited("amt", amount, format!("amt {} -> {amount}", current.amount))?;
    }
    if let Some(category) = &changes.category {
        let (cat_num, name) = db::resolve_category(&tx, category)?;
        edited("cat_num", &cat_num, format!("cat {} -> {cat_num} ({name})", current.category))?;
    }
    if let Some(payee) = &changes.payee {
        required(payee, "to")?;
        edited("to_who", payee, format!("to '{}' -> '{payee}'", current.payee))?;
    }
    if let Some(comment) = &changes.comment {
        required(comment, "comment")?;
        edited("comment", comment, format!("cmt '{}' -> '{comment}'", current.comment))?;
    }
    if let Some(text) = &changes.timestamp {
        let stamp = normalize_timestamp(text)?;
        edited("dtime", &stamp, format!("date {} -> {stamp}", current.timestamp))?;
    }

    if changes.is_monetary() {
        posting::post_in(&tx, PostMode::Full)?;
    }
    tx.commit()?;
    debug!(num, "transaction edited");
    Ok(())
}

/// Marks transaction `num` removed, archives a copy, deletes it from the live
/// journal and recalculates. Returns the removed row.
pub fn remove_transaction(conn: &Connection, num: i64) -> Result<Transaction> {
    let tx = conn.unchecked_transaction()?;
    let mut txn = db::get_transaction(&tx, num)?.ok_or(PurseError::UnknownTransaction(num))?;
    txn.status = txn.status.transition(num, TxStatus::Removed)?;

    tx.execute(
        "UPDATE tran SET status = ?1 WHERE num = ?2",
        rusqlite::params![txn.status, num],
    )?;
    tx.execute("INSERT INTO arch SELECT * FROM tran WHERE num = ?1", [num])?;
    tx.execute("DELETE FROM tran WHERE num = ?1", [num])?;
    db::log_activity(
        &tx,
        &ActivityEntry::new(ActivityKind::TransactionRemoved)
            .category(txn.category)
            .transaction(num)
            .amount(&txn.amount)
            .payee(txn.payee.as_str())
            .comment(format!("Removed tran {num}")),
    )?;
    posting::post_in(&tx, PostMode::Full)?;
    tx.commit()?;
    debug!(num, "transaction removed");
    Ok(txn)
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum QueryFilter {
    Date(String),
    Status(String),
    Payee(String),
    Category(String),
    Comment(String),
    Amount(String),
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub filter: QueryFilter,
    /// Colon-delimited dump instead of a table.
    pub machine_readable: bool,
}

impl Query {
    /// Parses `dt:`, `st:`, `to:`, `cat:`, `cmt:` or `amt:` prefixed
    /// substrings, `mr` for a machine-readable dump, anything else lists all.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text == "mr" {
            return Ok(Self {
                filter: QueryFilter::All,
                machine_readable: true,
            });
        }
        let filter = match text.split_once(':') {
            Some((key, value)) => {
                let build: Option<fn(String) -> QueryFilter> = match key {
                    "dt" => Some(QueryFilter::Date),
                    "st" => Some(QueryFilter::Status),
                    "to" => Some(QueryFilter::Payee),
                    "cat" => Some(QueryFilter::Category),
                    "cmt" => Some(QueryFilter::Comment),
                    "amt" => Some(QueryFilter::Amount),
                    _ => None,
                };
                match build {
                    Some(_) if value.is_empty() => {
                        return Err(PurseError::InvalidQuery(text.to_string()))
                    }
                    Some(build) => build(value.to_string()),
                    None => QueryFilter::All,
                }
            }
            None => QueryFilter::All,
        };
        Ok(Self {
            filter,
            machine_readable: false,
        })
    }
}

pub fn query(conn: &Connection, filter: &QueryFilter) -> Result<Vec<TransactionRow>> {
    let (clause, value) = match filter {
        QueryFilter::Date(v) => ("t.dtime LIKE '%' || ?1 || '%'", Some(v.clone())),
        QueryFilter::Status(v) => match TxStatus::from_label(v) {
            Some(status) => ("t.status = ?1", Some(status.code().to_string())),
            None => ("t.status LIKE '%' || ?1 || '%'", Some(v.clone())),
        },
        QueryFilter::Payee(v) => ("t.to_who LIKE '%' || ?1 || '%'", Some(v.clone())),
        QueryFilter::Category(v) => ("c.name LIKE '%' || ?1 || '%'", Some(v.clone())),
        QueryFilter::Comment(v) => ("t.comment LIKE '%' || ?1 || '%'", Some(v.clone())),
        QueryFilter::Amount(v) => ("t.amt LIKE '%' || ?1 || '%'", Some(v.clone())),
        QueryFilter::All => ("1 = 1", None),
    };
    let sql = format!(
        "SELECT t.num, c.name, t.dtime, t.amt, t.status, t.to_who, t.comment
         FROM tran t JOIN cat c ON c.num = t.cat_num
         WHERE {clause}
         ORDER BY t.dtime, t.num"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(value), |row| {
            Ok(TransactionRow {
                num: row.get(0)?,
                category_name: row.get(1)?,
                timestamp: row.get(2)?,
                amount: row.get(3)?,
                status: row.get(4)?,
                payee: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                comment: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// One colon-delimited line per row, for scripts. The timestamp is compacted
/// to `YYYYMMDDHHMMSS`; free text goes last.
pub fn machine_line(row: &TransactionRow) -> String {
    let stamp: String = row.timestamp.chars().filter(char::is_ascii_digit).collect();
    format!(
        "{}:{}:{}:{}:{}:{}:{}",
        row.num,
        stamp,
        row.status.code(),
        row.category_name,
        row.amount,
        row.payee,
        row.comment
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;
    use crate::db::tests::{activity_kinds, balance_of, get_archived, test_db};
    use crate::models::CategoryRef;

    fn add(conn: &Connection, cat: &str, amount: &str, payee: &str) -> i64 {
        add_transaction(
            conn,
            &NewTransaction {
                category: CategoryRef::Name(cat.to_string()),
                amount: Amount::parse(amount).unwrap(),
                payee: payee.to_string(),
                comment: "note".to_string(),
                timestamp: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_new_category() {
        let (_dir, conn) = test_db();
        assert_eq!(new_category(&conn, "Food", None).unwrap(), 1);
        assert_eq!(new_category(&conn, " Rent ", Some("monthly")).unwrap(), 2);
        let cats = list_categories(&conn).unwrap();
        assert_eq!(cats[1].name, "Rent");
        assert_eq!(cats[1].comment, "monthly");
        assert_eq!(cats[0].comment, DEFAULT_CATEGORY_COMMENT);
        assert!(cats.iter().all(|c| c.balance.is_zero()));
        assert_eq!(activity_kinds(&conn), vec!["CAT", "CAT"]);
    }

    #[test]
    fn test_new_category_rejects_duplicates_and_blanks() {
        let (_dir, conn) = test_db();
        new_category(&conn, "Food", None).unwrap();
        assert!(matches!(
            new_category(&conn, "Food", None),
            Err(PurseError::DuplicateCategory(_))
        ));
        assert!(matches!(
            new_category(&conn, "  ", None),
            Err(PurseError::MissingField("name"))
        ));
    }

    #[test]
    fn test_add_transaction_is_unposted() {
        let (_dir, conn) = test_db();
        let food = new_category(&conn, "Food", None).unwrap();
        let num = add(&conn, "Food", "-4.50", "Cafe");
        let txn = db::get_transaction(&conn, num).unwrap().unwrap();
        assert_eq!(txn.status, TxStatus::Unposted);
        assert_eq!(txn.category, food);
        assert_eq!(balance_of(&conn, food), "0.00");
        assert_eq!(activity_kinds(&conn), vec!["CAT", "TRN"]);
    }

    #[test]
    fn test_add_transaction_validation() {
        let (_dir, conn) = test_db();
        new_category(&conn, "Food", None).unwrap();
        let mut new = NewTransaction {
            category: CategoryRef::Name("Nope".into()),
            amount: Amount::parse("1").unwrap(),
            payee: "Shop".into(),
            comment: "x".into(),
            timestamp: None,
        };
        assert!(matches!(
            add_transaction(&conn, &new),
            Err(PurseError::UnknownCategory(_))
        ));
        new.category = CategoryRef::Num(1);
        new.payee = String::new();
        assert!(matches!(
            add_transaction(&conn, &new),
            Err(PurseError::MissingField("to"))
        ));
        new.payee = "Shop".into();
        new.timestamp = Some("yesterday".into());
        assert!(matches!(
            add_transaction(&conn, &new),
            Err(PurseError::InvalidDate(_))
        ));
        new.timestamp = Some("2024-03-05".into());
        let num = add_transaction(&conn, &new).unwrap();
        let txn = db::get_transaction(&conn, num).unwrap().unwrap();
        assert_eq!(txn.timestamp, "2024-03-05 00:00:00");
    }

    #[test]
    fn test_normalize_timestamp() {
        assert_eq!(
            normalize_timestamp("2023-12-31 23:59:01").unwrap(),
            "2023-12-31 23:59:01"
        );
        assert!(normalize_timestamp("2023-02-30").is_err());
        assert!(normalize_timestamp("12/31/2023").is_err());
    }

    #[test]
    fn test_remove_preserves_audit_trail() {
        let (_dir, conn) = test_db();
        let food = new_category(&conn, "Food", None).unwrap();
        for i in 1..=8 {
            add(&conn, "Food", &format!("{i}.00"), &format!("Payee {i}"));
        }
        posting::post_unposted(&conn).unwrap();
        assert_eq!(balance_of(&conn, food), "36.00");
        let before = db::get_transaction(&conn, 7).unwrap().unwrap();

        let removed = remove_transaction(&conn, 7).unwrap();
        assert_eq!(removed.status, TxStatus::Removed);

        let archived = get_archived(&conn, 7);
        assert_eq!(archived.len(), 1);
        assert_eq!(
            archived[0],
            Transaction {
                status: TxStatus::Removed,
                ..before
            }
        );
        assert!(db::get_transaction(&conn, 7).unwrap().is_none());
        assert_eq!(balance_of(&conn, food), "29.00");
        posting::recalculate(&conn).unwrap();
        assert_eq!(balance_of(&conn, food), "29.00");
        assert_eq!(activity_kinds(&conn).last().unwrap(), "RMV");
    }

    #[test]
    fn test_remove_unposted_and_unknown() {
        let (_dir, conn) = test_db();
        new_category(&conn, "Food", None).unwrap();
        let num = add(&conn, "Food", "3.00", "Shop");
        remove_transaction(&conn, num).unwrap();
        assert!(matches!(
            remove_transaction(&conn, num),
            Err(PurseError::UnknownTransaction(_))
        ));
        // Removed numbers are not handed out again.
        assert_eq!(add(&conn, "Food", "1.00", "Shop"), num + 1);
    }

    #[test]
    fn test_edit_amount_recalculates() {
        let (_dir, conn) = test_db();
        let food = new_category(&conn, "Food", None).unwrap();
        let rent = new_category(&conn, "Rent", None).unwrap();
        let num = add(&conn, "Food", "10.00", "Shop");
        posting::post_unposted(&conn).unwrap();

        let changes = TransactionEdit {
            amount: Some(Amount::parse("12.50").unwrap()),
            ..Default::default()
        };
        edit_transaction(&conn, num, &changes).unwrap();
        assert_eq!(balance_of(&conn, food), "12.50");

        let changes = TransactionEdit {
            category: Some(CategoryRef::Num(rent)),
            ..Default::default()
        };
        edit_transaction(&conn, num, &changes).unwrap();
        assert_eq!(balance_of(&conn, food), "0.00");
        assert_eq!(balance_of(&conn, rent), "12.50");
    }

    #[test]
    fn test_edit_text_fields_keep_status() {
        let (_dir, conn) = test_db();
        new_category(&conn, "Food", None).unwrap();
        let num = add(&conn, "Food", "10.00", "Shop");
        let changes = TransactionEdit {
            payee: Some("Market".into()),
            comment: Some("weekly".into()),
            timestamp: Some("2024-01-02".into()),
            ..Default::default()
        };
        edit_transaction(&conn, num, &changes).unwrap();
        let txn = db::get_transaction(&conn, num).unwrap().unwrap();
        assert_eq!(txn.payee, "Market");
        assert_eq!(txn.comment, "weekly");
        assert_eq!(txn.timestamp, "2024-01-02 00:00:00");
        assert_eq!(txn.status, TxStatus::Unposted);
        let edits = activity_kinds(&conn).iter().filter(|k| *k == "EDT").count();
        assert_eq!(edits, 3);
    }

    #[test]
    fn test_edit_errors_leave_row_unchanged() {
        let (_dir, conn) = test_db();
        new_category(&conn, "Food", None).unwrap();
        let num = add(&conn, "Food", "10.00", "Shop");
        assert!(matches!(
            edit_transaction(&conn, num, &TransactionEdit::default()),
            Err(PurseError::NothingToEdit(_))
        ));
        assert!(matches!(
            edit_transaction(&conn, 99, &TransactionEdit { payee: Some("x".into()), ..Default::default() }),
            Err(PurseError::UnknownTransaction(99))
        ));
        let changes = TransactionEdit {
            payee: Some("Market".into()),
            category: Some(CategoryRef::Name("Nope".into())),
            ..Default::default()
        };
        assert!(edit_transaction(&conn, num, &changes).is_err());
        let txn = db::get_transaction(&conn, num).unwrap().unwrap();
        assert_eq!(txn.payee, "Shop");
    }

    #[test]
    fn test_query_parse() {
        assert_eq!(
            Query::parse("to:Cafe").unwrap().filter,
            QueryFilter::Payee("Cafe".into())
        );
        assert!(Query::parse("mr").unwrap().machine_readable);
        assert_eq!(Query::parse("everything").unwrap().filter, QueryFilter::All);
        assert_eq!(Query::parse("zz:top").unwrap().filter, QueryFilter::All);
        assert!(matches!(Query::parse("cat:"), Err(PurseError::InvalidQuery(_))));
    }

    #[test]
    fn test_query_filters() {
        let (_dir, conn) = test_db();
        new_category(&conn, "Food", None).unwrap();
        new_category(&conn, "Rent", None).unwrap();
        add(&conn, "Food", "-4.50", "Cafe");
        add(&conn, "Rent", "-800.00", "Landlord");
        add(&conn, "Food", "-20.00", "Grocer");
        posting::post_unposted(&conn).unwrap();
        add(&conn, "Food", "-1.00", "Cafe");

        assert_eq!(query(&conn, &QueryFilter::All).unwrap().len(), 4);
        assert_eq!(query(&conn, &QueryFilter::Payee("cafe".into())).unwrap().len(), 2);
        assert_eq!(query(&conn, &QueryFilter::Category("Rent".into())).unwrap().len(), 1);
        assert_eq!(query(&conn, &QueryFilter::Amount("800".into())).unwrap().len(), 1);
        let unposted = query(&conn, &QueryFilter::Status("unposted".into())).unwrap();
        assert_eq!(unposted.len(), 1);
        assert_eq!(unposted[0].num, 4);
        assert_eq!(
            machine_line(&unposted[0]).split(':').nth(3),
            Some("Food")
        );
    }
}
