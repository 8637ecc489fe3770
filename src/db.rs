use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::{PurseError, Result};
use crate::models::{ActivityEntry, Category, CategoryRef, Transaction};

pub const DB_FILE: &str = "purse.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cat (
    num INTEGER PRIMARY KEY,
    dtime TEXT NOT NULL,
    name TEXT NOT NULL UNIQUE,
    amt TEXT NOT NULL DEFAULT '0.00',
    comment TEXT
);

CREATE TABLE IF NOT EXISTS tran (
    num INTEGER PRIMARY KEY,
    cat_num INTEGER NOT NULL,
    dtime TEXT NOT NULL,
    amt TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('ARCH','EDIT','FARC','NPST','PSTD','RMVD')),
    to_who TEXT,
    comment TEXT,
    FOREIGN KEY (cat_num) REFERENCES cat(num)
);
CREATE INDEX IF NOT EXISTS t_dt ON tran(dtime);

CREATE TABLE IF NOT EXISTS arch (
    num INTEGER NOT NULL,
    cat_num INTEGER NOT NULL,
    dtime TEXT NOT NULL,
    amt TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('ARCH','EDIT','FARC','NPST','PSTD','RMVD')),
    to_who TEXT,
    comment TEXT
);
CREATE INDEX IF NOT EXISTS a_num ON arch(num);

CREATE TABLE IF NOT EXISTS act (
    type TEXT NOT NULL CHECK (type IN ('ARC','CAT','EDT','RMV','TRN')),
    cat_num INTEGER,
    tran_num INTEGER,
    dtime TEXT NOT NULL,
    amt TEXT,
    to_who TEXT,
    comment TEXT
);
CREATE INDEX IF NOT EXISTS ct_dt ON act(dtime);
";

const TRAN_COLUMNS: &str = "num, cat_num, dtime, amt, status, to_who, comment";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Opens the ledger in `dir`, creating the directory and schema on first use.
pub fn open_ledger(dir: &Path) -> Result<Connection> {
    std::fs::create_dir_all(dir)?;
    let conn = get_connection(&dir.join(DB_FILE))?;
    init_db(&conn)?;
    Ok(conn)
}

/// Local wall-clock time in the stored timestamp format.
pub fn now_stamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn row_to_category(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        num: row.get(0)?,
        last_updated: row.get(1)?,
        name: row.get(2)?,
        balance: row.get(3)?,
        comment: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
    })
}

pub(crate) fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        num: row.get(0)?,
        category: row.get(1)?,
        timestamp: row.get(2)?,
        amount: row.get(3)?,
        status: row.get(4)?,
        payee: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        comment: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
    })
}

pub fn get_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT num, dtime, name, amt, comment FROM cat ORDER BY num")?;
    let rows = stmt
        .query_map([], row_to_category)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn category_num_by_name(conn: &Connection, name: &str) -> Result<Option<i64>> {
    let num = conn
        .query_row("SELECT num FROM cat WHERE name = ?1", [name], |r| r.get(0))
        .optional()?;
    Ok(num)
}

pub fn category_name_by_num(conn: &Connection, num: i64) -> Result<Option<String>> {
    let name = conn
        .query_row("SELECT name FROM cat WHERE num = ?1", [num], |r| r.get(0))
        .optional()?;
    Ok(name)
}

/// Resolves a category reference to `(num, name)`.
pub fn resolve_category(conn: &Connection, category: &CategoryRef) -> Result<(i64, String)> {
    match category {
        CategoryRef::Num(num) => category_name_by_num(conn, *num)?
            .map(|name| (*num, name))
            .ok_or(PurseError::UnknownCategoryNum(*num)),
        CategoryRef::Name(name) => category_num_by_name(conn, name)?
            .map(|num| (num, name.clone()))
            .ok_or_else(|| PurseError::UnknownCategory(name.clone())),
    }
}

pub fn next_category_num(conn: &Connection) -> Result<i64> {
    let max: i64 = conn.query_row("SELECT COALESCE(MAX(num), 0) FROM cat", [], |r| r.get(0))?;
    Ok(max + 1)
}

/// Transaction numbers are never reused, so the archive counts too.
pub fn next_transaction_num(conn: &Connection) -> Result<i64> {
    let max: i64 = conn.query_row(
        "SELECT MAX(COALESCE((SELECT MAX(num) FROM tran), 0), COALESCE((SELECT MAX(num) FROM arch), 0))",
        [],
        |r| r.get(0),
    )?;
    Ok(max + 1)
}

pub fn get_transaction(conn: &Connection, num: i64) -> Result<Option<Transaction>> {
    let txn = conn
        .query_row(
            &format!("SELECT {TRAN_COLUMNS} FROM tran WHERE num = ?1"),
            [num],
            row_to_transaction,
        )
        .optional()?;
    Ok(txn)
}

/// Live transactions in ascending `num`, optionally only the unposted ones.
pub fn get_transactions(conn: &Connection, unposted_only: bool) -> Result<Vec<Transaction>> {
    let sql = if unposted_only {
        format!("SELECT {TRAN_COLUMNS} FROM tran WHERE status = 'NPST' ORDER BY num")
    } else {
        format!("SELECT {TRAN_COLUMNS} FROM tran ORDER BY num")
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], row_to_transaction)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn insert_transaction(conn: &Connection, txn: &Transaction) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO tran ({TRAN_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        rusqlite::params![
            txn.num,
            txn.category,
            txn.timestamp,
            txn.amount,
            txn.status,
            txn.payee,
            txn.comment
        ],
    )?;
    Ok(())
}

pub fn log_activity(conn: &Connection, entry: &ActivityEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO act (type, cat_num, tran_num, dtime, amt, to_who, comment) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            entry.kind.code(),
            entry.category,
            entry.transaction,
            now_stamp(),
            entry.amount,
            entry.payee,
            entry.comment
        ],
    )?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::amount::Amount;
    use crate::models::ActivityKind;
    use crate::status::TxStatus;

    pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    pub(crate) fn add_category(conn: &Connection, name: &str) -> i64 {
        let num = next_category_num(conn).unwrap();
        conn.execute(
            "INSERT INTO cat (num, dtime, name, amt, comment) VALUES (?1, '2024-01-01 00:00:00', ?2, '0.00', '')",
            rusqlite::params![num, name],
        )
        .unwrap();
        num
    }

    pub(crate) fn add_txn(conn: &Connection, category: i64, amount: &str, status: TxStatus) -> i64 {
        let num = next_transaction_num(conn).unwrap();
        insert_transaction(
            conn,
            &Transaction {
                num,
                category,
                timestamp: "2024-02-01 12:00:00".to_string(),
                amount: Amount::parse(amount).unwrap(),
                status,
                payee: "Payee".to_string(),
                comment: "Comment".to_string(),
            },
        )
        .unwrap();
        num
    }

    pub(crate) fn balance_of(conn: &Connection, num: i64) -> String {
        conn.query_row("SELECT amt FROM cat WHERE num = ?1", [num], |r| r.get(0))
            .unwrap()
    }

    pub(crate) fn get_archived(conn: &Connection, num: i64) -> Vec<Transaction> {
        conn.prepare(&format!(
            "SELECT {TRAN_COLUMNS} FROM arch WHERE num = ?1 ORDER BY rowid"
        ))
        .unwrap()
        .query_map([num], row_to_transaction)
        .unwrap()
        .collect::<std::result::Result<Vec<_>, _>>()
        .unwrap()
    }

    pub(crate) fn activity_kinds(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT type FROM act ORDER BY rowid")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["cat", "tran", "arch", "act"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_open_ledger_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ledger_dir = dir.path().join("nested").join("ledger");
        open_ledger(&ledger_dir).unwrap();
        assert!(ledger_dir.join(DB_FILE).exists());
    }

    #[test]
    fn test_status_check_rejects_unknown_codes() {
        let (_dir, conn) = test_db();
        let cat = add_category(&conn, "Food");
        let err = conn.execute(
            "INSERT INTO tran VALUES (1, ?1, '2024-01-01 00:00:00', '1.00', 'BOGUS', '', '')",
            [cat],
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_transaction_roundtrip() {
        let (_dir, conn) = test_db();
        let cat = add_category(&conn, "Food");
        let num = add_txn(&conn, cat, "-12.34", TxStatus::Unposted);
        let txn = get_transaction(&conn, num).unwrap().unwrap();
        assert_eq!(txn.amount.to_string(), "-12.34");
        assert_eq!(txn.status, TxStatus::Unposted);
        assert_eq!(txn.category, cat);
        assert!(get_transaction(&conn, num + 1).unwrap().is_none());
    }

    #[test]
    fn test_next_transaction_num_counts_archive() {
        let (_dir, conn) = test_db();
        let cat = add_category(&conn, "Food");
        assert_eq!(next_transaction_num(&conn).unwrap(), 1);
        conn.execute(
            "INSERT INTO arch VALUES (41, ?1, '2024-01-01 00:00:00', '1.00', 'ARCH', '', '')",
            [cat],
        )
        .unwrap();
        assert_eq!(next_transaction_num(&conn).unwrap(), 42);
        add_txn(&conn, cat, "1.00", TxStatus::Unposted);
        assert_eq!(next_transaction_num(&conn).unwrap(), 43);
    }

    #[test]
    fn test_resolve_category() {
        let (_dir, conn) = test_db();
        let food = add_category(&conn, "Food");
        assert_eq!(
            resolve_category(&conn, &CategoryRef::Name("Food".into())).unwrap(),
            (food, "Food".to_string())
        );
        assert_eq!(resolve_category(&conn, &CategoryRef::Num(food)).unwrap().1, "Food");
        assert!(matches!(
            resolve_category(&conn, &CategoryRef::Num(99)),
            Err(PurseError::UnknownCategoryNum(99))
        ));
        assert!(matches!(
            resolve_category(&conn, &CategoryRef::Name("Rent".into())),
            Err(PurseError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_log_activity_appends() {
        let (_dir, conn) = test_db();
        log_activity(&conn, &ActivityEntry::new(ActivityKind::Archived).comment("all")).unwrap();
        log_activity(
            &conn,
            &ActivityEntry::new(ActivityKind::TransactionAdded)
                .transaction(1)
                .amount(&Amount::parse("2.50").unwrap()),
        )
        .unwrap();
        assert_eq!(activity_kinds(&conn), vec!["ARC", "TRN"]);
        let amt: String = conn
            .query_row("SELECT amt FROM act WHERE type = 'TRN'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(amt, "2.50");
    }
}
