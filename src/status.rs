use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::error::{PurseError, Result};

/// Lifecycle of a journal entry.
///
/// `Unposted -> Posted -> Removed`, with `Archived` reachable from every
/// live state during rollover. Nothing moves backwards. `Edited` and
/// `FullyArchived` exist in the schema but no operation assigns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxStatus {
    Unposted,
    Posted,
    Removed,
    Archived,
    Edited,
    FullyArchived,
}

impl TxStatus {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unposted => "NPST",
            Self::Posted => "PSTD",
            Self::Removed => "RMVD",
            Self::Archived => "ARCH",
            Self::Edited => "EDIT",
            Self::FullyArchived => "FARC",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "NPST" => Some(Self::Unposted),
            "PSTD" => Some(Self::Posted),
            "RMVD" => Some(Self::Removed),
            "ARCH" => Some(Self::Archived),
            "EDIT" => Some(Self::Edited),
            "FARC" => Some(Self::FullyArchived),
            _ => None,
        }
    }

    /// Accepts a storage code (`PSTD`) or a name (`posted`), case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        let upper = label.trim().to_uppercase();
        Self::from_code(&upper).or(match upper.as_str() {
            "UNPOSTED" => Some(Self::Unposted),
            "POSTED" => Some(Self::Posted),
            "REMOVED" => Some(Self::Removed),
            "ARCHIVED" => Some(Self::Archived),
            _ => None,
        })
    }

    /// Reserved states are declared for the schema only.
    pub fn is_reserved(&self) -> bool {
        matches!(self, Self::Edited | Self::FullyArchived)
    }

    pub fn can_transition_to(&self, next: TxStatus) -> bool {
        use TxStatus::*;
        if self.is_reserved() || next.is_reserved() {
            return false;
        }
        match (*self, next) {
            (Unposted, Posted) => true,
            // Re-posting during a full recalculation.
            (Posted, Posted) => true,
            (Unposted, Removed) | (Posted, Removed) => true,
            (Unposted, Archived) | (Posted, Archived) | (Removed, Archived) => true,
            _ => false,
        }
    }

    /// Validates a move of transaction `num` from `self` to `next`.
    pub fn transition(&self, num: i64, next: TxStatus) -> Result<TxStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(PurseError::IllegalTransition {
                num,
                from: *self,
                to: next,
            })
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unposted => "unposted",
            Self::Posted => "posted",
            Self::Removed => "removed",
            Self::Archived => "archived",
            Self::Edited => "edited",
            Self::FullyArchived => "fully archived",
        };
        f.write_str(name)
    }
}

impl ToSql for TxStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for TxStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_str()?;
        TxStatus::from_code(code).ok_or_else(|| {
            FromSqlError::Other(format!("unknown transaction status '{code}'").into())
        })
    }
}
