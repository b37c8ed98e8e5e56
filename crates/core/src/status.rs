//! Shared lifecycle status for every directory record.
//!
//! Permissions, roles, role-permission links, user-role assignments, menu
//! items and user accounts all carry the same status column. Only
//! [`RecordStatus::Active`] records take part in authorization decisions, and
//! that rule lives here, in [`Lifecycle::is_active`], rather than in each
//! record type.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Lifecycle state of a persisted record.
///
/// Serialized as its integer code (`-1..=3`), matching the stored column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum RecordStatus {
    /// Soft-deleted.
    Deleted,
    Inactive,
    #[default]
    Active,
    /// Awaiting approval.
    Pending,
    /// Temporarily disabled.
    Suspended,
}

impl RecordStatus {
    pub fn code(self) -> i8 {
        match self {
            RecordStatus::Deleted => -1,
            RecordStatus::Inactive => 0,
            RecordStatus::Active => 1,
            RecordStatus::Pending => 2,
            RecordStatus::Suspended => 3,
        }
    }

    pub fn is_active(self) -> bool {
        self == RecordStatus::Active
    }

    pub fn is_deleted(self) -> bool {
        self == RecordStatus::Deleted
    }
}

impl TryFrom<i8> for RecordStatus {
    type Error = DomainError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(RecordStatus::Deleted),
            0 => Ok(RecordStatus::Inactive),
            1 => Ok(RecordStatus::Active),
            2 => Ok(RecordStatus::Pending),
            3 => Ok(RecordStatus::Suspended),
            other => Err(DomainError::InvalidStatus(other.into())),
        }
    }
}

impl From<RecordStatus> for i8 {
    fn from(value: RecordStatus) -> Self {
        value.code()
    }
}

impl core::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RecordStatus::Deleted => write!(f, "Deleted"),
            RecordStatus::Inactive => write!(f, "Inactive"),
            RecordStatus::Active => write!(f, "Active"),
            RecordStatus::Pending => write!(f, "Pending"),
            RecordStatus::Suspended => write!(f, "Suspended"),
        }
    }
}

/// Any record carrying a [`RecordStatus`].
pub trait Lifecycle {
    fn status(&self) -> RecordStatus;

    /// Whether the record participates in authorization decisions.
    fn is_active(&self) -> bool {
        self.status().is_active()
    }
}

impl Lifecycle for RecordStatus {
    fn status(&self) -> RecordStatus {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for status in [
            RecordStatus::Deleted,
            RecordStatus::Inactive,
            RecordStatus::Active,
            RecordStatus::Pending,
            RecordStatus::Suspended,
        ] {
            assert_eq!(RecordStatus::try_from(status.code()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert_eq!(
            RecordStatus::try_from(7),
            Err(DomainError::InvalidStatus(7))
        );
    }

    #[test]
    fn serializes_as_integer() {
        assert_eq!(serde_json::to_string(&RecordStatus::Deleted).unwrap(), "-1");
        let parsed: RecordStatus = serde_json::from_str("3").unwrap();
        assert_eq!(parsed, RecordStatus::Suspended);
        assert!(serde_json::from_str::<RecordStatus>("9").is_err());
    }

    #[test]
    fn only_active_is_active() {
        assert!(RecordStatus::Active.is_active());
        assert!(!RecordStatus::Pending.is_active());
        assert!(!RecordStatus::Suspended.is_active());
        assert!(!RecordStatus::Deleted.is_active());
    }
}
