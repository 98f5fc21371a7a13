// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter};

use cmip_replica_core::ExitCode;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreErrorCode {
    NotFound,
    Validation,
    /// Another connection holds the database lock past the busy timeout.
    Locked,
    /// A record is in a state this tool must not touch (e.g. `running`).
    Conflict,
    Sqlite,
    Io,
}

impl StoreErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation_error",
            Self::Locked => "database_locked",
            Self::Conflict => "record_conflict",
            Self::Sqlite => "sqlite_error",
            Self::Io => "io_error",
        }
    }

    #[must_use]
    pub const fn as_exit_code(self) -> ExitCode {
        match self {
            Self::NotFound | Self::Validation => ExitCode::Validation,
            Self::Locked | Self::Conflict | Self::Sqlite | Self::Io => ExitCode::DependencyFailure,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub code: StoreErrorCode,
    pub message: String,
}

impl StoreError {
    #[must_use]
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Lock contention and busy records clear up on their own; a later run retries.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self.code, StoreErrorCode::Locked | StoreErrorCode::Conflict)
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        let code = match value.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked) => {
                StoreErrorCode::Locked
            }
            Some(rusqlite::ErrorCode::CannotOpen) => StoreErrorCode::NotFound,
            _ => StoreErrorCode::Sqlite,
        };
        Self::new(code, value.to_string())
    }
}

impl From<cmip_replica_core::Error> for StoreError {
    fn from(value: cmip_replica_core::Error) -> Self {
        let code = match value {
            cmip_replica_core::Error::StatusConflict { .. } => StoreErrorCode::Conflict,
            _ => StoreErrorCode::Validation,
        };
        Self::new(code, value.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::new(StoreErrorCode::Io, value.to_string())
    }
}
