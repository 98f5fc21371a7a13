// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter};

use cmip_replica_core::ExitCode;
use cmip_replica_store::StoreError;

pub type StatsResult<T> = Result<T, StatsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StatsErrorCode {
    Io,
    Parse,
    Store,
    Validation,
}

impl StatsErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Io => "io_error",
            Self::Parse => "parse_error",
            Self::Store => "store_error",
            Self::Validation => "validation_error",
        }
    }

    #[must_use]
    pub const fn as_exit_code(self) -> ExitCode {
        match self {
            Self::Io | Self::Store => ExitCode::DependencyFailure,
            Self::Parse | Self::Validation => ExitCode::Validation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsError {
    pub code: StatsErrorCode,
    pub message: String,
}

impl StatsError {
    #[must_use]
    pub fn new(code: StatsErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl Display for StatsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for StatsError {}

impl From<std::io::Error> for StatsError {
    fn from(value: std::io::Error) -> Self {
        Self::new(StatsErrorCode::Io, value.to_string())
    }
}

impl From<serde_json::Error> for StatsError {
    fn from(value: serde_json::Error) -> Self {
        Self::new(StatsErrorCode::Parse, value.to_string())
    }
}

impl From<StoreError> for StatsError {
    fn from(value: StoreError) -> Self {
        Self::new(StatsErrorCode::Store, value.to_string())
    }
}
