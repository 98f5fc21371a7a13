// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter};

use cmip_replica_core::ExitCode;

pub type SearchResult<T> = Result<T, SearchError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SearchErrorCode {
    Network,
    HttpStatus,
    Parse,
    /// The index declared more results than one response carried.
    Overflow,
    Validation,
    Io,
}

impl SearchErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network_error",
            Self::HttpStatus => "http_status",
            Self::Parse => "parse_error",
            Self::Overflow => "num_found_overflow",
            Self::Validation => "validation_error",
            Self::Io => "io_error",
        }
    }

    #[must_use]
    pub const fn as_exit_code(self) -> ExitCode {
        match self {
            Self::Network | Self::HttpStatus | Self::Parse | Self::Io => {
                ExitCode::DependencyFailure
            }
            Self::Overflow | Self::Validation => ExitCode::Validation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchError {
    pub code: SearchErrorCode,
    pub message: String,
}

impl SearchError {
    #[must_use]
    pub fn new(code: SearchErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn overflow(num_found: u64, retrieved: usize, constraints: &str) -> Self {
        Self::new(
            SearchErrorCode::Overflow,
            format!("numFound={num_found} > retrieved={retrieved} for constraints `{constraints}`"),
        )
    }

    #[must_use]
    pub fn is_overflow(&self) -> bool {
        self.code == SearchErrorCode::Overflow
    }
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for SearchError {}

impl From<std::io::Error> for SearchError {
    fn from(value: std::io::Error) -> Self {
        Self::new(SearchErrorCode::Io, value.to_string())
    }
}
