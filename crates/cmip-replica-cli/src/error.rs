// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter};

use cmip_replica_core::ExitCode;
use cmip_replica_search::SearchError;
use cmip_replica_stats::StatsError;
use cmip_replica_store::StoreError;

/// Failure of one command, carrying the process exit code it maps to.
#[derive(Debug)]
pub struct CliError {
    pub exit: ExitCode,
    pub message: String,
}

impl CliError {
    pub fn new(exit: ExitCode, message: impl Into<String>) -> Self {
        Self {
            exit,
            message: message.into(),
        }
    }

    pub fn missing_input(what: &str, path: &std::path::Path) -> Self {
        Self::new(
            ExitCode::Validation,
            format!("{what} `{}` does not exist", path.display()),
        )
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.exit.as_str())
    }
}

impl std::error::Error for CliError {}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        Self::new(value.code.as_exit_code(), value.to_string())
    }
}

impl From<SearchError> for CliError {
    fn from(value: SearchError) -> Self {
        Self::new(value.code.as_exit_code(), value.to_string())
    }
}

impl From<StatsError> for CliError {
    fn from(value: StatsError) -> Self {
        Self::new(value.code.as_exit_code(), value.to_string())
    }
}

impl From<cmip_replica_core::Error> for CliError {
    fn from(value: cmip_replica_core::Error) -> Self {
        Self::new(ExitCode::Validation, value.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::new(ExitCode::DependencyFailure, value.to_string())
    }
}
