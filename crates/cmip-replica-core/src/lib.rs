// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod config;
mod errors;
mod ids;
mod sizes;
mod status;

pub const CRATE_NAME: &str = "cmip-replica-core";

pub use config::{
    ReplicaConfig, DEFAULT_DATABASE, DEFAULT_LOG_FILE, DEFAULT_OFFSET_FILE, DEFAULT_SEARCH_URL,
    ENV_DATABASE, ENV_LOG_FILE, ENV_LOG_LEVEL, ENV_OFFSET_FILE, ENV_RETRY_DELAY_SECS,
    ENV_SEARCH_URL,
};
pub use errors::{Error, ExitCode, Result};
pub use ids::{parse_identifier_line, DatasetFunctionalId, SuffixToken};
pub use sizes::{bytes_to_human, human_to_bytes};
pub use status::{dataset_transition, file_transition, Status, Transition, DEFAULT_SUFFIX};
