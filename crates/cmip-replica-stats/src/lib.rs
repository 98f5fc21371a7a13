// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod error;
mod history;
mod model;
mod process;
mod report;

pub const CRATE_NAME: &str = "cmip-replica-stats";

pub use error::{StatsError, StatsErrorCode, StatsResult};
pub use history::{collect_status_history, load_snapshot_list, read_snapshot, HISTORY_FILE_NAME};
pub use model::{
    to_pretty_json, write_pretty_json, SizeValue, StatusHistory, StatusSnapshot, StatusTotals,
};
pub use process::{
    db_status_files, process_db_status_files, status_remap, DB_STATUS_STATS_FILE_NAME,
};
pub use report::{parse_report_log, QueueStats, DEFAULT_REPORT_LOG, QUEUE_STATS_FILE_NAME};
