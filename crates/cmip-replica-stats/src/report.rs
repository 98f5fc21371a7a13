// SPDX-License-Identifier: Apache-2.0

//! `synda queue` sections of the weekly reports log.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{StatsError, StatsErrorCode, StatsResult};
use crate::model::{SizeValue, StatusHistory, StatusSnapshot, StatusTotals};

pub const DEFAULT_REPORT_LOG: &str = "/var/log/synda/reports.log";
pub const QUEUE_STATS_FILE_NAME: &str = "synda_queue_stats.json";

const SECTION: &str = r"(?sm)(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z)\nsynda queue\n(.*?)status\s+count\s+size\n(.*?)/scripts/synda-perf.py";
const ROW: &str = r"(?sm)(.*?)\s+(.*?)\s+(.*? (?:Byte|Bytes|kB|MB|GB|TB|PB|EB|ZB|YB))\n";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub synda_queue_stats: StatusHistory,
}

fn compile(expr: &str) -> StatsResult<Regex> {
    Regex::new(expr).map_err(|e| StatsError::new(StatsErrorCode::Parse, e.to_string()))
}

pub fn parse_report_log(text: &str) -> StatsResult<QueueStats> {
    let section = compile(SECTION)?;
    let row = compile(ROW)?;
    let mut stats = QueueStats::default();
    for caps in section.captures_iter(text) {
        let timestamp = caps.get(1).map_or("", |m| m.as_str());
        let body = caps.get(3).map_or("", |m| m.as_str());
        let mut snapshot = StatusSnapshot::new();
        for r in row.captures_iter(body) {
            let status = r.get(1).map_or("", |m| m.as_str()).trim();
            let count = r.get(2).map_or("", |m| m.as_str());
            let size = r.get(3).map_or("", |m| m.as_str());
            let file_count = count.parse::<u64>().map_err(|e| {
                StatsError::new(
                    StatsErrorCode::Parse,
                    format!("{timestamp}: count `{count}` for `{status}`: {e}"),
                )
            })?;
            snapshot.insert(
                status.to_string(),
                StatusTotals {
                    file_count,
                    size: Some(SizeValue::Human(size.to_string())),
                },
            );
        }
        stats.synda_queue_stats.insert(timestamp.to_string(), snapshot);
    }
    info!(sections = stats.synda_queue_stats.len(), "report log parsed");
    Ok(stats)
}
