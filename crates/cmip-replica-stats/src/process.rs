// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cmip_replica_core::{bytes_to_human, human_to_bytes};
use tracing::{info, warn};

use crate::error::StatsResult;
use crate::model::{SizeValue, StatusHistory, StatusSnapshot, StatusTotals};

pub const DB_STATUS_STATS_FILE_NAME: &str = "db_status_stats.json";

const KEPT_STATUSES: [&str; 6] = ["done", "error", "published", "retracted", "waiting", "running"];

/// Folds the long tail of historical statuses into a handful of buckets.
#[must_use]
pub fn status_remap(status: &str) -> &str {
    if KEPT_STATUSES.iter().any(|kept| *kept == status) {
        return status;
    }
    if status == "obsolete" || status.starts_with("error-") {
        return "error";
    }
    let tail = status
        .char_indices()
        .rev()
        .nth(9)
        .map_or(status, |(idx, _)| &status[idx..]);
    if ",retracted".contains(tail) {
        "retracted"
    } else {
        "miscellaneous"
    }
}

fn size_in_bytes(size: Option<&SizeValue>) -> u64 {
    match size {
        None => 0,
        Some(SizeValue::Bytes(n)) => *n,
        Some(SizeValue::Human(text)) => human_to_bytes(text).unwrap_or_else(|err| {
            warn!(size = %text, error = %err, "unreadable size counted as 0");
            0
        }),
    }
}

/// `sdt.db*.json` files in `dir`, sorted by name.
pub fn db_status_files(dir: &Path) -> StatsResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with("sdt.db") && name.ends_with(".json") && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Merges per-snapshot status files into one history with human-readable sizes.
///
/// With `remap`, statuses are folded by [`status_remap`] and their counts and sizes summed.
pub fn process_db_status_files(dir: &Path, remap: bool) -> StatsResult<StatusHistory> {
    let mut history = StatusHistory::new();
    for path in db_status_files(dir)? {
        let raw = fs::read_to_string(&path)?;
        let parsed: StatusHistory = serde_json::from_str(&raw)?;
        for (timestamp, snapshot) in parsed {
            history.insert(timestamp, merge_snapshot(snapshot, remap));
        }
    }
    info!(dir = %dir.display(), timestamps = history.len(), remap, "db status files processed");
    Ok(history)
}

fn merge_snapshot(snapshot: StatusSnapshot, remap: bool) -> StatusSnapshot {
    let mut sums: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for (status, totals) in snapshot {
        let key = if remap {
            status_remap(&status).to_string()
        } else {
            status
        };
        let slot = sums.entry(key).or_insert((0, 0));
        slot.0 += totals.file_count;
        slot.1 += size_in_bytes(totals.size.as_ref());
    }
    sums.into_iter()
        .map(|(status, (file_count, bytes))| {
            (
                status,
                StatusTotals {
                    file_count,
                    size: Some(SizeValue::Human(bytes_to_human(bytes))),
                },
            )
        })
        .collect()
}
