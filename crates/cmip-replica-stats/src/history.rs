// SPDX-License-Identifier: Apache-2.0

//! Per-status totals across a series of tracking store backups.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cmip_replica_store::{open_snapshot, status_counts};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{StatsError, StatsErrorCode, StatsResult};
use crate::model::{write_pretty_json, SizeValue, StatusHistory, StatusSnapshot, StatusTotals};

pub const HISTORY_FILE_NAME: &str = "db_status_history.json";

/// Reads a `{timestamp: db path}` listing of store backups.
pub fn load_snapshot_list(path: &Path) -> StatsResult<BTreeMap<String, PathBuf>> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn read_snapshot(db: &Path) -> StatsResult<StatusSnapshot> {
    let conn = open_snapshot(db)?;
    Ok(status_counts(&conn)?
        .into_iter()
        .map(|c| {
            (
                c.status,
                StatusTotals {
                    file_count: c.file_count,
                    size: c.size.map(SizeValue::Bytes),
                },
            )
        })
        .collect())
}

/// Aggregates every snapshot on a pool of `workers` threads.
///
/// Each snapshot also lands in `<out_dir>/<db file name>.json` as soon as it is read, so an
/// interrupted run keeps what it finished. Unreadable snapshots are skipped.
pub fn collect_status_history(
    snapshots: &BTreeMap<String, PathBuf>,
    out_dir: &Path,
    workers: usize,
) -> StatsResult<StatusHistory> {
    fs::create_dir_all(out_dir)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| StatsError::new(StatsErrorCode::Validation, e.to_string()))?;

    let entries: Vec<(&String, &PathBuf)> = snapshots.iter().collect();
    let collected: Vec<Option<(String, StatusSnapshot)>> = pool.install(|| {
        entries
            .into_par_iter()
            .map(|(timestamp, db)| collect_one(timestamp, db, out_dir))
            .collect()
    });

    let history: StatusHistory = collected.into_iter().flatten().collect();
    write_pretty_json(&out_dir.join(HISTORY_FILE_NAME), &history)?;
    info!(snapshots = history.len(), out_dir = %out_dir.display(), "status history written");
    Ok(history)
}

fn collect_one(timestamp: &str, db: &Path, out_dir: &Path) -> Option<(String, StatusSnapshot)> {
    if !db.is_file() {
        warn!(db = %db.display(), "not a file, skipping");
        return None;
    }
    let snapshot = match read_snapshot(db) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(db = %db.display(), error = %err, "cannot read snapshot, skipping");
            return None;
        }
    };
    let name = db
        .file_name()
        .map_or_else(|| timestamp.to_string(), |n| n.to_string_lossy().into_owned());
    let mut single = StatusHistory::new();
    single.insert(timestamp.to_string(), snapshot.clone());
    if let Err(err) = write_pretty_json(&out_dir.join(format!("{name}.json")), &single) {
        warn!(db = %db.display(), error = %err, "cannot write snapshot totals");
    }
    info!(timestamp, statuses = snapshot.len(), "snapshot aggregated");
    Some((timestamp.to_string(), snapshot))
}
