// SPDX-License-Identifier: Apache-2.0

//! Synda 3.35 leaves a dataset `empty` after all of its files arrive. This flips such
//! datasets to `complete`.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use tracing::info;

use crate::error::StoreResult;

/// Only datasets created after this date are considered.
pub const DEFAULT_CREATED_AFTER: &str = "2023-07-27";

const LATEST_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const COMPLETED_DATASETS: &str = "
    SELECT f.dataset_id FROM file AS f
    INNER JOIN dataset AS d ON f.dataset_id=d.dataset_id
    WHERE d.crea_date>?1 AND d.status='empty'
    GROUP BY f.dataset_id
    HAVING COUNT(*) = COUNT(CASE WHEN f.status = 'done' THEN 1 END)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionReport {
    pub eligible: u64,
    pub updated: usize,
    pub dry_run: bool,
}

pub fn mark_completed_datasets(
    conn: &mut Connection,
    created_after: &str,
    dry_run: bool,
    now: NaiveDateTime,
) -> StoreResult<CompletionReport> {
    let eligible: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM dataset WHERE dataset_id IN ({COMPLETED_DATASETS})"),
        params![created_after],
        |row| row.get(0),
    )?;
    info!(eligible, created_after, "datasets to be marked complete");

    let mut updated = 0;
    if !dry_run {
        let latest_date = now.format(LATEST_DATE_FORMAT).to_string();
        let tx = conn.transaction()?;
        updated = tx.execute(
            &format!(
                "UPDATE dataset SET status='complete', latest_date=?2 \
                 WHERE dataset_id IN ({COMPLETED_DATASETS})"
            ),
            params![created_after, latest_date],
        )?;
        tx.commit()?;
        info!(updated, "datasets marked complete");
    }
    Ok(CompletionReport {
        eligible: eligible.max(0) as u64,
        updated,
        dry_run,
    })
}
