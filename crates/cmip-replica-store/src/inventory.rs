// SPDX-License-Identifier: Apache-2.0

use rusqlite::Connection;

use crate::error::StoreResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCount {
    pub status: String,
    pub file_count: u64,
    /// `None` when every file in the group has a NULL size.
    pub size: Option<u64>,
}

/// Per-status file count and byte total of the `file` table.
pub fn status_counts(conn: &Connection) -> StoreResult<Vec<StatusCount>> {
    let mut stmt =
        conn.prepare("SELECT status, COUNT(*), SUM(size) FROM file GROUP BY status ORDER BY status")?;
    let rows = stmt
        .query_map([], |row| {
            let status: Option<String> = row.get(0)?;
            let file_count: i64 = row.get(1)?;
            let size: Option<i64> = row.get(2)?;
            Ok(StatusCount {
                status: status.unwrap_or_else(|| "null".to_string()),
                file_count: file_count.max(0) as u64,
                size: size.map(|s| s.max(0) as u64),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Data nodes that serve files in the store, least used first.
pub fn list_data_nodes(conn: &Connection) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT data_node FROM file WHERE data_node IS NOT NULL \
         GROUP BY data_node ORDER BY COUNT(*), data_node",
    )?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
