// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};

use crate::error::{StoreError, StoreErrorCode, StoreResult};

/// How long a statement waits for the download manager to release its write lock.
pub const LOCK_WAIT: Duration = Duration::from_secs(200 * 60);

/// Opens the live tracking database for reading and writing. Never creates a file.
pub fn open_tracking_store(path: &Path) -> StoreResult<Connection> {
    open_with(path, OpenFlags::SQLITE_OPEN_READ_WRITE, LOCK_WAIT)
}

/// Opens a database snapshot read-only.
pub fn open_snapshot(path: &Path) -> StoreResult<Connection> {
    open_with(path, OpenFlags::SQLITE_OPEN_READ_ONLY, LOCK_WAIT)
}

pub(crate) fn open_with(
    path: &Path,
    mode: OpenFlags,
    busy_timeout: Duration,
) -> StoreResult<Connection> {
    if !path.is_file() {
        return Err(StoreError::new(
            StoreErrorCode::NotFound,
            format!("tracking database {} does not exist", path.display()),
        ));
    }
    let conn = Connection::open_with_flags(
        path,
        mode | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(busy_timeout)?;
    Ok(conn)
}
