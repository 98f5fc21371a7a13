// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::error::{SearchError, SearchErrorCode, SearchResult};

/// Cursor into the sequential listing of retracted datasets, persisted as the bare decimal value.
#[derive(Debug, Clone)]
pub struct OffsetTracker {
    path: PathBuf,
    loaded: Option<u64>,
}

impl OffsetTracker {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loaded: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value in the cursor file, or 0 when it is missing or unreadable.
    pub fn get_starting_offset(&mut self) -> u64 {
        match read_offset(&self.path) {
            Ok(offset) => {
                info!(offset, path = %self.path.display(), "loaded starting offset");
                self.loaded = Some(offset);
                offset
            }
            Err(err) => {
                error!(path = %self.path.display(), error = %err, "cannot read starting offset, using 0");
                0
            }
        }
    }

    pub fn save_starting_offset(&mut self, offset: u64) -> SearchResult<()> {
        if let Some(loaded) = self.loaded {
            if offset < loaded {
                return Err(SearchError::new(
                    SearchErrorCode::Validation,
                    format!("refusing to move cursor back from {loaded} to {offset}"),
                ));
            }
        }
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                SearchError::new(SearchErrorCode::Validation, "cursor path has no file name")
            })?;
        let tmp = self.path.with_file_name(format!(".{file_name}.tmp"));
        {
            let mut f = fs::File::create(&tmp)?;
            write!(f, "{offset}")?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        self.loaded = Some(offset);
        info!(offset, "saved starting offset");
        Ok(())
    }
}

fn read_offset(path: &Path) -> SearchResult<u64> {
    let raw = fs::read_to_string(path)?;
    let first = raw.lines().next().unwrap_or_default().trim();
    first.parse::<u64>().map_err(|e| {
        SearchError::new(
            SearchErrorCode::Parse,
            format!("cursor `{first}` is not an integer: {e}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_garbage_cursor_starts_at_zero() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut missing = OffsetTracker::new(dir.path().join("absent"));
        assert_eq!(missing.get_starting_offset(), 0);

        let garbage = dir.path().join("garbage");
        fs::write(&garbage, "forty\n").expect("write");
        assert_eq!(OffsetTracker::new(garbage).get_starting_offset(), 0);
    }

    #[test]
    fn saved_cursor_is_read_back_and_never_regresses() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("CMIP6_Nretracted");
        fs::write(&path, "4200\nignored\n").expect("seed");

        let mut tracker = OffsetTracker::new(&path);
        assert_eq!(tracker.get_starting_offset(), 4200);
        tracker.save_starting_offset(4500).expect("advance");
        assert_eq!(fs::read_to_string(&path).expect("read"), "4500");

        let err = tracker.save_starting_offset(10).expect_err("regression");
        assert_eq!(err.code, SearchErrorCode::Validation);
        assert_eq!(OffsetTracker::new(&path).get_starting_offset(), 4500);
    }
}
