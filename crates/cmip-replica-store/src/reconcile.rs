// SPDX-License-Identifier: Apache-2.0

//! Marks retracted datasets and their files in the tracking database.

use std::fs;
use std::path::Path;

use cmip_replica_core::{
    dataset_transition, file_transition, parse_identifier_line, DatasetFunctionalId, Status,
    SuffixToken, Transition,
};
use rusqlite::{params, Connection};
use tracing::{debug, error, info, warn};

use crate::connection::open_tracking_store;
use crate::error::{StoreError, StoreErrorCode, StoreResult};

/// Row updates allowed to accumulate before an intermediate commit.
pub const COMMIT_BATCH_ROWS: usize = 100;

const DATASET_SAVEPOINT: &str = "retract_dataset";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatasetOutcome {
    /// The dataset has a row in the `dataset` table.
    pub known: bool,
    pub files_rewritten: usize,
    pub dataset_rewritten: bool,
}

impl DatasetOutcome {
    fn rows(&self) -> usize {
        self.files_rewritten + usize::from(self.dataset_rewritten)
    }
}

/// Owns one tracking-store connection plus the batch and change counters.
pub struct Reconciler {
    conn: Connection,
    suffix: SuffixToken,
    pending_rows: usize,
    changes: u64,
}

impl Reconciler {
    pub fn open(path: &Path, suffix: SuffixToken) -> StoreResult<Self> {
        Ok(Self::from_connection(open_tracking_store(path)?, suffix))
    }

    #[must_use]
    pub fn from_connection(conn: Connection, suffix: SuffixToken) -> Self {
        Self {
            conn,
            suffix,
            pending_rows: 0,
            changes: 0,
        }
    }

    #[must_use]
    pub fn suffix(&self) -> &SuffixToken {
        &self.suffix
    }

    /// Datasets newly marked since this reconciler was created.
    #[must_use]
    pub fn changes(&self) -> u64 {
        self.changes
    }

    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Reconciles every dataset named in `lines` and commits.
    ///
    /// Returns how many datasets this call newly marked. The first failing dataset stops
    /// the run; datasets finished before it stay committed.
    pub fn status_retracted<I, S>(&mut self, lines: I) -> StoreResult<u64>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let before = self.changes;
        for line in lines {
            let Some(raw) = parse_identifier_line(line.as_ref()) else {
                continue;
            };
            let dataset = match DatasetFunctionalId::new(raw) {
                Ok(dataset) => dataset,
                Err(err) => {
                    warn!(error = %err, "skipping unparsable dataset line");
                    continue;
                }
            };
            if let Err(err) = self.retract_dataset(&dataset) {
                error!(dataset = %dataset, error = %err, "status_retracted stopped");
                if let Err(commit_err) = self.commit() {
                    warn!(error = %commit_err, "could not commit finished datasets");
                }
                return Err(err);
            }
        }
        self.commit()?;
        let newly = self.changes - before;
        info!(
            changes = newly,
            suffix = self.suffix.as_str(),
            "datasets newly marked"
        );
        Ok(newly)
    }

    pub fn status_retracted_from_file(&mut self, path: &Path) -> StoreResult<u64> {
        info!(path = %path.display(), "reading list of retracted datasets");
        let raw = fs::read_to_string(path)?;
        let newly = self.status_retracted(raw.lines())?;
        info!(path = %path.display(), "finished processing retracted datasets");
        Ok(newly)
    }

    /// Marks one dataset and all its files.
    ///
    /// A failure on any file rolls back this dataset's file updates and leaves the dataset
    /// row untouched, so a later run picks it up again.
    pub fn retract_dataset(&mut self, dataset: &DatasetFunctionalId) -> StoreResult<DatasetOutcome> {
        self.begin()?;
        self.conn
            .execute_batch(&format!("SAVEPOINT {DATASET_SAVEPOINT}"))?;
        match self.retract_dataset_rows(dataset) {
            Ok(outcome) => {
                self.conn
                    .execute_batch(&format!("RELEASE {DATASET_SAVEPOINT}"))?;
                self.pending_rows += outcome.rows();
                if outcome.dataset_rewritten {
                    self.changes += 1;
                }
                if self.pending_rows >= COMMIT_BATCH_ROWS {
                    self.commit()?;
                }
                Ok(outcome)
            }
            Err(err) => {
                error!(
                    dataset = %dataset,
                    error = %err,
                    "couldn't finish changing the status of dataset"
                );
                if let Err(rollback_err) = self.conn.execute_batch(&format!(
                    "ROLLBACK TO {DATASET_SAVEPOINT}; RELEASE {DATASET_SAVEPOINT}"
                )) {
                    warn!(error = %rollback_err, "rollback to dataset savepoint failed");
                }
                Err(err)
            }
        }
    }

    /// Marks a single file by id. Returns whether its status was rewritten.
    pub fn retract_file(&mut self, file_id: i64) -> StoreResult<bool> {
        self.begin()?;
        let rewritten = self.rewrite_file_status(file_id)?;
        if rewritten {
            self.pending_rows += 1;
            if self.pending_rows >= COMMIT_BATCH_ROWS {
                self.commit()?;
            }
        }
        Ok(rewritten)
    }

    /// Marks files named one per line. Each name must match exactly one record.
    pub fn files_retracted<I, S>(&mut self, filenames: I) -> StoreResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rewritten = 0;
        for line in filenames {
            let filename = line.as_ref().trim();
            if filename.is_empty() {
                continue;
            }
            let ids = self.query_i64s("SELECT file_id FROM file WHERE filename=?1", filename)?;
            let [file_id] = ids.as_slice() else {
                return Err(StoreError::new(
                    StoreErrorCode::Validation,
                    format!("filename {filename} matches {} records, expected 1", ids.len()),
                ));
            };
            if self.retract_file(*file_id)? {
                rewritten += 1;
            }
        }
        self.commit()?;
        Ok(rewritten)
    }

    pub fn commit(&mut self) -> StoreResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
            debug!(rows = self.pending_rows, "committed batch");
        }
        self.pending_rows = 0;
        Ok(())
    }

    /// Commits outstanding work and closes the connection.
    pub fn finish(mut self) -> StoreResult<u64> {
        self.commit()?;
        let changes = self.changes;
        self.conn.close().map_err(|(_, e)| StoreError::from(e))?;
        Ok(changes)
    }

    fn begin(&mut self) -> StoreResult<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    fn retract_dataset_rows(&mut self, dataset: &DatasetFunctionalId) -> StoreResult<DatasetOutcome> {
        let file_ids = self.query_i64s(
            "SELECT file_id FROM file WHERE dataset_id IN \
             (SELECT dataset_id FROM dataset WHERE dataset_functional_id=?1)",
            dataset.as_str(),
        )?;
        if file_ids.is_empty() && !self.check_superseded(dataset)? {
            return Ok(DatasetOutcome::default());
        }

        let mut outcome = DatasetOutcome {
            known: true,
            ..DatasetOutcome::default()
        };
        for file_id in file_ids {
            if self.rewrite_file_status(file_id)? {
                outcome.files_rewritten += 1;
            }
        }

        let statuses = self.query_strings(
            "SELECT status FROM dataset WHERE dataset_functional_id=?1",
            dataset.as_str(),
        )?;
        match statuses.as_slice() {
            [] => {}
            [current] => {
                let current = Status::parse(current);
                if let Transition::Rewrite(next) = dataset_transition(&current, &self.suffix) {
                    self.conn.execute(
                        "UPDATE dataset SET status=?1 WHERE dataset_functional_id=?2",
                        params![next.to_legacy_string(), dataset.as_str()],
                    )?;
                    info!(
                        dataset = %dataset,
                        from = %current,
                        to = %next,
                        "dataset status changed"
                    );
                    outcome.dataset_rewritten = true;
                }
            }
            many => {
                return Err(StoreError::new(
                    StoreErrorCode::Validation,
                    format!("dataset {dataset} has {} rows", many.len()),
                ))
            }
        }
        Ok(outcome)
    }

    /// Called when a dataset has no files. Returns whether the dataset row exists, and warns
    /// when it is the newest version we hold: upstream retracted it without a replacement.
    fn check_superseded(&self, dataset: &DatasetFunctionalId) -> StoreResult<bool> {
        let paths = self.query_strings(
            "SELECT path_without_version FROM dataset WHERE dataset_functional_id=?1",
            dataset.as_str(),
        )?;
        let path_without_version = match paths.as_slice() {
            [] => return Ok(false),
            [path] => path,
            many => {
                return Err(StoreError::new(
                    StoreErrorCode::Validation,
                    format!("dataset {dataset} has {} rows", many.len()),
                ))
            }
        };
        let siblings = self.query_strings(
            "SELECT dataset_functional_id FROM dataset WHERE path_without_version=?1",
            path_without_version,
        )?;
        let version = dataset.version_token();
        let mut same_version_exists = false;
        let mut newer_version_exists = false;
        for sibling in &siblings {
            if sibling == dataset.as_str() {
                same_version_exists = true;
            }
            let sibling_version = sibling.rsplit_once('.').map_or(sibling.as_str(), |(_, v)| v);
            if sibling_version > version {
                newer_version_exists = true;
            }
        }
        if same_version_exists && !newer_version_exists {
            warn!(dataset = %dataset, "dataset is retracted but there is no newer version");
        }
        Ok(true)
    }

    fn rewrite_file_status(&self, file_id: i64) -> StoreResult<bool> {
        let current: String = self
            .conn
            .query_row(
                "SELECT status FROM file WHERE file_id=?1",
                params![file_id],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::new(
                    StoreErrorCode::NotFound,
                    format!("file {file_id} not found"),
                ),
                other => StoreError::from(other),
            })?;
        let current = Status::parse(&current);
        match file_transition(&current, &self.suffix)? {
            Transition::Unchanged => Ok(false),
            Transition::Rewrite(next) => {
                self.conn.execute(
                    "UPDATE file SET status=?1 WHERE file_id=?2",
                    params![next.to_legacy_string(), file_id],
                )?;
                debug!(file_id, from = %current, to = %next, "file status changed");
                Ok(true)
            }
        }
    }

    fn query_i64s(&self, sql: &str, param: &str) -> StoreResult<Vec<i64>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params![param], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn query_strings(&self, sql: &str, param: &str) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params![param], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
