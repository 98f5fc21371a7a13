// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cmip_replica_core::{DatasetFunctionalId, SuffixToken};
use cmip_replica_store::{
    list_data_nodes, open_tracking_store, Reconciler, StoreErrorCode, COMMIT_BATCH_ROWS,
};
use rusqlite::{params, Connection};
use tempfile::{tempdir, TempDir};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

const TAS_V1: &str = "CMIP6.CMIP.NCAR.CESM2.historical.r1i1p1f1.Amon.tas.gn.v20190308";
const TAS_V2: &str = "CMIP6.CMIP.NCAR.CESM2.historical.r1i1p1f1.Amon.tas.gn.v20200101";
const PR_V1: &str = "CMIP6.CMIP.NCAR.CESM2.historical.r1i1p1f1.Amon.pr.gn.v20190308";

fn fixture_db() -> (TempDir, PathBuf) {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("sdt.db");
    let conn = Connection::open(&path).expect("create db");
    conn.execute_batch(
        "
        CREATE TABLE dataset (
          dataset_id INTEGER PRIMARY KEY,
          dataset_functional_id TEXT NOT NULL,
          path_without_version TEXT NOT NULL,
          status TEXT NOT NULL,
          crea_date TEXT,
          latest_date TEXT
        );
        CREATE TABLE file (
          file_id INTEGER PRIMARY KEY,
          dataset_id INTEGER NOT NULL,
          status TEXT NOT NULL,
          filename TEXT NOT NULL,
          size INTEGER,
          data_node TEXT
        );
        ",
    )
    .expect("schema");
    (dir, path)
}

fn add_dataset(conn: &Connection, id: i64, fid: &str, status: &str) {
    let path = fid.rsplit_once('.').map_or(fid, |(p, _)| p);
    conn.execute(
        "INSERT INTO dataset (dataset_id, dataset_functional_id, path_without_version, status, crea_date)
         VALUES (?1, ?2, ?3, ?4, '2024-01-01')",
        params![id, fid, path, status],
    )
    .expect("insert dataset");
}

fn add_file(conn: &Connection, file_id: i64, dataset_id: i64, status: &str) {
    conn.execute(
        "INSERT INTO file (file_id, dataset_id, status, filename, size, data_node)
         VALUES (?1, ?2, ?3, ?4, 1000, 'esgf-data.ucar.edu')",
        params![file_id, dataset_id, status, format!("f{file_id}.nc")],
    )
    .expect("insert file");
}

fn file_status(path: &Path, file_id: i64) -> String {
    let conn = Connection::open(path).expect("open");
    conn.query_row(
        "SELECT status FROM file WHERE file_id=?1",
        params![file_id],
        |r| r.get(0),
    )
    .expect("file status")
}

fn dataset_status(path: &Path, fid: &str) -> String {
    let conn = Connection::open(path).expect("open");
    conn.query_row(
        "SELECT status FROM dataset WHERE dataset_functional_id=?1",
        params![fid],
        |r| r.get(0),
    )
    .expect("dataset status")
}

fn reconciler(path: &Path) -> Reconciler {
    Reconciler::open(path, SuffixToken::default()).expect("reconciler")
}

#[test]
fn retraction_rewrites_files_by_rule_and_appends_to_dataset() {
    let (_dir, path) = fixture_db();
    {
        let conn = Connection::open(&path).expect("open");
        add_dataset(&conn, 1, TAS_V1, "complete");
        add_file(&conn, 10, 1, "done");
        add_file(&conn, 11, 1, "published");
        add_file(&conn, 12, 1, "error-checksum");
        add_file(&conn, 13, 1, "waiting");
        add_file(&conn, 14, 1, "done,retracted");
        add_file(&conn, 15, 1, "paused");
    }

    let mut rec = reconciler(&path);
    let changes = rec
        .status_retracted([format!("<str name=\"instance_id\">{TAS_V1}</str>")])
        .expect("reconcile");
    assert_eq!(changes, 1);
    drop(rec);

    assert_eq!(file_status(&path, 10), "done,retracted");
    assert_eq!(file_status(&path, 11), "published,retracted");
    assert_eq!(file_status(&path, 12), "retracted");
    assert_eq!(file_status(&path, 13), "retracted");
    assert_eq!(file_status(&path, 14), "done,retracted");
    assert_eq!(file_status(&path, 15), "paused,retracted");
    assert_eq!(dataset_status(&path, TAS_V1), "complete,retracted");
}

#[test]
fn second_run_changes_nothing() {
    let (_dir, path) = fixture_db();
    {
        let conn = Connection::open(&path).expect("open");
        add_dataset(&conn, 1, TAS_V1, "complete");
        add_file(&conn, 10, 1, "done");
    }
    let mut rec = reconciler(&path);
    assert_eq!(rec.status_retracted([TAS_V1]).expect("first"), 1);
    assert_eq!(rec.status_retracted([TAS_V1]).expect("second"), 0);
    assert_eq!(rec.finish().expect("finish"), 1);
    assert_eq!(file_status(&path, 10), "done,retracted");
    assert_eq!(dataset_status(&path, TAS_V1), "complete,retracted");
}

#[test]
fn running_file_aborts_only_that_dataset_and_rolls_back_its_files() {
    let (_dir, path) = fixture_db();
    {
        let conn = Connection::open(&path).expect("open");
        add_dataset(&conn, 1, PR_V1, "complete");
        add_file(&conn, 20, 1, "done");
        add_dataset(&conn, 2, TAS_V1, "empty");
        add_file(&conn, 30, 2, "done");
        add_file(&conn, 31, 2, "running");
        add_file(&conn, 32, 2, "waiting");
    }

    let mut rec = reconciler(&path);
    let err = rec
        .status_retracted([PR_V1, TAS_V1])
        .expect_err("running file must abort");
    assert_eq!(err.code, StoreErrorCode::Conflict);
    assert!(err.is_transient());
    drop(rec);

    assert_eq!(dataset_status(&path, PR_V1), "complete,retracted");
    assert_eq!(file_status(&path, 20), "done,retracted");
    assert_eq!(file_status(&path, 30), "done");
    assert_eq!(file_status(&path, 31), "running");
    assert_eq!(dataset_status(&path, TAS_V1), "empty");
}

#[test]
fn unknown_dataset_is_left_alone() {
    let (_dir, path) = fixture_db();
    let mut rec = reconciler(&path);
    let id = DatasetFunctionalId::new(TAS_V1).expect("id");
    let outcome = rec.retract_dataset(&id).expect("retract");
    assert!(!outcome.known);
    assert_eq!(outcome.files_rewritten, 0);
    assert_eq!(rec.finish().expect("finish"), 0);
}

#[test]
fn dataset_without_files_still_gets_marked() {
    let (_dir, path) = fixture_db();
    {
        let conn = Connection::open(&path).expect("open");
        add_dataset(&conn, 1, TAS_V1, "empty");
        add_dataset(&conn, 2, TAS_V2, "complete");
    }
    let mut rec = reconciler(&path);
    let outcome = rec
        .retract_dataset(&DatasetFunctionalId::new(TAS_V1).expect("id"))
        .expect("retract");
    assert!(outcome.known);
    assert!(outcome.dataset_rewritten);
    rec.finish().expect("finish");
    assert_eq!(dataset_status(&path, TAS_V1), "empty,retracted");
    assert_eq!(dataset_status(&path, TAS_V2), "complete");
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl<'a> MakeWriter<'a> for SharedBuffer {
    type Writer = BufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        BufferWriter(Arc::clone(&self.0))
    }
}

impl io::Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "lock poisoned"))?;
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Retracts `TAS_V1` (which has no files) and returns the captured log text.
fn retract_without_files(path: &Path) -> String {
    let sink = SharedBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(sink.clone())
        .with_ansi(false)
        .with_max_level(Level::WARN)
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        let mut rec = reconciler(path);
        rec.retract_dataset(&DatasetFunctionalId::new(TAS_V1).expect("id"))
            .expect("retract");
        rec.finish().expect("finish");
    });
    let bytes = sink.0.lock().expect("lock output").clone();
    String::from_utf8(bytes).expect("utf8 log output")
}

const NO_NEWER_VERSION: &str = "dataset is retracted but there is no newer version";

#[test]
fn empty_dataset_without_newer_version_is_warned_about() {
    let (_dir, path) = fixture_db();
    {
        let conn = Connection::open(&path).expect("open");
        add_dataset(&conn, 1, TAS_V1, "empty");
        add_dataset(&conn, 3, PR_V1, "complete");
        add_file(&conn, 30, 3, "done");
    }
    let logs = retract_without_files(&path);
    assert!(logs.contains(NO_NEWER_VERSION), "missing warning in: {logs}");
    assert!(logs.contains(TAS_V1));
    assert_eq!(dataset_status(&path, TAS_V1), "empty,retracted");
    assert_eq!(dataset_status(&path, PR_V1), "complete");
    assert_eq!(file_status(&path, 30), "done");
}

#[test]
fn empty_dataset_with_newer_version_is_not_warned_about() {
    let (_dir, path) = fixture_db();
    {
        let conn = Connection::open(&path).expect("open");
        add_dataset(&conn, 1, TAS_V1, "empty");
        add_dataset(&conn, 2, TAS_V2, "complete");
        add_file(&conn, 20, 2, "done");
    }
    let logs = retract_without_files(&path);
    assert!(!logs.contains(NO_NEWER_VERSION), "unexpected warning in: {logs}");
    assert_eq!(dataset_status(&path, TAS_V1), "empty,retracted");
    assert_eq!(dataset_status(&path, TAS_V2), "complete");
    assert_eq!(file_status(&path, 20), "done");
}

#[test]
fn dataset_rule_skips_statuses_mentioning_the_suffix() {
    let (_dir, path) = fixture_db();
    {
        let conn = Connection::open(&path).expect("open");
        add_dataset(&conn, 1, TAS_V1, "retracted,complete");
        add_file(&conn, 10, 1, "done");
    }
    let mut rec = reconciler(&path);
    assert_eq!(rec.status_retracted([TAS_V1]).expect("run"), 0);
    drop(rec);
    assert_eq!(dataset_status(&path, TAS_V1), "retracted,complete");
    assert_eq!(file_status(&path, 10), "done,retracted");
}

#[test]
fn large_datasets_commit_in_batches() {
    let (_dir, path) = fixture_db();
    {
        let mut conn = Connection::open(&path).expect("open");
        let tx = conn.transaction().expect("tx");
        add_dataset(&tx, 1, TAS_V1, "complete");
        for i in 0..(COMMIT_BATCH_ROWS as i64 + 20) {
            add_file(&tx, 1000 + i, 1, "done");
        }
        tx.commit().expect("commit");
    }
    let mut rec = reconciler(&path);
    rec.retract_dataset(&DatasetFunctionalId::new(TAS_V1).expect("id"))
        .expect("retract");
    assert!(
        rec.connection().is_autocommit(),
        "a batch over the threshold is committed immediately"
    );
    let other = Connection::open(&path).expect("second connection");
    let marked: i64 = other
        .query_row(
            "SELECT COUNT(*) FROM file WHERE status='done,retracted'",
            [],
            |r| r.get(0),
        )
        .expect("count");
    assert_eq!(marked, COMMIT_BATCH_ROWS as i64 + 20);
}

#[test]
fn files_retracted_matches_by_filename() {
    let (_dir, path) = fixture_db();
    {
        let conn = Connection::open(&path).expect("open");
        add_dataset(&conn, 1, TAS_V1, "complete");
        add_file(&conn, 10, 1, "done");
        add_file(&conn, 11, 1, "error");
    }
    let mut rec = reconciler(&path);
    assert_eq!(
        rec.files_retracted(["f10.nc", "", "f11.nc"]).expect("files"),
        2
    );
    let err = rec
        .files_retracted(["missing.nc"])
        .expect_err("unknown filename");
    assert_eq!(err.code, StoreErrorCode::Validation);
    drop(rec);
    assert_eq!(file_status(&path, 10), "done,retracted");
    assert_eq!(file_status(&path, 11), "retracted");
    assert_eq!(dataset_status(&path, TAS_V1), "complete");
}

#[test]
fn custom_suffix_is_applied() {
    let (_dir, path) = fixture_db();
    {
        let conn = Connection::open(&path).expect("open");
        add_dataset(&conn, 1, TAS_V1, "complete");
        add_file(&conn, 10, 1, "published");
    }
    let mut rec =
        Reconciler::open(&path, SuffixToken::new("withdrawn").expect("suffix")).expect("open");
    rec.status_retracted([TAS_V1]).expect("run");
    drop(rec);
    assert_eq!(file_status(&path, 10), "published,withdrawn");
    assert_eq!(dataset_status(&path, TAS_V1), "complete,withdrawn");
}

#[test]
fn lock_contention_surfaces_as_transient_locked_error() {
    let (_dir, path) = fixture_db();
    {
        let conn = Connection::open(&path).expect("open");
        add_dataset(&conn, 1, TAS_V1, "complete");
        add_file(&conn, 10, 1, "done");
    }
    let holder = Connection::open(&path).expect("holder");
    holder.execute_batch("BEGIN EXCLUSIVE").expect("exclusive lock");

    let conn = Connection::open(&path).expect("contender");
    conn.busy_timeout(Duration::from_millis(50)).expect("timeout");
    let mut rec = Reconciler::from_connection(conn, SuffixToken::default());
    let err = rec
        .retract_dataset(&DatasetFunctionalId::new(TAS_V1).expect("id"))
        .expect_err("locked store");
    assert_eq!(err.code, StoreErrorCode::Locked);
    assert!(err.is_transient());

    holder.execute_batch("ROLLBACK").expect("release");
}

#[test]
fn data_nodes_are_listed_from_live_store() {
    let (_dir, path) = fixture_db();
    {
        let conn = Connection::open(&path).expect("open");
        add_dataset(&conn, 1, TAS_V1, "complete");
        add_file(&conn, 10, 1, "done");
    }
    let conn = open_tracking_store(&path).expect("open");
    assert_eq!(
        list_data_nodes(&conn).expect("nodes"),
        vec!["esgf-data.ucar.edu".to_string()]
    );
}
