// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cmip_replica_stats::{
    collect_status_history, load_snapshot_list, process_db_status_files, SizeValue,
    StatusTotals, HISTORY_FILE_NAME,
};
use rusqlite::Connection;
use tempfile::tempdir;

fn snapshot_db(path: &Path, rows: &[(&str, i64)]) {
    let conn = Connection::open(path).expect("create snapshot");
    conn.execute_batch("CREATE TABLE file (file_id INTEGER PRIMARY KEY, status TEXT, size INTEGER);")
        .expect("schema");
    for (status, size) in rows {
        conn.execute(
            "INSERT INTO file (status, size) VALUES (?1, ?2)",
            rusqlite::params![status, size],
        )
        .expect("row");
    }
}

#[test]
fn snapshots_are_aggregated_then_merged_with_remapping() {
    let dir = tempdir().expect("tempdir");
    let backups = dir.path().join("backups");
    fs::create_dir_all(&backups).expect("mkdir");
    let first = backups.join("sdt.db.2024-01-01");
    let second = backups.join("sdt.db.2024-02-01");
    snapshot_db(&first, &[("done", 1_500), ("done", 500), ("error-checksum", 10)]);
    snapshot_db(
        &second,
        &[("done", 3_000_000), ("obsolete", 100), ("done,retracted", 7)],
    );

    let mut listing: BTreeMap<String, PathBuf> = BTreeMap::new();
    listing.insert("2024-01-01T00:00:00".to_string(), first);
    listing.insert("2024-02-01T00:00:00".to_string(), second);
    listing.insert("2024-03-01T00:00:00".to_string(), backups.join("missing.db"));
    let listing_path = dir.path().join("db_backups_list.json");
    fs::write(&listing_path, serde_json::to_string(&listing).expect("json")).expect("write");

    let out = dir.path().join("db_status_files");
    let snapshots = load_snapshot_list(&listing_path).expect("listing");
    let history = collect_status_history(&snapshots, &out, 2).expect("collect");
    assert_eq!(history.len(), 2, "missing snapshot is skipped");
    assert_eq!(
        history["2024-01-01T00:00:00"]["done"],
        StatusTotals {
            file_count: 2,
            size: Some(SizeValue::Bytes(2_000)),
        }
    );
    assert!(out.join("sdt.db.2024-01-01.json").is_file());
    let combined = fs::read_to_string(out.join(HISTORY_FILE_NAME)).expect("combined");
    assert!(combined.starts_with("{\n    \"2024-01-01T00:00:00\": {"));

    let merged = process_db_status_files(&out, true).expect("process");
    let feb = &merged["2024-02-01T00:00:00"];
    assert_eq!(feb["done"].size, Some(SizeValue::Human("3.0 MB".to_string())));
    assert_eq!(feb["error"].file_count, 1);
    assert_eq!(feb["retracted"].file_count, 1);
    let jan = &merged["2024-01-01T00:00:00"];
    assert_eq!(jan["error"].size, Some(SizeValue::Human("10 Bytes".to_string())));

    let plain = process_db_status_files(&out, false).expect("process");
    assert!(plain["2024-01-01T00:00:00"].contains_key("error-checksum"));
}
