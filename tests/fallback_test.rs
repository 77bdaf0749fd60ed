use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn request_batch() -> NamedTempFile {
    let mut csv = NamedTempFile::new().unwrap();
    writeln!(csv, "op,owner,payout,amount,order,account_name,account_number,bank_code").unwrap();
    writeln!(csv, "credit,user-1,,200000,order-1,,,").unwrap();
    writeln!(csv, "request,user-1,p1,,,Ada Obi,0123456789,058").unwrap();
    csv
}

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_db_path_without_rocksdb_runs_in_memory() {
    let csv = request_batch();
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("payouts_db");

    let mut cmd = Command::new(cargo_bin!("payoutctl"));
    cmd.arg(csv.path()).arg("--db-path").arg(&db_path);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("'storage-rocksdb' feature is not enabled"))
        .stdout(predicate::str::contains("\"owner_id\":\"user-1\""))
        .stdout(predicate::str::contains("\"status\":\"pending\""));

    // Nothing was written where the database would have been.
    assert!(!db_path.exists());
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_db_path_with_rocksdb_creates_database() {
    let csv = request_batch();
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("payouts_db");

    let mut cmd = Command::new(cargo_bin!("payoutctl"));
    cmd.arg(csv.path()).arg("--db-path").arg(&db_path);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Falling back").not())
        .stdout(predicate::str::contains("\"status\":\"pending\""));
    assert!(db_path.exists());
}
