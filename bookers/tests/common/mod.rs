#![allow(dead_code)]

use std::path::PathBuf;

use diesel::sqlite::SqliteConnection;
use tempfile::TempDir;

use bookers::accounts::Registration;
use bookers::storage::DiskService;
use bookers::{auth, db, User};

pub fn connection() -> SqliteConnection {
    auth::set_cost(auth::MIN_COST);
    db::establish_in_memory().unwrap()
}

pub fn disk() -> (TempDir, DiskService) {
    let dir = tempfile::tempdir().unwrap();
    let disk = DiskService::new(dir.path());
    (dir, disk)
}

pub fn assets_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets")
}

pub fn register(conn: &mut SqliteConnection, name: &str) -> User {
    User::register(
        conn,
        &Registration {
            name,
            email: &format!("{}@example.com", name),
            password: "password",
            introduction: None,
        },
    )
    .unwrap()
}
