//! Shared test infrastructure: tempdir-backed migration directories and a
//! sqlite-file database the engine can be run against repeatedly, with
//! direct-inspection helpers for asserting on the resulting state.

use std::fs;
use std::path::Path;

use crate::core::SEPARATOR;

/// Write a well-formed migration file composed of the given up and down
/// scripts.
pub(crate) fn write_migration(dir: &Path, file_name: &str, up: &str, down: &str) {
    let contents = format!("{up}\n{SEPARATOR}\n{down}\n");
    fs::write(dir.join(file_name), contents).unwrap();
}

#[cfg(feature = "sqlite")]
pub(crate) use sqlite_env::TestEnv;

#[cfg(feature = "sqlite")]
mod sqlite_env {
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use crate::adapter::Driver;
    use crate::migrator::{Config, Migrator};

    /// A disposable migrations directory plus a file-backed sqlite database,
    /// so state persists across separate engine runs the way it does against
    /// a real server.
    pub(crate) struct TestEnv {
        _root: TempDir,
        pub migrations: PathBuf,
        pub db_path: PathBuf,
    }

    impl TestEnv {
        pub fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let migrations = root.path().join("migrations");
            fs::create_dir(&migrations).unwrap();
            let db_path = root.path().join("test.db");
            Self {
                _root: root,
                migrations,
                db_path,
            }
        }

        pub fn migrator(&self) -> Migrator {
            Migrator::new(Config {
                dir: self.migrations.clone(),
                driver: Driver::Sqlite,
                database_url: self.db_path.display().to_string(),
            })
        }

        fn conn(&self) -> rusqlite::Connection {
            rusqlite::Connection::open(&self.db_path).unwrap()
        }

        /// Run arbitrary SQL outside the engine, e.g. to corrupt state.
        pub fn execute(&self, sql: &str) {
            self.conn().execute_batch(sql).unwrap();
        }

        /// All rows of the control table, in version order.
        pub fn control_rows(&self) -> Vec<i64> {
            let conn = self.conn();
            let mut stmt = conn
                .prepare("select version from schema_migrations order by version")
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .collect::<Result<Vec<i64>, _>>()
                .unwrap()
        }

        pub fn table_exists(&self, name: &str) -> bool {
            let count: i64 = self
                .conn()
                .query_row(
                    "select count(*) from sqlite_master where type = 'table' and name = ?1",
                    [name],
                    |row| row.get(0),
                )
                .unwrap();
            count > 0
        }

        pub fn query_i64(&self, sql: &str) -> i64 {
            self.conn().query_row(sql, [], |row| row.get(0)).unwrap()
        }
    }
}
