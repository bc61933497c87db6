//! The migration engine: computes the ordered plan between the current and
//! target versions, then executes it strictly sequentially, each step inside
//! one transaction that covers both the schema change and the version-store
//! write.
//!
//! Per-step (not whole-run) transactions bound the blast radius of a
//! failure to the in-flight migration: completed steps stay durable, the
//! failing step rolls back in full, and the operator can fix the script and
//! re-run without redoing prior work.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::adapter::{self, Adapter, Driver};
use crate::core::{self, MigrationFile};
use crate::error::Error;
use crate::store;

/// Run configuration, passed by value into the engine's entry points.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the migration files.
    pub dir: PathBuf,
    /// Which compiled-in database backend to use.
    pub driver: Driver,
    /// Backend-specific connection URL.
    pub database_url: String,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationReport {
    /// Version the database was at when the run started.
    pub from_version: u32,
    /// Version the database was at when the run finished.
    pub to_version: u32,
    /// Versions of the units executed, in execution order (ascending for an
    /// up run, descending for a down run).
    pub applied: Vec<u32>,
}

/// The entrypoint for applying or reverting file-based migrations.
///
/// One `Migrator` run owns its database connection for the run's whole
/// lifetime. Two concurrent runs against the same database are not
/// coordinated; serialize invocations externally.
pub struct Migrator {
    config: Config,
    on_migration_start: Option<Box<dyn Fn(u32, &str) + Send + Sync>>,
    on_migration_complete: Option<Box<dyn Fn(u32, &str, Duration) + Send + Sync>>,
}

// Manual Debug impl since the hook closures don't implement Debug
impl std::fmt::Debug for Migrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migrator")
            .field("config", &self.config)
            .field("on_migration_start", &self.on_migration_start.is_some())
            .field(
                "on_migration_complete",
                &self.on_migration_complete.is_some(),
            )
            .finish()
    }
}

impl Migrator {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            on_migration_start: None,
            on_migration_complete: None,
        }
    }

    /// Set a callback to be invoked when a migration step starts.
    /// The callback receives the unit's version and file name.
    pub fn on_migration_start<F>(mut self, callback: F) -> Self
    where
        F: Fn(u32, &str) + Send + Sync + 'static,
    {
        self.on_migration_start = Some(Box::new(callback));
        self
    }

    /// Set a callback to be invoked when a migration step commits.
    /// The callback receives the unit's version, file name, and duration.
    pub fn on_migration_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(u32, &str, Duration) + Send + Sync + 'static,
    {
        self.on_migration_complete = Some(Box::new(callback));
        self
    }

    /// Apply every migration with a version greater than the database's
    /// current version, ascending.
    pub fn up(&self) -> Result<MigrationReport, Error> {
        let mut adapter = adapter::connect(self.config.driver, &self.config.database_url)?;
        let result = self.run_up(adapter.as_mut());
        match result {
            Ok(report) => {
                adapter.close()?;
                Ok(report)
            }
            Err(err) => {
                let _ = adapter.close();
                Err(err)
            }
        }
    }

    /// Revert migrations in descending order until the database sits at
    /// `target_version`. The target must be strictly below the current
    /// version.
    pub fn down(&self, target_version: u32) -> Result<MigrationReport, Error> {
        let mut adapter = adapter::connect(self.config.driver, &self.config.database_url)?;
        let result = self.run_down(adapter.as_mut(), target_version);
        match result {
            Ok(report) => {
                adapter.close()?;
                Ok(report)
            }
            Err(err) => {
                let _ = adapter.close();
                Err(err)
            }
        }
    }

    fn run_up(&self, adapter: &mut dyn Adapter) -> Result<MigrationReport, Error> {
        // parse the whole directory first: every configuration error
        // surfaces before the database is mutated at all
        let files = core::load_migration_dir(&self.config.dir)?;
        let current = bootstrap_and_read(adapter)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            current_version = current,
            available = files.len(),
            "Planning upgrade"
        );

        let mut applied = Vec::new();
        let mut version = current;
        for unit in core::pending_upgrades(&files, current) {
            #[cfg(feature = "tracing")]
            let _span = tracing::info_span!(
                "migration_up",
                version = unit.version,
                file = %unit.file_name
            )
            .entered();

            self.apply_step(adapter, unit, &unit.up_sql, unit.version)?;
            version = unit.version;
            applied.push(unit.version);
        }

        Ok(MigrationReport {
            from_version: current,
            to_version: version,
            applied,
        })
    }

    fn run_down(
        &self,
        adapter: &mut dyn Adapter,
        target_version: u32,
    ) -> Result<MigrationReport, Error> {
        let current = bootstrap_and_read(adapter)?;

        // checked before any migration file is read
        if target_version >= current {
            return Err(Error::InvalidTargetVersion {
                target: target_version,
                current,
            });
        }

        let files = core::load_migration_dir(&self.config.dir)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            current_version = current,
            target_version = target_version,
            "Planning downgrade"
        );

        let mut applied = Vec::new();
        let mut version = current;
        for unit in core::pending_downgrades(&files, current, target_version) {
            #[cfg(feature = "tracing")]
            let _span = tracing::info_span!(
                "migration_down",
                version = unit.version,
                file = %unit.file_name
            )
            .entered();

            // reverting out of `version` lands the database on `version - 1`
            self.apply_step(adapter, unit, &unit.down_sql, unit.version - 1)?;
            version = unit.version - 1;
            applied.push(unit.version);
        }

        Ok(MigrationReport {
            from_version: current,
            to_version: version,
            applied,
        })
    }

    /// Execute one unit's script and record `record_version` as current,
    /// both inside a single transaction. A failure rolls the step back in
    /// full and aborts the run; step N+1 never begins before step N has
    /// committed.
    fn apply_step(
        &self,
        adapter: &mut dyn Adapter,
        unit: &MigrationFile,
        script: &str,
        record_version: u32,
    ) -> Result<(), Error> {
        if let Some(ref callback) = self.on_migration_start {
            callback(unit.version, &unit.file_name);
        }

        #[cfg(feature = "tracing")]
        tracing::info!("Starting migration");

        let started = Instant::now();

        adapter
            .transact(&mut |tx| {
                tx.execute(script)?;
                store::set_current(tx, record_version)
            })
            .map_err(|e| {
                #[cfg(feature = "tracing")]
                tracing::error!(error = %e, "Migration failed, step rolled back");

                Error::Apply {
                    version: unit.version,
                    source: Box::new(e),
                }
            })?;

        let duration = started.elapsed();

        #[cfg(feature = "tracing")]
        tracing::info!(duration_ms = duration.as_millis() as u64, "Migration committed");

        if let Some(ref callback) = self.on_migration_complete {
            callback(unit.version, &unit.file_name, duration);
        }

        Ok(())
    }
}

/// Create the control table if needed and read the current version, in one
/// transaction.
fn bootstrap_and_read(adapter: &mut dyn Adapter) -> Result<u32, Error> {
    let mut current = 0;
    adapter.transact(&mut |tx| {
        store::ensure_bootstrap(tx)?;
        current = store::read_current(tx)?;
        Ok(())
    })?;
    Ok(current)
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::test_util::{write_migration, TestEnv};

    #[test]
    fn up_from_clean_applies_all_in_order() {
        let env = TestEnv::new();
        write_migration(
            &env.migrations,
            "1_create_users.sql",
            "create table users (id integer primary key);",
            "drop table users;",
        );
        write_migration(
            &env.migrations,
            "2_create_posts.sql",
            "create table posts (id integer primary key);",
            "drop table posts;",
        );
        write_migration(
            &env.migrations,
            "3_create_comments.sql",
            "create table comments (id integer primary key);",
            "drop table comments;",
        );

        let report = env.migrator().up().unwrap();
        assert_eq!(
            report,
            MigrationReport {
                from_version: 0,
                to_version: 3,
                applied: vec![1, 2, 3],
            }
        );

        // exactly one control row, at the highest applied version
        assert_eq!(env.control_rows(), vec![3]);
        for table in ["users", "posts", "comments"] {
            assert!(env.table_exists(table));
        }
    }

    #[test]
    fn up_twice_is_idempotent() {
        let env = TestEnv::new();
        write_migration(
            &env.migrations,
            "1_create_users.sql",
            "create table users (id integer primary key);",
            "drop table users;",
        );

        env.migrator().up().unwrap();
        let second = env.migrator().up().unwrap();
        assert_eq!(
            second,
            MigrationReport {
                from_version: 1,
                to_version: 1,
                applied: vec![],
            }
        );
        assert_eq!(env.control_rows(), vec![1]);
    }

    #[test]
    fn init_and_seed_scenario() {
        let env = TestEnv::new();
        write_migration(
            &env.migrations,
            "1_init.sql",
            "create table test (id integer primary key);",
            "drop table test;",
        );
        write_migration(
            &env.migrations,
            "2_seed.sql",
            "insert into test (id) values (1);",
            "delete from test;",
        );

        let report = env.migrator().up().unwrap();
        assert_eq!(report.to_version, 2);
        assert!(env.table_exists("test"));
        assert_eq!(env.query_i64("select count(*) from test"), 1);

        // revert the seed: row gone, table still there, version 1
        let report = env.migrator().down(1).unwrap();
        assert_eq!(
            report,
            MigrationReport {
                from_version: 2,
                to_version: 1,
                applied: vec![2],
            }
        );
        assert!(env.table_exists("test"));
        assert_eq!(env.query_i64("select count(*) from test"), 0);
        assert_eq!(env.control_rows(), vec![1]);

        // revert the init: table gone, version 0
        let report = env.migrator().down(0).unwrap();
        assert_eq!(report.to_version, 0);
        assert!(!env.table_exists("test"));
        assert_eq!(env.control_rows(), vec![0]);
    }

    #[test]
    fn down_then_up_round_trips() {
        let env = TestEnv::new();
        for (version, table) in [(1, "users"), (2, "posts"), (3, "comments")] {
            write_migration(
                &env.migrations,
                &format!("{version}_create_{table}.sql"),
                &format!("create table {table} (id integer primary key);"),
                &format!("drop table {table};"),
            );
        }

        env.migrator().up().unwrap();
        env.migrator().down(1).unwrap();
        let report = env.migrator().up().unwrap();

        assert_eq!(
            report,
            MigrationReport {
                from_version: 1,
                to_version: 3,
                applied: vec![2, 3],
            }
        );
        assert_eq!(env.control_rows(), vec![3]);
    }

    #[test]
    fn missing_separator_rejected_before_any_sql() {
        let env = TestEnv::new();
        std::fs::write(
            env.migrations.join("1_broken.sql"),
            "create table t (id integer primary key);",
        )
        .unwrap();

        let err = env.migrator().up().unwrap_err();
        assert_eq!(
            err,
            Error::MissingSeparator {
                file: "1_broken.sql".to_string()
            }
        );
        // nothing ran: not even the control table was created
        assert!(!env.table_exists("schema_migrations"));
    }

    #[test]
    fn malformed_later_file_blocks_the_whole_run() {
        let env = TestEnv::new();
        write_migration(
            &env.migrations,
            "1_create_users.sql",
            "create table users (id integer primary key);",
            "drop table users;",
        );
        env.migrator().up().unwrap();

        // a second file arrives without a separator
        std::fs::write(env.migrations.join("2_broken.sql"), "drop table users;").unwrap();

        let err = env.migrator().up().unwrap_err();
        assert!(matches!(err, Error::MissingSeparator { .. }));
        // the applied state is exactly what it was before the failed run
        assert_eq!(env.control_rows(), vec![1]);
        assert!(env.table_exists("users"));
    }

    #[test]
    fn invalid_file_name_rejected() {
        let env = TestEnv::new();
        write_migration(&env.migrations, "init.sql", "select 1;", "select 1;");

        let err = env.migrator().up().unwrap_err();
        assert_eq!(
            err,
            Error::InvalidMigrationName {
                file: "init.sql".to_string()
            }
        );
        assert!(!env.table_exists("schema_migrations"));
    }

    #[test]
    fn down_precondition_checked_before_reading_files() {
        let env = TestEnv::new();
        // would fail with MissingSeparator if files were read first
        std::fs::write(env.migrations.join("1_broken.sql"), "no separator here").unwrap();

        let err = env.migrator().down(0).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidTargetVersion {
                target: 0,
                current: 0
            }
        );
    }

    #[test]
    fn down_to_current_or_above_is_rejected() {
        let env = TestEnv::new();
        write_migration(
            &env.migrations,
            "1_create_users.sql",
            "create table users (id integer primary key);",
            "drop table users;",
        );
        env.migrator().up().unwrap();

        for target in [1, 2] {
            let err = env.migrator().down(target).unwrap_err();
            assert_eq!(
                err,
                Error::InvalidTargetVersion { target, current: 1 }
            );
        }
        assert_eq!(env.control_rows(), vec![1]);
    }

    #[test]
    fn failure_mid_sequence_keeps_committed_prefix() {
        let env = TestEnv::new();
        write_migration(
            &env.migrations,
            "1_create_users.sql",
            "create table users (id integer primary key);",
            "drop table users;",
        );
        write_migration(
            &env.migrations,
            "2_create_posts.sql",
            "create table posts (id integer primary key);",
            "drop table posts;",
        );
        write_migration(
            &env.migrations,
            "3_broken.sql",
            "create table comments (id integer primary key);\nbleep blorp;",
            "drop table comments;",
        );

        let err = env.migrator().up().unwrap_err();
        assert!(matches!(err, Error::Apply { version: 3, .. }));

        // versions 1 and 2 stay committed; version 3 rolled back in full
        assert_eq!(env.control_rows(), vec![2]);
        assert!(env.table_exists("users"));
        assert!(env.table_exists("posts"));
        assert!(!env.table_exists("comments"));
    }

    #[test]
    fn corrupt_control_table_fails_loudly() {
        let env = TestEnv::new();
        write_migration(
            &env.migrations,
            "1_create_users.sql",
            "create table users (id integer primary key);",
            "drop table users;",
        );
        env.migrator().up().unwrap();

        // a second row appears behind the runner's back
        env.execute("insert into schema_migrations (version) values (99)");

        let err = env.migrator().up().unwrap_err();
        assert!(matches!(err, Error::CorruptVersionState(_)));
    }

    #[test]
    fn up_with_empty_directory_bootstraps_and_applies_nothing() {
        let env = TestEnv::new();
        let report = env.migrator().up().unwrap();
        assert_eq!(
            report,
            MigrationReport {
                from_version: 0,
                to_version: 0,
                applied: vec![],
            }
        );
        assert!(env.table_exists("schema_migrations"));
        assert_eq!(env.control_rows(), Vec::<i64>::new());
    }

    #[test]
    fn hooks_fire_per_step_in_order() {
        let env = TestEnv::new();
        write_migration(
            &env.migrations,
            "1_create_users.sql",
            "create table users (id integer primary key);",
            "drop table users;",
        );
        write_migration(
            &env.migrations,
            "2_create_posts.sql",
            "create table posts (id integer primary key);",
            "drop table posts;",
        );

        let events = Arc::new(Mutex::new(Vec::new()));
        let start_events = Arc::clone(&events);
        let complete_events = Arc::clone(&events);

        let migrator = env
            .migrator()
            .on_migration_start(move |version, file| {
                start_events
                    .lock()
                    .unwrap()
                    .push(format!("start {version} {file}"));
            })
            .on_migration_complete(move |version, file, _duration| {
                complete_events
                    .lock()
                    .unwrap()
                    .push(format!("complete {version} {file}"));
            });
        migrator.up().unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "start 1 1_create_users.sql",
                "complete 1 1_create_users.sql",
                "start 2 2_create_posts.sql",
                "complete 2 2_create_posts.sql",
            ]
        );
    }
}
