#![cfg_attr(docsrs, feature(doc_cfg))]
//! `lockstep` applies and reverts file-based SQL migrations along a single
//! linear version history, tracking the current version in a one-row
//! `schema_migrations` control table inside the target database.
//!
//! Core concepts:
//! - A migration is one file named `<version>_<label>.sql`, holding an up
//!   script and a down script split by the literal `-- migrate:down`.
//!   Versions must be unique, positive, and contiguous from 1.
//! - Each step runs inside one transaction covering both the script and the
//!   version write, so the recorded version never disagrees with what
//!   actually committed. A failing step rolls back alone; earlier steps stay
//!   durable.
//! - Backends are selected at compile time through cargo features; the
//!   engine talks to them through one adapter interface.
//!
//! # Example
//!
//! ```rust
//! # #[cfg(not(feature = "sqlite"))]
//! # fn main() {}
//! # #[cfg(feature = "sqlite")]
//! # fn main() {
//! use lockstep::{Config, Driver, Migrator};
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::write(
//!     dir.path().join("1_create_users.sql"),
//!     "create table users (id integer primary key, name text);\n\
//!      -- migrate:down\n\
//!      drop table users;\n",
//! )
//! .unwrap();
//!
//! let db = dir.path().join("app.db");
//! let migrator = Migrator::new(Config {
//!     dir: dir.path().to_path_buf(),
//!     driver: Driver::Sqlite,
//!     database_url: db.display().to_string(),
//! });
//!
//! let report = migrator.up().unwrap();
//! assert_eq!(report.from_version, 0);
//! assert_eq!(report.to_version, 1);
//!
//! // a second run has nothing left to apply
//! assert!(migrator.up().unwrap().applied.is_empty());
//!
//! // `down` reverts unit by unit until the database sits at the target
//! let report = migrator.down(0).unwrap();
//! assert_eq!(report.to_version, 0);
//! # }
//! ```
//!
//! # Database support
//!
//! - PostgreSQL (driver key `pg`) — available with the `postgres` feature
//!   flag (on by default).
//! - SQLite (driver key `sqlite`) — available with the `sqlite` feature
//!   flag (on by default).
//!
//! Structured logging through the `tracing` crate is available with the
//! `tracing` feature flag.
//!
//! # Concurrency
//!
//! A run owns its connection from connect to close and applies steps
//! strictly sequentially. Two concurrent runs against the same database are
//! not coordinated — serialize them externally (a deploy lock, a CI mutex).

mod adapter;
mod core;
mod error;
mod migrator;
mod store;

pub use adapter::{connect, Adapter, Driver, SqlTx};
pub use core::{load_migration_dir, MigrationFile, SEPARATOR};
pub use error::Error;
pub use migrator::{Config, MigrationReport, Migrator};
pub use store::VERSION_TABLE;

#[cfg(feature = "postgres")]
#[cfg_attr(docsrs, doc(cfg(feature = "postgres")))]
pub mod postgres;

#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub mod sqlite;

#[cfg(test)]
pub(crate) mod test_util;
