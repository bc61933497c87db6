//! The version store: the single row of applied-state truth, kept in the
//! `schema_migrations` control table inside the target database.
//!
//! Every function here runs against an already-open transaction handle.
//! [set_current] in particular must share a transaction with the schema
//! change it records — a crash between the two would otherwise leave the
//! persisted version claiming work that never committed, or vice versa.

use crate::adapter::SqlTx;
use crate::error::Error;

/// Name of the control table. Its shape is `(version integer primary key)`
/// and it holds at most one row once bootstrapped.
pub const VERSION_TABLE: &str = "schema_migrations";

/// Create the control table if it does not exist. Idempotent, run at the
/// start of every run.
pub(crate) fn ensure_bootstrap(tx: &mut dyn SqlTx) -> Result<(), Error> {
    tx.execute(&format!(
        "create table if not exists {VERSION_TABLE} (version integer primary key)"
    ))
}

/// Read the current version: 0 when the table is empty, the stored value
/// when exactly one row exists.
///
/// More than one row (or a negative value) means some other writer has
/// corrupted the table; that fails loudly rather than silently picking a
/// row.
pub(crate) fn read_current(tx: &mut dyn SqlTx) -> Result<u32, Error> {
    let rows = tx.query_versions(&format!("select version from {VERSION_TABLE}"))?;
    match rows.as_slice() {
        [] => Ok(0),
        [version] => u32::try_from(*version).map_err(|_| {
            Error::CorruptVersionState(format!("stored version {version} is negative"))
        }),
        _ => Err(Error::CorruptVersionState(format!(
            "{VERSION_TABLE} holds {} rows, expected at most one",
            rows.len()
        ))),
    }
}

/// Record `version` as current within the caller's transaction: insert the
/// new row, then prune every other row, leaving exactly one.
pub(crate) fn set_current(tx: &mut dyn SqlTx, version: u32) -> Result<(), Error> {
    tx.execute(&format!(
        "insert into {VERSION_TABLE} (version) values ({version})"
    ))?;
    tx.execute(&format!(
        "delete from {VERSION_TABLE} where version != {version}"
    ))
}
