//! The database adapter capability the engine consumes: connect to a URL,
//! run a closure inside one transaction, close.
//!
//! Concrete adapters are selected statically through cargo features; there
//! is no runtime driver loading. Each enabled backend lives in its own
//! module ([`crate::postgres`], [`crate::sqlite`]) and plugs in here via
//! [`connect`].

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Handle for executing SQL inside an open transaction.
pub trait SqlTx {
    /// Execute one or more raw SQL statements, discarding any result rows.
    fn execute(&mut self, sql: &str) -> Result<(), Error>;

    /// Run a query returning a single integer column, collecting every row.
    fn query_versions(&mut self, sql: &str) -> Result<Vec<i64>, Error>;
}

/// A live database connection with transactional scoping.
///
/// `transact` runs `op` against a [SqlTx] inside one transaction: the
/// transaction commits when `op` returns `Ok` and rolls back in full when it
/// returns `Err`. The connection is owned exclusively by one run for its
/// entire lifetime.
pub trait Adapter {
    fn transact(
        &mut self,
        op: &mut dyn FnMut(&mut dyn SqlTx) -> Result<(), Error>,
    ) -> Result<(), Error>;

    fn close(self: Box<Self>) -> Result<(), Error>;
}

/// The compiled-in database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    #[cfg(feature = "postgres")]
    Postgres,
    #[cfg(feature = "sqlite")]
    Sqlite,
}

impl FromStr for Driver {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            #[cfg(feature = "postgres")]
            "pg" | "postgres" => Ok(Self::Postgres),
            #[cfg(feature = "sqlite")]
            "sqlite" => Ok(Self::Sqlite),
            other => Err(Error::UnknownDriver(other.to_string())),
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres => write!(f, "pg"),
            #[cfg(feature = "sqlite")]
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Open a connection with the selected backend.
/// Fails with [Error::Connection] when the database is unreachable.
pub fn connect(driver: Driver, url: &str) -> Result<Box<dyn Adapter>, Error> {
    match driver {
        #[cfg(feature = "postgres")]
        Driver::Postgres => Ok(Box::new(crate::postgres::PostgresAdapter::connect(url)?)),
        #[cfg(feature = "sqlite")]
        Driver::Sqlite => Ok(Box::new(crate::sqlite::SqliteAdapter::connect(url)?)),
    }
}
