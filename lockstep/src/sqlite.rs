//! SQLite adapter over the [`rusqlite`](https://crates.io/crates/rusqlite)
//! crate.
//!
//! SQLite supports transactional DDL, so a failed migration rolls back
//! completely, schema changes included. The database URL is a filesystem
//! path (or `:memory:`).

use rusqlite::Connection;

use crate::adapter::{Adapter, SqlTx};
use crate::error::Error;

/// An open SQLite connection.
#[derive(Debug)]
pub struct SqliteAdapter {
    conn: Connection,
}

impl SqliteAdapter {
    pub fn connect(path: &str) -> Result<Self, Error> {
        let conn = Connection::open(path).map_err(|e| Error::Connection(e.to_string()))?;
        Ok(Self { conn })
    }
}

impl SqlTx for rusqlite::Transaction<'_> {
    fn execute(&mut self, sql: &str) -> Result<(), Error> {
        Connection::execute_batch(self, sql).map_err(Error::from)
    }

    fn query_versions(&mut self, sql: &str) -> Result<Vec<i64>, Error> {
        let mut stmt = self.prepare(sql)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl Adapter for SqliteAdapter {
    fn transact(
        &mut self,
        op: &mut dyn FnMut(&mut dyn SqlTx) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let mut tx = self.conn.transaction()?;
        // a failing op drops the transaction, which rolls it back
        op(&mut tx)?;
        tx.commit()?;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), Error> {
        self.conn.close().map_err(|(_, e)| Error::from(e))
    }
}
