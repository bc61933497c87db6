//! PostgreSQL adapter over the
//! [`postgres`](https://crates.io/crates/postgres) crate.
//!
//! PostgreSQL fully supports transactional DDL: when a migration fails
//! mid-step, the step's schema changes and its version write roll back
//! together. The exceptions (`CREATE DATABASE`, `CREATE TABLESPACE` and
//! their `DROP` counterparts) cannot be rolled back even here; avoid them
//! in migration scripts.

use postgres::{Client, NoTls};

use crate::adapter::{Adapter, SqlTx};
use crate::error::Error;

/// An open PostgreSQL connection.
pub struct PostgresAdapter {
    client: Client,
}

impl PostgresAdapter {
    pub fn connect(url: &str) -> Result<Self, Error> {
        let client = Client::connect(url, NoTls).map_err(|e| Error::Connection(e.to_string()))?;
        Ok(Self { client })
    }
}

impl SqlTx for postgres::Transaction<'_> {
    fn execute(&mut self, sql: &str) -> Result<(), Error> {
        self.batch_execute(sql).map_err(Error::from)
    }

    fn query_versions(&mut self, sql: &str) -> Result<Vec<i64>, Error> {
        let rows = self.query(sql, &[])?;
        rows.iter()
            .map(|row| Ok(i64::from(row.try_get::<_, i32>(0)?)))
            .collect()
    }
}

impl Adapter for PostgresAdapter {
    fn transact(
        &mut self,
        op: &mut dyn FnMut(&mut dyn SqlTx) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let mut tx = self.client.transaction()?;
        // a failing op drops the transaction, which rolls it back
        op(&mut tx)?;
        tx.commit()?;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), Error> {
        self.client.close().map_err(Error::from)
    }
}
