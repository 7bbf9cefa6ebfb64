// ELD Trip Planner
// Copyright 2025 The eldplan Authors
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Common utilities to interact with an SQLite database, primarily intended
//! to support unit tests.

use crate::db::{Db, DbError, DbResult, Executor, TxExecutor};
use async_trait::async_trait;
use futures::TryStreamExt;
use log::warn;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqlitePool, SqlitePoolOptions};
use sqlx::Executor as _;
use sqlx::{SqliteConnection, Transaction};

/// Takes a raw sqlx error `e` and converts it to our generic error type.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::RowNotFound => DbError::NotFound,
        sqlx::Error::PoolTimedOut => DbError::Unavailable,
        e if e.to_string().contains("UNIQUE constraint failed") => DbError::AlreadyExists,
        e if e.to_string().contains("FOREIGN KEY constraint failed") => DbError::NotFound,
        e => DbError::BackendError(e.to_string()),
    }
}

/// Creates a new connection to the database at `conn_str`.
///
/// The pool is bounded to one connection so that `:memory:` databases see a
/// single, consistent store.
pub async fn connect(conn_str: &str) -> DbResult<SqliteDb> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(conn_str)
        .await
        .map_err(map_sqlx_error)?;
    Ok(SqliteDb { pool })
}

/// A database executor that can either talk straight to the pool or to an
/// open transaction.
pub enum SqliteExecutor {
    /// An executor backed by a pool connection.
    Pool(PoolConnection<Sqlite>),

    /// An executor backed by a transaction.
    Tx(Transaction<'static, Sqlite>),
}

impl SqliteExecutor {
    /// Returns the raw connection to run queries against.
    pub(crate) fn conn(&mut self) -> &mut SqliteConnection {
        match self {
            SqliteExecutor::Pool(conn) => conn,
            SqliteExecutor::Tx(tx) => tx,
        }
    }

    /// Commits the transaction if this executor is backed by one.
    ///
    /// Calling this on a pool-backed executor results in a panic.
    pub(super) async fn commit(self) -> DbResult<()> {
        match self {
            SqliteExecutor::Pool(_) => unreachable!("Do not call commit on direct executors"),
            SqliteExecutor::Tx(tx) => tx.commit().await.map_err(map_sqlx_error),
        }
    }
}

/// A database instance backed by an SQLite pool.
pub struct SqliteDb {
    /// Shared connection pool.
    pool: SqlitePool,
}

impl Drop for SqliteDb {
    fn drop(&mut self) {
        if !self.pool.is_closed() {
            warn!("Dropping connection without having called close() first");
        }
    }
}

#[async_trait]
impl Db for SqliteDb {
    async fn ex(&self) -> DbResult<Executor> {
        let conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        Ok(Executor::Sqlite(SqliteExecutor::Pool(conn)))
    }

    async fn begin(&self) -> DbResult<TxExecutor> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(TxExecutor(Executor::Sqlite(SqliteExecutor::Tx(tx))))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Initializes the database with the schema in `schema`.
pub async fn run_schema(ex: &mut SqliteExecutor, schema: &str) -> DbResult<()> {
    let mut results = ex.conn().execute_many(schema);
    while results.try_next().await.map_err(map_sqlx_error)?.is_some() {
        // Nothing to do.
    }
    Ok(())
}

/// Test utilities for the SQLite connection.
#[cfg(test)]
pub mod testutils {
    use super::*;
    use crate::db::init_schema;

    /// Initializes an in-memory test database with the schema applied.
    pub(crate) async fn setup() -> SqliteDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();
        let db = connect(":memory:").await.unwrap();
        let mut ex = db.ex().await.unwrap();
        init_schema(&mut ex).await.unwrap();
        db
    }
}
