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

//! Common utilities to interact with a PostgreSQL database, the production
//! backend.

use crate::db::{Db, DbError, DbResult, Executor, TxExecutor};
use crate::env::{get_optional_var, get_required_var};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, PgPoolOptions, Postgres};
use sqlx::Executor as _;
use sqlx::{PgConnection, Transaction};

/// Default size of the connection pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Takes a raw sqlx error `e` and converts it to our generic error type.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::RowNotFound => DbError::NotFound,
        sqlx::Error::PoolTimedOut => DbError::Unavailable,
        e if e.to_string().contains("duplicate key value") => DbError::AlreadyExists,
        e if e.to_string().contains("violates foreign key constraint") => DbError::NotFound,
        e => DbError::BackendError(e.to_string()),
    }
}

/// Options to establish a connection against a PostgreSQL database.
#[derive(Clone, Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct PostgresOptions {
    /// Connection string.
    pub url: String,

    /// Maximum number of connections in the pool.
    pub max_connections: u32,
}

impl PostgresOptions {
    /// Creates a set of options from the `DATABASE_URL` and the optional
    /// `DATABASE_MAX_CONNECTIONS` environment variables.
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            url: get_required_var::<String>("DATABASE_URL")?,
            max_connections: get_optional_var::<u32>("DATABASE_MAX_CONNECTIONS")?
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
        })
    }
}

/// A database executor that can either talk straight to the pool or to an
/// open transaction.
pub enum PostgresExecutor {
    /// An executor backed by a pool connection.
    Pool(PoolConnection<Postgres>),

    /// An executor backed by a transaction.
    Tx(Transaction<'static, Postgres>),
}

impl PostgresExecutor {
    /// Returns the raw connection to run queries against.
    pub(crate) fn conn(&mut self) -> &mut PgConnection {
        match self {
            PostgresExecutor::Pool(conn) => conn,
            PostgresExecutor::Tx(tx) => tx,
        }
    }

    /// Commits the transaction if this executor is backed by one.
    ///
    /// Calling this on a pool-backed executor results in a panic.
    pub(super) async fn commit(self) -> DbResult<()> {
        match self {
            PostgresExecutor::Pool(_) => unreachable!("Do not call commit on direct executors"),
            PostgresExecutor::Tx(tx) => tx.commit().await.map_err(map_sqlx_error),
        }
    }
}

/// A database instance backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PostgresDb {
    /// Shared connection pool.
    pool: PgPool,
}

impl PostgresDb {
    /// Creates a lazy connection pool using `opts` for configuration.  The
    /// pool connects on first use, so this cannot fail on a bad address.
    pub fn connect(opts: PostgresOptions) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(opts.max_connections)
            .connect_lazy(&opts.url)
            .map_err(map_sqlx_error)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Db for PostgresDb {
    async fn ex(&self) -> DbResult<Executor> {
        let conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        Ok(Executor::Postgres(PostgresExecutor::Pool(conn)))
    }

    async fn begin(&self) -> DbResult<TxExecutor> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(TxExecutor(Executor::Postgres(PostgresExecutor::Tx(tx))))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Initializes the database with the schema in `schema`.
pub async fn run_schema(ex: &mut PostgresExecutor, schema: &str) -> DbResult<()> {
    let mut results = ex.conn().execute_many(schema);
    while results.try_next().await.map_err(map_sqlx_error)?.is_some() {
        // Nothing to do.
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_env_all_present() {
        let overrides = [
            ("DATABASE_URL", Some("postgres://user@host/db")),
            ("DATABASE_MAX_CONNECTIONS", Some("4")),
        ];
        temp_env::with_vars(overrides, || {
            let opts = PostgresOptions::from_env().unwrap();
            assert_eq!(
                PostgresOptions { url: "postgres://user@host/db".to_owned(), max_connections: 4 },
                opts
            );
        });
    }

    #[test]
    fn test_options_from_env_defaults() {
        let overrides = [
            ("DATABASE_URL", Some("postgres://user@host/db")),
            ("DATABASE_MAX_CONNECTIONS", None),
        ];
        temp_env::with_vars(overrides, || {
            let opts = PostgresOptions::from_env().unwrap();
            assert_eq!(DEFAULT_MAX_CONNECTIONS, opts.max_connections);
        });
    }

    #[test]
    fn test_options_from_env_missing_url() {
        temp_env::with_var_unset("DATABASE_URL", || {
            let err = PostgresOptions::from_env().unwrap_err();
            assert!(err.contains("DATABASE_URL not present"));
        });
    }
}
