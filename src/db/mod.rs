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

//! The persistence layer.
//!
//! PostgreSQL backs production and SQLite backs the unit tests; the
//! `Executor` enum bridges the two so that every query is written once per
//! backend and callers stay backend-agnostic.  Writes happen inside a
//! single transaction per business operation.

use crate::model::{
    AccessToken, CycleHours, DailyLedger, EmailAddress, HashedPassword, ModelError, NamedPlace,
    RefreshToken, RoutePlan, Stop, Trip, TripId, TripOverview, TripSummary, User, UserId,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use time::OffsetDateTime;

pub mod postgres;
pub mod sqlite;
#[cfg(test)]
mod tests;

/// Database errors.  Any unexpected errors that come from the database are
/// classified as `BackendError`, but errors we know about have more
/// specific types.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum DbError {
    /// Indicates that a request to create an entry failed because it
    /// already exists.
    #[error("Already exists")]
    AlreadyExists,

    /// Catch-all error type for unexpected database errors.
    #[error("Database error: {0}")]
    BackendError(String),

    /// Indicates a failure processing the data that already exists in the
    /// database.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),

    /// Indicates that a requested entry does not exist.
    #[error("Entity not found")]
    NotFound,

    /// Indicates that the database is not available.
    #[error("Unavailable")]
    Unavailable,
}

impl From<ModelError> for DbError {
    fn from(e: ModelError) -> Self {
        DbError::DataIntegrityError(e.to_string())
    }
}

/// Result type for this module.
pub type DbResult<T> = Result<T, DbError>;

/// A database executor that can talk to multiple database implementations.
///
/// This can wrap an executor that talks directly to the pool or to an open
/// transaction.
pub enum Executor {
    /// A PostgreSQL executor.
    Postgres(postgres::PostgresExecutor),

    /// An SQLite executor.
    Sqlite(sqlite::SqliteExecutor),
}

/// A wrapper for a database executor backed by an open transaction.
pub struct TxExecutor(Executor);

impl TxExecutor {
    /// Returns the executor wrapped by this transaction.
    ///
    /// This would be better called `executor` but this method is used so
    /// frequently that it makes call sites too verbose.
    pub fn ex(&mut self) -> &mut Executor {
        &mut self.0
    }

    /// Commits the transaction.
    pub async fn commit(self) -> DbResult<()> {
        match self.0 {
            Executor::Postgres(e) => e.commit().await,
            Executor::Sqlite(e) => e.commit().await,
        }
    }
}

/// Abstraction over the database connection.
#[async_trait]
pub trait Db {
    /// Obtains an executor for direct access to the pool.
    async fn ex(&self) -> DbResult<Executor>;

    /// Begins a transaction.
    ///
    /// It is the responsibility of the caller to call `commit` on the
    /// returned executor.  Otherwise the transaction is rolled back on drop.
    async fn begin(&self) -> DbResult<TxExecutor>;

    /// Closes the connection to the pool.
    ///
    /// The caller can never do anything useful on error, so this doesn't
    /// return them.
    async fn close(&self);
}

/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,
    }
}

/// Converts a timestamp into the microsecond count stored in the database.
fn unpack_timestamp(ts: OffsetDateTime) -> i64 {
    let nanos = ts.unix_timestamp_nanos();
    assert!(nanos >= 0, "Cannot store a pre-epoch timestamp");
    i64::try_from(nanos / 1000).expect("Microsecond timestamps fit in i64 for eons")
}

/// Converts a stored microsecond count back into a timestamp.
fn build_timestamp(us: i64) -> DbResult<OffsetDateTime> {
    if us < 0 {
        return Err(DbError::DataIntegrityError(format!("Negative timestamp {}", us)));
    }
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(us) * 1000)
        .map_err(|e| DbError::DataIntegrityError(format!("Invalid timestamp: {}", e)))
}

/// Parses a JSON payload column.
fn parse_json<T: DeserializeOwned>(raw: &str) -> DbResult<T> {
    serde_json::from_str(raw).map_err(|e| DbError::DataIntegrityError(e.to_string()))
}

/// Serializes a JSON payload column.
fn to_json<T: Serialize>(value: &T) -> DbResult<String> {
    serde_json::to_string(value).map_err(|e| DbError::BackendError(e.to_string()))
}

/// The geocoded endpoints of a trip, stored as one JSON payload.
#[derive(Deserialize, Serialize)]
struct PlacesRecord {
    /// Geocoded start place.
    current: NamedPlace,

    /// Geocoded pickup place.
    pickup: NamedPlace,

    /// Geocoded dropoff place.
    dropoff: NamedPlace,
}

/// Helper to verify that an insert or update operation affected just one
/// row.
fn ensure_one_modified(rows_affected: u64) -> DbResult<()> {
    if rows_affected != 1 {
        Err(DbError::BackendError(format!("Expected 1 modified row but got {}", rows_affected)))
    } else {
        Ok(())
    }
}

/// Creates the account for `user` with the given `password` hash.
pub(crate) async fn create_user(
    ex: &mut Executor,
    user: &User,
    password: &HashedPassword,
    created_at: OffsetDateTime,
) -> DbResult<()> {
    let done = match ex {
        Executor::Postgres(ex) => {
            let query_str =
                "INSERT INTO users (id, email, name, password, created_at_us)
                VALUES ($1, $2, $3, $4, $5)";
            sqlx::query(query_str)
                .bind(user.id().to_string())
                .bind(user.email().as_str())
                .bind(user.name())
                .bind(password.as_str())
                .bind(unpack_timestamp(created_at))
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?
                .rows_affected()
        }

        Executor::Sqlite(ex) => {
            let query_str =
                "INSERT INTO users (id, email, name, password, created_at_us)
                VALUES (?, ?, ?, ?, ?)";
            sqlx::query(query_str)
                .bind(user.id().to_string())
                .bind(user.email().as_str())
                .bind(user.name())
                .bind(password.as_str())
                .bind(unpack_timestamp(created_at))
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?
                .rows_affected()
        }
    };
    ensure_one_modified(done)
}

/// Gets the account registered under `email` with its password hash.
pub(crate) async fn get_user_by_email(
    ex: &mut Executor,
    email: &EmailAddress,
) -> DbResult<(User, HashedPassword)> {
    let (id, name, password): (String, String, String) = match ex {
        Executor::Postgres(ex) => {
            let query_str = "SELECT id, name, password FROM users WHERE email = $1";
            let row = sqlx::query(query_str)
                .bind(email.as_str())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            (row.try_get("id"), row.try_get("name"), row.try_get("password"))
                .try_into_tuple()
                .map_err(postgres::map_sqlx_error)?
        }

        Executor::Sqlite(ex) => {
            let query_str = "SELECT id, name, password FROM users WHERE email = ?";
            let row = sqlx::query(query_str)
                .bind(email.as_str())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            (row.try_get("id"), row.try_get("name"), row.try_get("password"))
                .try_into_tuple()
                .map_err(sqlite::map_sqlx_error)?
        }
    };

    let user = User::new(id.parse::<UserId>()?, email.clone(), name);
    Ok((user, HashedPassword::new(password)))
}

/// Gets the account with the given `id`.
pub(crate) async fn get_user_by_id(ex: &mut Executor, id: UserId) -> DbResult<User> {
    let (email, name): (String, String) = match ex {
        Executor::Postgres(ex) => {
            let query_str = "SELECT email, name FROM users WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.to_string())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            (row.try_get("email"), row.try_get("name"))
                .try_into_tuple()
                .map_err(postgres::map_sqlx_error)?
        }

        Executor::Sqlite(ex) => {
            let query_str = "SELECT email, name FROM users WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.to_string())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            (row.try_get("email"), row.try_get("name"))
                .try_into_tuple()
                .map_err(sqlite::map_sqlx_error)?
        }
    };

    Ok(User::new(id, EmailAddress::new(email)?, name))
}

/// Records an access-token session for `user_id`.
pub(crate) async fn put_session(
    ex: &mut Executor,
    token: &AccessToken,
    user_id: UserId,
    expires_at: OffsetDateTime,
) -> DbResult<()> {
    let done = match ex {
        Executor::Postgres(ex) => {
            let query_str =
                "INSERT INTO sessions (access_token, user_id, expires_at_us) VALUES ($1, $2, $3)";
            sqlx::query(query_str)
                .bind(token.as_str())
                .bind(user_id.to_string())
                .bind(unpack_timestamp(expires_at))
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?
                .rows_affected()
        }

        Executor::Sqlite(ex) => {
            let query_str =
                "INSERT INTO sessions (access_token, user_id, expires_at_us) VALUES (?, ?, ?)";
            sqlx::query(query_str)
                .bind(token.as_str())
                .bind(user_id.to_string())
                .bind(unpack_timestamp(expires_at))
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?
                .rows_affected()
        }
    };
    ensure_one_modified(done)
}

/// Looks up the session behind `token`, returning its owner and expiration.
pub(crate) async fn get_session(
    ex: &mut Executor,
    token: &AccessToken,
) -> DbResult<(UserId, OffsetDateTime)> {
    let (user_id, expires_at_us): (String, i64) = match ex {
        Executor::Postgres(ex) => {
            let query_str = "SELECT user_id, expires_at_us FROM sessions WHERE access_token = $1";
            let row = sqlx::query(query_str)
                .bind(token.as_str())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            (row.try_get("user_id"), row.try_get("expires_at_us"))
                .try_into_tuple()
                .map_err(postgres::map_sqlx_error)?
        }

        Executor::Sqlite(ex) => {
            let query_str = "SELECT user_id, expires_at_us FROM sessions WHERE access_token = ?";
            let row = sqlx::query(query_str)
                .bind(token.as_str())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            (row.try_get("user_id"), row.try_get("expires_at_us"))
                .try_into_tuple()
                .map_err(sqlite::map_sqlx_error)?
        }
    };

    Ok((user_id.parse::<UserId>()?, build_timestamp(expires_at_us)?))
}

/// Deletes the session behind `token`, if any.
pub(crate) async fn delete_session(ex: &mut Executor, token: &AccessToken) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => {
            let query_str = "DELETE FROM sessions WHERE access_token = $1";
            sqlx::query(query_str)
                .bind(token.as_str())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
        }

        Executor::Sqlite(ex) => {
            let query_str = "DELETE FROM sessions WHERE access_token = ?";
            sqlx::query(query_str)
                .bind(token.as_str())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
        }
    }
    Ok(())
}

/// Records a refresh token for `user_id`.
pub(crate) async fn put_refresh_token(
    ex: &mut Executor,
    token: &RefreshToken,
    user_id: UserId,
    expires_at: OffsetDateTime,
) -> DbResult<()> {
    let done = match ex {
        Executor::Postgres(ex) => {
            let query_str = "INSERT INTO refresh_tokens (token, user_id, expires_at_us, revoked)
                VALUES ($1, $2, $3, FALSE)";
            sqlx::query(query_str)
                .bind(token.as_str())
                .bind(user_id.to_string())
                .bind(unpack_timestamp(expires_at))
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?
                .rows_affected()
        }

        Executor::Sqlite(ex) => {
            let query_str = "INSERT INTO refresh_tokens (token, user_id, expires_at_us, revoked)
                VALUES (?, ?, ?, 0)";
            sqlx::query(query_str)
                .bind(token.as_str())
                .bind(user_id.to_string())
                .bind(unpack_timestamp(expires_at))
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?
                .rows_affected()
        }
    };
    ensure_one_modified(done)
}

/// Looks up a refresh token, returning its owner, expiration, and whether
/// it has been revoked.
pub(crate) async fn get_refresh_token(
    ex: &mut Executor,
    token: &RefreshToken,
) -> DbResult<(UserId, OffsetDateTime, bool)> {
    let (user_id, expires_at_us, revoked): (String, i64, bool) = match ex {
        Executor::Postgres(ex) => {
            let query_str =
                "SELECT user_id, expires_at_us, revoked FROM refresh_tokens WHERE token = $1";
            let row = sqlx::query(query_str)
                .bind(token.as_str())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            (row.try_get("user_id"), row.try_get("expires_at_us"), row.try_get("revoked"))
                .try_into_tuple()
                .map_err(postgres::map_sqlx_error)?
        }

        Executor::Sqlite(ex) => {
            let query_str =
                "SELECT user_id, expires_at_us, revoked FROM refresh_tokens WHERE token = ?";
            let row = sqlx::query(query_str)
                .bind(token.as_str())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            (row.try_get("user_id"), row.try_get("expires_at_us"), row.try_get("revoked"))
                .try_into_tuple()
                .map_err(sqlite::map_sqlx_error)?
        }
    };

    Ok((user_id.parse::<UserId>()?, build_timestamp(expires_at_us)?, revoked))
}

/// Marks a refresh token as revoked.  Fails with `NotFound` when the token
/// does not exist.
pub(crate) async fn revoke_refresh_token(ex: &mut Executor, token: &RefreshToken) -> DbResult<()> {
    let done = match ex {
        Executor::Postgres(ex) => {
            let query_str = "UPDATE refresh_tokens SET revoked = TRUE WHERE token = $1";
            sqlx::query(query_str)
                .bind(token.as_str())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?
                .rows_affected()
        }

        Executor::Sqlite(ex) => {
            let query_str = "UPDATE refresh_tokens SET revoked = 1 WHERE token = ?";
            sqlx::query(query_str)
                .bind(token.as_str())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?
                .rows_affected()
        }
    };
    if done == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Persists `trip` for `owner`: the trip row plus one child row per stop
/// and per daily ledger.
pub(crate) async fn put_trip(ex: &mut Executor, owner: UserId, trip: &Trip) -> DbResult<()> {
    let places = to_json(&PlacesRecord {
        current: trip.current_place.clone(),
        pickup: trip.pickup_place.clone(),
        dropoff: trip.dropoff_place.clone(),
    })?;
    let route = to_json(&trip.route)?;
    let summary = to_json(&trip.summary)?;

    let done = match ex {
        Executor::Postgres(ex) => {
            let query_str = "INSERT INTO trips (id, user_id, current_location, pickup_location,
                    dropoff_location, current_cycle_hours, total_distance_miles,
                    total_driving_hours, total_days, places, route, summary, created_at_us)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)";
            sqlx::query(query_str)
                .bind(trip.id.to_string())
                .bind(owner.to_string())
                .bind(&trip.current_location)
                .bind(&trip.pickup_location)
                .bind(&trip.dropoff_location)
                .bind(trip.current_cycle_hours.as_f64())
                .bind(trip.summary.total_distance_miles)
                .bind(trip.summary.total_driving_hours)
                .bind(trip.summary.total_days as i32)
                .bind(&places)
                .bind(&route)
                .bind(&summary)
                .bind(unpack_timestamp(trip.created_at))
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?
                .rows_affected()
        }

        Executor::Sqlite(ex) => {
            let query_str = "INSERT INTO trips (id, user_id, current_location, pickup_location,
                    dropoff_location, current_cycle_hours, total_distance_miles,
                    total_driving_hours, total_days, places, route, summary, created_at_us)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";
            sqlx::query(query_str)
                .bind(trip.id.to_string())
                .bind(owner.to_string())
                .bind(&trip.current_location)
                .bind(&trip.pickup_location)
                .bind(&trip.dropoff_location)
                .bind(trip.current_cycle_hours.as_f64())
                .bind(trip.summary.total_distance_miles)
                .bind(trip.summary.total_driving_hours)
                .bind(trip.summary.total_days as i32)
                .bind(&places)
                .bind(&route)
                .bind(&summary)
                .bind(unpack_timestamp(trip.created_at))
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?
                .rows_affected()
        }
    };
    ensure_one_modified(done)?;

    for stop in &trip.stops {
        let data = to_json(stop)?;
        let done = match ex {
            Executor::Postgres(ex) => {
                let query_str = "INSERT INTO trip_stops (trip_id, ord, data) VALUES ($1, $2, $3)";
                sqlx::query(query_str)
                    .bind(trip.id.to_string())
                    .bind(stop.order as i32)
                    .bind(&data)
                    .execute(ex.conn())
                    .await
                    .map_err(postgres::map_sqlx_error)?
                    .rows_affected()
            }

            Executor::Sqlite(ex) => {
                let query_str = "INSERT INTO trip_stops (trip_id, ord, data) VALUES (?, ?, ?)";
                sqlx::query(query_str)
                    .bind(trip.id.to_string())
                    .bind(stop.order as i32)
                    .bind(&data)
                    .execute(ex.conn())
                    .await
                    .map_err(sqlite::map_sqlx_error)?
                    .rows_affected()
            }
        };
        ensure_one_modified(done)?;
    }

    for ledger in &trip.daily_logs {
        let data = to_json(ledger)?;
        let done = match ex {
            Executor::Postgres(ex) => {
                let query_str = "INSERT INTO trip_days (trip_id, day, data) VALUES ($1, $2, $3)";
                sqlx::query(query_str)
                    .bind(trip.id.to_string())
                    .bind(ledger.day_number as i32)
                    .bind(&data)
                    .execute(ex.conn())
                    .await
                    .map_err(postgres::map_sqlx_error)?
                    .rows_affected()
            }

            Executor::Sqlite(ex) => {
                let query_str = "INSERT INTO trip_days (trip_id, day, data) VALUES (?, ?, ?)";
                sqlx::query(query_str)
                    .bind(trip.id.to_string())
                    .bind(ledger.day_number as i32)
                    .bind(&data)
                    .execute(ex.conn())
                    .await
                    .map_err(sqlite::map_sqlx_error)?
                    .rows_affected()
            }
        };
        ensure_one_modified(done)?;
    }

    Ok(())
}

/// Fetches the trip `id` owned by `owner`, reassembling the aggregate from
/// its child rows.
pub(crate) async fn get_trip(ex: &mut Executor, owner: UserId, id: TripId) -> DbResult<Trip> {
    type TripRow = (String, String, String, f64, String, String, String, i64);
    let (
        current_location,
        pickup_location,
        dropoff_location,
        current_cycle_hours,
        places,
        route,
        summary,
        created_at_us,
    ): TripRow = match ex {
        Executor::Postgres(ex) => {
            let query_str = "SELECT current_location, pickup_location, dropoff_location,
                    current_cycle_hours, places, route, summary, created_at_us
                FROM trips WHERE id = $1 AND user_id = $2";
            let row = sqlx::query(query_str)
                .bind(id.to_string())
                .bind(owner.to_string())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            (
                row.try_get("current_location"),
                row.try_get("pickup_location"),
                row.try_get("dropoff_location"),
                row.try_get("current_cycle_hours"),
                row.try_get("places"),
                row.try_get("route"),
                row.try_get("summary"),
                row.try_get("created_at_us"),
            )
                .try_into_tuple()
                .map_err(postgres::map_sqlx_error)?
        }

        Executor::Sqlite(ex) => {
            let query_str = "SELECT current_location, pickup_location, dropoff_location,
                    current_cycle_hours, places, route, summary, created_at_us
                FROM trips WHERE id = ? AND user_id = ?";
            let row = sqlx::query(query_str)
                .bind(id.to_string())
                .bind(owner.to_string())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            (
                row.try_get("current_location"),
                row.try_get("pickup_location"),
                row.try_get("dropoff_location"),
                row.try_get("current_cycle_hours"),
                row.try_get("places"),
                row.try_get("route"),
                row.try_get("summary"),
                row.try_get("created_at_us"),
            )
                .try_into_tuple()
                .map_err(sqlite::map_sqlx_error)?
        }
    };

    let stops_raw: Vec<String> = match ex {
        Executor::Postgres(ex) => {
            let query_str = "SELECT data FROM trip_stops WHERE trip_id = $1 ORDER BY ord";
            let rows = sqlx::query(query_str)
                .bind(id.to_string())
                .fetch_all(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.into_iter()
                .map(|row| row.try_get("data"))
                .collect::<Result<_, _>>()
                .map_err(postgres::map_sqlx_error)?
        }

        Executor::Sqlite(ex) => {
            let query_str = "SELECT data FROM trip_stops WHERE trip_id = ? ORDER BY ord";
            let rows = sqlx::query(query_str)
                .bind(id.to_string())
                .fetch_all(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.into_iter()
                .map(|row| row.try_get("data"))
                .collect::<Result<_, _>>()
                .map_err(sqlite::map_sqlx_error)?
        }
    };

    let days_raw: Vec<String> = match ex {
        Executor::Postgres(ex) => {
            let query_str = "SELECT data FROM trip_days WHERE trip_id = $1 ORDER BY day";
            let rows = sqlx::query(query_str)
                .bind(id.to_string())
                .fetch_all(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.into_iter()
                .map(|row| row.try_get("data"))
                .collect::<Result<_, _>>()
                .map_err(postgres::map_sqlx_error)?
        }

        Executor::Sqlite(ex) => {
            let query_str = "SELECT data FROM trip_days WHERE trip_id = ? ORDER BY day";
            let rows = sqlx::query(query_str)
                .bind(id.to_string())
                .fetch_all(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.into_iter()
                .map(|row| row.try_get("data"))
                .collect::<Result<_, _>>()
                .map_err(sqlite::map_sqlx_error)?
        }
    };

    let places: PlacesRecord = parse_json(&places)?;
    let route: RoutePlan = parse_json(&route)?;
    let summary: TripSummary = parse_json(&summary)?;
    let stops: Vec<Stop> =
        stops_raw.iter().map(|raw| parse_json(raw)).collect::<DbResult<_>>()?;
    let daily_logs: Vec<DailyLedger> =
        days_raw.iter().map(|raw| parse_json(raw)).collect::<DbResult<_>>()?;

    Ok(Trip {
        id,
        current_location,
        pickup_location,
        dropoff_location,
        current_place: places.current,
        pickup_place: places.pickup,
        dropoff_place: places.dropoff,
        current_cycle_hours: CycleHours::new(current_cycle_hours)?,
        route,
        stops,
        daily_logs,
        summary,
        created_at: build_timestamp(created_at_us)?,
    })
}

/// Lists the trips owned by `owner`, newest first, in truncated form.
pub(crate) async fn list_trips(ex: &mut Executor, owner: UserId) -> DbResult<Vec<TripOverview>> {
    type OverviewRow = (String, String, String, String, f64, f64, i32, i64);
    let raw_rows: Vec<OverviewRow> = match ex {
        Executor::Postgres(ex) => {
            let query_str = "SELECT id, current_location, pickup_location, dropoff_location,
                    total_distance_miles, total_driving_hours, total_days, created_at_us
                FROM trips WHERE user_id = $1 ORDER BY created_at_us DESC";
            let rows = sqlx::query(query_str)
                .bind(owner.to_string())
                .fetch_all(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.into_iter()
                .map(|row| {
                    (
                        row.try_get("id"),
                        row.try_get("current_location"),
                        row.try_get("pickup_location"),
                        row.try_get("dropoff_location"),
                        row.try_get("total_distance_miles"),
                        row.try_get("total_driving_hours"),
                        row.try_get("total_days"),
                        row.try_get("created_at_us"),
                    )
                        .try_into_tuple()
                })
                .collect::<Result<_, _>>()
                .map_err(postgres::map_sqlx_error)?
        }

        Executor::Sqlite(ex) => {
            let query_str = "SELECT id, current_location, pickup_location, dropoff_location,
                    total_distance_miles, total_driving_hours, total_days, created_at_us
                FROM trips WHERE user_id = ? ORDER BY created_at_us DESC";
            let rows = sqlx::query(query_str)
                .bind(owner.to_string())
                .fetch_all(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.into_iter()
                .map(|row| {
                    (
                        row.try_get("id"),
                        row.try_get("current_location"),
                        row.try_get("pickup_location"),
                        row.try_get("dropoff_location"),
                        row.try_get("total_distance_miles"),
                        row.try_get("total_driving_hours"),
                        row.try_get("total_days"),
                        row.try_get("created_at_us"),
                    )
                        .try_into_tuple()
                })
                .collect::<Result<_, _>>()
                .map_err(sqlite::map_sqlx_error)?
        }
    };

    let mut overviews = Vec::with_capacity(raw_rows.len());
    for (id, current, pickup, dropoff, miles, hours, days, created_at_us) in raw_rows {
        overviews.push(TripOverview {
            id: id.parse::<TripId>()?,
            current_location: current,
            pickup_location: pickup,
            dropoff_location: dropoff,
            total_distance_miles: miles,
            total_driving_hours: hours,
            total_days: u32::try_from(days)
                .map_err(|e| DbError::DataIntegrityError(e.to_string()))?,
            created_at: build_timestamp(created_at_us)?,
        });
    }
    Ok(overviews)
}

/// Deletes the trip `id` owned by `owner` and all of its child rows.  Fails
/// with `NotFound` when the trip does not exist or belongs to someone else.
pub(crate) async fn delete_trip(ex: &mut Executor, owner: UserId, id: TripId) -> DbResult<()> {
    // Ownership check first so we never touch someone else's child rows.
    match ex {
        Executor::Postgres(ex) => {
            let query_str = "SELECT id FROM trips WHERE id = $1 AND user_id = $2";
            sqlx::query(query_str)
                .bind(id.to_string())
                .bind(owner.to_string())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
        }

        Executor::Sqlite(ex) => {
            let query_str = "SELECT id FROM trips WHERE id = ? AND user_id = ?";
            sqlx::query(query_str)
                .bind(id.to_string())
                .bind(owner.to_string())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
        }
    }

    for table in ["trip_stops", "trip_days"] {
        match ex {
            Executor::Postgres(ex) => {
                let query_str = format!("DELETE FROM {} WHERE trip_id = $1", table);
                sqlx::query(&query_str)
                    .bind(id.to_string())
                    .execute(ex.conn())
                    .await
                    .map_err(postgres::map_sqlx_error)?;
            }

            Executor::Sqlite(ex) => {
                let query_str = format!("DELETE FROM {} WHERE trip_id = ?", table);
                sqlx::query(&query_str)
                    .bind(id.to_string())
                    .execute(ex.conn())
                    .await
                    .map_err(sqlite::map_sqlx_error)?;
            }
        }
    }

    let done = match ex {
        Executor::Postgres(ex) => {
            let query_str = "DELETE FROM trips WHERE id = $1 AND user_id = $2";
            sqlx::query(query_str)
                .bind(id.to_string())
                .bind(owner.to_string())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?
                .rows_affected()
        }

        Executor::Sqlite(ex) => {
            let query_str = "DELETE FROM trips WHERE id = ? AND user_id = ?";
            sqlx::query(query_str)
                .bind(id.to_string())
                .bind(owner.to_string())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?
                .rows_affected()
        }
    };
    if done == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Helper to lift a tuple of per-column results into a result of a tuple.
trait TryIntoTuple {
    /// The tuple of unwrapped values.
    type Output;

    /// Returns the tuple of values or the first error among them.
    fn try_into_tuple(self) -> Result<Self::Output, sqlx::Error>;
}

macro_rules! try_into_tuple_for [
    ( $( $t:ident, $v:ident );+ ) => {
        impl<$($t),+> TryIntoTuple for ($(Result<$t, sqlx::Error>,)+) {
            type Output = ($($t,)+);

            fn try_into_tuple(self) -> Result<Self::Output, sqlx::Error> {
                let ($($v,)+) = self;
                Ok(($($v?,)+))
            }
        }
    }
];

try_into_tuple_for!(A, a);
try_into_tuple_for!(A, a; B, b);
try_into_tuple_for!(A, a; B, b; C, c);
try_into_tuple_for!(A, a; B, b; C, c; D, d);
try_into_tuple_for!(A, a; B, b; C, c; D, d; E, e);
try_into_tuple_for!(A, a; B, b; C, c; D, d; E, e; F, f);
try_into_tuple_for!(A, a; B, b; C, c; D, d; E, e; F, f; G, g);
try_into_tuple_for!(A, a; B, b; C, c; D, d; E, e; F, f; G, g; H, h);
