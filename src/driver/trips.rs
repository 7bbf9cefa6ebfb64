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

//! Extends the driver with the trip retrieval and deletion methods.

use crate::db::{self, DbError};
use crate::driver::{Driver, DriverError, DriverResult};
use crate::model::{AccessToken, Trip, TripId, TripOverview};

impl Driver {
    /// Lists the caller's trips, newest first, in truncated form.
    pub async fn list_trips(self, token: AccessToken) -> DriverResult<Vec<TripOverview>> {
        let mut ex = self.db.ex().await?;
        let user = self.get_session(&mut ex, &token).await?;
        Ok(db::list_trips(&mut ex, *user.id()).await?)
    }

    /// Fetches one of the caller's trips in full, ledgers included.
    pub async fn get_trip(self, token: AccessToken, id: TripId) -> DriverResult<Trip> {
        let mut ex = self.db.ex().await?;
        let user = self.get_session(&mut ex, &token).await?;
        match db::get_trip(&mut ex, *user.id(), id).await {
            Ok(trip) => Ok(trip),
            Err(DbError::NotFound) => {
                Err(DriverError::NotFound(format!("Trip {} not found", id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes one of the caller's trips and its dependent rows.
    pub async fn delete_trip(self, token: AccessToken, id: TripId) -> DriverResult<()> {
        let mut tx = self.db.begin().await?;
        let user = self.get_session(tx.ex(), &token).await?;
        match db::delete_trip(tx.ex(), *user.id(), id).await {
            Ok(()) => (),
            Err(DbError::NotFound) => {
                return Err(DriverError::NotFound(format!("Trip {} not found", id)));
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit().await?;
        Ok(())
    }
}
