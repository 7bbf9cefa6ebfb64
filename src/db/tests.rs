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

//! Tests for the persistence layer, run against an in-memory SQLite
//! database.

use crate::db::sqlite::testutils::setup;
use crate::db::*;
use crate::geo::TruckStopLocator;
use crate::logbook::project;
use crate::model::{
    AccessToken, CycleHours, EmailAddress, NamedPlace, Password, RefreshToken, Trip, TripId, User,
    UserId,
};
use crate::rules::PROPERTY_CARRYING_70H_8D;
use crate::scheduler::{plan_trip, TripPlan};
use sqlx::Row as _;
use time::macros::datetime;

/// Creates a user with canned values and returns it.
async fn make_user(ex: &mut Executor, email: &str) -> User {
    let user =
        User::new(UserId::generate(), EmailAddress::new(email).unwrap(), "Test Driver".to_owned());
    let password = Password::from("secret password").hash().unwrap();
    create_user(ex, &user, &password, datetime!(2026-01-17 00:00:00 UTC)).await.unwrap();
    user
}

/// Builds a fully planned trip for persistence tests.
fn make_trip(created_at: time::OffsetDateTime) -> Trip {
    use crate::model::{Coordinate, RoutePlan};

    let chicago = NamedPlace::new("Chicago", "Chicago, IL", Coordinate::new(41.8781, -87.6298));
    let milwaukee =
        NamedPlace::new("Milwaukee", "Milwaukee, WI", Coordinate::new(43.0389, -87.9065));
    let madison = NamedPlace::new("Madison", "Madison, WI", Coordinate::new(43.0731, -89.4012));

    let plan = TripPlan {
        start_time: datetime!(2026-01-17 06:30:00 -06:00),
        start_place: chicago.clone(),
        pickup_place: milwaukee.clone(),
        dropoff_place: madison.clone(),
        seg_to_pickup: crate::model::RouteSegment::new(
            chicago.clone(),
            milwaukee.clone(),
            93.0,
            1.75,
            None,
        )
        .unwrap(),
        seg_to_dropoff: crate::model::RouteSegment::new(
            milwaukee.clone(),
            madison.clone(),
            80.0,
            1.5,
            None,
        )
        .unwrap(),
        opening_cycle_hours: CycleHours::new(10.0).unwrap(),
    };
    let schedule = plan_trip(&PROPERTY_CARRYING_70H_8D, &TruckStopLocator::new(), &plan);
    let daily_logs = project(&schedule.activities, plan.start_time.offset());

    Trip {
        id: TripId::generate(),
        current_location: "Chicago, IL".to_owned(),
        pickup_location: "Milwaukee, WI".to_owned(),
        dropoff_location: "Madison, WI".to_owned(),
        current_place: chicago,
        pickup_place: milwaukee,
        dropoff_place: madison,
        current_cycle_hours: CycleHours::new(10.0).unwrap(),
        route: RoutePlan {
            polyline: "_p~iF~ps|U".to_owned(),
            segments: vec![plan.seg_to_pickup.clone(), plan.seg_to_dropoff.clone()],
        },
        stops: schedule.stops,
        daily_logs,
        summary: schedule.summary,
        created_at,
    }
}

#[tokio::test]
async fn test_create_user_and_get_by_email() {
    let db = setup().await;
    let mut ex = db.ex().await.unwrap();

    let user = make_user(&mut ex, "driver@example.com").await;

    let (fetched, hash) =
        get_user_by_email(&mut ex, &EmailAddress::new("driver@example.com").unwrap())
            .await
            .unwrap();
    assert_eq!(user, fetched);
    assert!(Password::from("secret password").verify(&hash).unwrap());

    drop(ex);
    db.close().await;
}

#[tokio::test]
async fn test_create_user_duplicate_email() {
    let db = setup().await;
    let mut ex = db.ex().await.unwrap();

    let _user = make_user(&mut ex, "driver@example.com").await;

    let dupe = User::new(
        UserId::generate(),
        EmailAddress::new("driver@example.com").unwrap(),
        "Other".to_owned(),
    );
    let password = Password::from("x").hash().unwrap();
    assert_eq!(
        DbError::AlreadyExists,
        create_user(&mut ex, &dupe, &password, datetime!(2026-01-17 00:00:00 UTC))
            .await
            .unwrap_err()
    );

    drop(ex);
    db.close().await;
}

#[tokio::test]
async fn test_get_user_by_id_missing() {
    let db = setup().await;
    let mut ex = db.ex().await.unwrap();

    assert_eq!(DbError::NotFound, get_user_by_id(&mut ex, UserId::generate()).await.unwrap_err());

    drop(ex);
    db.close().await;
}

#[tokio::test]
async fn test_sessions_lifecycle() {
    let db = setup().await;
    let mut ex = db.ex().await.unwrap();

    let user = make_user(&mut ex, "driver@example.com").await;
    let token = AccessToken::generate();
    let expires_at = datetime!(2026-01-17 01:00:00 UTC);

    put_session(&mut ex, &token, *user.id(), expires_at).await.unwrap();
    let (owner, expiry) = get_session(&mut ex, &token).await.unwrap();
    assert_eq!(*user.id(), owner);
    assert_eq!(expires_at, expiry);

    delete_session(&mut ex, &token).await.unwrap();
    assert_eq!(DbError::NotFound, get_session(&mut ex, &token).await.unwrap_err());

    // Deleting a missing session is not an error.
    delete_session(&mut ex, &token).await.unwrap();

    drop(ex);
    db.close().await;
}

#[tokio::test]
async fn test_refresh_token_revocation() {
    let db = setup().await;
    let mut ex = db.ex().await.unwrap();

    let user = make_user(&mut ex, "driver@example.com").await;
    let token = RefreshToken::generate();
    let expires_at = datetime!(2026-01-31 00:00:00 UTC);

    put_refresh_token(&mut ex, &token, *user.id(), expires_at).await.unwrap();
    let (owner, expiry, revoked) = get_refresh_token(&mut ex, &token).await.unwrap();
    assert_eq!(*user.id(), owner);
    assert_eq!(expires_at, expiry);
    assert!(!revoked);

    revoke_refresh_token(&mut ex, &token).await.unwrap();
    let (_owner, _expiry, revoked) = get_refresh_token(&mut ex, &token).await.unwrap();
    assert!(revoked);

    assert_eq!(
        DbError::NotFound,
        revoke_refresh_token(&mut ex, &RefreshToken::generate()).await.unwrap_err()
    );

    drop(ex);
    db.close().await;
}

#[tokio::test]
async fn test_trip_round_trip() {
    let db = setup().await;
    let mut ex = db.ex().await.unwrap();

    let user = make_user(&mut ex, "driver@example.com").await;
    let trip = make_trip(datetime!(2026-01-17 12:45:00 UTC));

    put_trip(&mut ex, *user.id(), &trip).await.unwrap();
    let fetched = get_trip(&mut ex, *user.id(), trip.id).await.unwrap();
    assert_eq!(trip, fetched);

    drop(ex);
    db.close().await;
}

#[tokio::test]
async fn test_trip_not_visible_to_other_owner() {
    let db = setup().await;
    let mut ex = db.ex().await.unwrap();

    let owner = make_user(&mut ex, "driver@example.com").await;
    let other = make_user(&mut ex, "other@example.com").await;
    let trip = make_trip(datetime!(2026-01-17 12:45:00 UTC));
    put_trip(&mut ex, *owner.id(), &trip).await.unwrap();

    assert_eq!(DbError::NotFound, get_trip(&mut ex, *other.id(), trip.id).await.unwrap_err());
    assert_eq!(DbError::NotFound, delete_trip(&mut ex, *other.id(), trip.id).await.unwrap_err());
    assert!(list_trips(&mut ex, *other.id()).await.unwrap().is_empty());

    // The owner still sees it after the other user's failed attempts.
    get_trip(&mut ex, *owner.id(), trip.id).await.unwrap();

    drop(ex);
    db.close().await;
}

#[tokio::test]
async fn test_list_trips_newest_first() {
    let db = setup().await;
    let mut ex = db.ex().await.unwrap();

    let user = make_user(&mut ex, "driver@example.com").await;
    let older = make_trip(datetime!(2026-01-17 12:45:00 UTC));
    let newer = make_trip(datetime!(2026-01-18 09:00:00 UTC));
    put_trip(&mut ex, *user.id(), &older).await.unwrap();
    put_trip(&mut ex, *user.id(), &newer).await.unwrap();

    let overviews = list_trips(&mut ex, *user.id()).await.unwrap();
    assert_eq!(2, overviews.len());
    assert_eq!(newer.id, overviews[0].id);
    assert_eq!(older.id, overviews[1].id);
    assert_eq!("Chicago, IL", overviews[0].current_location);
    assert_eq!(older.summary.total_days, overviews[1].total_days);

    drop(ex);
    db.close().await;
}

#[tokio::test]
async fn test_delete_trip_removes_children() {
    let db = setup().await;

    let user;
    let trip;
    {
        let mut ex = db.ex().await.unwrap();
        user = make_user(&mut ex, "driver@example.com").await;
        trip = make_trip(datetime!(2026-01-17 12:45:00 UTC));
        put_trip(&mut ex, *user.id(), &trip).await.unwrap();
    }

    {
        let mut tx = db.begin().await.unwrap();
        delete_trip(tx.ex(), *user.id(), trip.id).await.unwrap();
        tx.commit().await.unwrap();
    }

    {
        let mut ex = db.ex().await.unwrap();
        assert_eq!(DbError::NotFound, get_trip(&mut ex, *user.id(), trip.id).await.unwrap_err());
        assert_eq!(
            DbError::NotFound,
            delete_trip(&mut ex, *user.id(), trip.id).await.unwrap_err()
        );

        // No orphaned child rows survive.
        let count = match &mut ex {
            Executor::Sqlite(ex) => {
                let row = sqlx::query(
                    "SELECT COUNT(*) AS count FROM trip_stops WHERE trip_id = ?",
                )
                .bind(trip.id.to_string())
                .fetch_one(ex.conn())
                .await
                .unwrap();
                row.try_get::<i64, _>("count").unwrap()
            }
            _ => unreachable!(),
        };
        assert_eq!(0, count);
    }

    db.close().await;
}
