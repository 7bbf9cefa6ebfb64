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

//! Account operations: register, login, refresh, and logout.
//!
//! Access tokens are short-lived and stored server-side.  Refresh tokens
//! are long-lived, rotated on every use, and revocable; presenting a
//! rotated token fails.

use crate::db::{self, DbError, TxExecutor};
use crate::driver::{Driver, DriverError, DriverResult};
use crate::model::{AccessToken, EmailAddress, Password, RefreshToken, User, UserId};
use serde::Serialize;

/// A freshly issued access and refresh token pair.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    /// Short-lived token to authenticate API calls with.
    pub access: AccessToken,

    /// Long-lived token to obtain the next pair with.
    pub refresh: RefreshToken,
}

impl Driver {
    /// Issues a fresh token pair for `user_id` within the transaction.
    async fn issue_tokens(&self, tx: &mut TxExecutor, user_id: UserId) -> DriverResult<TokenPair> {
        let now = self.clock.now_utc();

        let access = AccessToken::generate();
        db::put_session(tx.ex(), &access, user_id, now + self.opts.access_token_ttl).await?;

        let refresh = RefreshToken::generate();
        db::put_refresh_token(tx.ex(), &refresh, user_id, now + self.opts.refresh_token_ttl)
            .await?;

        Ok(TokenPair { access, refresh })
    }

    /// Registers a new account and logs it in.
    pub async fn register(
        self,
        email: EmailAddress,
        password: Password,
        name: String,
    ) -> DriverResult<(User, TokenPair)> {
        let name = name.trim().to_owned();
        if name.is_empty() {
            return Err(DriverError::InvalidInput("Name cannot be empty".to_owned()));
        }
        let hash = password.hash()?;

        let mut tx = self.db.begin().await?;

        let user = User::new(UserId::generate(), email, name);
        match db::create_user(tx.ex(), &user, &hash, self.clock.now_utc()).await {
            Ok(()) => (),
            Err(DbError::AlreadyExists) => {
                return Err(DriverError::AlreadyExists(format!(
                    "An account for {} already exists",
                    user.email()
                )));
            }
            Err(e) => return Err(e.into()),
        }

        let tokens = self.issue_tokens(&mut tx, *user.id()).await?;
        tx.commit().await?;
        Ok((user, tokens))
    }

    /// Logs a user in with `email` and `password`.
    pub async fn login(
        self,
        email: EmailAddress,
        password: Password,
    ) -> DriverResult<(User, TokenPair)> {
        let mut tx = self.db.begin().await?;

        let (user, hash) = match db::get_user_by_email(tx.ex(), &email).await {
            Ok(found) => found,
            Err(DbError::NotFound) => {
                // Same message as a bad password so the endpoint does not
                // reveal which accounts exist.
                return Err(DriverError::Unauthorized("Invalid credentials".to_owned()));
            }
            Err(e) => return Err(e.into()),
        };

        if !password.verify(&hash)? {
            return Err(DriverError::Unauthorized("Invalid credentials".to_owned()));
        }

        let tokens = self.issue_tokens(&mut tx, *user.id()).await?;
        tx.commit().await?;
        Ok((user, tokens))
    }

    /// Exchanges a refresh token for a fresh token pair, rotating it.
    pub async fn refresh(self, token: RefreshToken) -> DriverResult<TokenPair> {
        let mut tx = self.db.begin().await?;

        let (user_id, expires_at, revoked) = match db::get_refresh_token(tx.ex(), &token).await {
            Ok(found) => found,
            Err(DbError::NotFound) => {
                return Err(DriverError::Unauthorized("Invalid refresh token".to_owned()));
            }
            Err(e) => return Err(e.into()),
        };

        if revoked {
            return Err(DriverError::Unauthorized(
                "Refresh token has been revoked; please log in again".to_owned(),
            ));
        }
        if self.clock.now_utc() > expires_at {
            return Err(DriverError::Unauthorized(
                "Refresh token expired; please log in again".to_owned(),
            ));
        }

        db::revoke_refresh_token(tx.ex(), &token).await?;
        let tokens = self.issue_tokens(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(tokens)
    }

    /// Logs a user out: revokes the presented refresh token and deletes the
    /// current access session.
    pub async fn logout(
        self,
        access_token: AccessToken,
        refresh_token: RefreshToken,
    ) -> DriverResult<()> {
        let mut tx = self.db.begin().await?;

        let user = self.get_session(tx.ex(), &access_token).await?;

        let (owner, _expires_at, _revoked) =
            match db::get_refresh_token(tx.ex(), &refresh_token).await {
                Ok(found) => found,
                Err(DbError::NotFound) => {
                    return Err(DriverError::InvalidInput("Unknown refresh token".to_owned()));
                }
                Err(e) => return Err(e.into()),
            };
        if owner != *user.id() {
            return Err(DriverError::Forbidden(
                "Refresh token belongs to a different account".to_owned(),
            ));
        }

        db::revoke_refresh_token(tx.ex(), &refresh_token).await?;
        db::delete_session(tx.ex(), &access_token).await?;
        tx.commit().await?;
        Ok(())
    }
}
