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

//! Data types for accounts, credentials, and tokens.

use crate::model::{ModelError, ModelResult};
use derive_getters::Getters;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Length of our opaque tokens, in characters.
///
/// This is not customizable because the size is replicated in the database
/// schema and cannot change at runtime.
const TOKEN_LENGTH: usize = 64;

/// Unique identifier of a user account.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates an identifier from a raw UUID.
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for UserId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<Uuid>() {
            Ok(id) => Ok(Self(id)),
            Err(e) => Err(ModelError(format!("Invalid user id: {}", e))),
        }
    }
}

/// A syntactically plausible email address, stored lowercase.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a new email address after validating its shape.
    pub fn new<S: Into<String>>(email: S) -> ModelResult<Self> {
        let email = email.into().trim().to_lowercase();
        match email.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') =>
            {
                Ok(Self(email))
            }
            _ => Err(ModelError(format!("Invalid email address '{}'", email))),
        }
    }

    /// Returns the address as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = ModelError;

    fn try_from(email: String) -> ModelResult<Self> {
        EmailAddress::new(email)
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque type to hold a password, protecting it from leaking into logs.
#[derive(Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
#[cfg_attr(test, derive(Clone))]
pub struct Password(String);

impl Password {
    /// Creates a new password from a literal string.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();
        if s.is_empty() {
            return Err(ModelError("Password cannot be empty".to_owned()));
        }
        if s.len() > 72 {
            // bcrypt ignores everything past this point.
            return Err(ModelError("Password is too long".to_owned()));
        }
        Ok(Password(s))
    }

    /// Hashes the password.  Consumes it because there is no context in
    /// which keeping the password alive once we have its hash is correct.
    pub fn hash(self) -> ModelResult<HashedPassword> {
        let hashed = bcrypt::hash(self.0, bcrypt::DEFAULT_COST)
            .map_err(|e| ModelError(format!("Password error: {}", e)))?;
        Ok(HashedPassword::new(hashed))
    }

    /// Verifies if this password matches a given `hash`.
    pub fn verify(self, hash: &HashedPassword) -> ModelResult<bool> {
        bcrypt::verify(self.0, hash.as_str())
            .map_err(|e| ModelError(format!("Password error: {}", e)))
    }
}

#[cfg(test)]
impl From<&'static str> for Password {
    /// Creates a new password from a hardcoded string, which must be valid.
    fn from(s: &'static str) -> Self {
        Password::new(s).expect("Hardcoded passwords must be valid")
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scrubbed password")
    }
}

/// An opaque type to hold a hashed password, protecting it from leaking into
/// logs.
#[derive(Clone, PartialEq)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// Creates a new hashed password from a literal string.
    pub fn new<S: Into<String>>(s: S) -> Self {
        HashedPassword(s.into())
    }

    /// Returns a string view of the hash.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scrubbed hash")
    }
}

/// Generates a random alphanumeric token of `TOKEN_LENGTH` characters.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let mut token = String::with_capacity(TOKEN_LENGTH);
    for _ in 0..TOKEN_LENGTH {
        let i = rng.gen_range(0..(10 + 26 + 26));
        let ch = if i < 10 {
            (b'0' + i) as char
        } else if i < 10 + 26 {
            (b'a' + (i - 10)) as char
        } else {
            (b'A' + (i - 10 - 26)) as char
        };
        token.push(ch);
    }
    token
}

/// Validates that a raw token has the right length and alphabet.
fn validate_token(token: &str) -> ModelResult<()> {
    if token.len() != TOKEN_LENGTH || !token.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        return Err(ModelError("Invalid token".to_owned()));
    }
    Ok(())
}

/// An opaque, short-lived token granting access to the API.
#[derive(Clone, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Creates a new access token from its raw representation.
    pub fn new<S: Into<String>>(token: S) -> ModelResult<Self> {
        let token = token.into();
        validate_token(&token)?;
        Ok(Self(token))
    }

    /// Generates a new random access token.
    pub fn generate() -> Self {
        Self::new(generate_token()).expect("Auto-generated tokens must be valid")
    }

    /// Returns the string representation of the token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scrubbed access token")
    }
}

/// An opaque, long-lived token that can be exchanged for a fresh access
/// token.  Rotated on every use and revocable.
#[derive(Clone, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RefreshToken(String);

impl RefreshToken {
    /// Creates a new refresh token from its raw representation.
    pub fn new<S: Into<String>>(token: S) -> ModelResult<Self> {
        let token = token.into();
        validate_token(&token)?;
        Ok(Self(token))
    }

    /// Generates a new random refresh token.
    pub fn generate() -> Self {
        Self::new(generate_token()).expect("Auto-generated tokens must be valid")
    }

    /// Returns the string representation of the token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scrubbed refresh token")
    }
}

/// A registered account.
#[derive(Clone, Debug, Getters, PartialEq, Serialize)]
pub struct User {
    /// Unique identifier of the account.
    id: UserId,

    /// Email address the account registered with.
    email: EmailAddress,

    /// Display name of the driver.
    name: String,
}

impl User {
    /// Creates a new user from its parts.
    pub fn new(id: UserId, email: EmailAddress, name: String) -> Self {
        Self { id, email, name }
    }
}
