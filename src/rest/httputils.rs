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

//! Utilities to deal with HTTP authorization.

use crate::model::AccessToken;
use crate::rest::{RestError, RestResult};
use http::header::HeaderMap;

/// Extracts the header `name` from `headers` and ensures it has at most one
/// value.
fn get_unique_header<'a>(headers: &'a HeaderMap, name: &str) -> RestResult<Option<&'a str>> {
    let mut iter = headers.get_all(name).iter();
    let value = match iter.next() {
        Some(value) => value,
        None => return Ok(None),
    };
    if iter.next().is_some() {
        return Err(RestError::InvalidRequest(format!(
            "Header {} cannot have more than one value",
            name
        )));
    }
    match value.to_str() {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            Err(RestError::InvalidRequest(format!("Bad encoding in header {}: {}", name, e)))
        }
    }
}

/// Assumes that the `headers` carry a bearer access token and extracts it.
pub(crate) fn get_bearer_auth(headers: &HeaderMap) -> RestResult<AccessToken> {
    let authz = match get_unique_header(headers, "Authorization") {
        Ok(Some(value)) => value,
        Ok(None) => {
            return Err(RestError::Unauthorized("Missing Authorization header".to_owned()));
        }
        Err(e) => return Err(RestError::Unauthorized(e.to_string())),
    };

    let mut fields = authz.splitn(2, ' ');
    let scheme = match fields.next() {
        Some(s) if !s.is_empty() => s,
        _ => {
            return Err(RestError::Unauthorized(
                "Bad Authorization header: missing scheme".to_owned(),
            ));
        }
    };
    let payload = match fields.next() {
        Some(s) => s,
        None => {
            return Err(RestError::Unauthorized(
                "Bad Authorization header: missing payload".to_owned(),
            ));
        }
    };

    if scheme != "Bearer" {
        return Err(RestError::Unauthorized("Unsupported authorization scheme".to_owned()));
    }

    match AccessToken::new(payload) {
        Ok(token) => Ok(token),
        Err(e) => Err(RestError::Unauthorized(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_get_bearer_auth_ok() {
        let token = AccessToken::generate();

        let mut headers = HeaderMap::new();
        headers.append("Authorization", format!("Bearer {}", token.as_str()).parse().unwrap());
        assert_eq!(token, get_bearer_auth(&headers).unwrap());
    }

    /// Runs `get_bearer_auth` with an invalid set of header `values` and
    /// ensures that the call fails with an `Unauthorized` error mentioning
    /// `exp_error`.
    fn do_bearer_auth_error_test(exp_error: &str, values: &[&[u8]]) {
        let mut headers = HeaderMap::new();
        for value in values {
            headers.append("Authorization", HeaderValue::from_bytes(value).unwrap());
        }
        match get_bearer_auth(&headers) {
            Err(RestError::Unauthorized(message)) => {
                assert!(
                    message.contains(exp_error),
                    "message '{}' does not contain '{}'",
                    message,
                    exp_error
                );
            }
            e => panic!("{:?}", e),
        }
    }

    #[test]
    fn test_get_bearer_auth_missing() {
        do_bearer_auth_error_test("Missing Authorization", &[]);
    }

    #[test]
    fn test_get_bearer_auth_duplicate() {
        do_bearer_auth_error_test("cannot have more than one value", &[b"abc", b"def"]);
    }

    #[test]
    fn test_get_bearer_auth_missing_scheme() {
        do_bearer_auth_error_test("missing scheme", &[b""]);
    }

    #[test]
    fn test_get_bearer_auth_missing_payload() {
        do_bearer_auth_error_test("missing payload", &[b"Bearer"]);
    }

    #[test]
    fn test_get_bearer_auth_unsupported_scheme() {
        do_bearer_auth_error_test("Unsupported authorization scheme", &[b"Basic dXNlcjpwdw=="]);
    }

    #[test]
    fn test_get_bearer_auth_malformed_token() {
        do_bearer_auth_error_test("Invalid token", &[b"Bearer xxx"]);
    }
}
