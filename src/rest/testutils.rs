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

//! Common test code for the REST server.

use crate::driver::testutils;
use crate::driver::TokenPair;
use crate::geo::MockRouter;
use crate::rest::{app, ErrorResponse};
use axum::body::Body;
use axum::Router;
use http::Request;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use tower::util::ServiceExt;

/// Maximum body size for testing purposes.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// State for a REST test: the driver context plus the router under test.
pub(crate) struct TestContext {
    /// The driver context backing the app.
    pub(crate) inner: testutils::TestContext,
}

impl TestContext {
    /// Builds a test app over mocks and an in-memory database.
    pub(crate) async fn setup() -> Self {
        Self { inner: testutils::TestContext::setup().await }
    }

    /// Builds a test app with a canned router.
    pub(crate) async fn setup_with_router(router: MockRouter) -> Self {
        Self { inner: testutils::TestContext::setup_with(router, Default::default()).await }
    }

    /// Returns the router under test.
    pub(crate) fn app(&self) -> Router {
        app(self.inner.driver.clone(), None).unwrap()
    }

    /// Registers a test account and returns its tokens.
    pub(crate) async fn register(&self, email: &str) -> TokenPair {
        let (_user, tokens) = self.inner.register_user(email).await;
        tokens
    }
}

/// Builder for a single request to the API server.
#[must_use]
pub(crate) struct OneShotBuilder {
    /// The router for the app being tested.
    app: Router,

    /// Builder for the request that will be sent to the app.
    builder: http::request::Builder,
}

impl OneShotBuilder {
    /// Creates a new request against a given `method`/`uri` pair served by
    /// an `app` router.
    pub(crate) fn new<U: AsRef<str>>(app: Router, (method, uri): (http::Method, U)) -> Self {
        let builder = Request::builder().method(method).uri(uri.as_ref());
        Self { app, builder }
    }

    /// Extends the URI in the request with a `query` string.
    pub(crate) fn with_raw_query(mut self, query: &str) -> Self {
        let uri = self.builder.uri_ref().unwrap().to_string();
        assert!(!uri.contains('?'), "URI already contains a query: {}", uri);
        self.builder = self.builder.uri(format!("{}?{}", uri, query));
        self
    }

    /// Adds bearer authentication to the request.
    pub(crate) fn with_bearer_auth<T: fmt::Display>(mut self, token: T) -> Self {
        self.builder =
            self.builder.header(http::header::AUTHORIZATION, format!("Bearer {}", token));
        self
    }

    /// Finishes building the request and sends it with an empty payload.
    pub(crate) async fn send_empty(self) -> ResponseChecker {
        let request = self.builder.body(Body::empty()).unwrap();
        ResponseChecker::from(self.app.oneshot(request).await.unwrap())
    }

    /// Finishes building the request and sends it with a JSON payload.
    pub(crate) async fn send_json<T: Serialize>(self, request: T) -> ResponseChecker {
        let request = self
            .builder
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&request).unwrap()))
            .unwrap();
        ResponseChecker::from(self.app.oneshot(request).await.unwrap())
    }
}

/// Type alias for the response type returned by the `oneshot` call.
type HttpResponse = http::Response<Body>;

/// Validator for the outcome of a request sent by a `OneShotBuilder`.
#[must_use]
pub(crate) struct ResponseChecker {
    /// Actual response that we received from the app.
    response: HttpResponse,

    /// Expected HTTP status code in the response above.
    exp_status: http::StatusCode,
}

impl From<HttpResponse> for ResponseChecker {
    fn from(response: HttpResponse) -> Self {
        Self { response, exp_status: http::StatusCode::OK }
    }
}

impl ResponseChecker {
    /// Sets the expected exit HTTP status to `status`.
    pub(crate) fn expect_status(mut self, status: http::StatusCode) -> Self {
        self.exp_status = status;
        self
    }

    /// Performs common validation operations on the response.
    fn verify(&self) {
        assert_eq!(self.exp_status, self.response.status());
    }

    /// Finishes checking the response and expects it to contain an empty
    /// body.
    pub(crate) async fn expect_empty(self) {
        self.verify();

        let body = axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.is_empty(), "Body not empty; got {}", body);
    }

    /// Finishes checking the response and expects its body to be an
    /// `ErrorResponse` with code `exp_code` and a message containing
    /// `exp_fragment`.  Returns the structured details for further checks.
    pub(crate) async fn expect_error(
        self,
        exp_code: crate::rest::ErrorCode,
        exp_fragment: &str,
    ) -> serde_json::Value {
        self.verify();

        let body = axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
        let response: ErrorResponse = match serde_json::from_slice(&body) {
            Ok(response) => response,
            Err(e) => {
                let body = String::from_utf8(body.to_vec()).unwrap();
                panic!("Invalid error response due to {}; content was {}", e, body);
            }
        };
        assert_eq!(exp_code, response.code);
        assert!(
            response.error.contains(exp_fragment),
            "Error '{}' does not contain '{}'",
            response.error,
            exp_fragment
        );
        response.details
    }

    /// Finishes checking the response and expects it to contain a valid
    /// JSON object of type `T`.
    pub(crate) async fn expect_json<T: DeserializeOwned>(self) -> T {
        self.verify();

        let body = axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
        match serde_json::from_slice::<T>(&body) {
            Ok(value) => value,
            Err(e) => {
                let body = String::from_utf8(body.to_vec()).unwrap();
                panic!("Invalid response due to {}; content was {}", e, body);
            }
        }
    }
}
