//! Test assertion helpers - fluent API for verifying responses
#![allow(dead_code)] // Test utilities may not all be used in every test

use axum::{
    http::{header, StatusCode},
    response::Response,
};

// ============================================================================
// Assertion Helpers
// ============================================================================

pub struct PageAssertion {
    status: StatusCode,
    location: Option<String>,
    body: String,
}

impl PageAssertion {
    /// Buffers the response so it can be checked several times
    pub async fn of(response: Response) -> Self {
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|value| value.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        Self {
            status,
            location,
            body: String::from_utf8(body.to_vec()).unwrap(),
        }
    }

    pub fn is_ok(self) -> Self {
        assert_eq!(self.status, StatusCode::OK, "body: {}", self.body);
        self
    }

    pub fn redirects_to(self, expected: &str) -> Self {
        assert_eq!(self.status, StatusCode::SEE_OTHER, "body: {}", self.body);
        assert_eq!(self.location.as_deref(), Some(expected));
        self
    }

    pub fn is_forbidden(self) -> Self {
        assert_eq!(self.status, StatusCode::FORBIDDEN);
        assert_eq!(self.body, "You are not authorized to do this.");
        self
    }

    pub fn is_not_found(self) -> Self {
        assert_eq!(self.status, StatusCode::NOT_FOUND);
        self
    }

    pub fn contains(self, text: &str) -> Self {
        assert!(
            self.body.contains(text),
            "expected page to contain {:?}",
            text
        );
        self
    }

    pub fn does_not_contain(self, text: &str) -> Self {
        assert!(
            !self.body.contains(text),
            "expected page not to contain {:?}",
            text
        );
        self
    }
}
