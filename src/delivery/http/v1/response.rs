use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Serialize)]
struct Envelope<'a, T> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
    data: BTreeMap<&'static str, T>,
}

/// `{"status":"success", "results"?, "token"?, "data": {<key>: ...}}`
pub struct Success<T> {
    status: StatusCode,
    key: &'static str,
    data: T,
    results: Option<usize>,
    token: Option<String>,
}

impl<T: Serialize> Success<T> {
    pub fn ok(key: &'static str, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            key,
            data,
            results: None,
            token: None,
        }
    }

    pub fn created(key: &'static str, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(key, data)
        }
    }

    pub fn with_results(mut self, results: usize) -> Self {
        self.results = Some(results);
        self
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }
}

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        let envelope = Envelope {
            status: "success",
            results: self.results,
            token: self.token.as_deref(),
            data: BTreeMap::from([(self.key, self.data)]),
        };
        (self.status, Json(envelope)).into_response()
    }
}

pub fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_listing_envelope() {
        let response = Success::ok("data", vec![1, 2]).with_results(2).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"status": "success", "results": 2, "data": {"data": [1, 2]}})
        );
    }

    #[tokio::test]
    async fn test_created_with_token() {
        let response = Success::created("user", json!({"name": "Jonas"}))
            .with_token("abc".to_string())
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            body_json(response).await,
            json!({"status": "success", "token": "abc", "data": {"user": {"name": "Jonas"}}})
        );
    }
}
