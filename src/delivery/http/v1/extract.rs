use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::extract::rejection::FormRejection;
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum_extra::extract::Multipart;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::delivery::http::v1::middleware::CurrentUser;
use crate::domain::user::User;
use crate::usecase::error::UsecaseError;
use crate::usecase::query::QueryParams;

/// JSON body whose rejections surface as validation failures.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = UsecaseError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection, "rejected request body");
                Err(body_rejection(rejection.status(), rejection.body_text()))
            }
        }
    }
}

fn body_rejection(status: StatusCode, text: String) -> UsecaseError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        UsecaseError::PayloadTooLarge("Request body is too large".to_string())
    } else {
        UsecaseError::Validation(text)
    }
}

/// Url-encoded form body; rejections surface as validation failures.
pub struct AppForm<T>(pub T);

impl<S, T> FromRequest<S> for AppForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = UsecaseError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        axum::Form::<T>::from_request(req, state)
            .await
            .map(|axum::Form(value)| Self(value))
            .map_err(|rejection: FormRejection| {
                tracing::debug!(error = %rejection, "rejected form body");
                body_rejection(rejection.status(), rejection.body_text())
            })
    }
}

/// JSON body, or `multipart/form-data` when the request carries files.
pub enum JsonOrMultipart<T> {
    Json(T),
    Multipart(Multipart),
}

impl<S, T> FromRequest<S> for JsonOrMultipart<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = UsecaseError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if !is_multipart {
            let AppJson(value) = AppJson::<T>::from_request(req, state).await?;
            return Ok(Self::Json(value));
        }

        Multipart::from_request(req, state)
            .await
            .map(Self::Multipart)
            .map_err(|rejection| {
                tracing::debug!(error = %rejection, "rejected multipart body");
                UsecaseError::Validation(format!("Failed to read multipart: {rejection}"))
            })
    }
}

/// Raw query-string pairs in request order, repeated keys included.
impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = UsecaseError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map_err(|e| UsecaseError::Validation(e.body_text()))?;
        Ok(QueryParams(pairs))
    }
}

/// Single `{id}` path segment that must be a UUID.
#[derive(Debug, Clone, Copy)]
pub struct ResourceId(pub Uuid);

impl<S> FromRequestParts<S> for ResourceId
where
    S: Send + Sync,
{
    type Rejection = UsecaseError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| UsecaseError::Validation(e.body_text()))?;

        Uuid::parse_str(&raw)
            .map(Self)
            .map_err(|_| UsecaseError::NotFound(format!("Invalid id: {raw}")))
    }
}

/// The signed-in user when `identify` recognised one.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<User>);

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<CurrentUser>()
                .map(|current| current.0.clone()),
        ))
    }
}
