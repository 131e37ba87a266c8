use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::AppState;
use crate::delivery::http::views;
use crate::domain::user::{Role, User};
use crate::usecase::error::{ErrorReport, UsecaseError, status_label};

pub const JWT_COOKIE: &str = "jwt";

#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Bearer header first, then the `jwt` cookie.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(JWT_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

pub async fn protect(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, UsecaseError> {
    let Some(token) = session_token(request.headers()) else {
        tracing::warn!("missing session token");
        return Err(UsecaseError::unauthorized());
    };

    let user = state.auth_usecase.authenticate(&token).await?;

    tracing::debug!(user_id = %user.id, role = %user.role, "user authenticated");
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Attaches the user behind a valid session cookie. Never rejects.
pub async fn identify(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = CookieJar::from_headers(request.headers())
        .get(JWT_COOKIE)
        .map(|cookie| cookie.value().to_string());

    if let Some(token) = token {
        match state.auth_usecase.authenticate(&token).await {
            Ok(user) => {
                request.extensions_mut().insert(CurrentUser(user));
            }
            Err(e) => tracing::debug!(error = %e, "ignoring session cookie"),
        }
    }

    next.run(request).await
}

/// Roles permitted past `restrict_to`.
#[derive(Clone, Copy, Debug)]
pub struct AllowedRoles(&'static [Role]);

impl AllowedRoles {
    pub const ADMIN: Self = Self(&[Role::Admin]);
    pub const STAFF: Self = Self(&[Role::Admin, Role::LeadGuide]);
    pub const GUIDES: Self = Self(&[Role::Admin, Role::LeadGuide, Role::Guide]);
    pub const USER: Self = Self(&[Role::User]);
    pub const REVIEWERS: Self = Self(&[Role::User, Role::Admin]);

    pub const fn new(roles: &'static [Role]) -> Self {
        Self(roles)
    }

    pub fn permits(&self, role: Role) -> bool {
        self.0.contains(&role)
    }
}

/// Runs after `protect`; rejects principals outside the allowed set.
pub async fn restrict_to(
    State(roles): State<AllowedRoles>,
    request: Request,
    next: Next,
) -> Result<Response, UsecaseError> {
    let Some(CurrentUser(user)) = request.extensions().get::<CurrentUser>() else {
        return Err(UsecaseError::unauthorized());
    };

    if !roles.permits(user.role) {
        tracing::warn!(user_id = %user.id, role = %user.role, "role not permitted");
        return Err(UsecaseError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

/// Re-renders failures for the running mode and for API or page requests.
pub async fn format_errors(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let is_api = request.uri().path().starts_with("/api");
    let response = next.run(request).await;

    let Some(report) = response.extensions().get::<ErrorReport>().cloned() else {
        return response;
    };
    let development = state.environment.is_development();

    if !is_api {
        let message = if development || report.operational {
            report.message.as_str()
        } else {
            "Please try again later"
        };
        return views::error_page(report.status, message);
    }

    if development {
        let body = json!({
            "status": status_label(report.status),
            "error": {
                "kind": report.kind,
                "detail": report.detail,
            },
            "message": report.message,
        });
        return (report.status, Json(body)).into_response();
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum::http::header::COOKIE;

    #[test]
    fn test_bearer_token_preferred_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        headers.insert(COOKIE, HeaderValue::from_static("jwt=cookie-token"));

        assert_eq!(session_token(&headers), Some("header-token".to_string()));
    }

    #[test]
    fn test_cookie_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; jwt=cookie-token"));

        assert_eq!(session_token(&headers), Some("cookie-token".to_string()));
    }

    #[test]
    fn test_malformed_authorization_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));

        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_allowed_roles() {
        assert!(AllowedRoles::STAFF.permits(Role::LeadGuide));
        assert!(!AllowedRoles::STAFF.permits(Role::Guide));
        assert!(AllowedRoles::REVIEWERS.permits(Role::User));
        assert!(!AllowedRoles::ADMIN.permits(Role::User));
        assert!(AllowedRoles::new(&[Role::Guide]).permits(Role::Guide));
    }
}
