use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::AppState;
use crate::delivery::http::v1::extract::AppJson;
use crate::delivery::http::v1::middleware::{CurrentUser, JWT_COOKIE};
use crate::delivery::http::v1::response::Success;
use crate::usecase::auth::{LoginRequest, NewPassword, Session, SignupRequest, UpdatePasswordRequest};
use crate::usecase::error::UsecaseError;

const LOGGED_OUT: &str = "loggedout";
const LOGOUT_COOKIE_SECS: i64 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

fn cookie(state: &AppState, value: &str, max_age_secs: i64) -> String {
    let mut cookie = format!("{JWT_COOKIE}={value}; Max-Age={max_age_secs}; Path=/; HttpOnly; SameSite=Lax");
    if !state.environment.is_development() {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(state: &AppState, token: &str) -> String {
    cookie(state, token, state.jwt_cookie_expires_in_days * 24 * 60 * 60)
}

/// Token in the body and in the session cookie.
fn send_session(state: &AppState, status: StatusCode, session: Session) -> Response {
    let set_cookie = session_cookie(state, &session.token);

    let body = if status == StatusCode::CREATED {
        Success::created("user", session.user)
    } else {
        Success::ok("user", session.user)
    };
    ([(header::SET_COOKIE, set_cookie)], body.with_token(session.token)).into_response()
}

#[tracing::instrument(skip(state, request))]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<SignupRequest>,
) -> Result<Response, UsecaseError> {
    let session = state.auth_usecase.signup(request).await?;
    Ok(send_session(&state, StatusCode::CREATED, session))
}

#[tracing::instrument(skip(state, request))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<Response, UsecaseError> {
    let session = state.auth_usecase.login(request).await?;
    Ok(send_session(&state, StatusCode::OK, session))
}

pub async fn logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, cookie(&state, LOGGED_OUT, LOGOUT_COOKIE_SECS))],
        Json(json!({ "status": "success" })),
    )
}

#[tracing::instrument(skip(state, headers, request))]
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppJson(request): AppJson<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, UsecaseError> {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("http");
    let reset_url_base = format!("{scheme}://{host}/api/v1/users/reset-password");

    state
        .auth_usecase
        .forgot_password(request.email, &reset_url_base)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Token sent to email!",
    })))
}

#[tracing::instrument(skip(state, token, request))]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    AppJson(request): AppJson<NewPassword>,
) -> Result<Response, UsecaseError> {
    let session = state.auth_usecase.reset_password(&token, request).await?;
    Ok(send_session(&state, StatusCode::OK, session))
}

#[tracing::instrument(skip(state, user, request), fields(user_id = %user.id))]
pub async fn update_my_password(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AppJson(request): AppJson<UpdatePasswordRequest>,
) -> Result<Response, UsecaseError> {
    let session = state.auth_usecase.update_password(&user, request).await?;
    Ok(send_session(&state, StatusCode::OK, session))
}
