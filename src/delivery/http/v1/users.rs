use std::sync::Arc;

use axum::{Extension, extract::State, response::IntoResponse};

use crate::AppState;
use crate::delivery::http::v1::extract::{AppJson, JsonOrMultipart, ResourceId};
use crate::delivery::http::v1::middleware::CurrentUser;
use crate::delivery::http::v1::response::{Success, no_content};
use crate::delivery::http::v1::upload::{USER_PHOTO_FIELDS, read_upload_form};
use crate::domain::user::{ProfileUpdate, UserPatch};
use crate::usecase::error::UsecaseError;
use crate::usecase::query::QueryParams;

pub async fn get_me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> impl IntoResponse {
    Success::ok("data", user)
}

#[tracing::instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    body: JsonOrMultipart<ProfileUpdate>,
) -> Result<impl IntoResponse, UsecaseError> {
    let update = match body {
        JsonOrMultipart::Json(update) => update,
        JsonOrMultipart::Multipart(multipart) => {
            let mut form = read_upload_form(multipart, USER_PHOTO_FIELDS).await?;
            let mut update: ProfileUpdate = form.parse()?;
            if let Some(photo) = form.take_file("photo") {
                update.photo = Some(state.images.store_user_photo(user.id, photo).await?);
            }
            update
        }
    };

    let updated = state.users_usecase.update_me(&user, update).await?;
    Ok(Success::ok("user", updated))
}

#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_me(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, UsecaseError> {
    state.users_usecase.delete_me(&user).await?;
    Ok(no_content())
}

#[tracing::instrument(skip(state, params))]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    params: QueryParams,
) -> Result<impl IntoResponse, UsecaseError> {
    let listing = state.users.list(&params, None).await?;
    Ok(Success::ok("data", listing.documents).with_results(listing.results))
}

/// Accounts are only created through signup.
pub async fn create_user() -> UsecaseError {
    UsecaseError::RouteUndefined("This route is not defined! Please use /signup instead".to_string())
}

#[tracing::instrument(skip(state))]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, UsecaseError> {
    let user = state.users.get(id).await?;
    Ok(Success::ok("data", user))
}

#[tracing::instrument(skip(state, patch))]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    ResourceId(id): ResourceId,
    AppJson(patch): AppJson<UserPatch>,
) -> Result<impl IntoResponse, UsecaseError> {
    let user = state.users.update(id, patch).await?;
    Ok(Success::ok("data", user))
}

#[tracing::instrument(skip(state))]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, UsecaseError> {
    state.users.delete(id).await?;
    Ok(no_content())
}
