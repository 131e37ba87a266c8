use std::sync::Arc;

use axum::{Extension, extract::State, response::IntoResponse};
use uuid::Uuid;

use crate::AppState;
use crate::delivery::http::v1::extract::{AppJson, ResourceId};
use crate::delivery::http::v1::middleware::CurrentUser;
use crate::delivery::http::v1::response::{Success, no_content};
use crate::domain::review::{NewReview, Review, ReviewPatch};
use crate::usecase::error::UsecaseError;
use crate::usecase::query::{Filter, QueryParams, Value};

async fn list_scoped(
    state: &AppState,
    params: &QueryParams,
    scope: Option<Filter>,
) -> Result<Success<Vec<serde_json::Value>>, UsecaseError> {
    let listing = state.reviews_usecase.list(params, scope).await?;
    Ok(Success::ok("data", listing.documents).with_results(listing.results))
}

#[tracing::instrument(skip(state, params))]
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    params: QueryParams,
) -> Result<impl IntoResponse, UsecaseError> {
    list_scoped(&state, &params, None).await
}

/// `GET /tours/{tour_id}/reviews`
#[tracing::instrument(skip(state, params))]
pub async fn list_tour_reviews(
    State(state): State<Arc<AppState>>,
    ResourceId(tour_id): ResourceId,
    params: QueryParams,
) -> Result<impl IntoResponse, UsecaseError> {
    list_scoped(&state, &params, Some(Filter::eq("tour_id", Value::Uuid(tour_id)))).await
}

/// `GET /reviews/my-reviews`, with tour and author populated.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn my_reviews(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, UsecaseError> {
    let reviews = state.reviews_usecase.my_reviews(user.id).await?;
    let results = reviews.len();
    Ok(Success::ok("data", reviews).with_results(results))
}

#[tracing::instrument(skip(state))]
pub async fn get_review(
    State(state): State<Arc<AppState>>,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, UsecaseError> {
    let review = state.reviews_usecase.get(id).await?;
    Ok(Success::ok("data", review))
}

async fn create(
    state: &AppState,
    input: NewReview,
    tour_id: Option<Uuid>,
    author: Uuid,
) -> Result<Success<Review>, UsecaseError> {
    let review = state.reviews_usecase.create(input, tour_id, author).await?;
    Ok(Success::created("data", review))
}

#[tracing::instrument(skip(state, user, input), fields(user_id = %user.id))]
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AppJson(input): AppJson<NewReview>,
) -> Result<impl IntoResponse, UsecaseError> {
    create(&state, input, None, user.id).await
}

/// `POST /tours/{tour_id}/reviews`
#[tracing::instrument(skip(state, user, input), fields(user_id = %user.id))]
pub async fn create_tour_review(
    State(state): State<Arc<AppState>>,
    ResourceId(tour_id): ResourceId,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AppJson(input): AppJson<NewReview>,
) -> Result<impl IntoResponse, UsecaseError> {
    create(&state, input, Some(tour_id), user.id).await
}

#[tracing::instrument(skip(state, patch))]
pub async fn update_review(
    State(state): State<Arc<AppState>>,
    ResourceId(id): ResourceId,
    AppJson(patch): AppJson<ReviewPatch>,
) -> Result<impl IntoResponse, UsecaseError> {
    let review = state.reviews_usecase.update(id, patch).await?;
    Ok(Success::ok("data", review))
}

#[tracing::instrument(skip(state))]
pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, UsecaseError> {
    state.reviews_usecase.delete(id).await?;
    Ok(no_content())
}
