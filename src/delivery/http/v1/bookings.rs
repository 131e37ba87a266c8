use std::sync::Arc;

use axum::{Extension, extract::State, response::IntoResponse};

use crate::AppState;
use crate::delivery::http::v1::extract::{AppJson, ResourceId};
use crate::delivery::http::v1::middleware::CurrentUser;
use crate::delivery::http::v1::response::{Success, no_content};
use crate::domain::booking::{BookingPatch, NewBooking};
use crate::usecase::error::UsecaseError;
use crate::usecase::query::QueryParams;

#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, UsecaseError> {
    let bookings = state.bookings_usecase.my_bookings(user.id).await?;
    let results = bookings.len();
    Ok(Success::ok("data", bookings).with_results(results))
}

#[tracing::instrument(skip(state, params))]
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    params: QueryParams,
) -> Result<impl IntoResponse, UsecaseError> {
    let listing = state.bookings.list(&params, None).await?;
    Ok(Success::ok("data", listing.documents).with_results(listing.results))
}

#[tracing::instrument(skip(state))]
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, UsecaseError> {
    let booking = state.bookings.get(id).await?;
    Ok(Success::ok("data", booking))
}

#[tracing::instrument(skip(state, input))]
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    AppJson(input): AppJson<NewBooking>,
) -> Result<impl IntoResponse, UsecaseError> {
    let booking = state.bookings.create(input).await?;
    Ok(Success::created("data", booking))
}

#[tracing::instrument(skip(state, patch))]
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    ResourceId(id): ResourceId,
    AppJson(patch): AppJson<BookingPatch>,
) -> Result<impl IntoResponse, UsecaseError> {
    let booking = state.bookings.update(id, patch).await?;
    Ok(Success::ok("data", booking))
}

#[tracing::instrument(skip(state))]
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, UsecaseError> {
    state.bookings.delete(id).await?;
    Ok(no_content())
}
