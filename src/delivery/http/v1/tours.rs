use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};

use crate::AppState;
use crate::delivery::http::v1::extract::{AppJson, JsonOrMultipart, ResourceId};
use crate::delivery::http::v1::response::{Success, no_content};
use crate::delivery::http::v1::upload::{TOUR_IMAGE_FIELDS, read_upload_form};
use crate::domain::tour::{NewTour, TourPatch};
use crate::usecase::error::UsecaseError;
use crate::usecase::query::QueryParams;
use crate::usecase::tours::alias_top_tours;

#[tracing::instrument(skip(state, params))]
pub async fn list_tours(
    State(state): State<Arc<AppState>>,
    params: QueryParams,
) -> Result<impl IntoResponse, UsecaseError> {
    let listing = state.tours.list(&params, None).await?;
    Ok(Success::ok("data", listing.documents).with_results(listing.results))
}

#[tracing::instrument(skip(state, params))]
pub async fn top_tours(
    State(state): State<Arc<AppState>>,
    mut params: QueryParams,
) -> Result<impl IntoResponse, UsecaseError> {
    alias_top_tours(&mut params);
    let listing = state.tours.list(&params, None).await?;
    Ok(Success::ok("data", listing.documents).with_results(listing.results))
}

#[tracing::instrument(skip(state))]
pub async fn get_tour(
    State(state): State<Arc<AppState>>,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, UsecaseError> {
    let details = state.tours_usecase.get_details(id).await?;
    Ok(Success::ok("data", details))
}

#[tracing::instrument(skip(state, input))]
pub async fn create_tour(
    State(state): State<Arc<AppState>>,
    AppJson(input): AppJson<NewTour>,
) -> Result<impl IntoResponse, UsecaseError> {
    let tour = state.tours.create(input).await?;
    tracing::debug!(tour_id = %tour.id, "tour created");
    Ok(Success::created("data", tour))
}

/// JSON patch, or multipart with `image_cover` and up to three `images`
/// which are resized and stored before the update.
#[tracing::instrument(skip(state, body))]
pub async fn update_tour(
    State(state): State<Arc<AppState>>,
    ResourceId(id): ResourceId,
    body: JsonOrMultipart<TourPatch>,
) -> Result<impl IntoResponse, UsecaseError> {
    let patch = match body {
        JsonOrMultipart::Json(patch) => patch,
        JsonOrMultipart::Multipart(multipart) => {
            let mut form = read_upload_form(multipart, TOUR_IMAGE_FIELDS).await?;
            let mut patch: TourPatch = form.parse()?;

            let stored = state
                .images
                .store_tour_images(id, form.take_file("image_cover"), form.take_files("images"))
                .await?;
            if stored.cover.is_some() {
                patch.image_cover = stored.cover;
            }
            if !stored.images.is_empty() {
                patch.images = Some(stored.images);
            }
            patch
        }
    };

    let tour = state.tours.update(id, patch).await?;
    Ok(Success::ok("data", tour))
}

#[tracing::instrument(skip(state))]
pub async fn delete_tour(
    State(state): State<Arc<AppState>>,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, UsecaseError> {
    state.tours.delete(id).await?;
    Ok(no_content())
}

#[tracing::instrument(skip(state))]
pub async fn tour_stats(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, UsecaseError> {
    let stats = state.tours_usecase.stats().await?;
    Ok(Success::ok("stats", stats))
}

#[tracing::instrument(skip(state))]
pub async fn monthly_plan(
    State(state): State<Arc<AppState>>,
    Path(year): Path<String>,
) -> Result<impl IntoResponse, UsecaseError> {
    let year: i32 = year
        .parse()
        .map_err(|_| UsecaseError::Validation(format!("Invalid year: {year}")))?;

    let plan = state.tours_usecase.monthly_plan(year).await?;
    let results = plan.len();
    Ok(Success::ok("plan", plan).with_results(results))
}

/// `/tours-within/{distance}/center/{lat,lng}/unit/{unit}`
#[tracing::instrument(skip(state))]
pub async fn tours_within(
    State(state): State<Arc<AppState>>,
    Path((distance, center, unit)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, UsecaseError> {
    let distance: f64 = distance
        .parse()
        .map_err(|_| UsecaseError::Validation(format!("Invalid distance: {distance}")))?;

    let tours = state.tours_usecase.within(distance, &center, &unit).await?;
    let results = tours.len();
    Ok(Success::ok("data", tours).with_results(results))
}

/// `/distances/{lat,lng}/unit/{unit}`
#[tracing::instrument(skip(state))]
pub async fn distances(
    State(state): State<Arc<AppState>>,
    Path((center, unit)): Path<(String, String)>,
) -> Result<impl IntoResponse, UsecaseError> {
    let distances = state.tours_usecase.distances(&center, &unit).await?;
    Ok(Success::ok("data", distances))
}
