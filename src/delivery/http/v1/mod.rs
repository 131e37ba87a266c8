pub mod auth;
pub mod bookings;
pub mod extract;
pub mod middleware;
pub mod rate_limit;
pub mod response;
pub mod reviews;
pub mod tours;
pub mod upload;
pub mod users;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{MethodRouter, delete, get, patch, post},
};

use crate::AppState;
use crate::delivery::http::UPLOAD_LIMIT_BYTES;
use middleware::{AllowedRoles, protect, restrict_to};

/// Requires a signed-in user.
fn protected(route: MethodRouter<Arc<AppState>>, state: &Arc<AppState>) -> MethodRouter<Arc<AppState>> {
    route.layer(from_fn_with_state(state.clone(), protect))
}

/// Requires a signed-in user holding one of `roles`.
fn guarded(
    route: MethodRouter<Arc<AppState>>,
    state: &Arc<AppState>,
    roles: AllowedRoles,
) -> MethodRouter<Arc<AppState>> {
    protected(route.layer(from_fn_with_state(roles, restrict_to)), state)
}

fn tour_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(tours::list_tours).merge(guarded(post(tours::create_tour), state, AllowedRoles::STAFF)),
        )
        .route("/top-5-cheap", get(tours::top_tours))
        .route("/tour-stats", get(tours::tour_stats))
        .route(
            "/monthly-plan/{year}",
            guarded(get(tours::monthly_plan), state, AllowedRoles::GUIDES),
        )
        .route(
            "/tours-within/{distance}/center/{center}/unit/{unit}",
            get(tours::tours_within),
        )
        .route("/distances/{center}/unit/{unit}", get(tours::distances))
        .route(
            "/{id}",
            get(tours::get_tour).merge(guarded(
                patch(tours::update_tour)
                    .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
                    .delete(tours::delete_tour),
                state,
                AllowedRoles::STAFF,
            )),
        )
        .route(
            "/{id}/reviews",
            protected(get(reviews::list_tour_reviews), state).merge(guarded(
                post(reviews::create_tour_review),
                state,
                AllowedRoles::USER,
            )),
        )
}

fn user_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password/{token}", patch(auth::reset_password))
        .route(
            "/update-my-password",
            protected(patch(auth::update_my_password), state),
        )
        .route("/me", protected(get(users::get_me), state))
        .route(
            "/update-me",
            protected(
                patch(users::update_me).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
                state,
            ),
        )
        .route("/delete-me", protected(delete(users::delete_me), state))
        .route(
            "/",
            guarded(
                get(users::list_users).post(users::create_user),
                state,
                AllowedRoles::ADMIN,
            ),
        )
        .route(
            "/{id}",
            guarded(
                get(users::get_user)
                    .patch(users::update_user)
                    .delete(users::delete_user),
                state,
                AllowedRoles::ADMIN,
            ),
        )
}

fn review_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            protected(get(reviews::list_reviews), state).merge(guarded(
                post(reviews::create_review),
                state,
                AllowedRoles::USER,
            )),
        )
        .route("/my-reviews", protected(get(reviews::my_reviews), state))
        .route(
            "/{id}",
            protected(get(reviews::get_review), state).merge(guarded(
                patch(reviews::update_review).delete(reviews::delete_review),
                state,
                AllowedRoles::REVIEWERS,
            )),
        )
}

fn booking_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/my-bookings", protected(get(bookings::my_bookings), state))
        .route(
            "/",
            guarded(
                get(bookings::list_bookings).post(bookings::create_booking),
                state,
                AllowedRoles::STAFF,
            ),
        )
        .route(
            "/{id}",
            guarded(
                get(bookings::get_booking)
                    .patch(bookings::update_booking)
                    .delete(bookings::delete_booking),
                state,
                AllowedRoles::STAFF,
            ),
        )
}

/// Everything under `/api/v1`, rate limited per client.
pub fn api_router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .nest("/tours", tour_routes(state))
        .nest("/users", user_routes(state))
        .nest("/reviews", review_routes(state))
        .nest("/bookings", booking_routes(state))
        .route_layer(from_fn_with_state(state.clone(), rate_limit::rate_limit))
}
