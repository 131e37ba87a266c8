//! Server-rendered pages. Every interpolated value goes through `escape`.

use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};

use crate::AppState;
use crate::delivery::http::v1::auth::session_cookie;
use crate::delivery::http::v1::extract::{AppForm, Viewer};
use crate::delivery::http::v1::middleware::CurrentUser;
use crate::domain::resource::Resource;
use crate::domain::review::ReviewWithAuthor;
use crate::domain::tour::Tour;
use crate::domain::user::User;
use crate::usecase::contracts::ResourceRepository;
use crate::usecase::auth::LoginRequest;
use crate::usecase::error::UsecaseError;
use crate::usecase::query::ApiQuery;
use crate::usecase::tours::TourDetails;

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, viewer: Option<&User>, content: &str) -> String {
    let nav = match viewer {
        Some(user) => format!(
            r#"<a class="nav__el" href="/my-tours">My bookings</a><a class="nav__el" href="/me"><img class="nav__user-img" src="/img/users/{photo}" alt="Photo of {name}"><span>{name}</span></a>"#,
            photo = escape(&user.photo),
            name = escape(&user.name),
        ),
        None => r#"<a class="nav__el" href="/login">Log in</a>"#.to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Natours | {title}</title>
</head>
<body>
<header class="header"><nav class="nav nav--tours"><a class="nav__el" href="/">All tours</a></nav><nav class="nav nav--user">{nav}</nav></header>
<main class="main">{content}</main>
</body>
</html>"#,
        title = escape(title),
    )
}

fn tour_card(tour: &Tour) -> String {
    let start = tour
        .start_dates
        .first()
        .map(|date| date.format("%B %Y").to_string())
        .unwrap_or_else(|| "Soon".to_string());

    format!(
        r#"<div class="card"><h3 class="heading-tertirary">{name}</h3><h4 class="card__sub-heading">{difficulty} {duration}-day tour</h4><p class="card__text">{summary}</p><p>{start}</p><p>{stops} stops</p><p>{group} people</p><p><span class="card__footer-value">${price}</span> per person</p><p><span class="card__footer-value">{average}</span> rating ({quantity})</p><a class="btn btn--green btn--small" href="/tour/{slug}">Details</a></div>"#,
        name = escape(&tour.name),
        difficulty = escape(tour.difficulty.as_str()),
        duration = tour.duration,
        summary = escape(&tour.summary),
        start = escape(&start),
        stops = tour.locations.len(),
        group = tour.max_group_size,
        price = tour.price,
        average = tour.ratings_average,
        quantity = tour.ratings_quantity,
        slug = escape(&tour.slug),
    )
}

fn overview_page(title: &str, viewer: Option<&User>, tours: &[Tour]) -> String {
    let cards: String = tours.iter().map(tour_card).collect();
    layout(title, viewer, &format!(r#"<div class="card-container">{cards}</div>"#))
}

fn review_card(review: &ReviewWithAuthor) -> String {
    format!(
        r#"<div class="reviews__card"><div class="reviews__avatar"><img class="reviews__avatar-img" src="/img/users/{photo}" alt="{name}"><h6 class="reviews__user">{name}</h6></div><p class="reviews__text">{text}</p><p class="reviews__rating">{rating} / 5</p></div>"#,
        photo = escape(review.author_photo.as_deref().unwrap_or("default.jpg")),
        name = escape(review.author_name.as_deref().unwrap_or("Former user")),
        text = escape(&review.review),
        rating = review.rating,
    )
}

fn tour_page(viewer: Option<&User>, details: &TourDetails) -> String {
    let tour = &details.tour;
    let guides: String = details
        .guides
        .iter()
        .map(|guide| {
            format!(
                r#"<div class="overview-box__detail"><span class="overview-box__label">{role}</span><span class="overview-box__text">{name}</span></div>"#,
                role = escape(guide.role.as_str()),
                name = escape(&guide.name),
            )
        })
        .collect();
    let reviews: String = details.reviews.iter().map(review_card).collect();
    let location = tour
        .start_location
        .as_ref()
        .and_then(|point| point.description.as_deref())
        .unwrap_or("");
    let description = tour.description.as_deref().unwrap_or(&tour.summary);
    let paragraphs: String = description
        .split('\n')
        .map(|p| format!(r#"<p class="description__text">{}</p>"#, escape(p)))
        .collect();

    let content = format!(
        r#"<section class="section-header"><h1 class="heading-primary">{name} tour</h1><span>{duration} days</span><span>{location}</span></section><section class="section-description"><div class="overview-box"><h2>Quick facts</h2><p>Difficulty: {difficulty}</p><p>Participants: {group} people</p><p>Rating: {average} / 5</p><h2>Your tour guides</h2>{guides}</div><div class="description-box"><h2>About {name} tour</h2>{paragraphs}</div></section><section class="section-reviews"><div class="reviews">{reviews}</div></section>"#,
        name = escape(&tour.name),
        duration = tour.duration,
        location = escape(location),
        difficulty = escape(tour.difficulty.as_str()),
        group = tour.max_group_size,
        average = tour.ratings_average,
    );
    layout(&format!("{} Tour", tour.name), viewer, &content)
}

fn login_page(viewer: Option<&User>) -> String {
    let content = r#"<div class="login-form"><h2 class="heading-secondary">Log into your account</h2><form class="form form--login" method="post" action="/login"><label class="form__label" for="email">Email address</label><input class="form__input" id="email" name="email" type="email" placeholder="you@example.com" required><label class="form__label" for="password">Password</label><input class="form__input" id="password" name="password" type="password" placeholder="••••••••" required minlength="8"><button class="btn btn--green">Login</button></form></div>"#;
    layout("Log into your account", viewer, content)
}

fn account_page(user: &User) -> String {
    let content = format!(
        r#"<div class="user-view"><h2 class="heading-secondary">Your account settings</h2><p>Name: {name}</p><p>Email: {email}</p><p>Role: {role}</p><img class="form__user-photo" src="/img/users/{photo}" alt="User photo"></div>"#,
        name = escape(&user.name),
        email = escape(&user.email),
        role = escape(user.role.as_str()),
        photo = escape(&user.photo),
    );
    layout("Your account", Some(user), &content)
}

pub fn error_page(status: StatusCode, message: &str) -> Response {
    let content = format!(
        r#"<div class="error"><div class="error__title"><h2 class="heading-secondary heading-secondary--error">Uh oh! Something went wrong!</h2></div><div class="error__msg">{}</div></div>"#,
        escape(message)
    );
    (status, Html(layout("Something went wrong!", None, &content))).into_response()
}

#[tracing::instrument(skip(state, viewer))]
pub async fn overview(
    State(state): State<Arc<AppState>>,
    Viewer(viewer): Viewer,
) -> Result<Html<String>, UsecaseError> {
    let tours = state
        .tours
        .repository()
        .find_many(&ApiQuery::all(Tour::SCHEMA))
        .await?;
    Ok(Html(overview_page("All Tours", viewer.as_ref(), &tours)))
}

#[tracing::instrument(skip(state, viewer))]
pub async fn tour(
    State(state): State<Arc<AppState>>,
    Viewer(viewer): Viewer,
    Path(slug): Path<String>,
) -> Result<Html<String>, UsecaseError> {
    let details = state.tours_usecase.get_by_slug(&slug).await?;
    Ok(Html(tour_page(viewer.as_ref(), &details)))
}

pub async fn login(Viewer(viewer): Viewer) -> Html<String> {
    Html(login_page(viewer.as_ref()))
}

/// Form post from the login page: sets the session cookie and returns to the overview.
#[tracing::instrument(skip(state, request))]
pub async fn submit_login(
    State(state): State<Arc<AppState>>,
    AppForm(request): AppForm<LoginRequest>,
) -> Result<Response, UsecaseError> {
    let session = state.auth_usecase.login(request).await?;
    Ok((
        [(header::SET_COOKIE, session_cookie(&state, &session.token))],
        Redirect::to("/"),
    )
        .into_response())
}

pub async fn account(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Html<String> {
    Html(account_page(&user))
}

#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn my_tours(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Html<String>, UsecaseError> {
    let tours = state.bookings_usecase.my_tours(user.id).await?;
    Ok(Html(overview_page("My Tours", Some(&user), &tours)))
}
