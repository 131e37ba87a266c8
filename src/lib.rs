pub mod config;
pub mod delivery;
pub mod domain;
pub mod repository;
pub mod telemetry;
pub mod usecase;

use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;

use crate::config::{AppConfig, RunMode};
use crate::delivery::http::v1::rate_limit::RateLimiter;
use crate::domain::booking::Booking;
use crate::domain::tour::Tour;
use crate::domain::user::User;
use crate::repository::postgres::{
    PostgresBookingRepository, PostgresReviewRepository, PostgresTourRepository,
    PostgresUserRepository,
};
use crate::usecase::auth::AuthUseCase;
use crate::usecase::bookings::BookingsUseCase;
use crate::usecase::images::ImageStore;
use crate::usecase::jwt::JwtService;
use crate::usecase::mailer::{MailError, SmtpMailer};
use crate::usecase::ratings::RatingsUseCase;
use crate::usecase::resource::ResourceService;
use crate::usecase::reviews::ReviewsUseCase;
use crate::usecase::tours::ToursUseCase;
use crate::usecase::users::UsersUseCase;

pub use crate::delivery::http::build_router;

pub struct AppState {
    pub environment: RunMode,
    pub jwt_cookie_expires_in_days: i64,
    pub tours: ResourceService<Tour, PostgresTourRepository>,
    pub tours_usecase:
        ToursUseCase<PostgresTourRepository, PostgresUserRepository, PostgresReviewRepository>,
    pub users: ResourceService<User, PostgresUserRepository>,
    pub users_usecase: UsersUseCase<PostgresUserRepository>,
    pub auth_usecase: AuthUseCase<PostgresUserRepository, SmtpMailer>,
    pub reviews_usecase:
        ReviewsUseCase<PostgresReviewRepository, PostgresReviewRepository, PostgresTourRepository>,
    pub bookings: ResourceService<Booking, PostgresBookingRepository>,
    pub bookings_usecase: BookingsUseCase<PostgresBookingRepository, PostgresTourRepository>,
    pub images: ImageStore,
    pub rate_limiter: RateLimiter,
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    /// Wires every usecase over one shared pool.
    pub fn new(
        config: &AppConfig,
        pool: PgPool,
        metrics_handle: PrometheusHandle,
    ) -> Result<Self, MailError> {
        let tour_repository = PostgresTourRepository::new(pool.clone());
        let user_repository = PostgresUserRepository::new(pool.clone());
        let review_repository = PostgresReviewRepository::new(pool.clone());
        let booking_repository = PostgresBookingRepository::new(pool);

        let jwt = JwtService::new(config.jwt_secret.clone(), config.jwt_expires_in_days);
        let mailer = SmtpMailer::from_config(config)?;

        let ratings = RatingsUseCase::new(review_repository.clone(), tour_repository.clone());

        Ok(Self {
            environment: config.environment,
            jwt_cookie_expires_in_days: config.jwt_cookie_expires_in_days,
            tours: ResourceService::new(tour_repository.clone()),
            tours_usecase: ToursUseCase::new(
                tour_repository.clone(),
                user_repository.clone(),
                review_repository.clone(),
            ),
            users: ResourceService::new(user_repository.clone()),
            users_usecase: UsersUseCase::new(user_repository.clone()),
            auth_usecase: AuthUseCase::new(user_repository, mailer, jwt),
            reviews_usecase: ReviewsUseCase::new(ResourceService::new(review_repository), ratings),
            bookings: ResourceService::new(booking_repository.clone()),
            bookings_usecase: BookingsUseCase::new(booking_repository, tour_repository),
            images: ImageStore::new(std::path::Path::new(&config.public_dir).join("img")),
            rate_limiter: RateLimiter::new(config.rate_limit_max, config.rate_limit_window_secs)
                .trust_proxy_hops(config.trusted_proxy_hops),
            metrics_handle,
        })
    }
}
