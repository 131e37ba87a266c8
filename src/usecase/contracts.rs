use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    domain::booking::Booking,
    domain::rating::{RatingAggregate, RatingStats},
    domain::resource::Resource,
    domain::review::{ReviewDetails, ReviewWithAuthor},
    domain::tour::{MonthlyPlan, Tour, TourDistance, TourStats},
    domain::user::User,
    repository::errors::RepositoryError,
    usecase::query::ApiQuery,
};

/// Storage operations shared by every resource exposed through the generic handlers.
pub trait ResourceRepository<E: Resource>: Send + Sync {
    async fn find_many(&self, query: &ApiQuery) -> Result<Vec<E>, RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<E>, RepositoryError>;
    async fn insert(&self, entity: &E) -> Result<E, RepositoryError>;
    async fn update(&self, id: Uuid, patch: &E::Patch) -> Result<Option<E>, RepositoryError>;
    /// Removes the row and returns it, `None` when absent.
    async fn delete(&self, id: Uuid) -> Result<Option<E>, RepositoryError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCenter {
    pub lat: f64,
    pub lng: f64,
}

#[cfg_attr(test, mockall::automock)]
pub trait TourRepository: Send + Sync {
    /// Writes the denormalised rating values; a missing tour is not an error.
    async fn set_rating_aggregate(
        &self,
        tour_id: Uuid,
        aggregate: &RatingAggregate,
    ) -> Result<(), RepositoryError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tour>, RepositoryError>;
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Tour>, RepositoryError>;
    async fn stats(&self, min_rating: f64) -> Result<Vec<TourStats>, RepositoryError>;
    async fn monthly_plan(&self, year: i32) -> Result<Vec<MonthlyPlan>, RepositoryError>;
    /// Tours whose start location lies within `radius` radians of `center`.
    async fn within(&self, center: GeoCenter, radius: f64) -> Result<Vec<Tour>, RepositoryError>;
    /// Distance in metres from `center` to every tour, scaled by `multiplier`.
    async fn distances(
        &self,
        center: GeoCenter,
        multiplier: f64,
    ) -> Result<Vec<TourDistance>, RepositoryError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User, RepositoryError>;
    /// Active users only.
    async fn find_active(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepositoryError>;
    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError>;
    /// User holding an unexpired reset token with this hash.
    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError>;
    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, RepositoryError>;
    async fn deactivate(&self, id: Uuid) -> Result<(), RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait ReviewRepository: Send + Sync {
    async fn rating_stats(&self, tour_id: Uuid) -> Result<RatingStats, RepositoryError>;
    async fn find_by_tour_with_authors(
        &self,
        tour_id: Uuid,
    ) -> Result<Vec<ReviewWithAuthor>, RepositoryError>;
    async fn find_by_user_with_tours(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ReviewDetails>, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait BookingRepository: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Booking>, RepositoryError>;
}
