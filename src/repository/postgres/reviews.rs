use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::rating::RatingStats;
use crate::domain::review::{
    Review, ReviewAuthor, ReviewDetails, ReviewPatch, ReviewWithAuthor, ReviewedTour,
};
use crate::repository::errors::RepositoryError;
use crate::repository::postgres::resource::{PgResource, PostgresResourceRepository, set_column};
use crate::usecase::contracts::ReviewRepository;

pub type PostgresReviewRepository = PostgresResourceRepository<Review>;

impl PgResource for Review {
    const TABLE: &'static str = "reviews";
    const COLUMNS: &'static str = "id, review, rating, tour_id, user_id, created_at, version";

    fn push_values(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        let mut values = builder.separated(", ");
        values
            .push_bind(self.id)
            .push_bind(self.review.clone())
            .push_bind(self.rating)
            .push_bind(self.tour_id)
            .push_bind(self.user_id)
            .push_bind(self.created_at)
            .push_bind(self.version);
    }

    fn push_patch(patch: &ReviewPatch, builder: &mut QueryBuilder<'_, Postgres>) {
        set_column(builder, "review", patch.review.clone());
        set_column(builder, "rating", patch.rating);
    }
}

/// Flat row behind `ReviewDetails`; the joined sides are null when filtered out.
#[derive(sqlx::FromRow)]
struct ReviewDetailsRow {
    id: Uuid,
    review: String,
    rating: i16,
    created_at: DateTime<Utc>,
    tour_id: Option<Uuid>,
    tour_name: Option<String>,
    tour_image_cover: Option<String>,
    tour_price: Option<f64>,
    tour_duration: Option<i32>,
    author_id: Option<Uuid>,
    author_name: Option<String>,
    author_email: Option<String>,
}

impl From<ReviewDetailsRow> for ReviewDetails {
    fn from(row: ReviewDetailsRow) -> Self {
        let tour = match (row.tour_id, row.tour_name, row.tour_image_cover, row.tour_price, row.tour_duration) {
            (Some(id), Some(name), Some(image_cover), Some(price), Some(duration)) => Some(ReviewedTour {
                id,
                name,
                image_cover,
                price,
                duration,
            }),
            _ => None,
        };
        let user = match (row.author_id, row.author_name, row.author_email) {
            (Some(id), Some(name), Some(email)) => Some(ReviewAuthor { id, name, email }),
            _ => None,
        };

        Self {
            id: row.id,
            review: row.review,
            rating: row.rating,
            created_at: row.created_at,
            tour,
            user,
        }
    }
}

impl ReviewRepository for PostgresReviewRepository {
    #[tracing::instrument(skip(self), fields(tour_id = %tour_id))]
    async fn rating_stats(&self, tour_id: Uuid) -> Result<RatingStats, RepositoryError> {
        tracing::debug!("aggregating ratings");

        sqlx::query_as::<_, RatingStats>(
            r#"
            SELECT COUNT(*) AS count, AVG(rating)::FLOAT8 AS average
            FROM reviews
            WHERE tour_id = $1
            "#,
        )
        .bind(tour_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }

    #[tracing::instrument(skip(self), fields(tour_id = %tour_id))]
    async fn find_by_tour_with_authors(
        &self,
        tour_id: Uuid,
    ) -> Result<Vec<ReviewWithAuthor>, RepositoryError> {
        tracing::debug!("finding reviews with authors");

        let reviews = sqlx::query_as::<_, ReviewWithAuthor>(
            r#"
            SELECT r.id, r.review, r.rating, r.tour_id, r.user_id, r.created_at,
                   u.name AS author_name, u.photo AS author_photo
            FROM reviews r
            LEFT JOIN users u ON u.id = r.user_id AND u.active = TRUE
            WHERE r.tour_id = $1
            ORDER BY r.created_at DESC, r.id ASC
            "#,
        )
        .bind(tour_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(count = reviews.len(), "found reviews");
        Ok(reviews)
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    async fn find_by_user_with_tours(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ReviewDetails>, RepositoryError> {
        tracing::debug!("finding reviews with tours");

        let rows = sqlx::query_as::<_, ReviewDetailsRow>(
            r#"
            SELECT r.id, r.review, r.rating, r.created_at,
                   t.id AS tour_id, t.name AS tour_name, t.image_cover AS tour_image_cover,
                   t.price AS tour_price, t.duration AS tour_duration,
                   u.id AS author_id, u.name AS author_name, u.email AS author_email
            FROM reviews r
            LEFT JOIN tours t ON t.id = r.tour_id AND t.secret_tour = FALSE
            LEFT JOIN users u ON u.id = r.user_id AND u.active = TRUE
            WHERE r.user_id = $1
            ORDER BY r.created_at DESC, r.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(count = rows.len(), "found reviews");
        Ok(rows.into_iter().map(ReviewDetails::from).collect())
    }
}
