use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::rating::RatingAggregate;
use crate::domain::tour::{
    MonthlyPlan, Tour, TourDistance, TourPatch, TourStats, slugify, year_bounds,
};
use crate::repository::errors::RepositoryError;
use crate::repository::postgres::resource::{PgResource, PostgresResourceRepository, set_column};
use crate::usecase::contracts::{GeoCenter, TourRepository};

pub type PostgresTourRepository = PostgresResourceRepository<Tour>;

const EARTH_RADIUS_M: f64 = 6_378_100.0;

/// Central angle in radians between the bound centre ($1 lat, $2 lng) and a tour's start.
const CENTRAL_ANGLE: &str = "2 * ASIN(LEAST(1.0, SQRT(\
    POWER(SIN(RADIANS(start_lat - $1) / 2), 2) + \
    COS(RADIANS($1)) * COS(RADIANS(start_lat)) * POWER(SIN(RADIANS(start_lng - $2) / 2), 2))))";

const TOUR_COLUMNS: &str = "id, name, slug, duration, max_group_size, difficulty, \
    ratings_average, ratings_quantity, price, price_discount, summary, description, \
    image_cover, images, start_dates, secret_tour, start_location, locations, guides, \
    created_at, version";

impl PgResource for Tour {
    const TABLE: &'static str = "tours";
    const COLUMNS: &'static str = TOUR_COLUMNS;
    const INSERT_COLUMNS: &'static str = "id, name, slug, duration, max_group_size, difficulty, \
        ratings_average, ratings_quantity, price, price_discount, summary, description, \
        image_cover, images, start_dates, secret_tour, start_location, locations, guides, \
        created_at, version, start_lat, start_lng";
    const READ_FILTER: &'static str = "secret_tour = FALSE";

    fn push_values(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        let mut values = builder.separated(", ");
        values
            .push_bind(self.id)
            .push_bind(self.name.clone())
            .push_bind(self.slug.clone())
            .push_bind(self.duration)
            .push_bind(self.max_group_size)
            .push_bind(self.difficulty.as_str())
            .push_bind(self.ratings_average)
            .push_bind(self.ratings_quantity)
            .push_bind(self.price)
            .push_bind(self.price_discount)
            .push_bind(self.summary.clone())
            .push_bind(self.description.clone())
            .push_bind(self.image_cover.clone())
            .push_bind(self.images.clone())
            .push_bind(self.start_dates.clone())
            .push_bind(self.secret_tour)
            .push_bind(Json(self.start_location.clone()))
            .push_bind(Json(self.locations.clone()))
            .push_bind(self.guides.clone())
            .push_bind(self.created_at)
            .push_bind(self.version)
            .push_bind(self.start_location.as_ref().map(|p| p.lat()))
            .push_bind(self.start_location.as_ref().map(|p| p.lng()));
    }

    fn push_patch(patch: &TourPatch, builder: &mut QueryBuilder<'_, Postgres>) {
        set_column(builder, "name", patch.name.clone());
        set_column(builder, "slug", patch.name.as_deref().map(slugify));
        set_column(builder, "duration", patch.duration);
        set_column(builder, "max_group_size", patch.max_group_size);
        set_column(builder, "difficulty", patch.difficulty.clone());
        set_column(builder, "price", patch.price);
        set_column(builder, "price_discount", patch.price_discount);
        set_column(builder, "summary", patch.summary.as_deref().map(|s| s.trim().to_string()));
        set_column(builder, "description", patch.description.clone());
        set_column(builder, "image_cover", patch.image_cover.clone());
        set_column(builder, "images", patch.images.clone());
        set_column(builder, "start_dates", patch.start_dates.clone());
        set_column(builder, "secret_tour", patch.secret_tour);
        if let Some(point) = &patch.start_location {
            set_column(builder, "start_location", Some(Json(Some(point.clone()))));
            set_column(builder, "start_lat", Some(point.lat()));
            set_column(builder, "start_lng", Some(point.lng()));
        }
        set_column(builder, "locations", patch.locations.clone().map(Json));
        set_column(builder, "guides", patch.guides.clone());
    }
}

impl TourRepository for PostgresTourRepository {
    #[tracing::instrument(skip(self, aggregate), fields(tour_id = %tour_id, quantity = aggregate.quantity, average = aggregate.average))]
    async fn set_rating_aggregate(
        &self,
        tour_id: Uuid,
        aggregate: &RatingAggregate,
    ) -> Result<(), RepositoryError> {
        tracing::debug!("writing rating aggregate");

        let result = sqlx::query(
            r#"
            UPDATE tours
            SET ratings_quantity = $2, ratings_average = $3
            WHERE id = $1
            "#,
        )
        .bind(tour_id)
        .bind(aggregate.quantity)
        .bind(aggregate.average)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            tracing::warn!(tour_id = %tour_id, "rating aggregate for a missing tour");
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tour>, RepositoryError> {
        tracing::debug!("finding tour by slug");

        let mut builder = self.select();
        builder.push(" AND slug = ").push_bind(slug.to_string());

        builder
            .build_query_as::<Tour>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Tour>, RepositoryError> {
        tracing::debug!("finding tours by ids");

        let mut builder = self.select();
        builder
            .push(" AND id = ANY(")
            .push_bind(ids.to_vec())
            .push(") ORDER BY name ASC");

        builder
            .build_query_as::<Tour>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }

    #[tracing::instrument(skip(self))]
    async fn stats(&self, min_rating: f64) -> Result<Vec<TourStats>, RepositoryError> {
        tracing::debug!("aggregating tour stats");

        let stats = sqlx::query_as::<_, TourStats>(
            r#"
            SELECT UPPER(difficulty) AS difficulty,
                   COUNT(*) AS num_tours,
                   COALESCE(SUM(ratings_quantity), 0)::BIGINT AS num_ratings,
                   AVG(ratings_average) AS avg_rating,
                   AVG(price) AS avg_price,
                   MIN(price) AS min_price,
                   MAX(price) AS max_price
            FROM tours
            WHERE ratings_average >= $1 AND secret_tour = FALSE
            GROUP BY UPPER(difficulty)
            ORDER BY avg_price ASC
            "#,
        )
        .bind(min_rating)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(groups = stats.len(), "tour stats aggregated");
        Ok(stats)
    }

    #[tracing::instrument(skip(self))]
    async fn monthly_plan(&self, year: i32) -> Result<Vec<MonthlyPlan>, RepositoryError> {
        tracing::debug!("building monthly plan");

        let Some((from, to)) = year_bounds(year) else {
            return Ok(Vec::new());
        };

        let plan = sqlx::query_as::<_, MonthlyPlan>(
            r#"
            SELECT EXTRACT(MONTH FROM start_date)::INT AS month,
                   COUNT(*) AS num_tour_starts,
                   ARRAY_AGG(name ORDER BY name) AS tours
            FROM tours, UNNEST(start_dates) AS start_date
            WHERE start_date >= $1 AND start_date < $2 AND secret_tour = FALSE
            GROUP BY month
            ORDER BY num_tour_starts DESC, month ASC
            LIMIT 12
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(months = plan.len(), "monthly plan built");
        Ok(plan)
    }

    #[tracing::instrument(skip(self))]
    async fn within(&self, center: GeoCenter, radius: f64) -> Result<Vec<Tour>, RepositoryError> {
        tracing::debug!("finding tours within radius");

        let sql = format!(
            "SELECT {TOUR_COLUMNS} FROM tours \
             WHERE secret_tour = FALSE AND start_lat IS NOT NULL AND {CENTRAL_ANGLE} <= $3"
        );

        let tours = sqlx::query_as::<_, Tour>(&sql)
            .bind(center.lat)
            .bind(center.lng)
            .bind(radius)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(count = tours.len(), "tours within radius");
        Ok(tours)
    }

    #[tracing::instrument(skip(self))]
    async fn distances(
        &self,
        center: GeoCenter,
        multiplier: f64,
    ) -> Result<Vec<TourDistance>, RepositoryError> {
        tracing::debug!("computing tour distances");

        let sql = format!(
            "SELECT id, name, {EARTH_RADIUS_M} * {CENTRAL_ANGLE} * $3 AS distance FROM tours \
             WHERE secret_tour = FALSE AND start_lat IS NOT NULL \
             ORDER BY distance ASC"
        );

        sqlx::query_as::<_, TourDistance>(&sql)
            .bind(center.lat)
            .bind(center.lng)
            .bind(multiplier)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }
}
