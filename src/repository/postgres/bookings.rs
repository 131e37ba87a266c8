use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::booking::{Booking, BookingPatch};
use crate::repository::errors::RepositoryError;
use crate::repository::postgres::resource::{PgResource, PostgresResourceRepository, set_column};
use crate::usecase::contracts::BookingRepository;

pub type PostgresBookingRepository = PostgresResourceRepository<Booking>;

impl PgResource for Booking {
    const TABLE: &'static str = "bookings";
    const COLUMNS: &'static str = "id, tour_id, user_id, price, paid, created_at, version";

    fn push_values(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        let mut values = builder.separated(", ");
        values
            .push_bind(self.id)
            .push_bind(self.tour_id)
            .push_bind(self.user_id)
            .push_bind(self.price)
            .push_bind(self.paid)
            .push_bind(self.created_at)
            .push_bind(self.version);
    }

    fn push_patch(patch: &BookingPatch, builder: &mut QueryBuilder<'_, Postgres>) {
        set_column(builder, "tour_id", patch.tour_id);
        set_column(builder, "user_id", patch.user_id);
        set_column(builder, "price", patch.price);
        set_column(builder, "paid", patch.paid);
    }
}

impl BookingRepository for PostgresBookingRepository {
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Booking>, RepositoryError> {
        tracing::debug!("finding bookings by user");

        let mut builder = self.select();
        builder
            .push(" AND user_id = ")
            .push_bind(user_id)
            .push(" ORDER BY created_at DESC, id ASC");

        let bookings = builder
            .build_query_as::<Booking>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(count = bookings.len(), "found bookings");
        Ok(bookings)
    }
}
