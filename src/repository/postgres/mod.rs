pub mod bookings;
pub mod dev_data;
pub mod query;
pub mod resource;
pub mod reviews;
pub mod tours;
pub mod users;

use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};

pub use bookings::PostgresBookingRepository;
pub use resource::PostgresResourceRepository;
pub use reviews::PostgresReviewRepository;
pub use tours::PostgresTourRepository;
pub use users::PostgresUserRepository;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}
