use uuid::Uuid;

use crate::domain::booking::Booking;
use crate::domain::tour::Tour;
use crate::usecase::contracts::{BookingRepository, TourRepository};
use crate::usecase::error::UsecaseError;

pub struct BookingsUseCase<B, T>
where
    B: BookingRepository,
    T: TourRepository,
{
    booking_repository: B,
    tour_repository: T,
}

impl<B, T> BookingsUseCase<B, T>
where
    B: BookingRepository,
    T: TourRepository,
{
    pub fn new(booking_repository: B, tour_repository: T) -> Self {
        Self {
            booking_repository,
            tour_repository,
        }
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn my_bookings(&self, user_id: Uuid) -> Result<Vec<Booking>, UsecaseError> {
        let bookings = self.booking_repository.find_by_user(user_id).await?;
        tracing::debug!(count = bookings.len(), "bookings found");
        Ok(bookings)
    }

    /// Tours the user has booked, each listed once.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn my_tours(&self, user_id: Uuid) -> Result<Vec<Tour>, UsecaseError> {
        let bookings = self.booking_repository.find_by_user(user_id).await?;

        let mut tour_ids: Vec<Uuid> = Vec::with_capacity(bookings.len());
        for booking in &bookings {
            if !tour_ids.contains(&booking.tour_id) {
                tour_ids.push(booking.tour_id);
            }
        }
        if tour_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self.tour_repository.find_by_ids(&tour_ids).await?)
    }
}
