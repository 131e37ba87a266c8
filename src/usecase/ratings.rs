use uuid::Uuid;

use crate::domain::rating::RatingAggregate;
use crate::usecase::contracts::{ReviewRepository, TourRepository};
use crate::usecase::error::UsecaseError;

/// Keeps a tour's denormalised rating values in step with its reviews.
pub struct RatingsUseCase<Rv, T>
where
    Rv: ReviewRepository,
    T: TourRepository,
{
    review_repository: Rv,
    tour_repository: T,
}

impl<Rv, T> RatingsUseCase<Rv, T>
where
    Rv: ReviewRepository,
    T: TourRepository,
{
    pub fn new(review_repository: Rv, tour_repository: T) -> Self {
        Self {
            review_repository,
            tour_repository,
        }
    }

    /// Recomputes count and mean rating for the tour and stores them.
    /// Read and write are separate statements; concurrent review writes may race.
    #[tracing::instrument(skip(self), fields(tour_id = %tour_id))]
    pub async fn recalculate(&self, tour_id: Uuid) -> Result<RatingAggregate, UsecaseError> {
        tracing::debug!("recalculating ratings");

        let stats = self.review_repository.rating_stats(tour_id).await?;
        let aggregate = RatingAggregate::from_stats(stats);

        self.tour_repository
            .set_rating_aggregate(tour_id, &aggregate)
            .await?;

        metrics::counter!("tour_rating_recalculations_total").increment(1);
        tracing::info!(
            tour_id = %tour_id,
            quantity = aggregate.quantity,
            average = aggregate.average,
            "ratings recalculated"
        );
        Ok(aggregate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rating::RatingStats;
    use crate::repository::errors::RepositoryError;
    use crate::usecase::contracts::{MockReviewRepository, MockTourRepository};
    use mockall::predicate;

    #[tokio::test]
    async fn test_recalculate_writes_rounded_average() {
        let mut reviews = MockReviewRepository::new();
        let mut tours = MockTourRepository::new();
        let tour_id = Uuid::new_v4();

        reviews
            .expect_rating_stats()
            .with(predicate::eq(tour_id))
            .times(1)
            .returning(|_| Ok(RatingStats { count: 3, average: Some(4.0 + 2.0 / 3.0) }));

        tours
            .expect_set_rating_aggregate()
            .withf(move |id, aggregate| {
                *id == tour_id && aggregate.quantity == 3 && aggregate.average == 4.7
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let usecase = RatingsUseCase::new(reviews, tours);
        let aggregate = usecase.recalculate(tour_id).await.unwrap();

        assert_eq!(aggregate, RatingAggregate { quantity: 3, average: 4.7 });
    }

    #[tokio::test]
    async fn test_recalculate_without_reviews_resets_to_default() {
        let mut reviews = MockReviewRepository::new();
        let mut tours = MockTourRepository::new();
        let tour_id = Uuid::new_v4();

        reviews
            .expect_rating_stats()
            .times(1)
            .returning(|_| Ok(RatingStats { count: 0, average: None }));

        tours
            .expect_set_rating_aggregate()
            .withf(|_, aggregate| *aggregate == RatingAggregate::empty())
            .times(1)
            .returning(|_, _| Ok(()));

        let usecase = RatingsUseCase::new(reviews, tours);
        let aggregate = usecase.recalculate(tour_id).await.unwrap();

        assert_eq!(aggregate.quantity, 0);
        assert_eq!(aggregate.average, 4.5);
    }

    #[tokio::test]
    async fn test_recalculate_propagates_storage_failure() {
        let mut reviews = MockReviewRepository::new();
        let mut tours = MockTourRepository::new();

        reviews
            .expect_rating_stats()
            .times(1)
            .returning(|_| Err(RepositoryError::DatabaseError("connection reset".to_string())));
        tours.expect_set_rating_aggregate().times(0);

        let usecase = RatingsUseCase::new(reviews, tours);
        let result = usecase.recalculate(Uuid::new_v4()).await;

        assert!(matches!(result, Err(UsecaseError::Internal(_))));
    }
}
