use uuid::Uuid;

use crate::domain::review::{NewReview, Review, ReviewDetails, ReviewPatch};
use crate::usecase::contracts::{ResourceRepository, ReviewRepository, TourRepository};
use crate::usecase::error::UsecaseError;
use crate::usecase::query::{Filter, QueryParams};
use crate::usecase::ratings::RatingsUseCase;
use crate::usecase::resource::{ListResult, ResourceService};

/// Review writes followed by the owning tour's rating recalculation.
pub struct ReviewsUseCase<Rr, Rv, T>
where
    Rr: ResourceRepository<Review> + ReviewRepository,
    Rv: ReviewRepository,
    T: TourRepository,
{
    reviews: ResourceService<Review, Rr>,
    ratings: RatingsUseCase<Rv, T>,
}

impl<Rr, Rv, T> ReviewsUseCase<Rr, Rv, T>
where
    Rr: ResourceRepository<Review> + ReviewRepository,
    Rv: ReviewRepository,
    T: TourRepository,
{
    pub fn new(reviews: ResourceService<Review, Rr>, ratings: RatingsUseCase<Rv, T>) -> Self {
        Self { reviews, ratings }
    }

    pub async fn list(
        &self,
        params: &QueryParams,
        scope: Option<Filter>,
    ) -> Result<ListResult, UsecaseError> {
        self.reviews.list(params, scope).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Review, UsecaseError> {
        self.reviews.get(id).await
    }

    /// The author's reviews with tour and author summaries.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn my_reviews(&self, user_id: Uuid) -> Result<Vec<ReviewDetails>, UsecaseError> {
        Ok(self.reviews.repository().find_by_user_with_tours(user_id).await?)
    }

    /// Tour and author default to the nested route's tour and the caller.
    #[tracing::instrument(skip(self, input), fields(?tour_id, user_id = %author))]
    pub async fn create(
        &self,
        mut input: NewReview,
        tour_id: Option<Uuid>,
        author: Uuid,
    ) -> Result<Review, UsecaseError> {
        if input.tour_id.is_none() {
            input.tour_id = tour_id;
        }
        if input.user_id.is_none() {
            input.user_id = Some(author);
        }

        let review = self.reviews.create(input).await?;
        self.ratings.recalculate(review.tour_id).await?;
        Ok(review)
    }

    #[tracing::instrument(skip(self, patch), fields(review_id = %id))]
    pub async fn update(&self, id: Uuid, patch: ReviewPatch) -> Result<Review, UsecaseError> {
        let review = self.reviews.update(id, patch).await?;
        self.ratings.recalculate(review.tour_id).await?;
        Ok(review)
    }

    #[tracing::instrument(skip(self), fields(review_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), UsecaseError> {
        let review = self.reviews.delete(id).await?;
        self.ratings.recalculate(review.tour_id).await?;
        Ok(())
    }
}
