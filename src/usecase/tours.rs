use serde::Serialize;
use uuid::Uuid;

use crate::domain::review::ReviewWithAuthor;
use crate::domain::tour::{MonthlyPlan, Tour, TourDistance, TourStats, year_bounds};
use crate::domain::user::User;
use crate::usecase::contracts::{
    GeoCenter, ResourceRepository, ReviewRepository, TourRepository, UserRepository,
};
use crate::usecase::error::UsecaseError;
use crate::usecase::query::QueryParams;

const EARTH_RADIUS_MI: f64 = 3963.2;
const EARTH_RADIUS_KM: f64 = 6378.1;
const METERS_TO_MILES: f64 = 0.000621371;
const METERS_TO_KM: f64 = 0.001;
const STATS_MIN_RATING: f64 = 4.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Miles,
    Kilometers,
}

impl DistanceUnit {
    /// `mi` selects miles; anything else is kilometres.
    pub fn parse(unit: &str) -> Self {
        if unit == "mi" {
            DistanceUnit::Miles
        } else {
            DistanceUnit::Kilometers
        }
    }

    fn earth_radius(&self) -> f64 {
        match self {
            DistanceUnit::Miles => EARTH_RADIUS_MI,
            DistanceUnit::Kilometers => EARTH_RADIUS_KM,
        }
    }

    fn multiplier(&self) -> f64 {
        match self {
            DistanceUnit::Miles => METERS_TO_MILES,
            DistanceUnit::Kilometers => METERS_TO_KM,
        }
    }
}

/// Parses `lat,lng`.
pub fn parse_center(raw: &str) -> Result<GeoCenter, UsecaseError> {
    let invalid = || {
        UsecaseError::Validation(
            "Please provide latitude and longitude in the format lat,lng.".to_string(),
        )
    };

    let (lat, lng) = raw.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(invalid());
    }
    Ok(GeoCenter { lat, lng })
}

/// Rewrites the request into the cheapest best-rated five.
pub fn alias_top_tours(params: &mut QueryParams) {
    params.set("limit", "5");
    params.set("sort", "-ratings_average,price");
    params.set("fields", "name,price,ratings_average,summary,difficulty");
}

#[derive(Debug, Clone, Serialize)]
pub struct TourDetails {
    #[serde(flatten)]
    pub tour: Tour,
    pub guides: Vec<User>,
    pub reviews: Vec<ReviewWithAuthor>,
}

pub struct ToursUseCase<T, U, Rv>
where
    T: TourRepository + ResourceRepository<Tour>,
    U: UserRepository,
    Rv: ReviewRepository,
{
    tour_repository: T,
    user_repository: U,
    review_repository: Rv,
}

impl<T, U, Rv> ToursUseCase<T, U, Rv>
where
    T: TourRepository + ResourceRepository<Tour>,
    U: UserRepository,
    Rv: ReviewRepository,
{
    pub fn new(tour_repository: T, user_repository: U, review_repository: Rv) -> Self {
        Self {
            tour_repository,
            user_repository,
            review_repository,
        }
    }

    /// Tour with its guides and reviews loaded.
    #[tracing::instrument(skip(self), fields(tour_id = %id))]
    pub async fn get_details(&self, id: Uuid) -> Result<TourDetails, UsecaseError> {
        let tour = self
            .tour_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| UsecaseError::not_found("tour"))?;
        self.load_relations(tour).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_by_slug(&self, slug: &str) -> Result<TourDetails, UsecaseError> {
        let tour = self
            .tour_repository
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("There is no tour with that name.".to_string()))?;
        self.load_relations(tour).await
    }

    async fn load_relations(&self, tour: Tour) -> Result<TourDetails, UsecaseError> {
        let guides = self.user_repository.find_by_ids(&tour.guides).await?;
        let reviews = self
            .review_repository
            .find_by_tour_with_authors(tour.id)
            .await?;

        tracing::debug!(guides = guides.len(), reviews = reviews.len(), "relations loaded");
        Ok(TourDetails {
            tour,
            guides,
            reviews,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn stats(&self) -> Result<Vec<TourStats>, UsecaseError> {
        Ok(self.tour_repository.stats(STATS_MIN_RATING).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn monthly_plan(&self, year: i32) -> Result<Vec<MonthlyPlan>, UsecaseError> {
        if year_bounds(year).is_none() {
            return Err(UsecaseError::Validation(format!("Invalid year: {year}")));
        }
        Ok(self.tour_repository.monthly_plan(year).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn within(
        &self,
        distance: f64,
        center: &str,
        unit: &str,
    ) -> Result<Vec<Tour>, UsecaseError> {
        let center = parse_center(center)?;
        if !distance.is_finite() || distance < 0.0 {
            return Err(UsecaseError::Validation(format!("Invalid distance: {distance}")));
        }

        let radius = distance / DistanceUnit::parse(unit).earth_radius();
        Ok(self.tour_repository.within(center, radius).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn distances(
        &self,
        center: &str,
        unit: &str,
    ) -> Result<Vec<TourDistance>, UsecaseError> {
        let center = parse_center(center)?;
        let multiplier = DistanceUnit::parse(unit).multiplier();
        Ok(self.tour_repository.distances(center, multiplier).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rating::RatingAggregate;
    use crate::domain::resource::Creatable;
    use crate::domain::tour::{NewTour, TourPatch};
    use crate::repository::errors::RepositoryError;
    use crate::usecase::contracts::{MockReviewRepository, MockUserRepository};
    use crate::usecase::query::ApiQuery;
    use mockall::predicate;

    mockall::mock! {
        pub Tours {}

        impl TourRepository for Tours {
            async fn set_rating_aggregate(&self, tour_id: Uuid, aggregate: &RatingAggregate) -> Result<(), RepositoryError>;
            async fn find_by_slug(&self, slug: &str) -> Result<Option<Tour>, RepositoryError>;
            async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Tour>, RepositoryError>;
            async fn stats(&self, min_rating: f64) -> Result<Vec<TourStats>, RepositoryError>;
            async fn monthly_plan(&self, year: i32) -> Result<Vec<MonthlyPlan>, RepositoryError>;
            async fn within(&self, center: GeoCenter, radius: f64) -> Result<Vec<Tour>, RepositoryError>;
            async fn distances(&self, center: GeoCenter, multiplier: f64) -> Result<Vec<TourDistance>, RepositoryError>;
        }

        impl ResourceRepository<Tour> for Tours {
            async fn find_many(&self, query: &ApiQuery) -> Result<Vec<Tour>, RepositoryError>;
            async fn find_by_id(&self, id: Uuid) -> Result<Option<Tour>, RepositoryError>;
            async fn insert(&self, entity: &Tour) -> Result<Tour, RepositoryError>;
            async fn update(&self, id: Uuid, patch: &TourPatch) -> Result<Option<Tour>, RepositoryError>;
            async fn delete(&self, id: Uuid) -> Result<Option<Tour>, RepositoryError>;
        }
    }

    fn usecase(tours: MockTours) -> ToursUseCase<MockTours, MockUserRepository, MockReviewRepository> {
        ToursUseCase::new(tours, MockUserRepository::new(), MockReviewRepository::new())
    }

    #[test]
    fn test_parse_center() {
        assert_eq!(
            parse_center("34.111745,-118.113491").unwrap(),
            GeoCenter { lat: 34.111745, lng: -118.113491 }
        );
        for raw in ["34.1", "north,south", "", "95,10"] {
            let err = parse_center(raw).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Please provide latitude and longitude in the format lat,lng."
            );
        }
    }

    #[test]
    fn test_alias_top_tours_overrides_request() {
        let mut params = QueryParams::from_pairs(&[("limit", "50"), ("difficulty", "easy")]);
        alias_top_tours(&mut params);

        assert_eq!(params.last("limit"), Some("5"));
        assert_eq!(params.last("sort"), Some("-ratings_average,price"));
        assert_eq!(params.last("difficulty"), Some("easy"));
    }

    #[tokio::test]
    async fn test_within_converts_distance_to_radians() {
        let mut tours = MockTours::new();
        tours
            .expect_within()
            .withf(|center, radius| {
                center.lat == 34.0 && center.lng == -118.0 && (radius - 250.0 / 3963.2).abs() < 1e-12
            })
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let result = usecase(tours).within(250.0, "34,-118", "mi").await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_within_kilometres() {
        let mut tours = MockTours::new();
        tours
            .expect_within()
            .withf(|_, radius| (radius - 100.0 / 6378.1).abs() < 1e-12)
            .times(1)
            .returning(|_, _| Ok(vec![]));

        usecase(tours).within(100.0, "34,-118", "km").await.unwrap();
    }

    #[tokio::test]
    async fn test_distances_multiplier_per_unit() {
        let mut tours = MockTours::new();
        tours
            .expect_distances()
            .withf(|_, multiplier| *multiplier == 0.000621371)
            .times(1)
            .returning(|_, _| Ok(vec![]));

        usecase(tours).distances("34,-118", "mi").await.unwrap();
    }

    #[tokio::test]
    async fn test_distances_with_bad_center_skips_storage() {
        let mut tours = MockTours::new();
        tours.expect_distances().times(0);

        let result = usecase(tours).distances("oops", "km").await;
        assert!(matches!(result, Err(UsecaseError::Validation(_))));
    }

    #[tokio::test]
    async fn test_stats_use_rating_threshold() {
        let mut tours = MockTours::new();
        tours
            .expect_stats()
            .with(predicate::eq(4.5))
            .times(1)
            .returning(|_| Ok(vec![]));

        usecase(tours).stats().await.unwrap();
    }

    #[tokio::test]
    async fn test_monthly_plan_rejects_year_out_of_range() {
        let mut tours = MockTours::new();
        tours.expect_monthly_plan().times(0);

        let result = usecase(tours).monthly_plan(i32::MAX).await;
        assert!(matches!(result, Err(UsecaseError::Validation(ref m)) if m == "Invalid year: 2147483647"));
    }

    #[tokio::test]
    async fn test_monthly_plan_passes_year_through() {
        let mut tours = MockTours::new();
        tours
            .expect_monthly_plan()
            .with(predicate::eq(2021))
            .times(1)
            .returning(|_| Ok(vec![]));

        usecase(tours).monthly_plan(2021).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_details_missing_tour() {
        let mut tours = MockTours::new();
        tours.expect_find_by_id().times(1).returning(|_| Ok(None));

        let result = usecase(tours).get_details(Uuid::new_v4()).await;
        assert!(matches!(result, Err(UsecaseError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_by_slug_loads_guides_and_reviews() {
        let mut tours = MockTours::new();
        let mut users = MockUserRepository::new();
        let mut reviews = MockReviewRepository::new();
        let guide = User::new("Lisa".to_string(), "lisa@example.com".to_string(), "h".to_string());
        let tour = Tour {
            guides: vec![guide.id],
            ..Tour::build(NewTour {
                name: Some("The Forest Hiker".to_string()),
                duration: Some(5),
                max_group_size: Some(25),
                difficulty: Some("easy".to_string()),
                price: Some(397.0),
                summary: Some("Hike".to_string()),
                image_cover: Some("cover.jpg".to_string()),
                ..Default::default()
            })
        };
        let tour_id = tour.id;
        let guide_id = guide.id;

        tours
            .expect_find_by_slug()
            .withf(|slug| slug == "the-forest-hiker")
            .times(1)
            .returning(move |_| Ok(Some(tour.clone())));
        users
            .expect_find_by_ids()
            .withf(move |ids| ids == [guide_id])
            .times(1)
            .returning(move |_| Ok(vec![guide.clone()]));
        reviews
            .expect_find_by_tour_with_authors()
            .with(predicate::eq(tour_id))
            .times(1)
            .returning(|_| Ok(vec![]));

        let usecase = ToursUseCase::new(tours, users, reviews);
        let details = usecase.get_by_slug("the-forest-hiker").await.unwrap();

        assert_eq!(details.guides.len(), 1);
        assert!(details.reviews.is_empty());
    }
}
