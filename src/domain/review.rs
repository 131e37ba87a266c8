use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::resource::{Creatable, FieldDef, FieldKind, Resource, ResourceSchema};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub review: String,
    pub rating: i16,
    pub tour_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub version: i32,
}

/// Review joined with its author, as shown on a tour page.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ReviewWithAuthor {
    pub id: Uuid,
    pub review: String,
    pub rating: i16,
    pub tour_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub author_name: Option<String>,
    pub author_photo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewedTour {
    pub id: Uuid,
    pub name: String,
    pub image_cover: String,
    pub price: f64,
    pub duration: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewAuthor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Review with its tour and author populated. Either side is `None` once
/// the tour is hidden or the author deactivated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewDetails {
    pub id: Uuid,
    pub review: String,
    pub rating: i16,
    pub created_at: DateTime<Utc>,
    pub tour: Option<ReviewedTour>,
    pub user: Option<ReviewAuthor>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewReview {
    #[validate(
        required(message = "Review can not be empty!"),
        length(min = 1, message = "Review can not be empty!")
    )]
    pub review: Option<String>,
    #[validate(
        required(message = "Review must have a rating"),
        range(min = 1, max = 5, message = "Rating must be between 1 and 5")
    )]
    pub rating: Option<i16>,
    #[validate(required(message = "Review must belong to a tour."))]
    pub tour_id: Option<Uuid>,
    #[validate(required(message = "Review must belong to a user."))]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ReviewPatch {
    #[validate(length(min = 1, message = "Review can not be empty!"))]
    pub review: Option<String>,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i16>,
}

pub static REVIEW_SCHEMA: ResourceSchema = ResourceSchema {
    name: "review",
    fields: &[
        FieldDef::new("id", FieldKind::Uuid),
        FieldDef::new("review", FieldKind::Text),
        FieldDef::new("rating", FieldKind::Integer),
        FieldDef::new("tour_id", FieldKind::Uuid),
        FieldDef::new("user_id", FieldKind::Uuid),
        FieldDef::new("created_at", FieldKind::Timestamp),
        FieldDef::new("version", FieldKind::Integer),
    ],
    hidden: &["version"],
    multi_value: &[],
};

impl Resource for Review {
    type Patch = ReviewPatch;

    const SCHEMA: &'static ResourceSchema = &REVIEW_SCHEMA;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Creatable for Review {
    type Create = NewReview;

    fn build(input: NewReview) -> Self {
        Self {
            id: Uuid::new_v4(),
            review: input.review.unwrap_or_default(),
            rating: input.rating.unwrap_or_default(),
            tour_id: input.tour_id.unwrap_or_default(),
            user_id: input.user_id.unwrap_or_default(),
            created_at: Utc::now(),
            version: 0,
        }
    }
}
