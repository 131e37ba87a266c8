use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::resource::{Creatable, FieldDef, FieldKind, Resource, ResourceSchema};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub user_id: Uuid,
    pub price: f64,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
    pub version: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewBooking {
    #[validate(required(message = "Booking must belong to a Tour!"))]
    pub tour_id: Option<Uuid>,
    #[validate(required(message = "Booking must belong to a User!"))]
    pub user_id: Option<Uuid>,
    #[validate(
        required(message = "Booking must have a price."),
        range(exclusive_min = 0.0, message = "Price must be above 0")
    )]
    pub price: Option<f64>,
    pub paid: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BookingPatch {
    pub tour_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    #[validate(range(exclusive_min = 0.0, message = "Price must be above 0"))]
    pub price: Option<f64>,
    pub paid: Option<bool>,
}

pub static BOOKING_SCHEMA: ResourceSchema = ResourceSchema {
    name: "booking",
    fields: &[
        FieldDef::new("id", FieldKind::Uuid),
        FieldDef::new("tour_id", FieldKind::Uuid),
        FieldDef::new("user_id", FieldKind::Uuid),
        FieldDef::new("price", FieldKind::Float),
        FieldDef::new("paid", FieldKind::Boolean),
        FieldDef::new("created_at", FieldKind::Timestamp),
        FieldDef::new("version", FieldKind::Integer),
    ],
    hidden: &["version"],
    multi_value: &[],
};

impl Resource for Booking {
    type Patch = BookingPatch;

    const SCHEMA: &'static ResourceSchema = &BOOKING_SCHEMA;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Creatable for Booking {
    type Create = NewBooking;

    fn build(input: NewBooking) -> Self {
        Self {
            id: Uuid::new_v4(),
            tour_id: input.tour_id.unwrap_or_default(),
            user_id: input.user_id.unwrap_or_default(),
            price: input.price.unwrap_or_default(),
            paid: input.paid.unwrap_or(true),
            created_at: Utc::now(),
            version: 0,
        }
    }
}
