use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::rating::DEFAULT_RATINGS_AVERAGE;
use crate::domain::resource::{Creatable, FieldDef, FieldKind, Resource, ResourceSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Difficult => "difficult",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "difficult" => Some(Difficulty::Difficult),
            _ => None,
        }
    }
}

impl TryFrom<String> for Difficulty {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Difficulty::parse(&value).ok_or_else(|| format!("unknown difficulty: {value}"))
    }
}

/// GeoJSON point; `coordinates` is `[lng, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_geo_point"))]
pub struct GeoPoint {
    #[serde(rename = "type", default = "point_type")]
    pub kind: String,
    pub coordinates: [f64; 2],
    pub address: Option<String>,
    pub description: Option<String>,
}

impl GeoPoint {
    pub fn lng(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn lat(&self) -> f64 {
        self.coordinates[1]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TourLocation {
    #[serde(flatten)]
    #[validate(nested)]
    pub point: GeoPoint,
    #[validate(range(min = 1))]
    pub day: Option<i32>,
}

fn point_type() -> String {
    "Point".to_string()
}

fn validate_geo_point(point: &GeoPoint) -> Result<(), ValidationError> {
    if point.kind != "Point" {
        return Err(invalid("geo_type", "Location type must be Point"));
    }
    if !(-180.0..=180.0).contains(&point.lng()) || !(-90.0..=90.0).contains(&point.lat()) {
        return Err(invalid("coordinates", "Coordinates must be [lng, lat] within range"));
    }
    Ok(())
}

fn validate_difficulty(value: &str) -> Result<(), ValidationError> {
    match Difficulty::parse(value) {
        Some(_) => Ok(()),
        None => Err(invalid("difficulty", "Difficulty is either: easy, medium, difficult")),
    }
}

fn validate_new_tour(tour: &NewTour) -> Result<(), ValidationError> {
    discount_below_price(tour.price, tour.price_discount)
}

fn validate_tour_patch(patch: &TourPatch) -> Result<(), ValidationError> {
    discount_below_price(patch.price, patch.price_discount)
}

fn discount_below_price(price: Option<f64>, discount: Option<f64>) -> Result<(), ValidationError> {
    match (price, discount) {
        (Some(price), Some(discount)) if discount >= price => Err(invalid(
            "price_discount",
            "Discount price should be below regular price",
        )),
        _ => Ok(()),
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Tour {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub duration: i32,
    pub max_group_size: i32,
    #[sqlx(try_from = "String")]
    pub difficulty: Difficulty,
    pub ratings_average: f64,
    pub ratings_quantity: i32,
    pub price: f64,
    pub price_discount: Option<f64>,
    pub summary: String,
    pub description: Option<String>,
    pub image_cover: String,
    pub images: Vec<String>,
    pub start_dates: Vec<DateTime<Utc>>,
    pub secret_tour: bool,
    #[sqlx(json)]
    pub start_location: Option<GeoPoint>,
    #[sqlx(json)]
    pub locations: Vec<TourLocation>,
    pub guides: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub version: i32,
}

impl Tour {
    pub fn duration_weeks(&self) -> f64 {
        f64::from(self.duration) / 7.0
    }
}

/// Per-difficulty aggregate over well-rated tours.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct TourStats {
    pub difficulty: String,
    pub num_tours: i64,
    pub num_ratings: i64,
    pub avg_rating: f64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct MonthlyPlan {
    pub month: i32,
    pub num_tour_starts: i64,
    pub tours: Vec<String>,
}

/// `[Jan 1 of year, Jan 1 of year + 1)` in UTC, or `None` outside chrono's range.
pub fn year_bounds(year: i32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start_of = |year: i32| {
        NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|at| at.and_utc())
    };
    Some((start_of(year)?, start_of(year.checked_add(1)?)?))
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct TourDistance {
    pub id: Uuid,
    pub name: String,
    pub distance: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_new_tour"))]
pub struct NewTour {
    #[validate(
        required(message = "A tour must have a name"),
        length(min = 10, max = 40, message = "A tour name must have between 10 and 40 characters")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "A tour must have a duration"),
        range(min = 1, message = "Duration must be at least one day")
    )]
    pub duration: Option<i32>,
    #[validate(
        required(message = "A tour must have a group size"),
        range(min = 1, message = "Group size must be at least 1")
    )]
    pub max_group_size: Option<i32>,
    #[validate(
        required(message = "A tour must have a difficulty"),
        custom(function = "validate_difficulty")
    )]
    pub difficulty: Option<String>,
    #[validate(
        required(message = "A tour must have a price"),
        range(exclusive_min = 0.0, message = "Price must be above 0")
    )]
    pub price: Option<f64>,
    pub price_discount: Option<f64>,
    #[validate(
        required(message = "A tour must have a summary"),
        length(min = 1, message = "A tour must have a summary")
    )]
    pub summary: Option<String>,
    pub description: Option<String>,
    #[validate(required(message = "A tour must have a cover image"))]
    pub image_cover: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub start_dates: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub secret_tour: bool,
    #[validate(nested)]
    pub start_location: Option<GeoPoint>,
    #[serde(default)]
    #[validate(nested)]
    pub locations: Vec<TourLocation>,
    #[serde(default)]
    pub guides: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_tour_patch"))]
pub struct TourPatch {
    #[validate(length(min = 10, max = 40, message = "A tour name must have between 10 and 40 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 1, message = "Duration must be at least one day"))]
    pub duration: Option<i32>,
    #[validate(range(min = 1, message = "Group size must be at least 1"))]
    pub max_group_size: Option<i32>,
    #[validate(custom(function = "validate_difficulty"))]
    pub difficulty: Option<String>,
    #[validate(range(exclusive_min = 0.0, message = "Price must be above 0"))]
    pub price: Option<f64>,
    pub price_discount: Option<f64>,
    #[validate(length(min = 1, message = "A tour must have a summary"))]
    pub summary: Option<String>,
    pub description: Option<String>,
    pub image_cover: Option<String>,
    pub images: Option<Vec<String>>,
    pub start_dates: Option<Vec<DateTime<Utc>>>,
    pub secret_tour: Option<bool>,
    #[validate(nested)]
    pub start_location: Option<GeoPoint>,
    pub locations: Option<Vec<TourLocation>>,
    pub guides: Option<Vec<Uuid>>,
}

pub static TOUR_SCHEMA: ResourceSchema = ResourceSchema {
    name: "tour",
    fields: &[
        FieldDef::new("id", FieldKind::Uuid),
        FieldDef::new("name", FieldKind::Text),
        FieldDef::new("slug", FieldKind::Text),
        FieldDef::new("duration", FieldKind::Integer),
        FieldDef::new("max_group_size", FieldKind::Integer),
        FieldDef::new("difficulty", FieldKind::Text),
        FieldDef::new("ratings_average", FieldKind::Float),
        FieldDef::new("ratings_quantity", FieldKind::Integer),
        FieldDef::new("price", FieldKind::Float),
        FieldDef::new("price_discount", FieldKind::Float),
        FieldDef::new("summary", FieldKind::Text),
        FieldDef::new("description", FieldKind::Text),
        FieldDef::new("image_cover", FieldKind::Text),
        FieldDef::new("images", FieldKind::Composite),
        FieldDef::new("start_dates", FieldKind::Composite),
        FieldDef::new("secret_tour", FieldKind::Boolean),
        FieldDef::new("start_location", FieldKind::Composite),
        FieldDef::new("locations", FieldKind::Composite),
        FieldDef::new("guides", FieldKind::Composite),
        FieldDef::new("created_at", FieldKind::Timestamp),
        FieldDef::new("version", FieldKind::Integer),
    ],
    hidden: &["version"],
    multi_value: &[
        "duration",
        "ratings_quantity",
        "ratings_average",
        "max_group_size",
        "difficulty",
        "price",
    ],
};

impl Resource for Tour {
    type Patch = TourPatch;

    const SCHEMA: &'static ResourceSchema = &TOUR_SCHEMA;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Creatable for Tour {
    type Create = NewTour;

    fn build(input: NewTour) -> Self {
        let name = input.name.unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            slug: slugify(&name),
            name,
            duration: input.duration.unwrap_or_default(),
            max_group_size: input.max_group_size.unwrap_or_default(),
            difficulty: input
                .difficulty
                .as_deref()
                .and_then(Difficulty::parse)
                .unwrap_or(Difficulty::Easy),
            ratings_average: DEFAULT_RATINGS_AVERAGE,
            ratings_quantity: 0,
            price: input.price.unwrap_or_default(),
            price_discount: input.price_discount,
            summary: input.summary.map(|s| s.trim().to_string()).unwrap_or_default(),
            description: input.description.map(|d| d.trim().to_string()),
            image_cover: input.image_cover.unwrap_or_default(),
            images: input.images,
            start_dates: input.start_dates,
            secret_tour: input.secret_tour,
            start_location: input.start_location,
            locations: input.locations,
            guides: input.guides,
            created_at: Utc::now(),
            version: 0,
        }
    }
}
