//! Development data set: tours, users and reviews read from JSON files.
//! Reviews name their tour and author, and tours name their guides by
//! email, so the files carry no generated ids.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::review::NewReview;
use crate::domain::tour::NewTour;
use crate::domain::user::Role;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {file}: {source}")]
    Parse {
        file: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown tour in reviews: {0}")]
    UnknownTour(String),
    #[error("unknown user: {0}")]
    UnknownUser(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedTour {
    #[serde(flatten)]
    pub tour: NewTour,
    #[serde(default)]
    pub guide_emails: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub name: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: Role,
    pub photo: Option<String>,
    pub password: String,
}

fn default_role() -> Role {
    Role::User
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedReview {
    pub review: String,
    pub rating: i16,
    /// Tour name.
    pub tour: String,
    /// Author email.
    pub user: String,
}

#[derive(Debug, Clone)]
pub struct DevData {
    pub tours: Vec<SeedTour>,
    pub users: Vec<SeedUser>,
    pub reviews: Vec<SeedReview>,
}

impl DevData {
    /// Reads `tours.json`, `users.json` and `reviews.json` from `dir`.
    pub fn load(dir: &Path) -> Result<Self, SeedError> {
        Ok(Self {
            tours: read_json(dir, "tours.json")?,
            users: read_json(dir, "users.json")?,
            reviews: read_json(dir, "reviews.json")?,
        })
    }

    /// Tour inputs with guide emails swapped for the ids of the imported users.
    pub fn tour_inputs(&self, user_ids: &HashMap<String, Uuid>) -> Result<Vec<NewTour>, SeedError> {
        self.tours
            .iter()
            .map(|seed| {
                let mut tour = seed.tour.clone();
                for email in &seed.guide_emails {
                    tour.guides.push(lookup_user(user_ids, email)?);
                }
                Ok(tour)
            })
            .collect()
    }

    pub fn review_inputs(
        &self,
        tour_ids: &HashMap<String, Uuid>,
        user_ids: &HashMap<String, Uuid>,
    ) -> Result<Vec<NewReview>, SeedError> {
        self.reviews
            .iter()
            .map(|seed| {
                let tour_id = tour_ids
                    .get(&seed.tour)
                    .copied()
                    .ok_or_else(|| SeedError::UnknownTour(seed.tour.clone()))?;
                Ok(NewReview {
                    review: Some(seed.review.clone()),
                    rating: Some(seed.rating),
                    tour_id: Some(tour_id),
                    user_id: Some(lookup_user(user_ids, &seed.user)?),
                })
            })
            .collect()
    }
}

fn lookup_user(user_ids: &HashMap<String, Uuid>, email: &str) -> Result<Uuid, SeedError> {
    user_ids
        .get(&email.trim().to_lowercase())
        .copied()
        .ok_or_else(|| SeedError::UnknownUser(email.to_string()))
}

fn read_json<T: DeserializeOwned>(dir: &Path, file: &'static str) -> Result<T, SeedError> {
    let path = dir.join(file);
    let raw = std::fs::read_to_string(&path).map_err(|source| SeedError::Read { path, source })?;
    serde_json::from_str(&raw).map_err(|source| SeedError::Parse { file, source })
}
