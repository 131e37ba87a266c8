use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::resource::{FieldDef, FieldKind, Resource, ResourceSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Guide,
    LeadGuide,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Guide => "guide",
            Role::LeadGuide => "lead-guide",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "guide" => Some(Role::Guide),
            "lead-guide" => Some(Role::LeadGuide),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Role::parse(&value).ok_or_else(|| format!("unknown role: {value}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub photo: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[serde(skip)]
    pub password_hash: String,
    pub password_changed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub password_reset_token: Option<String>,
    #[serde(skip)]
    pub password_reset_expires: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub version: i32,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            email: email.trim().to_lowercase(),
            photo: "default.jpg".to_string(),
            role: Role::User,
            password_hash,
            password_changed_at: None,
            password_reset_token: None,
            password_reset_expires: None,
            active: true,
            created_at: Utc::now(),
            version: 0,
        }
    }

    /// True when the password was changed after a token issued at `issued_at`
    /// (seconds since the epoch).
    pub fn changed_password_after(&self, issued_at: i64) -> bool {
        match self.password_changed_at {
            Some(changed_at) => changed_at.timestamp() > issued_at,
            None => false,
        }
    }
}

/// Admin update of another account. Passwords are never changed here.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserPatch {
    #[validate(length(min = 1, message = "Please tell us your name!"))]
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    pub photo: Option<String>,
    pub role: Option<Role>,
}

/// Fields a user may change on their own account.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, message = "Please tell us your name!"))]
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    pub photo: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_confirm: Option<String>,
}

impl ProfileUpdate {
    pub fn touches_password(&self) -> bool {
        self.password.is_some() || self.password_confirm.is_some()
    }
}

pub static USER_SCHEMA: ResourceSchema = ResourceSchema {
    name: "user",
    fields: &[
        FieldDef::new("id", FieldKind::Uuid),
        FieldDef::new("name", FieldKind::Text),
        FieldDef::new("email", FieldKind::Text),
        FieldDef::new("photo", FieldKind::Text),
        FieldDef::new("role", FieldKind::Text),
        FieldDef::new("password_changed_at", FieldKind::Timestamp),
        FieldDef::new("created_at", FieldKind::Timestamp),
        FieldDef::new("version", FieldKind::Integer),
    ],
    hidden: &["version"],
    multi_value: &[],
};

impl Resource for User {
    type Patch = UserPatch;

    const SCHEMA: &'static ResourceSchema = &USER_SCHEMA;

    fn id(&self) -> Uuid {
        self.id
    }
}
