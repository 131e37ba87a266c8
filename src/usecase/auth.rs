use std::borrow::Cow;

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use validator::{Validate, ValidationError};

use crate::domain::user::User;
use crate::usecase::contracts::UserRepository;
use crate::usecase::error::UsecaseError;
use crate::usecase::jwt::JwtService;
use crate::usecase::mailer::{Email, Mailer};
use crate::usecase::password;

const RESET_TOKEN_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_signup_confirm"))]
pub struct SignupRequest {
    #[validate(
        required(message = "Please tell us your name!"),
        length(min = 1, message = "Please tell us your name!")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "Please provide your email"),
        email(message = "Please provide a valid email")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "Please provide a password"),
        length(min = 8, message = "A password must have at least 8 characters")
    )]
    pub password: Option<String>,
    #[validate(required(message = "Please confirm your password"))]
    pub password_confirm: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_new_password_confirm"))]
pub struct NewPassword {
    #[validate(
        required(message = "Please provide a password"),
        length(min = 8, message = "A password must have at least 8 characters")
    )]
    pub password: Option<String>,
    #[validate(required(message = "Please confirm your password"))]
    pub password_confirm: Option<String>,
}

/// Both fields present and different. Missing fields are reported by `required`.
fn confirm_matches(password: &Option<String>, confirm: &Option<String>) -> Result<(), ValidationError> {
    match (password, confirm) {
        (Some(password), Some(confirm)) if password != confirm => Err(
            ValidationError::new("password_confirm")
                .with_message(Cow::Borrowed("Passwords are not the same!")),
        ),
        _ => Ok(()),
    }
}

fn validate_signup_confirm(request: &SignupRequest) -> Result<(), ValidationError> {
    confirm_matches(&request.password, &request.password_confirm)
}

fn validate_new_password_confirm(request: &NewPassword) -> Result<(), ValidationError> {
    confirm_matches(&request.password, &request.password_confirm)
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    #[validate(required(message = "Please provide your current password"))]
    pub password_current: Option<String>,
    #[serde(flatten)]
    #[validate(nested)]
    pub new_password: NewPassword,
}

/// A signed-in user and the token that proves it.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Random reset token; only its digest is stored.
fn create_reset_token() -> (String, String) {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    let digest = hash_reset_token(&token);
    (token, digest)
}

pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Backdated by a second so a token issued right after the change stays valid.
fn password_changed_now() -> DateTime<Utc> {
    Utc::now() - Duration::seconds(1)
}

pub struct AuthUseCase<U, M>
where
    U: UserRepository,
    M: Mailer,
{
    user_repository: U,
    mailer: M,
    jwt: JwtService,
}

impl<U, M> AuthUseCase<U, M>
where
    U: UserRepository,
    M: Mailer,
{
    pub fn new(user_repository: U, mailer: M, jwt: JwtService) -> Self {
        Self {
            user_repository,
            mailer,
            jwt,
        }
    }

    fn session(&self, user: User) -> Result<Session, UsecaseError> {
        let token = self.jwt.generate_token(user.id)?;
        Ok(Session { user, token })
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn signup(&self, request: SignupRequest) -> Result<Session, UsecaseError> {
        request.validate()?;

        let password = request.password.unwrap_or_default();
        let password_hash = password::hash(password).await?;
        let user = User::new(
            request.name.unwrap_or_default(),
            request.email.unwrap_or_default(),
            password_hash,
        );

        let created = self.user_repository.create(&user).await?;
        tracing::info!(user_id = %created.id, "user signed up");
        self.session(created)
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> Result<Session, UsecaseError> {
        let (Some(email), Some(password)) = (request.email, request.password) else {
            return Err(UsecaseError::Validation(
                "Please provide email and password!".to_string(),
            ));
        };

        let incorrect = || UsecaseError::Unauthorized("Incorrect email or password".to_string());

        let user = self
            .user_repository
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(incorrect)?;

        if !password::verify(password, user.password_hash.clone()).await? {
            tracing::warn!(user_id = %user.id, "login with wrong password");
            return Err(incorrect());
        }

        tracing::info!(user_id = %user.id, "user logged in");
        self.session(user)
    }

    /// Resolves a bearer token to a live user whose password predates the token.
    #[tracing::instrument(skip(self, token))]
    pub async fn authenticate(&self, token: &str) -> Result<User, UsecaseError> {
        let claims = self.jwt.validate_token(token)?;
        let user_id = claims.user_id()?;

        let user = self
            .user_repository
            .find_active(user_id)
            .await?
            .ok_or_else(|| {
                UsecaseError::Unauthorized(
                    "The user belonging to this token does no longer exist.".to_string(),
                )
            })?;

        if user.changed_password_after(claims.iat) {
            return Err(UsecaseError::Unauthorized(
                "User recently changed password! Please log in again.".to_string(),
            ));
        }

        Ok(user)
    }

    #[tracing::instrument(skip(self, user, request), fields(user_id = %user.id))]
    pub async fn update_password(
        &self,
        user: &User,
        request: UpdatePasswordRequest,
    ) -> Result<Session, UsecaseError> {
        request.validate()?;

        let current = request.password_current.unwrap_or_default();
        if !password::verify(current, user.password_hash.clone()).await? {
            return Err(UsecaseError::Unauthorized(
                "Your current password is wrong.".to_string(),
            ));
        }

        self.store_password(user, request.new_password).await
    }

    async fn store_password(
        &self,
        user: &User,
        new_password: NewPassword,
    ) -> Result<Session, UsecaseError> {
        let password_hash =
            password::hash(new_password.password.unwrap_or_default()).await?;
        let changed_at = password_changed_now();

        self.user_repository
            .update_password(user.id, &password_hash, changed_at)
            .await?;

        let mut updated = user.clone();
        updated.password_hash = password_hash;
        updated.password_changed_at = Some(changed_at);
        updated.password_reset_token = None;
        updated.password_reset_expires = None;

        tracing::info!(user_id = %user.id, "password changed");
        self.session(updated)
    }

    /// Mails a single-use reset link built from `reset_url_base` plus the token.
    #[tracing::instrument(skip(self, reset_url_base))]
    pub async fn forgot_password(
        &self,
        email: Option<String>,
        reset_url_base: &str,
    ) -> Result<(), UsecaseError> {
        let email = email.unwrap_or_default().trim().to_lowercase();
        let user = self
            .user_repository
            .find_by_email(&email)
            .await?
            .ok_or_else(|| {
                UsecaseError::NotFound("There is no user with that email address.".to_string())
            })?;

        let (token, digest) = create_reset_token();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.user_repository
            .set_reset_token(user.id, Some(digest), Some(expires_at))
            .await?;

        let reset_url = format!("{reset_url_base}/{token}");
        let message = Email {
            to: user.email.clone(),
            subject: "Your password reset token (valid for 10 min)".to_string(),
            text: format!(
                "Forgot your password? Submit a PATCH request with your new password and \
                 password_confirm to: {reset_url}.\nIf you didn't forget your password, \
                 please ignore this email!"
            ),
        };

        if let Err(e) = self.mailer.send(message).await {
            tracing::error!(error = %e, user_id = %user.id, "reset email failed");
            self.user_repository
                .set_reset_token(user.id, None, None)
                .await?;
            return Err(UsecaseError::Internal(
                "There was an error sending the email. Try again later!".to_string(),
            ));
        }

        tracing::info!(user_id = %user.id, "reset token sent");
        Ok(())
    }

    #[tracing::instrument(skip(self, token, new_password))]
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: NewPassword,
    ) -> Result<Session, UsecaseError> {
        let user = self
            .user_repository
            .find_by_reset_token(&hash_reset_token(token), Utc::now())
            .await?
            .ok_or_else(|| {
                UsecaseError::Validation("Token is invalid or has expired".to_string())
            })?;

        new_password.validate()?;
        self.store_password(&user, new_password).await
    }
}
