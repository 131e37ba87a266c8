use validator::Validate;

use crate::domain::user::{ProfileUpdate, User};
use crate::usecase::contracts::{ProfileChanges, UserRepository};
use crate::usecase::error::UsecaseError;

/// Self-service account operations.
pub struct UsersUseCase<U>
where
    U: UserRepository,
{
    user_repository: U,
}

impl<U> UsersUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repository: U) -> Self {
        Self { user_repository }
    }

    #[tracing::instrument(skip(self, user, update), fields(user_id = %user.id))]
    pub async fn update_me(&self, user: &User, update: ProfileUpdate) -> Result<User, UsecaseError> {
        if update.touches_password() {
            return Err(UsecaseError::Validation(
                "This route is not for password updates. Please use /update-my-password.".to_string(),
            ));
        }
        update.validate()?;

        let changes = ProfileChanges {
            name: update.name.map(|n| n.trim().to_string()),
            email: update.email.map(|e| e.trim().to_lowercase()),
            photo: update.photo,
        };

        let updated = self
            .user_repository
            .update_profile(user.id, &changes)
            .await?
            .ok_or_else(|| UsecaseError::not_found("user"))?;

        tracing::info!(user_id = %user.id, "profile updated");
        Ok(updated)
    }

    /// Soft delete: the account stays stored but disappears from every read.
    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn delete_me(&self, user: &User) -> Result<(), UsecaseError> {
        self.user_repository.deactivate(user.id).await?;
        tracing::info!(user_id = %user.id, "account deactivated");
        Ok(())
    }
}
