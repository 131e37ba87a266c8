use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::user::{User, UserPatch};
use crate::repository::errors::{RepositoryError, map_db_error};
use crate::repository::postgres::resource::{PgResource, PostgresResourceRepository, set_column};
use crate::usecase::contracts::{ProfileChanges, ResourceRepository, UserRepository};

pub type PostgresUserRepository = PostgresResourceRepository<User>;

impl PgResource for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str = "id, name, email, photo, role, password_hash, \
        password_changed_at, password_reset_token, password_reset_expires, active, \
        created_at, version";
    const READ_FILTER: &'static str = "active = TRUE";

    fn push_values(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        let mut values = builder.separated(", ");
        values
            .push_bind(self.id)
            .push_bind(self.name.clone())
            .push_bind(self.email.clone())
            .push_bind(self.photo.clone())
            .push_bind(self.role.as_str())
            .push_bind(self.password_hash.clone())
            .push_bind(self.password_changed_at)
            .push_bind(self.password_reset_token.clone())
            .push_bind(self.password_reset_expires)
            .push_bind(self.active)
            .push_bind(self.created_at)
            .push_bind(self.version);
    }

    fn push_patch(patch: &UserPatch, builder: &mut QueryBuilder<'_, Postgres>) {
        set_column(builder, "name", patch.name.as_deref().map(|n| n.trim().to_string()));
        set_column(builder, "email", patch.email.as_deref().map(|e| e.trim().to_lowercase()));
        set_column(builder, "photo", patch.photo.clone());
        set_column(builder, "role", patch.role.map(|r| r.as_str()));
    }
}

impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: &User) -> Result<User, RepositoryError> {
        self.insert(user).await
    }

    async fn find_active(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        self.find_by_id(id).await
    }

    #[tracing::instrument(skip(self, email))]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        tracing::debug!("finding user by email");

        let mut builder = self.select();
        builder.push(" AND email = ").push_bind(email.to_string());

        builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = self.select();
        builder
            .push(" AND id = ANY(")
            .push_bind(ids.to_vec())
            .push(") ORDER BY name ASC");

        builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }

    #[tracing::instrument(skip(self, password_hash), fields(user_id = %id))]
    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        tracing::debug!("updating password");

        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, password_changed_at = $3,
                password_reset_token = NULL, password_reset_expires = NULL,
                version = version + 1
            WHERE id = $1 AND active = TRUE
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(changed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, token_hash), fields(user_id = %id, set = token_hash.is_some()))]
    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token = $2, password_reset_expires = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, token_hash))]
    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let mut builder = self.select();
        builder
            .push(" AND password_reset_token = ")
            .push_bind(token_hash.to_string())
            .push(" AND password_reset_expires > ")
            .push_bind(now);

        builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }

    #[tracing::instrument(skip(self, changes), fields(user_id = %id))]
    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, RepositoryError> {
        tracing::debug!("updating profile");

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE users SET version = version + 1");
        set_column(&mut builder, "name", changes.name.clone());
        set_column(&mut builder, "email", changes.email.clone());
        set_column(&mut builder, "photo", changes.photo.clone());
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" AND active = TRUE RETURNING {}", User::COLUMNS));

        builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    #[tracing::instrument(skip(self), fields(user_id = %id))]
    async fn deactivate(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET active = FALSE WHERE id = $1 AND active = TRUE")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        tracing::debug!("user deactivated");
        Ok(())
    }
}
