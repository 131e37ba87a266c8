use std::marker::PhantomData;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::resource::Resource;
use crate::repository::errors::{RepositoryError, map_db_error};
use crate::repository::postgres::query::{push_filters, push_order, push_page};
use crate::usecase::contracts::ResourceRepository;
use crate::usecase::query::ApiQuery;

/// Table mapping for a resource stored in Postgres.
pub trait PgResource: Resource + for<'r> sqlx::FromRow<'r, PgRow> {
    const TABLE: &'static str;
    /// Columns read back into the entity, in `FromRow` order.
    const COLUMNS: &'static str;
    /// Columns written on insert; `push_values` binds them in this order.
    const INSERT_COLUMNS: &'static str = Self::COLUMNS;
    /// Rows outside this predicate are invisible to reads.
    const READ_FILTER: &'static str = "TRUE";

    fn push_values(&self, builder: &mut QueryBuilder<'_, Postgres>);

    /// Appends `, column = value` for every field present in the patch.
    fn push_patch(patch: &Self::Patch, builder: &mut QueryBuilder<'_, Postgres>);
}

/// Appends `, column = $n` when the value is present.
pub fn set_column<'args, T>(
    builder: &mut QueryBuilder<'args, Postgres>,
    column: &str,
    value: Option<T>,
) where
    T: 'args + sqlx::Encode<'args, Postgres> + sqlx::Type<Postgres>,
{
    if let Some(value) = value {
        builder.push(", ").push(column).push(" = ").push_bind(value);
    }
}

pub struct PostgresResourceRepository<E> {
    pub(crate) pool: PgPool,
    _entity: PhantomData<fn() -> E>,
}

impl<E> PostgresResourceRepository<E> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }
}

impl<E> Clone for PostgresResourceRepository<E> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

impl<E: PgResource> PostgresResourceRepository<E> {
    /// `SELECT <columns> FROM <table> WHERE <read filter>`, ready for more conditions.
    pub(crate) fn select(&self) -> QueryBuilder<'static, Postgres> {
        QueryBuilder::new(format!(
            "SELECT {} FROM {} WHERE {}",
            E::COLUMNS,
            E::TABLE,
            E::READ_FILTER
        ))
    }
}

impl<E: PgResource> ResourceRepository<E> for PostgresResourceRepository<E> {
    #[tracing::instrument(skip(self, query), fields(table = E::TABLE, page = query.page, limit = query.limit))]
    async fn find_many(&self, query: &ApiQuery) -> Result<Vec<E>, RepositoryError> {
        tracing::debug!("finding documents");

        let mut builder = self.select();
        push_filters(&mut builder, &query.filters);
        push_order(&mut builder, &query.sort);
        push_page(&mut builder, query);

        let rows = builder
            .build_query_as::<E>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(count = rows.len(), "found documents");
        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(table = E::TABLE, id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<E>, RepositoryError> {
        tracing::debug!("finding document by id");

        let mut builder = self.select();
        builder.push(" AND id = ").push_bind(id);

        builder
            .build_query_as::<E>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }

    #[tracing::instrument(skip(self, entity), fields(table = E::TABLE, id = %entity.id()))]
    async fn insert(&self, entity: &E) -> Result<E, RepositoryError> {
        tracing::debug!("inserting document");

        let mut builder = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            E::TABLE,
            E::INSERT_COLUMNS
        ));
        entity.push_values(&mut builder);
        builder.push(format!(") RETURNING {}", E::COLUMNS));

        let created = builder
            .build_query_as::<E>()
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        tracing::debug!("document inserted");
        Ok(created)
    }

    #[tracing::instrument(skip(self, patch), fields(table = E::TABLE, id = %id))]
    async fn update(&self, id: Uuid, patch: &E::Patch) -> Result<Option<E>, RepositoryError> {
        tracing::debug!("updating document");

        let mut builder = QueryBuilder::new(format!(
            "UPDATE {} SET version = version + 1",
            E::TABLE
        ));
        E::push_patch(patch, &mut builder);
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" AND {} RETURNING {}", E::READ_FILTER, E::COLUMNS));

        builder
            .build_query_as::<E>()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    #[tracing::instrument(skip(self), fields(table = E::TABLE, id = %id))]
    async fn delete(&self, id: Uuid) -> Result<Option<E>, RepositoryError> {
        tracing::debug!("deleting document");

        let mut builder = QueryBuilder::new(format!("DELETE FROM {} WHERE id = ", E::TABLE));
        builder
            .push_bind(id)
            .push(format!(" AND {} RETURNING {}", E::READ_FILTER, E::COLUMNS));

        builder
            .build_query_as::<E>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }
}
