use std::marker::PhantomData;

use serde_json::Value as Json;
use uuid::Uuid;
use validator::Validate;

use crate::domain::resource::{Creatable, Resource};
use crate::usecase::contracts::ResourceRepository;
use crate::usecase::error::UsecaseError;
use crate::usecase::query::{ApiQuery, Filter, QueryParams};

/// Projected documents of a list request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListResult {
    pub documents: Vec<Json>,
    pub results: usize,
}

/// CRUD over a single resource. Never touches other entities.
pub struct ResourceService<E, R>
where
    E: Resource,
    R: ResourceRepository<E>,
{
    repository: R,
    _entity: PhantomData<fn() -> E>,
}

impl<E, R> ResourceService<E, R>
where
    E: Resource,
    R: ResourceRepository<E>,
{
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            _entity: PhantomData,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    #[tracing::instrument(skip(self, params), fields(resource = E::SCHEMA.name))]
    pub async fn list(
        &self,
        params: &QueryParams,
        scope: Option<Filter>,
    ) -> Result<ListResult, UsecaseError> {
        let query = ApiQuery::from_params(E::SCHEMA, params)?.scoped(scope);
        self.list_query(&query).await
    }

    #[tracing::instrument(skip(self, query), fields(resource = E::SCHEMA.name, page = query.page, limit = query.limit))]
    pub async fn list_query(&self, query: &ApiQuery) -> Result<ListResult, UsecaseError> {
        tracing::debug!(filters = query.filters.len(), "listing documents");

        let entities = self.repository.find_many(query).await?;
        let documents = entities
            .iter()
            .map(|entity| {
                serde_json::to_value(entity)
                    .map(|doc| query.projection.apply(doc))
                    .map_err(|e| UsecaseError::Internal(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(count = documents.len(), "documents listed");
        Ok(ListResult {
            results: documents.len(),
            documents,
        })
    }

    #[tracing::instrument(skip(self), fields(resource = E::SCHEMA.name, id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<E, UsecaseError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| UsecaseError::not_found(E::SCHEMA.name))
    }

    #[tracing::instrument(skip(self, patch), fields(resource = E::SCHEMA.name, id = %id))]
    pub async fn update(&self, id: Uuid, patch: E::Patch) -> Result<E, UsecaseError> {
        patch.validate()?;

        let updated = self
            .repository
            .update(id, &patch)
            .await?
            .ok_or_else(|| UsecaseError::not_found(E::SCHEMA.name))?;

        tracing::info!(id = %id, "document updated");
        Ok(updated)
    }

    /// Deletes the document, returning it so callers can react to the removal.
    #[tracing::instrument(skip(self), fields(resource = E::SCHEMA.name, id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<E, UsecaseError> {
        let deleted = self
            .repository
            .delete(id)
            .await?
            .ok_or_else(|| UsecaseError::not_found(E::SCHEMA.name))?;

        tracing::info!(id = %id, "document deleted");
        Ok(deleted)
    }
}

impl<E, R> ResourceService<E, R>
where
    E: Creatable,
    R: ResourceRepository<E>,
{
    #[tracing::instrument(skip(self, input), fields(resource = E::SCHEMA.name))]
    pub async fn create(&self, input: E::Create) -> Result<E, UsecaseError> {
        input.validate()?;

        let entity = E::build(input);
        let created = self.repository.insert(&entity).await?;

        tracing::info!(id = %created.id(), "document created");
        Ok(created)
    }
}
