//! Catalog service - categories and tags behind one pagination contract.
//!
//! Every read and write goes through here so validation, error mapping
//! and metrics are applied the same way no matter which adapter serves
//! the request.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::error::{DomainError, DomainResult, StorageError};
use crate::metrics::{QueryTimer, record_mutation, record_page_served, record_store_error};
use crate::models::{Entity, EntityInput, EntityKind, Post};
use crate::ports::{
    Cursor, DEFAULT_PAGE_SIZE, EntityFilter, EntityRepository, Page, PageRequest, Repositories,
};

/// Pagination and CRUD service for catalog entities.
#[derive(Clone)]
pub struct CatalogService {
    repositories: Arc<dyn Repositories>,
}

impl CatalogService {
    pub fn new(repositories: Arc<dyn Repositories>) -> Self {
        Self { repositories }
    }

    fn repo(&self, kind: EntityKind) -> &dyn EntityRepository {
        self.repositories.entities(kind)
    }

    /// Fetch one page of entities.
    ///
    /// `limit` defaults to [`DEFAULT_PAGE_SIZE`] and must lie in `[1, 100]`.
    /// The cursor is the `next_cursor` of a previous page issued under the
    /// same filter.
    #[instrument(skip(self, kind, filter), fields(kind = kind.as_str()))]
    pub async fn list_page(
        &self,
        kind: EntityKind,
        filter: &EntityFilter,
        cursor: Option<Cursor>,
        limit: Option<i64>,
    ) -> DomainResult<Page<Entity>> {
        filter.validate()?;
        let request = PageRequest::new(limit.unwrap_or(DEFAULT_PAGE_SIZE as i64), cursor)?;

        let page = {
            let _timer = QueryTimer::new(kind.as_str());
            self.repo(kind)
                .list_page(filter, request)
                .await
                .map_err(store_failure)?
        };

        debug!(items = page.len(), next = ?page.next_cursor, "Page served");
        record_page_served(kind.as_str(), !page.has_more());
        Ok(page)
    }

    /// Every matching entity, unpaginated.
    #[instrument(skip(self, kind, filter), fields(kind = kind.as_str()))]
    pub async fn list_all(
        &self,
        kind: EntityKind,
        filter: &EntityFilter,
    ) -> DomainResult<Vec<Entity>> {
        filter.validate()?;
        self.repo(kind).list_all(filter).await.map_err(store_failure)
    }

    /// Look up one entity by id.
    pub async fn get(&self, kind: EntityKind, id: i64) -> DomainResult<Option<Entity>> {
        self.repo(kind).get(id).await.map_err(store_failure)
    }

    #[instrument(skip(self, kind, input), fields(kind = kind.as_str()))]
    pub async fn create(&self, kind: EntityKind, input: EntityInput) -> DomainResult<Entity> {
        input.validate()?;
        let entity = self
            .repo(kind)
            .create(&input)
            .await
            .map_err(|e| write_failure(kind, None, e))?;

        debug!(id = entity.id, name = %entity.name, "Entity created");
        record_mutation(kind.as_str(), "create");
        Ok(entity)
    }

    #[instrument(skip(self, kind, input), fields(kind = kind.as_str()))]
    pub async fn update(
        &self,
        kind: EntityKind,
        id: i64,
        input: EntityInput,
    ) -> DomainResult<Entity> {
        input.validate()?;
        let entity = self
            .repo(kind)
            .update(id, &input)
            .await
            .map_err(|e| write_failure(kind, Some(id), e))?;

        debug!(id, "Entity updated");
        record_mutation(kind.as_str(), "update");
        Ok(entity)
    }

    #[instrument(skip(self, kind), fields(kind = kind.as_str()))]
    pub async fn delete(&self, kind: EntityKind, id: i64) -> DomainResult<()> {
        self.repo(kind)
            .delete(id)
            .await
            .map_err(|e| write_failure(kind, Some(id), e))?;

        debug!(id, "Entity deleted");
        record_mutation(kind.as_str(), "delete");
        Ok(())
    }

    /// Posts filed under the category or tag with this exact name.
    pub async fn posts_by_name(&self, kind: EntityKind, name: &str) -> DomainResult<Vec<Post>> {
        self.repo(kind)
            .posts_by_name(name)
            .await
            .map_err(store_failure)?
            .ok_or_else(|| DomainError::NotFound {
                kind: kind.label(),
                key: name.to_string(),
            })
    }

    /// Whether the backing store answers.
    pub async fn is_healthy(&self) -> bool {
        self.repositories.is_healthy().await
    }
}

fn store_failure(err: StorageError) -> DomainError {
    let err = DomainError::from(err);
    warn!(error = %err, "Store failure");
    record_store_error(err.code());
    err
}

fn write_failure(kind: EntityKind, id: Option<i64>, err: StorageError) -> DomainError {
    match (err, id) {
        (StorageError::NotFound(_), Some(id)) => DomainError::entity_not_found(kind, id),
        (StorageError::ConstraintViolation(detail), _) => {
            DomainError::Conflict(format!("{} with this name already exists ({})", kind, detail))
        }
        (err, _) => store_failure(err),
    }
}
