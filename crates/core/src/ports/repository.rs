//! Port traits for data repositories.
//!
//! These traits define the storage interface used by the domain layer.
//! Implementations live in the infrastructure layer (`daftar-storage`).

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::models::{Entity, EntityInput, EntityKind, Post, Profile, ProfileUpdate};

use super::pagination::{EntityFilter, Page, PageRequest};

// =============================================================================
// Repository Traits
// =============================================================================

/// Repository for one catalog table (categories or tags).
///
/// Writes on a missing id fail with `StorageError::NotFound`; a duplicate
/// name fails with `StorageError::ConstraintViolation`.
#[async_trait]
pub trait EntityRepository: Send + Sync {
    /// Which table this repository serves.
    fn kind(&self) -> EntityKind;

    /// One page ordered by ascending id, strictly after the request cursor.
    async fn list_page(
        &self,
        filter: &EntityFilter,
        page: PageRequest,
    ) -> StorageResult<Page<Entity>>;

    /// Every matching row ordered by ascending id.
    async fn list_all(&self, filter: &EntityFilter) -> StorageResult<Vec<Entity>>;

    /// Get a row by id.
    async fn get(&self, id: i64) -> StorageResult<Option<Entity>>;

    /// Insert a row, assigning the next id.
    async fn create(&self, input: &EntityInput) -> StorageResult<Entity>;

    /// Overwrite name and title of an existing row.
    async fn update(&self, id: i64, input: &EntityInput) -> StorageResult<Entity>;

    /// Remove a row.
    async fn delete(&self, id: i64) -> StorageResult<()>;

    /// Posts linked to the row with this name, newest first.
    ///
    /// Returns `None` when no row has that name.
    async fn posts_by_name(&self, name: &str) -> StorageResult<Option<Vec<Post>>>;
}

/// Repository for user profiles.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Get a profile with its social links.
    async fn get_profile(&self, user_id: &str) -> StorageResult<Option<Profile>>;

    /// Create an empty profile row for a session user if none exists.
    async fn ensure_user(&self, user_id: &str) -> StorageResult<()>;

    /// Apply a partial update; replacing socials happens in the same transaction.
    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> StorageResult<Profile>;
}

// =============================================================================
// Composite Repository
// =============================================================================

/// Combined repository access for the services.
#[async_trait]
pub trait Repositories: Send + Sync {
    /// Access the category repository.
    fn categories(&self) -> &dyn EntityRepository;

    /// Access the tag repository.
    fn tags(&self) -> &dyn EntityRepository;

    /// Access the user repository.
    fn users(&self) -> &dyn UserRepository;

    /// Check if the backing store answers.
    async fn is_healthy(&self) -> bool;

    /// Repository for the given kind.
    fn entities(&self, kind: EntityKind) -> &dyn EntityRepository {
        match kind {
            EntityKind::Category => self.categories(),
            EntityKind::Tag => self.tags(),
        }
    }
}
