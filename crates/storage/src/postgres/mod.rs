//! PostgreSQL storage adapter.
//!
//! This module implements the repository traits defined in `daftar-core`
//! using PostgreSQL as the backing store.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool and migrations
//! - [`PgRepositories`] - Composite repository implementing `Repositories` trait
//! - Individual repos: [`PgEntityRepository`] (one per table), [`PgUserRepository`]
//!
//! # Usage
//!
//! ```ignore
//! let config = DatabaseConfig::for_server(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let repositories = PgRepositories::new(Arc::new(db));
//! ```

mod database;
mod entity_repo;
mod helpers;
mod user_repo;

pub use database::{Database, DatabaseConfig};
pub use entity_repo::PgEntityRepository;
pub use user_repo::PgUserRepository;

use std::sync::Arc;

use async_trait::async_trait;

use daftar_core::models::EntityKind;
use daftar_core::ports::{EntityRepository, Repositories, UserRepository};

// =============================================================================
// Composite Repository
// =============================================================================

/// Aggregated PostgreSQL repositories implementing the `Repositories` trait.
pub struct PgRepositories {
    db: Arc<Database>,
    categories: PgEntityRepository,
    tags: PgEntityRepository,
    users: PgUserRepository,
}

impl PgRepositories {
    /// Create a new repository aggregate from a database connection.
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            categories: PgEntityRepository::new(&db, EntityKind::Category),
            tags: PgEntityRepository::new(&db, EntityKind::Tag),
            users: PgUserRepository::new(&db),
            db,
        }
    }
}

#[async_trait]
impl Repositories for PgRepositories {
    fn categories(&self) -> &dyn EntityRepository {
        &self.categories
    }

    fn tags(&self) -> &dyn EntityRepository {
        &self.tags
    }

    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    async fn is_healthy(&self) -> bool {
        self.db.is_healthy().await
    }
}
