//! Storage layer for the Daftar catalog.
//!
//! This crate provides implementations of the repository traits defined in
//! `daftar-core`: a PostgreSQL adapter for production and an in-memory
//! adapter for local runs and tests.
//!
//! # Architecture
//!
//! - [`postgres::Database`] - Connection pool management and migrations
//! - [`postgres::PgRepositories`] - Composite repository over PostgreSQL
//! - [`memory::MemoryRepositories`] - Composite repository over ordered maps
//!
//! Both adapters page by ascending id with an exclusive cursor, so a
//! client walking the pages sees the same sequence whichever one backs it.
//!
//! # Usage
//!
//! ```ignore
//! use daftar_storage::{Database, DatabaseConfig, PgRepositories};
//!
//! // Connect to the database
//! let config = DatabaseConfig::for_server(&database_url);
//! let db = Database::connect(&config).await?;
//!
//! // Run migrations
//! db.migrate().await?;
//!
//! // Create repositories
//! let repositories = Arc::new(PgRepositories::new(Arc::new(db)));
//! ```

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepositories;
pub use postgres::{Database, DatabaseConfig, PgRepositories};
