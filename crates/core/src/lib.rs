//! Core domain layer for the Daftar blog catalog.
//!
//! This crate contains the domain models, port traits (interfaces), and
//! services for the blog admin catalog: categories, tags, post index rows
//! and the author profile. It follows hexagonal architecture principles -
//! this is the innermost layer with no dependencies on infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      daftar (binary)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │      daftar-graphql         │        daftar-client          │
//! │   (API + HTTP server)       │  (list client, virtualizer)   │
//! ├─────────────────────────────┴───────────────────────────────┤
//! │                      daftar-storage                         │
//! │                (PostgreSQL, in-memory)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      daftar-core  ← YOU ARE HERE            │
//! │               (models, ports, services)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Domain models (Entity, Post, Profile, ...)
//! - [`ports`] - Pagination types and repository traits
//! - [`services`] - Catalog and profile services
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Pagination
//!
//! Lists are paged forward by id. A request carries a limit in `[1, 100]`
//! and an optional [`ports::Cursor`]; the response carries the items and
//! the cursor of the next page, absent once the collection is exhausted.
//! Cursors are scoped to the filter they were issued under.

pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod services;
