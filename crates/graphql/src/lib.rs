//! GraphQL API for the Daftar catalog.
//!
//! Provides a GraphQL endpoint over the catalog services: category and tag
//! lists (plain and cursor-paginated), CRUD mutations, posts by category or
//! tag name, and the session user's profile.
//!
//! # Building and serving
//!
//! ```ignore
//! use daftar_graphql::{build_schema, serve_with_shutdown, ServerConfig, Viewer};
//!
//! let schema = build_schema(repositories, Viewer(admin_user_id));
//! serve_with_shutdown(schema, ServerConfig::default(), shutdown).await?;
//! ```
//!
//! Errors carry a stable `extensions.code` (`VALIDATION`, `NOT_FOUND`,
//! `CONFLICT`, `STORE_UNAVAILABLE`, `INTERNAL`).

mod schema;
mod server;
mod types;

pub use schema::{
    build_schema, CatalogMutation, CatalogQuery, Category, CategoryPage, Post, Profile, Tag,
    TagPage, MAX_QUERY_COMPLEXITY, MAX_QUERY_DEPTH,
};
pub use server::{serve_with_shutdown, ServerConfig};
pub use types::{DaftarSchema, Viewer};
