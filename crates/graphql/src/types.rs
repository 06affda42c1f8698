//! GraphQL type definitions.

use async_graphql::{EmptySubscription, Schema};

use crate::schema::{CatalogMutation, CatalogQuery};

/// The catalog GraphQL schema type.
pub type DaftarSchema = Schema<CatalogQuery, CatalogMutation, EmptySubscription>;

/// Id of the user the request acts as.
///
/// Session handling sits in front of this server; it is configured once at
/// startup and placed in the schema data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer(pub String);
