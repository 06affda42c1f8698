//! GraphQL schema definition.
//!
//! This module provides the catalog schema: categories and tags (plain and
//! cursor-paginated lists, lookups, mutations), the posts filed under them,
//! and the profile of the session user.

use std::sync::Arc;

use async_graphql::{
    Context, EmptySubscription, ErrorExtensions, InputObject, Object, Result, Schema,
};
use chrono::{DateTime, Utc};
use tracing::error;

use daftar_core::error::DomainError;
use daftar_core::models::{EntityInput, EntityKind, ProfileUpdate, Social};
use daftar_core::ports::{Cursor, DEFAULT_PAGE_SIZE, EntityFilter, Repositories};
use daftar_core::services::{CatalogService, ProfileService};

use crate::types::{DaftarSchema, Viewer};

// -----------------------------------------------------------------------------
// Schema Configuration
// -----------------------------------------------------------------------------

/// Maximum query depth to prevent deeply nested queries (DoS protection).
/// Note: GraphQL introspection requires depth ~13, so we use 15 to allow it.
pub const MAX_QUERY_DEPTH: usize = 15;

/// Maximum query complexity score (DoS protection).
/// Each field has a default complexity of 1, nested objects multiply.
pub const MAX_QUERY_COMPLEXITY: usize = 500;

// -----------------------------------------------------------------------------
// Schema Builder
// -----------------------------------------------------------------------------

/// Build the catalog schema over a repository aggregate.
///
/// `viewer` is the session user that `profile` and `updateProfile` act on.
/// Includes query depth and complexity limits for DoS protection.
pub fn build_schema(repos: Arc<dyn Repositories>, viewer: Viewer) -> DaftarSchema {
    Schema::build(CatalogQuery, CatalogMutation, EmptySubscription)
        .data(CatalogService::new(repos.clone()))
        .data(ProfileService::new(repos))
        .data(viewer)
        .limit_depth(MAX_QUERY_DEPTH)
        .limit_complexity(MAX_QUERY_COMPLEXITY)
        .finish()
}

// -----------------------------------------------------------------------------
// Query Root
// -----------------------------------------------------------------------------

/// Query root for the catalog.
#[derive(Default)]
pub struct CatalogQuery;

#[Object]
impl CatalogQuery {
    /// All categories matching the filter, ordered by id.
    async fn categories<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        name: Option<String>,
        title: Option<String>,
    ) -> Result<Vec<Category>> {
        let items = list_all(ctx, EntityKind::Category, name, title).await?;
        Ok(items.into_iter().map(Category::from).collect())
    }

    /// One page of categories after `cursor`.
    async fn categories_infinite<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        name: Option<String>,
        title: Option<String>,
        cursor: Option<i64>,
        #[graphql(default_with = "DEFAULT_PAGE_SIZE as i64")] limit: i64,
    ) -> Result<CategoryPage> {
        let page = list_page(ctx, EntityKind::Category, name, title, cursor, limit).await?;
        Ok(CategoryPage::from(page))
    }

    /// Get a category by id.
    async fn category<'ctx>(&self, ctx: &Context<'ctx>, id: i64) -> Result<Option<Category>> {
        let catalog = ctx.data::<CatalogService>()?;
        let entity = catalog.get(EntityKind::Category, id).await.map_err(to_gql_error)?;
        Ok(entity.map(Category::from))
    }

    /// Posts filed under the category with this name, newest first.
    async fn posts_by_category_name<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        name: String,
    ) -> Result<Vec<Post>> {
        posts_by_name(ctx, EntityKind::Category, &name).await
    }

    /// All tags matching the filter, ordered by id.
    async fn tags<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        name: Option<String>,
        title: Option<String>,
    ) -> Result<Vec<Tag>> {
        let items = list_all(ctx, EntityKind::Tag, name, title).await?;
        Ok(items.into_iter().map(Tag::from).collect())
    }

    /// One page of tags after `cursor`.
    async fn tags_infinite<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        name: Option<String>,
        title: Option<String>,
        cursor: Option<i64>,
        #[graphql(default_with = "DEFAULT_PAGE_SIZE as i64")] limit: i64,
    ) -> Result<TagPage> {
        let page = list_page(ctx, EntityKind::Tag, name, title, cursor, limit).await?;
        Ok(TagPage::from(page))
    }

    /// Get a tag by id.
    async fn tag<'ctx>(&self, ctx: &Context<'ctx>, id: i64) -> Result<Option<Tag>> {
        let catalog = ctx.data::<CatalogService>()?;
        let entity = catalog.get(EntityKind::Tag, id).await.map_err(to_gql_error)?;
        Ok(entity.map(Tag::from))
    }

    /// Posts filed under the tag with this name, newest first.
    async fn posts_by_tag_name<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        name: String,
    ) -> Result<Vec<Post>> {
        posts_by_name(ctx, EntityKind::Tag, &name).await
    }

    /// Profile of the session user.
    async fn profile<'ctx>(&self, ctx: &Context<'ctx>) -> Result<Option<Profile>> {
        let profiles = ctx.data::<ProfileService>()?;
        let viewer = ctx.data::<Viewer>()?;

        let profile = profiles.get_profile(&viewer.0).await.map_err(to_gql_error)?;
        Ok(profile.map(Profile::from))
    }
}

// -----------------------------------------------------------------------------
// Mutation Root
// -----------------------------------------------------------------------------

/// Mutation root for the catalog.
#[derive(Default)]
pub struct CatalogMutation;

#[Object]
impl CatalogMutation {
    async fn create_category<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        input: EntityInputData,
    ) -> Result<Category> {
        let catalog = ctx.data::<CatalogService>()?;
        let entity = catalog
            .create(EntityKind::Category, input.into())
            .await
            .map_err(to_gql_error)?;
        Ok(Category::from(entity))
    }

    async fn update_category<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        id: i64,
        input: EntityInputData,
    ) -> Result<Category> {
        let catalog = ctx.data::<CatalogService>()?;
        let entity = catalog
            .update(EntityKind::Category, id, input.into())
            .await
            .map_err(to_gql_error)?;
        Ok(Category::from(entity))
    }

    /// Delete a category; returns true once removed.
    async fn delete_category<'ctx>(&self, ctx: &Context<'ctx>, id: i64) -> Result<bool> {
        let catalog = ctx.data::<CatalogService>()?;
        catalog.delete(EntityKind::Category, id).await.map_err(to_gql_error)?;
        Ok(true)
    }

    async fn create_tag<'ctx>(&self, ctx: &Context<'ctx>, input: EntityInputData) -> Result<Tag> {
        let catalog = ctx.data::<CatalogService>()?;
        let entity = catalog
            .create(EntityKind::Tag, input.into())
            .await
            .map_err(to_gql_error)?;
        Ok(Tag::from(entity))
    }

    async fn update_tag<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        id: i64,
        input: EntityInputData,
    ) -> Result<Tag> {
        let catalog = ctx.data::<CatalogService>()?;
        let entity = catalog
            .update(EntityKind::Tag, id, input.into())
            .await
            .map_err(to_gql_error)?;
        Ok(Tag::from(entity))
    }

    /// Delete a tag; returns true once removed.
    async fn delete_tag<'ctx>(&self, ctx: &Context<'ctx>, id: i64) -> Result<bool> {
        let catalog = ctx.data::<CatalogService>()?;
        catalog.delete(EntityKind::Tag, id).await.map_err(to_gql_error)?;
        Ok(true)
    }

    /// Update the session user's profile. A non-empty `socials` list
    /// replaces every existing link.
    async fn update_profile<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        input: ProfileInput,
    ) -> Result<Profile> {
        let profiles = ctx.data::<ProfileService>()?;
        let viewer = ctx.data::<Viewer>()?;

        let profile = profiles
            .update_profile(&viewer.0, input.into())
            .await
            .map_err(to_gql_error)?;
        Ok(Profile::from(profile))
    }
}

// -----------------------------------------------------------------------------
// Resolver Helpers
// -----------------------------------------------------------------------------

async fn list_all(
    ctx: &Context<'_>,
    kind: EntityKind,
    name: Option<String>,
    title: Option<String>,
) -> Result<Vec<daftar_core::models::Entity>> {
    let catalog = ctx.data::<CatalogService>()?;
    catalog
        .list_all(kind, &EntityFilter::new(name, title))
        .await
        .map_err(to_gql_error)
}

async fn list_page(
    ctx: &Context<'_>,
    kind: EntityKind,
    name: Option<String>,
    title: Option<String>,
    cursor: Option<i64>,
    limit: i64,
) -> Result<daftar_core::ports::Page<daftar_core::models::Entity>> {
    let catalog = ctx.data::<CatalogService>()?;
    catalog
        .list_page(kind, &EntityFilter::new(name, title), cursor.map(Cursor), Some(limit))
        .await
        .map_err(to_gql_error)
}

async fn posts_by_name(ctx: &Context<'_>, kind: EntityKind, name: &str) -> Result<Vec<Post>> {
    let catalog = ctx.data::<CatalogService>()?;
    let posts = catalog.posts_by_name(kind, name).await.map_err(to_gql_error)?;
    Ok(posts.into_iter().map(Post::from).collect())
}

/// Convert a domain error into a GraphQL error carrying `extensions.code`.
///
/// Internal failures are logged and reported without their detail.
fn to_gql_error(err: DomainError) -> async_graphql::Error {
    let code = err.code();
    let message = if code == "INTERNAL" {
        error!(error = %err, "Request failed");
        "Internal error".to_string()
    } else {
        err.to_string()
    };
    async_graphql::Error::new(message).extend_with(|_, ext| ext.set("code", code))
}

// -----------------------------------------------------------------------------
// GraphQL Types
// -----------------------------------------------------------------------------

/// Generate an entity object type and its page type with From impls.
macro_rules! define_entity {
    ($node:ident, $page:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(async_graphql::SimpleObject)]
        pub struct $node {
            pub id: i64,
            pub name: String,
            pub title: String,
        }

        impl From<daftar_core::models::Entity> for $node {
            fn from(e: daftar_core::models::Entity) -> Self {
                Self {
                    id: e.id,
                    name: e.name,
                    title: e.title,
                }
            }
        }

        #[derive(async_graphql::SimpleObject)]
        pub struct $page {
            pub items: Vec<$node>,
            /// Id of the last item; absent on the final page.
            pub next_cursor: Option<i64>,
        }

        impl From<daftar_core::ports::Page<daftar_core::models::Entity>> for $page {
            fn from(page: daftar_core::ports::Page<daftar_core::models::Entity>) -> Self {
                Self {
                    next_cursor: page.next_cursor.map(|c| c.value()),
                    items: page.items.into_iter().map(<$node>::from).collect(),
                }
            }
        }
    };
}

define_entity!(Category, CategoryPage, "Post category.");
define_entity!(Tag, TagPage, "Post tag.");

/// Post index row.
#[derive(async_graphql::SimpleObject)]
pub struct Post {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
}

impl From<daftar_core::models::Post> for Post {
    fn from(p: daftar_core::models::Post) -> Self {
        Self {
            id: p.id,
            slug: p.slug,
            title: p.title,
            published_at: p.published_at,
        }
    }
}

#[derive(async_graphql::SimpleObject)]
#[graphql(name = "Social")]
pub struct SocialLink {
    pub title: String,
    pub link: String,
}

/// User profile with social links.
#[derive(async_graphql::SimpleObject)]
pub struct Profile {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub socials: Vec<SocialLink>,
}

impl From<daftar_core::models::Profile> for Profile {
    fn from(p: daftar_core::models::Profile) -> Self {
        Self {
            id: p.id,
            name: p.name,
            email: p.email,
            bio: p.bio,
            image: p.image,
            socials: p
                .socials
                .into_iter()
                .map(|s| SocialLink {
                    title: s.title,
                    link: s.link,
                })
                .collect(),
        }
    }
}

// -----------------------------------------------------------------------------
// Input Types
// -----------------------------------------------------------------------------

#[derive(InputObject)]
#[graphql(name = "EntityInput")]
pub struct EntityInputData {
    pub name: String,
    pub title: String,
}

impl From<EntityInputData> for EntityInput {
    fn from(input: EntityInputData) -> Self {
        EntityInput::new(input.name, input.title)
    }
}

#[derive(InputObject)]
pub struct SocialInput {
    pub title: String,
    pub link: String,
}

#[derive(InputObject)]
pub struct ProfileInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub socials: Option<Vec<SocialInput>>,
}

impl From<ProfileInput> for ProfileUpdate {
    fn from(input: ProfileInput) -> Self {
        ProfileUpdate {
            name: input.name,
            email: input.email,
            bio: input.bio,
            socials: input.socials.map(|socials| {
                socials
                    .into_iter()
                    .map(|s| Social {
                        title: s.title,
                        link: s.link,
                    })
                    .collect()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daftar_core::error::StorageError;
    use daftar_core::ports::{EntityRepository, UserRepository};
    use daftar_storage::MemoryRepositories;
    use serde_json::{Value, json};

    async fn schema_with(categories: usize) -> (DaftarSchema, Arc<MemoryRepositories>) {
        let repos = Arc::new(MemoryRepositories::new());
        for i in 1..=categories {
            repos
                .categories()
                .create(&EntityInput::new(format!("cat-{i}"), format!("دسته {i}")))
                .await
                .unwrap();
        }
        repos.users().ensure_user("admin").await.unwrap();
        (build_schema(repos.clone(), Viewer("admin".into())), repos)
    }

    async fn run(schema: &DaftarSchema, query: &str) -> Value {
        let response = schema.execute(query).await;
        serde_json::to_value(&response).unwrap()
    }

    fn ids(page: &Value) -> Vec<i64> {
        page["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["id"].as_i64().unwrap())
            .collect()
    }

    fn error_code(response: &Value) -> &str {
        response["errors"][0]["extensions"]["code"].as_str().unwrap()
    }

    // Test critique: scénario 12 catégories, pages de 10, via l'API
    #[tokio::test]
    async fn test_categories_infinite_two_pages() {
        let (schema, _) = schema_with(12).await;

        let first = run(
            &schema,
            "{ categoriesInfinite(limit: 10) { items { id } nextCursor } }",
        )
        .await;
        let page = &first["data"]["categoriesInfinite"];
        assert_eq!(ids(page), (1..=10).collect::<Vec<_>>());
        assert_eq!(page["nextCursor"], json!(10));

        let second = run(
            &schema,
            "{ categoriesInfinite(cursor: 10, limit: 10) { items { id } nextCursor } }",
        )
        .await;
        let page = &second["data"]["categoriesInfinite"];
        assert_eq!(ids(page), vec![11, 12]);
        assert_eq!(page["nextCursor"], Value::Null);
    }

    #[tokio::test]
    async fn test_default_limit_and_filter() {
        let (schema, _) = schema_with(15).await;

        let response = run(&schema, "{ categoriesInfinite { items { id } } }").await;
        assert_eq!(ids(&response["data"]["categoriesInfinite"]).len(), 10);

        // cat-1, cat-10..cat-15
        let response = run(
            &schema,
            r#"{ categoriesInfinite(name: "cat-1", limit: 3) { items { id } nextCursor } }"#,
        )
        .await;
        let page = &response["data"]["categoriesInfinite"];
        assert_eq!(ids(page), vec![1, 10, 11]);
        assert_eq!(page["nextCursor"], json!(11));
    }

    #[tokio::test]
    async fn test_limit_out_of_range_is_validation() {
        let (schema, _) = schema_with(3).await;
        let response = run(&schema, "{ tagsInfinite(limit: 0) { nextCursor } }").await;
        assert_eq!(error_code(&response), "VALIDATION");
        let response = run(&schema, "{ tagsInfinite(limit: 101) { nextCursor } }").await;
        assert_eq!(error_code(&response), "VALIDATION");
    }

    // Le store hors ligne remonte STORE_UNAVAILABLE au client
    #[tokio::test]
    async fn test_offline_store_reports_unavailable() {
        let (schema, repos) = schema_with(3).await;
        repos.set_available(false);
        let response = run(&schema, "{ categoriesInfinite { nextCursor } }").await;
        assert_eq!(error_code(&response), "STORE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_category_mutations() {
        let (schema, _) = schema_with(0).await;

        let created = run(
            &schema,
            r#"mutation { createCategory(input: { name: "rust", title: "راست" }) { id name } }"#,
        )
        .await;
        assert_eq!(created["data"]["createCategory"]["id"], json!(1));

        let dup = run(
            &schema,
            r#"mutation { createCategory(input: { name: "rust", title: "x" }) { id } }"#,
        )
        .await;
        assert_eq!(error_code(&dup), "CONFLICT");

        let blank = run(
            &schema,
            r#"mutation { createCategory(input: { name: "  ", title: "x" }) { id } }"#,
        )
        .await;
        assert_eq!(error_code(&blank), "VALIDATION");

        let updated = run(
            &schema,
            r#"mutation { updateCategory(id: 1, input: { name: "rust-lang", title: "راست" }) { name } }"#,
        )
        .await;
        assert_eq!(updated["data"]["updateCategory"]["name"], json!("rust-lang"));

        let missing = run(&schema, "mutation { deleteCategory(id: 42) }").await;
        assert_eq!(error_code(&missing), "NOT_FOUND");

        let deleted = run(&schema, "mutation { deleteCategory(id: 1) }").await;
        assert_eq!(deleted["data"]["deleteCategory"], json!(true));

        let gone = run(&schema, "{ category(id: 1) { id } }").await;
        assert_eq!(gone["data"]["category"], Value::Null);
    }

    #[tokio::test]
    async fn test_posts_by_tag_name() {
        let (schema, repos) = schema_with(0).await;
        repos.tags().create(&EntityInput::new("async", "ناهمگام")).await.unwrap();
        repos.add_post("tokio", "توکیو", Utc::now(), &[], &["async"]).await.unwrap();

        let response = run(&schema, r#"{ postsByTagName(name: "async") { slug } }"#).await;
        assert_eq!(response["data"]["postsByTagName"], json!([{ "slug": "tokio" }]));

        let unknown = run(&schema, r#"{ postsByTagName(name: "nope") { slug } }"#).await;
        assert_eq!(error_code(&unknown), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_update_profile_of_viewer() {
        let (schema, _) = schema_with(0).await;

        let response = run(
            &schema,
            r#"mutation {
                updateProfile(input: {
                    name: "مریم",
                    email: "maryam@daftar.ir",
                    socials: [{ title: "GitHub", link: "https://github.com/maryam" }]
                }) { id name socials { title link } }
            }"#,
        )
        .await;
        let profile = &response["data"]["updateProfile"];
        assert_eq!(profile["id"], json!("admin"));
        assert_eq!(profile["socials"][0]["title"], json!("GitHub"));

        let invalid = run(
            &schema,
            r#"mutation { updateProfile(input: { email: "not-an-email" }) { id } }"#,
        )
        .await;
        assert_eq!(error_code(&invalid), "VALIDATION");

        let read = run(&schema, "{ profile { name email } }").await;
        assert_eq!(read["data"]["profile"]["email"], json!("maryam@daftar.ir"));
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let missing = StorageError::QueryError("relation \"users\" does not exist".into());
        let err = to_gql_error(DomainError::Storage(missing));
        assert_eq!(err.message, "Internal error");
    }
}
