//! In-memory storage adapter.
//!
//! Backs the server when started with `--in-memory` and the integration
//! tests of the upper crates. Rows live in ordered maps so that paging by
//! id is a range scan, like the primary key index in PostgreSQL.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound::{Excluded, Unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use daftar_core::error::{StorageError, StorageResult};
use daftar_core::models::{Entity, EntityInput, EntityKind, Post, Profile, ProfileUpdate};
use daftar_core::ports::{
    EntityFilter, EntityRepository, Page, PageRequest, Repositories, UserRepository,
};

/// Availability switch shared by every table of one store.
#[derive(Clone)]
struct Availability(Arc<AtomicBool>);

impl Availability {
    fn up() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    fn check(&self) -> StorageResult<()> {
        if self.0.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable("in-memory store is offline".into()))
        }
    }
}

// =============================================================================
// Entity tables
// =============================================================================

#[derive(Default)]
struct EntityTable {
    rows: BTreeMap<i64, Entity>,
    /// Ids are never reused, even after deletes.
    last_id: i64,
    /// Entity id -> linked post ids.
    links: BTreeMap<i64, BTreeSet<i64>>,
}

impl EntityTable {
    fn name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.rows
            .values()
            .any(|e| e.name == name && Some(e.id) != except)
    }

    fn id_of(&self, name: &str) -> Option<i64> {
        self.rows.values().find(|e| e.name == name).map(|e| e.id)
    }
}

/// In-memory implementation of EntityRepository.
pub struct MemoryEntityRepository {
    kind: EntityKind,
    table: RwLock<EntityTable>,
    posts: Arc<RwLock<BTreeMap<i64, Post>>>,
    availability: Availability,
}

impl MemoryEntityRepository {
    fn new(
        kind: EntityKind,
        posts: Arc<RwLock<BTreeMap<i64, Post>>>,
        availability: Availability,
    ) -> Self {
        Self {
            kind,
            table: RwLock::new(EntityTable::default()),
            posts,
            availability,
        }
    }

    fn unique_violation(&self) -> StorageError {
        StorageError::ConstraintViolation(format!("{}_name_key", self.kind.table()))
    }

    fn missing(&self, id: i64) -> StorageError {
        StorageError::NotFound(format!("{}.id = {}", self.kind.table(), id))
    }

    /// Ids of `names`, failing on the first unknown one.
    fn resolve(&self, table: &EntityTable, names: &[&str]) -> StorageResult<Vec<i64>> {
        names
            .iter()
            .map(|name| {
                table.id_of(name).ok_or_else(|| {
                    StorageError::NotFound(format!("{}.name = {}", self.kind.table(), name))
                })
            })
            .collect()
    }
}

#[async_trait]
impl EntityRepository for MemoryEntityRepository {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    async fn list_page(
        &self,
        filter: &EntityFilter,
        page: PageRequest,
    ) -> StorageResult<Page<Entity>> {
        self.availability.check()?;
        let table = self.table.read().await;

        // A cursor whose row was deleted still bounds the range
        let lower = page.after().map_or(Unbounded, |c| Excluded(c.value()));
        let rows: Vec<Entity> = table
            .rows
            .range((lower, Unbounded))
            .map(|(_, e)| e)
            .filter(|e| filter.matches(e))
            .take(page.fetch_size())
            .cloned()
            .collect();

        Ok(Page::from_overfetch(rows, page.limit(), |e| e.id))
    }

    async fn list_all(&self, filter: &EntityFilter) -> StorageResult<Vec<Entity>> {
        self.availability.check()?;
        let table = self.table.read().await;
        Ok(table.rows.values().filter(|e| filter.matches(e)).cloned().collect())
    }

    async fn get(&self, id: i64) -> StorageResult<Option<Entity>> {
        self.availability.check()?;
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn create(&self, input: &EntityInput) -> StorageResult<Entity> {
        self.availability.check()?;
        let mut table = self.table.write().await;
        if table.name_taken(&input.name, None) {
            return Err(self.unique_violation());
        }

        table.last_id += 1;
        let entity = Entity {
            id: table.last_id,
            name: input.name.clone(),
            title: input.title.clone(),
        };
        table.rows.insert(entity.id, entity.clone());
        debug!(kind = self.kind.as_str(), id = entity.id, "Row inserted");
        Ok(entity)
    }

    async fn update(&self, id: i64, input: &EntityInput) -> StorageResult<Entity> {
        self.availability.check()?;
        let mut table = self.table.write().await;
        if !table.rows.contains_key(&id) {
            return Err(self.missing(id));
        }
        if table.name_taken(&input.name, Some(id)) {
            return Err(self.unique_violation());
        }

        let row = table.rows.get_mut(&id).ok_or_else(|| self.missing(id))?;
        row.name = input.name.clone();
        row.title = input.title.clone();
        Ok(row.clone())
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        self.availability.check()?;
        let mut table = self.table.write().await;
        table.rows.remove(&id).ok_or_else(|| self.missing(id))?;
        table.links.remove(&id);
        Ok(())
    }

    async fn posts_by_name(&self, name: &str) -> StorageResult<Option<Vec<Post>>> {
        self.availability.check()?;
        let table = self.table.read().await;
        let Some(id) = table.id_of(name) else {
            return Ok(None);
        };

        let posts = self.posts.read().await;
        let mut linked: Vec<Post> = table
            .links
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|post_id| posts.get(post_id).cloned())
            .collect();
        linked.sort_by(|a, b| b.published_at.cmp(&a.published_at).then(b.id.cmp(&a.id)));
        Ok(Some(linked))
    }
}

// =============================================================================
// Users
// =============================================================================

/// In-memory implementation of UserRepository.
pub struct MemoryUserRepository {
    users: RwLock<HashMap<String, Profile>>,
    availability: Availability,
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn get_profile(&self, user_id: &str) -> StorageResult<Option<Profile>> {
        self.availability.check()?;
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn ensure_user(&self, user_id: &str) -> StorageResult<()> {
        self.availability.check()?;
        self.users
            .write()
            .await
            .entry(user_id.to_string())
            .or_insert_with(|| Profile {
                id: user_id.to_string(),
                ..Profile::default()
            });
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> StorageResult<Profile> {
        self.availability.check()?;
        let mut users = self.users.write().await;

        if let Some(email) = &update.email {
            let taken = users
                .values()
                .any(|p| p.id != user_id && p.email.as_deref() == Some(email.as_str()));
            if taken {
                return Err(StorageError::ConstraintViolation("users_email_key".into()));
            }
        }

        let profile = users
            .get_mut(user_id)
            .ok_or_else(|| StorageError::NotFound(format!("users.id = {}", user_id)))?;

        if let Some(name) = &update.name {
            profile.name = Some(name.clone());
        }
        if let Some(email) = &update.email {
            profile.email = Some(email.clone());
        }
        if let Some(bio) = &update.bio {
            profile.bio = Some(bio.clone());
        }
        if let Some(socials) = update.replacement_socials() {
            profile.socials = socials.to_vec();
        }
        Ok(profile.clone())
    }
}

// =============================================================================
// Composite Repository
// =============================================================================

/// Aggregated in-memory repositories implementing the `Repositories` trait.
pub struct MemoryRepositories {
    categories: MemoryEntityRepository,
    tags: MemoryEntityRepository,
    users: MemoryUserRepository,
    posts: Arc<RwLock<BTreeMap<i64, Post>>>,
    availability: Availability,
}

impl Default for MemoryRepositories {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepositories {
    pub fn new() -> Self {
        let posts = Arc::new(RwLock::new(BTreeMap::new()));
        let availability = Availability::up();
        Self {
            categories: MemoryEntityRepository::new(
                EntityKind::Category,
                posts.clone(),
                availability.clone(),
            ),
            tags: MemoryEntityRepository::new(EntityKind::Tag, posts.clone(), availability.clone()),
            users: MemoryUserRepository {
                users: RwLock::new(HashMap::new()),
                availability: availability.clone(),
            },
            posts,
            availability,
        }
    }

    /// Take the store offline (or back online); offline calls fail as unavailable.
    pub fn set_available(&self, available: bool) {
        self.availability.0.store(available, Ordering::SeqCst);
    }

    /// Index a post and link it to existing categories and tags by name.
    pub async fn add_post(
        &self,
        slug: &str,
        title: &str,
        published_at: DateTime<Utc>,
        categories: &[&str],
        tags: &[&str],
    ) -> StorageResult<Post> {
        self.availability.check()?;

        // Tables before posts, the order posts_by_name takes them in
        let mut category_table = self.categories.table.write().await;
        let mut tag_table = self.tags.table.write().await;
        let category_ids = self.categories.resolve(&category_table, categories)?;
        let tag_ids = self.tags.resolve(&tag_table, tags)?;

        let mut posts = self.posts.write().await;
        if posts.values().any(|p| p.slug == slug) {
            return Err(StorageError::ConstraintViolation("posts_slug_key".into()));
        }
        let id = posts.keys().next_back().map_or(1, |last| last + 1);
        let post = Post {
            id,
            slug: slug.to_string(),
            title: title.to_string(),
            published_at,
        };
        posts.insert(id, post.clone());

        for entity_id in category_ids {
            category_table.links.entry(entity_id).or_default().insert(id);
        }
        for entity_id in tag_ids {
            tag_table.links.entry(entity_id).or_default().insert(id);
        }
        Ok(post)
    }
}

#[async_trait]
impl Repositories for MemoryRepositories {
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
        self.availability.check().is_ok()
    }
}

// =============================================================================
// Tests
// =============================================================================
