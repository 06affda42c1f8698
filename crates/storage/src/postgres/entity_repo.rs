//! Category/tag repository implementation for PostgreSQL.
//!
//! Both tables share one implementation; the table name comes from
//! [`EntityKind`] and is never user input.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use daftar_core::error::{StorageError, StorageResult};
use daftar_core::models::{Entity, EntityInput, EntityKind, Post};
use daftar_core::ports::{EntityFilter, EntityRepository, Page, PageRequest};

use super::database::Database;
use super::helpers::map_sqlx_error;

/// PostgreSQL implementation of EntityRepository.
pub struct PgEntityRepository {
    pool: PgPool,
    kind: EntityKind,
}

impl PgEntityRepository {
    pub fn new(db: &Database, kind: EntityKind) -> Self {
        Self {
            pool: db.pool().clone(),
            kind,
        }
    }

    fn table(&self) -> &'static str {
        self.kind.table()
    }

    /// Join table and foreign key linking posts to this kind.
    fn post_link(&self) -> (&'static str, &'static str) {
        match self.kind {
            EntityKind::Category => ("post_categories", "category_id"),
            EntityKind::Tag => ("post_tags", "tag_id"),
        }
    }
}

/// WHERE clause for a filter plus optional cursor.
///
/// SAFETY: This dynamic SQL is safe from injection because:
/// 1. Column names (id, name, title) are hardcoded, never from user input
/// 2. Operators (>, strpos, AND) are hardcoded
/// 3. All VALUES are parameterized via $1, $2, etc. and bound separately
///
/// Parameters are numbered cursor first, then name, then title; callers
/// must bind in that order.
fn where_clause(filter: &EntityFilter, after: Option<i64>) -> String {
    let mut conditions = Vec::new();
    let mut position = 0;

    if after.is_some() {
        position += 1;
        conditions.push(format!("id > ${}", position));
    }
    if filter.name.is_some() {
        position += 1;
        conditions.push(format!("strpos(name, ${}) > 0", position));
    }
    if filter.title.is_some() {
        position += 1;
        conditions.push(format!("strpos(title, ${}) > 0", position));
    }

    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

#[async_trait]
impl EntityRepository for PgEntityRepository {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    #[instrument(skip(self, filter), fields(table = self.table()))]
    async fn list_page(
        &self,
        filter: &EntityFilter,
        page: PageRequest,
    ) -> StorageResult<Page<Entity>> {
        let after = page.after().map(|c| c.value());

        // One extra row beyond the limit tells us whether another page exists
        let query = format!(
            "SELECT id, name, title FROM {} {} ORDER BY id ASC LIMIT {}",
            self.table(),
            where_clause(filter, after),
            page.fetch_size()
        );

        let mut query_builder = sqlx::query_as::<_, EntityRow>(&query);
        if let Some(after) = after {
            query_builder = query_builder.bind(after);
        }
        for term in [&filter.name, &filter.title].into_iter().flatten() {
            query_builder = query_builder.bind(term.as_str());
        }

        let rows: Vec<EntityRow> = query_builder
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        debug!(fetched = rows.len(), "Page rows fetched");

        let entities = rows.into_iter().map(EntityRow::into_entity).collect();
        Ok(Page::from_overfetch(entities, page.limit(), |e| e.id))
    }

    async fn list_all(&self, filter: &EntityFilter) -> StorageResult<Vec<Entity>> {
        let query = format!(
            "SELECT id, name, title FROM {} {} ORDER BY id ASC",
            self.table(),
            where_clause(filter, None)
        );

        let mut query_builder = sqlx::query_as::<_, EntityRow>(&query);
        for term in [&filter.name, &filter.title].into_iter().flatten() {
            query_builder = query_builder.bind(term.as_str());
        }

        let rows = query_builder
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(EntityRow::into_entity).collect())
    }

    async fn get(&self, id: i64) -> StorageResult<Option<Entity>> {
        let query = format!("SELECT id, name, title FROM {} WHERE id = $1", self.table());

        let row = sqlx::query_as::<_, EntityRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(EntityRow::into_entity))
    }

    async fn create(&self, input: &EntityInput) -> StorageResult<Entity> {
        let query = format!(
            "INSERT INTO {} (name, title) VALUES ($1, $2) RETURNING id, name, title",
            self.table()
        );

        let row = sqlx::query_as::<_, EntityRow>(&query)
            .bind(&input.name)
            .bind(&input.title)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into_entity())
    }

    async fn update(&self, id: i64, input: &EntityInput) -> StorageResult<Entity> {
        let query = format!(
            "UPDATE {} SET name = $1, title = $2 WHERE id = $3 RETURNING id, name, title",
            self.table()
        );

        let row = sqlx::query_as::<_, EntityRow>(&query)
            .bind(&input.name)
            .bind(&input.title)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(EntityRow::into_entity)
            .ok_or_else(|| StorageError::NotFound(format!("{}.id = {}", self.table(), id)))
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        let query = format!("DELETE FROM {} WHERE id = $1", self.table());

        let result = sqlx::query(&query)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("{}.id = {}", self.table(), id)));
        }
        Ok(())
    }

    async fn posts_by_name(&self, name: &str) -> StorageResult<Option<Vec<Post>>> {
        let query = format!("SELECT id FROM {} WHERE name = $1", self.table());
        let owner: Option<(i64,)> = sqlx::query_as(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let Some((owner_id,)) = owner else {
            return Ok(None);
        };

        let (link_table, link_column) = self.post_link();
        let query = format!(
            r#"
            SELECT p.id, p.slug, p.title, p.published_at
            FROM posts p
            JOIN {link_table} l ON l.post_id = p.id
            WHERE l.{link_column} = $1
            ORDER BY p.published_at DESC, p.id DESC
            "#
        );

        let rows = sqlx::query_as::<_, PostRow>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Some(rows.into_iter().map(PostRow::into_post).collect()))
    }
}

/// Database row representation for categories and tags.
#[derive(sqlx::FromRow)]
struct EntityRow {
    id: i64,
    name: String,
    title: String,
}

impl EntityRow {
    fn into_entity(self) -> Entity {
        Entity {
            id: self.id,
            name: self.name,
            title: self.title,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    slug: String,
    title: String,
    published_at: chrono::DateTime<chrono::Utc>,
}

impl PostRow {
    fn into_post(self) -> Post {
        Post {
            id: self.id,
            slug: self.slug,
            title: self.title,
            published_at: self.published_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test critique: la numérotation des paramètres suit l'ordre de bind
    #[test]
    fn test_where_clause_parameter_order() {
        let filter = EntityFilter::new(Some("web".into()), Some("وب".into()));
        assert_eq!(
            where_clause(&filter, Some(10)),
            "WHERE id > $1 AND strpos(name, $2) > 0 AND strpos(title, $3) > 0"
        );
        assert_eq!(
            where_clause(&filter, None),
            "WHERE strpos(name, $1) > 0 AND strpos(title, $2) > 0"
        );
    }

    #[test]
    fn test_where_clause_title_only() {
        let filter = EntityFilter::new(None, Some("وب".into()));
        assert_eq!(where_clause(&filter, Some(3)), "WHERE id > $1 AND strpos(title, $2) > 0");
    }

    #[test]
    fn test_empty_filter_has_no_where() {
        assert_eq!(where_clause(&EntityFilter::default(), None), "");
    }
}
