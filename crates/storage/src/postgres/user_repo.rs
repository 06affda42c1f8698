//! User profile repository implementation for PostgreSQL.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use daftar_core::error::{StorageError, StorageResult};
use daftar_core::models::{Profile, ProfileUpdate, Social};
use daftar_core::ports::UserRepository;

use super::database::Database;
use super::helpers::map_sqlx_error;

/// PostgreSQL implementation of UserRepository.
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_profile(&self, user_id: &str) -> StorageResult<Option<Profile>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, bio, image FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let socials = sqlx::query_as::<_, SocialRow>(
            "SELECT title, link FROM socials WHERE user_id = $1 ORDER BY id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(Some(row.into_profile(socials)))
    }

    async fn ensure_user(&self, user_id: &str) -> StorageResult<()> {
        sqlx::query("INSERT INTO users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self, update))]
    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> StorageResult<Profile> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        // Absent fields keep their stored value
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                bio = COALESCE($4, bio)
            WHERE id = $1
            RETURNING id, name, email, bio, image
            "#,
        )
        .bind(user_id)
        .bind(update.name.as_deref())
        .bind(update.email.as_deref())
        .bind(update.bio.as_deref())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| StorageError::NotFound(format!("users.id = {}", user_id)))?;

        if let Some(socials) = update.replacement_socials() {
            replace_socials(&mut tx, user_id, socials).await?;
            debug!(count = socials.len(), "Socials replaced");
        }

        let socials = sqlx::query_as::<_, SocialRow>(
            "SELECT title, link FROM socials WHERE user_id = $1 ORDER BY id ASC",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        Ok(row.into_profile(socials))
    }
}

/// Drop every social of the user and insert the new list in order.
async fn replace_socials(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
    socials: &[Social],
) -> StorageResult<()> {
    sqlx::query("DELETE FROM socials WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

    for social in socials {
        sqlx::query("INSERT INTO socials (user_id, title, link) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(&social.title)
            .bind(&social.link)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
    }
    Ok(())
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    name: Option<String>,
    email: Option<String>,
    bio: Option<String>,
    image: Option<String>,
}

impl UserRow {
    fn into_profile(self, socials: Vec<SocialRow>) -> Profile {
        Profile {
            id: self.id,
            name: self.name,
            email: self.email,
            bio: self.bio,
            image: self.image,
            socials: socials
                .into_iter()
                .map(|s| Social {
                    title: s.title,
                    link: s.link,
                })
                .collect(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct SocialRow {
    title: String,
    link: String,
}
