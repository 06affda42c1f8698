//! Profile service - the admin user's own profile and social links.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::{DomainError, DomainResult, StorageError};
use crate::metrics::{record_mutation, record_store_error};
use crate::models::{Profile, ProfileUpdate};
use crate::ports::Repositories;

/// Read and update user profiles.
#[derive(Clone)]
pub struct ProfileService {
    repositories: Arc<dyn Repositories>,
}

impl ProfileService {
    pub fn new(repositories: Arc<dyn Repositories>) -> Self {
        Self { repositories }
    }

    pub async fn get_profile(&self, user_id: &str) -> DomainResult<Option<Profile>> {
        self.repositories
            .users()
            .get_profile(user_id)
            .await
            .map_err(|e| map_error(user_id, e))
    }

    /// Make sure the session user has a profile row.
    pub async fn ensure_user(&self, user_id: &str) -> DomainResult<()> {
        self.repositories
            .users()
            .ensure_user(user_id)
            .await
            .map_err(|e| map_error(user_id, e))
    }

    /// Validate and apply a partial update.
    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> DomainResult<Profile> {
        update.validate()?;
        let profile = self
            .repositories
            .users()
            .update_profile(user_id, &update)
            .await
            .map_err(|e| map_error(user_id, e))?;

        debug!(socials = profile.socials.len(), "Profile updated");
        record_mutation("profile", "update");
        Ok(profile)
    }
}

fn map_error(user_id: &str, err: StorageError) -> DomainError {
    match err {
        StorageError::NotFound(_) => DomainError::NotFound {
            kind: "User",
            key: user_id.to_string(),
        },
        StorageError::ConstraintViolation(detail) => {
            DomainError::Conflict(format!("email already in use ({})", detail))
        }
        err => {
            let err = DomainError::from(err);
            record_store_error(err.code());
            err
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_user_maps_to_not_found() {
        let err = map_error("u1", StorageError::NotFound("users".into()));
        assert_eq!(err.code(), "NOT_FOUND");
        assert!(err.to_string().contains("u1"));
    }

    #[test]
    fn test_duplicate_email_is_conflict() {
        let err = map_error("u1", StorageError::ConstraintViolation("users_email_key".into()));
        assert_eq!(err.code(), "CONFLICT");
    }
}
