//! Domain models for the blog catalog.
//!
//! These models are storage-agnostic and represent the canonical
//! form of catalog data within the domain layer.

use std::fmt;

use chrono::{DateTime, Utc};
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Maximum length (in characters) of an entity name or title.
pub const MAX_FIELD_LENGTH: usize = 128;

/// Maximum length (in characters) of a profile bio.
pub const MAX_BIO_LENGTH: usize = 160;

// =============================================================================
// Catalog Entities
// =============================================================================

/// The two catalog tables sharing the `{id, name, title}` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Category,
    Tag,
}

impl EntityKind {
    /// Human-readable label used in errors and logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Category => "Category",
            Self::Tag => "Tag",
        }
    }

    /// Backing table name.
    pub fn table(self) -> &'static str {
        match self {
            Self::Category => "categories",
            Self::Tag => "tags",
        }
    }

    /// Metric/log label (lowercase, stable).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Tag => "tag",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A category or tag row.
///
/// `name` is the English slug-like identifier, `title` the Persian display
/// text. Ids are assigned by the store and only ever grow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: i64,
    pub name: String,
    pub title: String,
}

/// Fields accepted by create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInput {
    pub name: String,
    pub title: String,
}

impl EntityInput {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
        }
    }

    /// Both fields are required and bounded.
    pub fn validate(&self) -> DomainResult<()> {
        validate_required(&self.name, "name")?;
        validate_required(&self.title, "title")
    }
}

fn validate_required(value: &str, field: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("{} cannot be empty", field)));
    }
    if value.chars().count() > MAX_FIELD_LENGTH {
        return Err(DomainError::Validation(format!(
            "{} too long: maximum {} characters allowed",
            field, MAX_FIELD_LENGTH
        )));
    }
    Ok(())
}

// =============================================================================
// Posts
// =============================================================================

/// Index row of a published article.
///
/// The article body itself is a static document rendered elsewhere;
/// the catalog only tracks what is needed to list posts by category or tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
}

// =============================================================================
// User Profile
// =============================================================================

/// A social link shown on the author profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Social {
    pub title: String,
    pub link: String,
}

/// Admin user profile with its social links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub socials: Vec<Social>,
}

/// Partial profile update.
///
/// `None` fields are left untouched. A non-empty `socials` list replaces
/// every existing link; an empty or missing list keeps them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub socials: Option<Vec<Social>>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::Validation("name cannot be empty".into()));
            }
        }
        if let Some(email) = &self.email {
            if !EmailAddress::is_valid(email) {
                return Err(DomainError::Validation(format!(
                    "invalid email address: {}",
                    email
                )));
            }
        }
        if let Some(bio) = &self.bio {
            if bio.chars().count() > MAX_BIO_LENGTH {
                return Err(DomainError::Validation(format!(
                    "bio too long: maximum {} characters allowed",
                    MAX_BIO_LENGTH
                )));
            }
        }
        for social in self.socials.iter().flatten() {
            url::Url::parse(&social.link).map_err(|e| {
                DomainError::Validation(format!("invalid link for {}: {}", social.title, e))
            })?;
        }
        Ok(())
    }

    /// Socials to write, if this update replaces them.
    pub fn replacement_socials(&self) -> Option<&[Social]> {
        self.socials.as_deref().filter(|s| !s.is_empty())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_input_rejects_blank_fields() {
        assert!(EntityInput::new("web", "توسعه وب").validate().is_ok());
        assert!(EntityInput::new("", "توسعه وب").validate().is_err());
        assert!(EntityInput::new("web", "   ").validate().is_err());
    }

    #[test]
    fn entity_input_length_counts_chars_not_bytes() {
        // Persian characters are two bytes each in UTF-8
        let title = "ب".repeat(MAX_FIELD_LENGTH);
        assert!(EntityInput::new("web", title).validate().is_ok());
        let too_long = "x".repeat(MAX_FIELD_LENGTH + 1);
        assert!(EntityInput::new(too_long, "t").validate().is_err());
    }

    #[test]
    fn profile_update_validation() {
        let ok = ProfileUpdate {
            name: Some("Sara".into()),
            email: Some("sara@example.com".into()),
            bio: Some("نویسنده".into()),
            socials: Some(vec![Social {
                title: "github".into(),
                link: "https://github.com/sara".into(),
            }]),
        };
        assert!(ok.validate().is_ok());

        let bad_email = ProfileUpdate {
            email: Some("not-an-email".into()),
            ..Default::default()
        };
        assert!(bad_email.validate().is_err());

        let long_bio = ProfileUpdate {
            bio: Some("a".repeat(MAX_BIO_LENGTH + 1)),
            ..Default::default()
        };
        assert!(long_bio.validate().is_err());

        let bad_link = ProfileUpdate {
            socials: Some(vec![Social {
                title: "site".into(),
                link: "not a url".into(),
            }]),
            ..Default::default()
        };
        assert!(bad_link.validate().is_err());
    }

    #[test]
    fn empty_social_list_is_not_a_replacement() {
        let update = ProfileUpdate {
            socials: Some(vec![]),
            ..Default::default()
        };
        assert!(update.replacement_socials().is_none());
        assert!(ProfileUpdate::default().replacement_socials().is_none());
    }

    #[test]
    fn entity_kind_tables() {
        assert_eq!(EntityKind::Category.table(), "categories");
        assert_eq!(EntityKind::Tag.table(), "tags");
        assert_eq!(EntityKind::Tag.to_string(), "Tag");
    }
}
