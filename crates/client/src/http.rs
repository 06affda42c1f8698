//! Page source over the GraphQL HTTP endpoint.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use daftar_core::error::{DomainError, StorageError};
use daftar_core::models::{Entity, EntityKind};
use daftar_core::ports::{Cursor, EntityFilter, Page, PageRequest};

use crate::error::{ClientError, ClientResult};
use crate::source::PageSource;

/// Fetches pages with the `categoriesInfinite` / `tagsInfinite` queries.
#[derive(Debug, Clone)]
pub struct GraphqlPageSource {
    http: Client,
    endpoint: Url,
}

impl GraphqlPageSource {
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    /// Reuse a configured HTTP client (timeouts, proxies).
    pub fn with_client(http: Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Query field serving pages of this kind.
fn infinite_field(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Category => "categoriesInfinite",
        EntityKind::Tag => "tagsInfinite",
    }
}

fn page_query(kind: EntityKind) -> String {
    format!(
        "query Page($name: String, $title: String, $cursor: Int, $limit: Int!) {{ \
         {}(name: $name, title: $title, cursor: $cursor, limit: $limit) \
         {{ items {{ id name title }} nextCursor }} }}",
        infinite_field(kind)
    )
}

#[async_trait]
impl PageSource for GraphqlPageSource {
    async fn fetch_page(
        &self,
        kind: EntityKind,
        filter: &EntityFilter,
        request: PageRequest,
    ) -> ClientResult<Page<Entity>> {
        let body = json!({
            "query": page_query(kind),
            "variables": {
                "name": filter.name,
                "title": filter.title,
                "cursor": request.after().map(|c| c.value()),
                "limit": request.limit(),
            },
        });

        let response = self.http.post(self.endpoint.clone()).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Transport(format!("HTTP {}: {}", status.as_u16(), message)));
        }

        let envelope: Envelope = response.json().await?;
        let page = envelope.into_page(infinite_field(kind))?;
        debug!(items = page.len(), next = ?page.next_cursor, "Page received");
        Ok(page)
    }
}

// -----------------------------------------------------------------------------
// Wire types
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<RemoteError>,
}

#[derive(Debug, Deserialize)]
struct RemoteError {
    message: String,
    #[serde(default)]
    extensions: Option<RemoteExtensions>,
}

#[derive(Debug, Deserialize)]
struct RemoteExtensions {
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PagePayload {
    items: Vec<Entity>,
    next_cursor: Option<i64>,
}

impl Envelope {
    fn into_page(self, field: &str) -> ClientResult<Page<Entity>> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(error.into_client_error());
        }

        let payload = self
            .data
            .and_then(|mut data| data.get_mut(field).map(Value::take))
            .ok_or_else(|| ClientError::Decode(format!("missing field {}", field)))?;
        let payload: PagePayload =
            serde_json::from_value(payload).map_err(|e| ClientError::Decode(e.to_string()))?;

        Ok(Page {
            items: payload.items,
            next_cursor: payload.next_cursor.map(Cursor),
        })
    }
}

impl RemoteError {
    /// Map the wire code back onto the domain taxonomy where one exists.
    ///
    /// The server sends the domain error's display text, so the variant
    /// prefix is stripped and the rebuilt error displays the same message.
    fn into_client_error(self) -> ClientError {
        let code = self.extensions.and_then(|e| e.code).unwrap_or_default();
        let message = self.message;
        match code.as_str() {
            "VALIDATION" => {
                DomainError::Validation(detail(&message, &["Validation error: "])).into()
            }
            "CONFLICT" => DomainError::Conflict(detail(&message, &["Conflict: "])).into(),
            "NOT_FOUND" => not_found(&message).into(),
            "STORE_UNAVAILABLE" => {
                let reason = detail(&message, &["Storage error: ", "Store unavailable: "]);
                DomainError::Storage(StorageError::Unavailable(reason)).into()
            }
            _ => ClientError::Remote { code, message },
        }
    }
}

/// Labels the server uses in `"{label} not found: {key}"` messages.
const NOT_FOUND_LABELS: [&str; 3] = ["Category", "Tag", "User"];

/// Strip `prefixes` in order, each only if present.
fn detail(message: &str, prefixes: &[&str]) -> String {
    prefixes
        .iter()
        .fold(message, |rest, prefix| rest.strip_prefix(prefix).unwrap_or(rest))
        .to_string()
}

fn not_found(message: &str) -> DomainError {
    let found = NOT_FOUND_LABELS.iter().find_map(|label| {
        let key = message.strip_prefix(*label)?.strip_prefix(" not found: ")?;
        Some((*label, key))
    });
    match found {
        Some((kind, key)) => DomainError::NotFound {
            kind,
            key: key.to_string(),
        },
        None => {
            let record = detail(message, &["Storage error: ", "Record not found: "]);
            DomainError::Storage(StorageError::NotFound(record))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(value: Value) -> Envelope {
        serde_json::from_value(value).unwrap()
    }

    fn remote_error(message: &str, code: &str) -> ClientError {
        envelope(json!({
            "data": null,
            "errors": [{ "message": message, "extensions": { "code": code } }]
        }))
        .into_page("categoriesInfinite")
        .unwrap_err()
    }

    #[test]
    fn test_query_targets_kind_field() {
        assert!(page_query(EntityKind::Category).contains("categoriesInfinite(name: $name"));
        assert!(page_query(EntityKind::Tag).contains("tagsInfinite("));
    }

    #[test]
    fn test_decodes_page_payload() {
        let page = envelope(json!({
            "data": { "tagsInfinite": {
                "items": [{ "id": 4, "name": "rust", "title": "راست" }],
                "nextCursor": 4
            }}
        }))
        .into_page("tagsInfinite")
        .unwrap();

        assert_eq!(page.items[0].title, "راست");
        assert_eq!(page.next_cursor, Some(Cursor(4)));
    }

    #[test]
    fn test_last_page_has_no_cursor() {
        let page = envelope(json!({
            "data": { "categoriesInfinite": { "items": [], "nextCursor": null } }
        }))
        .into_page("categoriesInfinite")
        .unwrap();
        assert!(page.is_empty());
        assert!(!page.has_more());
    }

    // Test critique: le code STORE_UNAVAILABLE reste reconnaissable côté client
    #[test]
    fn test_remote_codes_map_to_domain_errors() {
        let err = remote_error("Storage error: Store unavailable: refused", "STORE_UNAVAILABLE");
        assert!(err.is_unavailable());
        assert_eq!(err.to_string(), "Storage error: Store unavailable: refused");

        let err = remote_error(
            "Validation error: limit must be between 1 and 100, got 0",
            "VALIDATION",
        );
        assert!(matches!(err, ClientError::Domain(DomainError::Validation(_))));
        assert_eq!(err.to_string(), "Validation error: limit must be between 1 and 100, got 0");

        let err = remote_error("Conflict: Category with this name already exists", "CONFLICT");
        assert_eq!(err.to_string(), "Conflict: Category with this name already exists");

        let err = envelope(json!({ "errors": [{ "message": "boom" }] }))
            .into_page("categoriesInfinite")
            .unwrap_err();
        assert!(matches!(err, ClientError::Remote { .. }));
    }

    #[test]
    fn test_not_found_keeps_kind_and_key() {
        let err = remote_error("Category not found: 42", "NOT_FOUND");
        match &err {
            ClientError::Domain(DomainError::NotFound { kind, key }) => {
                assert_eq!(*kind, "Category");
                assert_eq!(key, "42");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "Category not found: 42");

        let err = remote_error("Storage error: Record not found: users.id = admin", "NOT_FOUND");
        assert!(matches!(
            err,
            ClientError::Domain(DomainError::Storage(StorageError::NotFound(ref detail)))
                if detail == "users.id = admin"
        ));
    }

    #[test]
    fn test_missing_field_is_decode_error() {
        let err = envelope(json!({ "data": {} })).into_page("tagsInfinite").unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }
}
