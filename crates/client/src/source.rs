//! Where pages come from.

use async_trait::async_trait;

use daftar_core::models::{Entity, EntityKind};
use daftar_core::ports::{EntityFilter, Page, PageRequest};
use daftar_core::services::CatalogService;

use crate::error::ClientResult;

/// A paginated catalog the list client can pull from.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page of `kind` under `filter`, continuing after the request cursor.
    async fn fetch_page(
        &self,
        kind: EntityKind,
        filter: &EntityFilter,
        request: PageRequest,
    ) -> ClientResult<Page<Entity>>;
}

/// Pages served by an in-process [`CatalogService`].
#[derive(Clone)]
pub struct ServicePageSource {
    catalog: CatalogService,
}

impl ServicePageSource {
    pub fn new(catalog: CatalogService) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl PageSource for ServicePageSource {
    async fn fetch_page(
        &self,
        kind: EntityKind,
        filter: &EntityFilter,
        request: PageRequest,
    ) -> ClientResult<Page<Entity>> {
        let page = self
            .catalog
            .list_page(kind, filter, request.after(), Some(request.limit() as i64))
            .await?;
        Ok(page)
    }
}
