//! Incremental list over a [`PageSource`].

use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use daftar_core::models::{Entity, EntityKind};
use daftar_core::ports::EntityFilter;

use crate::error::ClientResult;
use crate::source::PageSource;
use crate::state::{FetchOutcome, ListState};

/// A list of categories or tags that grows one page at a time.
///
/// The state lock is never held while a page is in flight: a fetch claims a
/// ticket, releases the lock, awaits the source, then re-locks to apply the
/// response. Concurrent callers therefore see `Skipped` instead of queuing a
/// second request.
pub struct InfiniteList<S> {
    source: S,
    kind: EntityKind,
    state: Mutex<ListState>,
}

impl<S: PageSource> InfiniteList<S> {
    pub fn new(source: S, kind: EntityKind, page_size: u32) -> ClientResult<Self> {
        Ok(Self {
            source,
            kind,
            state: Mutex::new(ListState::new(page_size)?),
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Load the next page, unless one is already loading or none is left.
    #[instrument(skip(self), fields(kind = self.kind.as_str()))]
    pub async fn fetch_next(&self) -> ClientResult<FetchOutcome> {
        let ticket = {
            let mut state = self.state.lock().await;
            match state.begin_fetch() {
                Some(ticket) => ticket,
                None => return Ok(FetchOutcome::Skipped),
            }
        };

        debug!(generation = ticket.generation(), cursor = ?ticket.cursor(), "Fetching page");
        let result = self
            .source
            .fetch_page(self.kind, ticket.filter(), ticket.request())
            .await;

        let outcome = self.state.lock().await.finish_fetch(ticket, result);
        if let Err(err) = &outcome {
            warn!(error = %err, "Page fetch failed");
        }
        outcome
    }

    /// Switch filter and load its first page.
    ///
    /// An unchanged filter is a no-op.
    pub async fn set_filter(&self, filter: EntityFilter) -> ClientResult<FetchOutcome> {
        if !self.state.lock().await.set_filter(filter) {
            return Ok(FetchOutcome::Skipped);
        }
        self.fetch_next().await
    }

    /// Reload from the start after a mutation, as many pages as were loaded.
    ///
    /// Returns the number of pages loaded again. Stops early when the list
    /// runs out or another caller takes over the fetch slot. On error the
    /// pages from before the reload are put back, unless the filter changed
    /// in the meantime.
    pub async fn refresh(&self) -> ClientResult<usize> {
        let (previous, generation) = {
            let mut state = self.state.lock().await;
            let previous = state.pages().to_vec();
            state.restart();
            (previous, state.generation())
        };

        match self.reload(previous.len().max(1)).await {
            Ok(loaded) => Ok(loaded),
            Err(err) => {
                let mut state = self.state.lock().await;
                if state.generation() == generation {
                    state.restore(previous, &err);
                }
                Err(err)
            }
        }
    }

    async fn reload(&self, wanted: usize) -> ClientResult<usize> {
        let mut loaded = 0;
        while loaded < wanted {
            match self.fetch_next().await? {
                FetchOutcome::Appended { has_more, .. } => {
                    loaded += 1;
                    if !has_more {
                        break;
                    }
                }
                FetchOutcome::Skipped | FetchOutcome::Stale => break,
            }
        }
        Ok(loaded)
    }

    pub async fn set_page_size(&self, page_size: u32) -> ClientResult<()> {
        self.state.lock().await.set_page_size(page_size)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub async fn total_count(&self) -> usize {
        self.state.lock().await.total_count()
    }

    pub async fn has_more(&self) -> bool {
        self.state.lock().await.has_more()
    }

    pub async fn is_fetching(&self) -> bool {
        self.state.lock().await.is_fetching()
    }

    pub async fn item_at(&self, index: usize) -> Option<Entity> {
        self.state.lock().await.item_at(index).cloned()
    }

    /// Run `f` against a consistent view of the state.
    pub async fn read<T>(&self, f: impl FnOnce(&ListState) -> T) -> T {
        f(&*self.state.lock().await)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use daftar_core::models::EntityInput;
    use daftar_core::ports::{EntityRepository, Page, PageRequest, Repositories};
    use daftar_core::services::CatalogService;
    use daftar_storage::MemoryRepositories;

    use super::*;
    use crate::error::ClientError;
    use crate::source::ServicePageSource;

    /// Source whose responses are released by the test.
    struct GatedSource {
        requests: AtomicUsize,
        pending: Mutex<VecDeque<oneshot::Sender<()>>>,
        inner: ServicePageSource,
    }

    impl GatedSource {
        fn new(inner: ServicePageSource) -> Self {
            Self {
                requests: AtomicUsize::new(0),
                pending: Mutex::new(VecDeque::new()),
                inner,
            }
        }

        /// Wait until `count` requests are parked at the gate.
        async fn wait_parked(&self, count: usize) {
            while self.pending.lock().await.len() < count {
                tokio::task::yield_now().await;
            }
        }

        /// Let the oldest parked request through.
        async fn release_next(&self) {
            if let Some(gate) = self.pending.lock().await.pop_front() {
                gate.send(()).unwrap();
            }
        }
    }

    #[async_trait]
    impl PageSource for Arc<GatedSource> {
        async fn fetch_page(
            &self,
            kind: EntityKind,
            filter: &EntityFilter,
            request: PageRequest,
        ) -> ClientResult<Page<Entity>> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = oneshot::channel();
            self.pending.lock().await.push_back(tx);
            rx.await.map_err(|_| ClientError::Transport("gate dropped".into()))?;
            self.inner.fetch_page(kind, filter, request).await
        }
    }

    async fn catalog(names: &[&str]) -> (CatalogService, Arc<MemoryRepositories>) {
        let repos = Arc::new(MemoryRepositories::new());
        for name in names {
            repos
                .categories()
                .create(&EntityInput::new(*name, format!("عنوان {name}")))
                .await
                .unwrap();
        }
        (CatalogService::new(repos.clone()), repos)
    }

    async fn numbered(count: usize) -> (CatalogService, Arc<MemoryRepositories>) {
        let names: Vec<String> = (1..=count).map(|i| format!("cat-{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        catalog(&refs).await
    }

    fn list_of(service: CatalogService, page_size: u32) -> InfiniteList<ServicePageSource> {
        InfiniteList::new(ServicePageSource::new(service), EntityKind::Category, page_size).unwrap()
    }

    fn appended(items: usize, has_more: bool) -> FetchOutcome {
        FetchOutcome::Appended { items, has_more }
    }

    async fn ids<S: PageSource>(list: &InfiniteList<S>) -> Vec<i64> {
        list.read(|state| state.items().map(|e| e.id).collect()).await
    }

    // Test critique: fetch_next pendant un fetch = aucune requête supplémentaire
    #[tokio::test]
    async fn test_fetch_next_while_fetching_is_noop() {
        let (service, _) = numbered(30).await;
        let source = Arc::new(GatedSource::new(ServicePageSource::new(service)));
        let list = Arc::new(InfiniteList::new(source.clone(), EntityKind::Category, 10).unwrap());

        let running = tokio::spawn({
            let list = list.clone();
            async move { list.fetch_next().await }
        });

        source.wait_parked(1).await;
        assert!(list.is_fetching().await);

        assert_eq!(list.fetch_next().await.unwrap(), FetchOutcome::Skipped);
        assert_eq!(list.fetch_next().await.unwrap(), FetchOutcome::Skipped);
        assert_eq!(source.requests.load(Ordering::SeqCst), 1);

        source.release_next().await;
        let outcome = running.await.unwrap().unwrap();
        assert_eq!(outcome, appended(10, true));
        assert_eq!(list.total_count().await, 10);
    }

    // Test critique: nouveau filtre pendant un fetch, l'ancienne réponse n'est jamais ajoutée
    #[tokio::test]
    async fn test_filter_change_during_fetch() {
        let (service, _) =
            catalog(&["go", "rust", "web-dev", "java", "python", "swift", "webgl"]).await;
        let source = Arc::new(GatedSource::new(ServicePageSource::new(service)));
        let list = Arc::new(InfiniteList::new(source.clone(), EntityKind::Category, 2).unwrap());

        let old = tokio::spawn({
            let list = list.clone();
            async move { list.fetch_next().await }
        });
        source.wait_parked(1).await;

        let web = EntityFilter::new(Some("web".into()), None);
        let fresh = tokio::spawn({
            let list = list.clone();
            async move { list.set_filter(web).await }
        });
        source.wait_parked(2).await;

        // Old request answers first, then the new one
        source.release_next().await;
        assert_eq!(old.await.unwrap().unwrap(), FetchOutcome::Stale);
        assert_eq!(list.total_count().await, 0);

        source.release_next().await;
        assert_eq!(fresh.await.unwrap().unwrap(), appended(2, false));
        assert_eq!(ids(&list).await, vec![3, 7]);
    }

    // Test critique: filtre "web" = ids {3, 7}, quelle que soit la taille de page ≥ 2
    #[tokio::test]
    async fn test_web_filter_scenario() {
        let names = ["go", "rust", "web-dev", "java", "python", "swift", "webgl", "zig"];
        let (service, _) = catalog(&names).await;

        for page_size in [2, 3, 10, 100] {
            let list = list_of(service.clone(), page_size);
            let web = EntityFilter::new(Some("web".into()), None);
            let outcome = list.set_filter(web).await.unwrap();

            assert_eq!(outcome, appended(2, false), "page size {page_size}");
            assert_eq!(ids(&list).await, vec![3, 7]);
            assert!(!list.has_more().await);
            assert_eq!(list.fetch_next().await.unwrap(), FetchOutcome::Skipped);
        }
    }

    #[tokio::test]
    async fn test_twelve_categories_end_to_end() {
        let (service, _) = numbered(12).await;
        let list = list_of(service, 10);

        assert_eq!(list.fetch_next().await.unwrap(), appended(10, true));
        assert_eq!(list.fetch_next().await.unwrap(), appended(2, false));
        assert_eq!(ids(&list).await, (1..=12).collect::<Vec<_>>());
        assert_eq!(list.item_at(11).await.map(|e| e.id), Some(12));
        assert_eq!(list.fetch_next().await.unwrap(), FetchOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_store_outage_keeps_loaded_pages() {
        let (service, repos) = numbered(25).await;
        let list = list_of(service, 10);
        list.fetch_next().await.unwrap();

        repos.set_available(false);
        let err = list.fetch_next().await.unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(list.total_count().await, 10);
        assert!(!list.is_fetching().await);

        repos.set_available(true);
        list.fetch_next().await.unwrap();
        assert_eq!(ids(&list).await, (1..=20).collect::<Vec<_>>());
    }

    // Test critique: un refresh en échec garde les pages déjà chargées
    #[tokio::test]
    async fn test_failed_refresh_keeps_loaded_pages() {
        let (service, repos) = numbered(25).await;
        let list = list_of(service, 10);
        list.fetch_next().await.unwrap();
        list.fetch_next().await.unwrap();

        repos.set_available(false);
        let err = list.refresh().await.unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(list.total_count().await, 20);
        assert!(!list.is_fetching().await);
        assert!(list.read(|state| state.last_error().is_some()).await);

        repos.set_available(true);
        list.fetch_next().await.unwrap();
        assert_eq!(ids(&list).await, (1..=25).collect::<Vec<_>>());

        assert_eq!(list.refresh().await.unwrap(), 3);
        assert_eq!(list.total_count().await, 25);
    }

    #[tokio::test]
    async fn test_refresh_reloads_same_depth_after_mutation() {
        let (service, repos) = numbered(25).await;
        let list = list_of(service, 10);
        list.fetch_next().await.unwrap();
        list.fetch_next().await.unwrap();

        repos.categories().delete(2).await.unwrap();
        repos
            .categories()
            .update(5, &EntityInput::new("cat-5", "ویرایش شده"))
            .await
            .unwrap();

        assert_eq!(list.refresh().await.unwrap(), 2);
        let loaded = ids(&list).await;
        assert_eq!(loaded.len(), 20);
        assert!(!loaded.contains(&2));
        assert_eq!(loaded[19], 21);
        assert_eq!(list.item_at(3).await.map(|e| e.title), Some("ویرایش شده".to_string()));
    }

    #[tokio::test]
    async fn test_page_size_locked_after_first_page() {
        let (service, _) = numbered(5).await;
        let list = list_of(service, 10);
        list.set_page_size(2).await.unwrap();
        list.fetch_next().await.unwrap();
        assert_eq!(list.total_count().await, 2);
        assert!(matches!(list.set_page_size(5).await, Err(ClientError::PageSizeLocked)));
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let (service, _) = numbered(0).await;
        let list = list_of(service, 10);
        assert_eq!(list.fetch_next().await.unwrap(), appended(0, false));
        assert_eq!(list.total_count().await, 0);
        assert!(list.item_at(0).await.is_none());
    }
}
