//! A paginated list bound to a virtualizer.

use tracing::debug;

use daftar_core::models::Entity;
use daftar_core::ports::EntityFilter;

use crate::error::ClientResult;
use crate::feed::InfiniteList;
use crate::source::PageSource;
use crate::state::FetchOutcome;
use crate::window::{LoadTrigger, Viewport, Virtualizer, WindowOptions};

/// A row ready to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub index: usize,
    pub start: u64,
    pub size: u32,
    pub entity: Entity,
}

/// Everything a frontend needs to draw one frame of the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub total_size: u64,
    pub total_count: usize,
    pub rows: Vec<Row>,
    pub has_more: bool,
    pub is_fetching: bool,
    /// Show the "load more" control (manual trigger only).
    pub show_load_more: bool,
    pub error: Option<String>,
}

/// Renders the loaded part of an [`InfiniteList`] through a [`Virtualizer`].
pub struct ListView<S> {
    list: InfiniteList<S>,
    virtualizer: Virtualizer,
}

impl<S: PageSource> ListView<S> {
    pub fn new(list: InfiniteList<S>, options: WindowOptions) -> Self {
        Self {
            list,
            virtualizer: Virtualizer::new(options),
        }
    }

    pub fn list(&self) -> &InfiniteList<S> {
        &self.list
    }

    pub fn virtualizer(&self) -> &Virtualizer {
        &self.virtualizer
    }

    /// Build the frame for `viewport`.
    ///
    /// With [`LoadTrigger::Auto`] a window reaching the end of the loaded
    /// rows fetches the next page first.
    pub async fn render(&self, viewport: Viewport) -> ClientResult<Frame> {
        if self.virtualizer.options().trigger == LoadTrigger::Auto {
            let count = self.list.total_count().await;
            if self.list.has_more().await && self.virtualizer.near_end(count, viewport) {
                debug!(count, "Window reached end of loaded rows");
                self.list.fetch_next().await?;
            }
        }
        Ok(self.frame(viewport).await)
    }

    async fn frame(&self, viewport: Viewport) -> Frame {
        let manual = self.virtualizer.options().trigger == LoadTrigger::Manual;
        self.list
            .read(|state| {
                let count = state.total_count();
                let window = self.virtualizer.window(count, viewport);
                let rows = window
                    .items
                    .iter()
                    .filter_map(|item| {
                        state.item_at(item.index).map(|entity| Row {
                            index: item.index,
                            start: item.start,
                            size: item.size,
                            entity: entity.clone(),
                        })
                    })
                    .collect();

                Frame {
                    total_size: window.total_size,
                    total_count: count,
                    rows,
                    has_more: state.has_more(),
                    is_fetching: state.is_fetching(),
                    show_load_more: manual && state.has_more(),
                    error: state.last_error().map(str::to_string),
                }
            })
            .await
    }

    /// The "load more" action.
    pub async fn load_more(&self) -> ClientResult<FetchOutcome> {
        self.list.fetch_next().await
    }

    /// Search box changes.
    pub async fn set_filter(&self, filter: EntityFilter) -> ClientResult<FetchOutcome> {
        self.list.set_filter(filter).await
    }

    /// Reload after a create, update or delete.
    pub async fn refresh(&self) -> ClientResult<usize> {
        self.list.refresh().await
    }
}
