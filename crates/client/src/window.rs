//! Fixed-row list virtualization.
//!
//! Given the number of loaded rows, an estimated row height and the
//! viewport, [`Virtualizer`] computes which rows to render. Every row is
//! assumed to be `estimate_size` tall; the window covers the visible rows
//! plus `overscan` rows on each side, clipped to the list.

use std::num::NonZeroU32;
use std::ops::RangeInclusive;

/// Default estimated row height.
pub const DEFAULT_ESTIMATE_SIZE: NonZeroU32 = match NonZeroU32::new(100) {
    Some(size) => size,
    None => unreachable!(),
};

/// Default number of extra rows on each side of the viewport.
pub const DEFAULT_OVERSCAN: usize = 5;

/// When the next page is requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadTrigger {
    /// The caller asks for more (a "load more" button).
    #[default]
    Manual,
    /// The view fetches when the window reaches the end of the loaded rows.
    Auto,
}

/// Virtualizer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowOptions {
    pub estimate_size: NonZeroU32,
    pub overscan: usize,
    pub trigger: LoadTrigger,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            estimate_size: DEFAULT_ESTIMATE_SIZE,
            overscan: DEFAULT_OVERSCAN,
            trigger: LoadTrigger::Manual,
        }
    }
}

/// Scroll position and height of the scroll container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub offset: u64,
    pub height: u64,
}

impl Viewport {
    pub fn new(offset: u64, height: u64) -> Self {
        Self { offset, height }
    }
}

/// One row to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualItem {
    pub index: usize,
    /// Offset of the row's top edge from the top of the list.
    pub start: u64,
    pub size: u32,
}

/// Rows to render for one viewport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleWindow {
    /// Height of the whole list, for the scroll spacer.
    pub total_size: u64,
    pub items: Vec<VirtualItem>,
}

impl VisibleWindow {
    pub fn start_index(&self) -> Option<usize> {
        self.items.first().map(|item| item.index)
    }

    pub fn end_index(&self) -> Option<usize> {
        self.items.last().map(|item| item.index)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Computes render windows. Pure: same inputs, same window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Virtualizer {
    options: WindowOptions,
}

impl Virtualizer {
    pub fn new(options: WindowOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WindowOptions {
        &self.options
    }

    fn row_size(&self) -> u64 {
        self.options.estimate_size.get() as u64
    }

    /// Height of `count` rows.
    pub fn total_size(&self, count: usize) -> u64 {
        count as u64 * self.row_size()
    }

    /// Rows intersecting the viewport, without overscan.
    ///
    /// A viewport scrolled past the end shows the last row.
    pub fn visible_range(&self, count: usize, viewport: Viewport) -> Option<RangeInclusive<usize>> {
        let last_row = count.checked_sub(1)?;
        let size = self.row_size();

        let first = ((viewport.offset / size) as usize).min(last_row);
        let bottom = viewport.offset + viewport.height.saturating_sub(1);
        let last = ((bottom / size) as usize).clamp(first, last_row);
        Some(first..=last)
    }

    /// Rows to render: the visible range widened by overscan and clipped.
    pub fn window(&self, count: usize, viewport: Viewport) -> VisibleWindow {
        let total_size = self.total_size(count);
        let Some(visible) = self.visible_range(count, viewport) else {
            return VisibleWindow {
                total_size,
                items: Vec::new(),
            };
        };

        let overscan = self.options.overscan;
        let start = visible.start().saturating_sub(overscan);
        let end = visible.end().saturating_add(overscan).min(count - 1);

        let size = self.options.estimate_size.get();
        let items = (start..=end)
            .map(|index| VirtualItem {
                index,
                start: index as u64 * size as u64,
                size,
            })
            .collect();

        VisibleWindow { total_size, items }
    }

    /// Whether the visible rows come within overscan of the last loaded row.
    pub fn near_end(&self, count: usize, viewport: Viewport) -> bool {
        self.visible_range(count, viewport)
            .is_some_and(|visible| visible.end() + self.options.overscan >= count - 1)
    }
}
