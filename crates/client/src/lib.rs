//! List client for the Daftar catalog.
//!
//! Drives cursor pagination against a [`PageSource`] and computes which
//! loaded rows a frontend should draw.
//!
//! # Modules
//!
//! - [`source`] - The `PageSource` port and its in-process adapter
//! - [`http`] - `PageSource` over the GraphQL endpoint
//! - [`state`] - Pure list state: pages, fetch guard, generations
//! - [`feed`] - `InfiniteList`, the async wrapper issuing fetches
//! - [`window`] - Fixed-row virtualizer
//! - [`view`] - `ListView`, a list bound to a virtualizer
//!
//! # Usage
//!
//! ```ignore
//! let source = GraphqlPageSource::new("http://localhost:4000/graphql".parse()?);
//! let list = InfiniteList::new(source, EntityKind::Category, 10)?;
//! let view = ListView::new(list, WindowOptions::default());
//!
//! view.load_more().await?;
//! let frame = view.render(Viewport::new(0, 600)).await?;
//! ```

pub mod error;
pub mod feed;
pub mod http;
pub mod source;
pub mod state;
pub mod view;
pub mod window;

pub use error::{ClientError, ClientResult};
pub use feed::InfiniteList;
pub use http::GraphqlPageSource;
pub use source::{PageSource, ServicePageSource};
pub use state::{FetchOutcome, FetchTicket, ListState};
pub use view::{Frame, ListView, Row};
pub use window::{LoadTrigger, Viewport, Virtualizer, VirtualItem, VisibleWindow, WindowOptions};
