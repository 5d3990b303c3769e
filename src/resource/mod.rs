//! Shared request patterns
//!
//! Every endpoint family reuses the same two loops instead of hand-rolling
//! them per record type.
//!
//! # Architecture
//!
//! - [`poller`] - Waits for a submitted operation to reach a terminal status
//! - [`paginate`] - Walks `page`/`size` list endpoints
//!
//! # Example
//!
//! ```ignore
//! use lume::resource::{collect, Pagination};
//!
//! async fn all_jobs(client: &lume::LumeClient) -> lume::Result<Vec<lume::Job>> {
//!     collect(Pagination::default(), true, |page, size| {
//!         client.fetch_page("jobs", page, size)
//!     })
//!     .await
//! }
//! ```

mod paginate;
mod poller;

pub use paginate::{collect, Page, Pagination, DEFAULT_PAGE_SIZE};
pub use poller::{
    PollPolicy, Poller, DEFAULT_MAX_POLL_INTERVAL, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT,
};
