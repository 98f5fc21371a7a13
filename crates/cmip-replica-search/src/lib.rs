// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod client;
mod discover;
mod error;
pub mod facets;
mod offset;
mod page;
mod query;
mod retry;

pub const CRATE_NAME: &str = "cmip-replica-search";

pub use client::{HttpSearchClient, SearchClient};
pub use discover::{
    BatchReconciler, Discoverer, DiscoveryOptions, DiscoveryOutcome, RetractionSink,
};
pub use error::{SearchError, SearchErrorCode, SearchResult};
pub use facets::FacetDimension;
pub use offset::OffsetTracker;
pub use page::{parse_page, QueryPage};
pub use query::{Constraint, ConstraintSet, SearchQuery, DEFAULT_PAGE_LIMIT};
pub use retry::{BackoffPolicy, RetryPolicy};
