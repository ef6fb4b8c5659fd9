//! Network fetcher implementations.
//!
//! - `HttpFetcher` - reqwest-based page and image fetcher
//! - [`crate::testing::MockFetcher`] - canned responses for tests

mod http;

pub use http::HttpFetcher;
