//! Storage implementations for the recipe pipeline.
//!
//! Available backends:
//! - `MemoryVocabulary` / `MemoryBlobStore` - In-memory (always available)
//! - `LocalBlobStore` - Image files on the local filesystem
//! - `PostgresVocabulary` - PostgreSQL vocabulary (requires `postgres` feature)

pub mod local;
pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use local::LocalBlobStore;
pub use memory::{MemoryBlobStore, MemoryVocabulary};

#[cfg(feature = "postgres")]
pub use postgres::PostgresVocabulary;
