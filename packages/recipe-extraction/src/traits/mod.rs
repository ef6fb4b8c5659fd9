//! Core trait abstractions for the extraction pipeline.
//!
//! These traits define the collaborators the pipeline depends on:
//! inference, vocabulary storage, blob storage, network fetching and
//! per-site markup parsing. Applications wire concrete implementations
//! into [`crate::RecipePipeline`].

pub mod ai;
pub mod extractor;
pub mod fetcher;
pub mod store;
