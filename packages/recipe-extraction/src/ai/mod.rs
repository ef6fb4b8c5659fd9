//! Inference service implementations.
//!
//! This module provides reference implementations of [`InferenceService`].
//! Users can use these directly or implement their own.
//!
//! [`InferenceService`]: crate::traits::ai::InferenceService

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openai")]
pub use openai::OpenAI;
