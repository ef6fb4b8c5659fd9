//! Data types for the recipe extraction pipeline.

pub mod config;
pub mod image;
pub mod input;
pub mod recipe;
pub mod vocabulary;
