pub mod consolidate;
pub mod core;
pub mod engine;
pub mod error;
pub mod export;
pub mod fusion;
pub mod jobs;
pub mod merge;
pub mod pipeline;
pub mod store;

pub use crate::core::config::FusionConfig;
pub use crate::core::model::{EngineBlockSet, NormalizedBox, UnionRegion, WordToken};
pub use error::{FusionError, Result};
pub use pipeline::{analyze_document, DocumentAnalysis};
