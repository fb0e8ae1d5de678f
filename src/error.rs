use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FusionError>;

/// Errors raised by the library. Per-page and per-engine failures inside a
/// document run are collected, not returned through this type.
#[derive(Debug, Error)]
pub enum FusionError {
    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("threshold {name} = {value} is out of range")]
    InvalidThreshold { name: &'static str, value: f32 },

    #[error("unknown {kind}: {value}")]
    UnknownOption { kind: &'static str, value: String },

    #[error("failed to encode {what}: {message}")]
    Encode { what: &'static str, message: String },
}
