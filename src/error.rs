//! The typed error hierarchy behind §7: every failure raised by the GPFS
//! store, the I/O adapter, or the job coordinator is one of these four
//! kinds before it reaches the HTTP or CLI boundary.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing or unknown HTTP operation or required argument.
    #[error("illegal command: {0}")]
    BadRequest(String),

    /// Unknown GPFS directory/file.
    #[error("not found: {dir}/{file}")]
    NotFound { dir: String, file: String },

    /// Output directory could not be removed/created, or the input
    /// directory could not be read.
    #[error("could not prepare {path}: {source}")]
    SetupFailure {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Any other failure surfacing from the job coordinator (a subprocess
    /// that could not be spawned, a shard that could not be opened, ...).
    #[error("{0}")]
    JobFailure(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
