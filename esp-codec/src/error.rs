//! Error types for the ESP codec host.
//!
//! Decoding itself never fails with an error: malformed input degrades to a
//! classification on the packet. These errors cover the surrounding plumbing
//! (packet intake, codec registration, input parsing).

use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T, E = CodecError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CodecError {
    /// The captured buffer is larger than any packet the capture system can produce.
    #[error("packet of {len} bytes exceeds the maximum packet size of {max} bytes")]
    PacketTooLarge { len: usize, max: usize },

    /// Two codec descriptors claimed the same protocol id.
    #[error("protocol {protocol} is claimed by both '{existing}' and '{duplicate}'")]
    DuplicateProtocol {
        protocol: u16,
        existing: &'static str,
        duplicate: &'static str,
    },

    /// A line of the packet input file was not valid hex.
    #[error("invalid hex on line {line}: {source}")]
    InvalidHex {
        line: usize,
        #[source]
        source: hex::FromHexError,
    },

    /// Failed to read the packet input.
    #[error("failed to read packet input {path}: {source}")]
    InputRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A decode worker panicked or was cancelled.
    #[error("decode worker {worker} failed: {source}")]
    Worker {
        worker: usize,
        #[source]
        source: tokio::task::JoinError,
    },
}

impl CodecError {
    pub fn input_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::InputRead {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while registering or serving metrics.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to bind metrics server to {address}: {source}")]
    BindAddress {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("metrics server stopped: {0}")]
    Serve(#[source] io::Error),

    #[error("failed to register collector: {0}")]
    Registration(#[from] prometheus::Error),
}
