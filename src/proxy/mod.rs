//! Outbound proxy endpoints and the rotation pool.

mod endpoint;
mod pool;

use std::path::PathBuf;

use thiserror::Error;

pub use endpoint::{ProxyCredentials, ProxyEndpoint};
pub use pool::ProxyPool;

/// Errors raised while loading proxies.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("malformed proxy entry: {0}")]
    Malformed(String),

    #[error("no usable proxies configured")]
    EmptyPool,

    #[error("failed to read proxy list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
