pub mod agent;
pub mod protocol;

pub use agent::{
    spawn_background_agent, CacheSource, CachedResponse, FetchedResource, OfflineCacheAgent,
    ReqwestFetcher, ResourceFetcher,
};

use thiserror::Error;

/// Agent-internal failures. Logged, never surfaced to the user flow.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("precache install failed: {0}")]
    Install(String),

    #[error("network fetch failed: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
