//! Offline precache agent.
//!
//! On startup the agent populates a precache generation named for the
//! current build (all-or-nothing) on a background thread, then activates
//! it by deleting every other generation. The same agent resolves every
//! request on the app's asset scheme (see [`super::protocol`]):
//! cache-first, with one carve-out — the large model weight files always
//! go to the network and are never written to the cache.
//!
//! Failure here is never fatal to the application: a failed install is
//! logged and the app simply runs without offline coverage.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::CacheError;
use crate::config;

/// A fetched network resource, reduced to what caching policy needs.
#[derive(Debug, Clone)]
pub struct FetchedResource {
    pub status: u16,
    /// URL the response actually came from (after redirects). `None`
    /// when the transport could not tell — treated as opaque, not cached.
    pub final_url: Option<String>,
    pub body: Vec<u8>,
}

/// Network boundary, injected so the agent's policy is testable without
/// a server.
pub trait ResourceFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchedResource, CacheError>;
}

/// Production fetcher over a blocking reqwest client. The agent owns its
/// own thread, so blocking I/O is fine here.
pub struct ReqwestFetcher {
    client: reqwest::blocking::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceFetcher for ReqwestFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedResource, CacheError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| CacheError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let final_url = Some(response.url().to_string());
        let body = response
            .bytes()
            .map_err(|e| CacheError::Network(e.to_string()))?
            .to_vec();
        Ok(FetchedResource {
            status,
            final_url,
            body,
        })
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    /// Served from the current generation's cache.
    Cache,
    /// Fetched from the network (and possibly stored).
    Network,
    /// Fetched from the network under the weights bypass — never stored.
    NetworkBypass,
}

/// A response served through the agent.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub source: CacheSource,
}

/// The background caching agent. One instance per process, owning the
/// cache root directory in which each generation is a subdirectory.
pub struct OfflineCacheAgent {
    root: PathBuf,
    generation: String,
    origin: String,
    fetcher: Box<dyn ResourceFetcher>,
}

impl OfflineCacheAgent {
    pub fn new(
        root: PathBuf,
        generation: String,
        origin: String,
        fetcher: Box<dyn ResourceFetcher>,
    ) -> Self {
        Self {
            root,
            generation: generation.trim_matches('/').to_string(),
            origin: origin.trim_end_matches('/').to_string(),
            fetcher,
        }
    }

    /// Production agent over the configured origin, cache root, and
    /// build-versioned generation name.
    pub fn from_config() -> Self {
        Self::new(
            config::offline_cache_dir(),
            config::cache_generation_name(),
            config::asset_origin(),
            Box::new(ReqwestFetcher::new()),
        )
    }

    pub fn generation(&self) -> &str {
        &self.generation
    }

    fn generation_dir(&self) -> PathBuf {
        self.root.join(&self.generation)
    }

    fn entry_path(&self, request_path: &str) -> PathBuf {
        self.generation_dir().join(entry_name(request_path))
    }

    /// Precache the manifest into the current generation. All-or-nothing:
    /// any single failure removes the partially populated generation and
    /// fails the install. Not retried.
    pub fn install(&self, manifest: &[&str]) -> Result<(), CacheError> {
        let dir = self.generation_dir();
        std::fs::create_dir_all(&dir)?;

        for path in manifest {
            let failed = |reason: String| {
                let _ = std::fs::remove_dir_all(&dir);
                CacheError::Install(format!("{path}: {reason}"))
            };

            let resource = self.fetch_origin(path).map_err(|e| failed(e.to_string()))?;
            if resource.status != 200 {
                return Err(failed(format!("status {}", resource.status)));
            }
            std::fs::write(self.entry_path(path), &resource.body)
                .map_err(|e| failed(e.to_string()))?;
        }

        info!(
            generation = %self.generation,
            entries = manifest.len(),
            "precache generation populated"
        );
        Ok(())
    }

    /// Delete every generation whose name differs from the current one.
    /// Idempotent; after this exactly one generation remains.
    pub fn activate(&self) -> Result<(), CacheError> {
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_string_lossy() != self.generation {
                info!(stale = %name.to_string_lossy(), "deleting stale cache generation");
                std::fs::remove_dir_all(entry.path())?;
            }
        }
        Ok(())
    }

    /// Serve one intercepted request. Weight files bypass the cache
    /// entirely; everything else is cache-first, stored on miss only when
    /// the network response is a successful, same-origin, unopaque one.
    pub fn handle(&self, request_path: &str) -> Result<CachedResponse, CacheError> {
        if is_weights_request(request_path) {
            debug!(path = request_path, "weights bypass — straight to network");
            let resource = self.fetch_origin(request_path)?;
            return Ok(CachedResponse {
                status: resource.status,
                body: resource.body,
                source: CacheSource::NetworkBypass,
            });
        }

        if let Ok(body) = std::fs::read(self.entry_path(request_path)) {
            return Ok(CachedResponse {
                status: 200,
                body,
                source: CacheSource::Cache,
            });
        }

        let resource = self.fetch_origin(request_path)?;
        if resource.status == 200 && self.same_origin(&resource) {
            let dir = self.generation_dir();
            if let Err(e) = std::fs::create_dir_all(&dir)
                .and_then(|_| std::fs::write(self.entry_path(request_path), &resource.body))
            {
                warn!(path = request_path, error = %e, "could not store cache entry");
            }
        }

        Ok(CachedResponse {
            status: resource.status,
            body: resource.body,
            source: CacheSource::Network,
        })
    }

    /// Install then activate, logging instead of propagating. The agent
    /// must never block or break normal (non-offline) operation.
    pub fn install_and_activate(&self, manifest: &[&str]) {
        match self.install(manifest) {
            Ok(()) => {
                if let Err(e) = self.activate() {
                    warn!(error = %e, "cache generation cleanup failed");
                }
            }
            Err(e) => error!(error = %e, "precache install failed — continuing without offline coverage"),
        }
    }

    fn fetch_origin(&self, request_path: &str) -> Result<FetchedResource, CacheError> {
        let url = format!("{}{}", self.origin, request_path);
        self.fetcher.fetch(&url)
    }

    /// Same-origin means the full scheme/host/port triple matches the
    /// configured origin; a redirect that changes any of the three (an
    /// `http://` downgrade included) is cross-origin. An unparseable or
    /// unknown final URL is opaque, never cached.
    fn same_origin(&self, resource: &FetchedResource) -> bool {
        let expected = match reqwest::Url::parse(&self.origin) {
            Ok(url) => url,
            Err(_) => return false,
        };
        let actual = match resource
            .final_url
            .as_deref()
            .and_then(|url| reqwest::Url::parse(url).ok())
        {
            Some(url) => url,
            None => return false,
        };
        actual.scheme() == expected.scheme()
            && actual.host_str() == expected.host_str()
            && actual.port_or_known_default() == expected.port_or_known_default()
    }
}

/// Model weight files live under the model prefix and are not description
/// files. They bypass the cache: too large and too volatile to precache.
pub fn is_weights_request(request_path: &str) -> bool {
    request_path.contains(config::MODEL_ASSET_PREFIX)
        && !request_path.ends_with(config::MODEL_METADATA_SUFFIX)
}

/// Flatten a request path into a single cache entry file name.
fn entry_name(request_path: &str) -> String {
    let trimmed = request_path.trim_matches('/');
    if trimmed.is_empty() {
        "__root".to_string()
    } else {
        trimmed.replace('/', "__")
    }
}

/// Run the precache install on its own thread. Fire-and-forget: the UI
/// flow never waits on it, and the same agent keeps serving requests
/// through the asset scheme while the install runs.
pub fn spawn_background_agent(agent: Arc<OfflineCacheAgent>) {
    let spawned = std::thread::Builder::new()
        .name("offline-cache".into())
        .spawn(move || agent.install_and_activate(config::PRECACHE_MANIFEST));
    if let Err(e) = spawned {
        warn!(error = %e, "could not start offline cache agent");
    }
}
