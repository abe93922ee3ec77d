use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Ryba";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Model description resources, fetched from the model asset root at startup.
/// The topology descriptor names the weights file and the expected input
/// geometry; the metadata descriptor carries the label vocabulary.
pub const MODEL_TOPOLOGY_FILE: &str = "model.json";
pub const MODEL_METADATA_FILE: &str = "metadata.json";

/// Request paths under this prefix hold the large model weight files.
/// The offline cache agent never caches them — except the small JSON
/// description files, recognized by suffix.
pub const MODEL_ASSET_PREFIX: &str = "/model/";
pub const MODEL_METADATA_SUFFIX: &str = ".json";

/// Fixed, ordered precache manifest. The two model weight files are
/// deliberately absent: too large and too volatile to precache reliably.
pub const PRECACHE_MANIFEST: &[&str] = &[
    "/",
    "/index.html",
    "/static/js/main.chunk.js",
    "/static/js/bundle.js",
    "/static/js/vendors~main.chunk.js",
    "/static/css/main.chunk.css",
    "/manifest.json",
    "/icon-192.png",
    "/icon-512.png",
    "/model/model.json",
    "/model/metadata.json",
];

/// Advisory capture resolution hint. The controller reads the negotiated
/// resolution back from the granted stream rather than assuming this.
pub const PREFERRED_CAPTURE_WIDTH: u32 = 1280;
pub const PREFERRED_CAPTURE_HEIGHT: u32 = 720;

/// JPEG quality for camera snapshots and display previews.
pub const SNAPSHOT_JPEG_QUALITY: u8 = 90;

/// Origin the offline cache agent resolves request paths against.
/// Overridable for self-hosted deployments.
pub fn asset_origin() -> String {
    std::env::var("RYBA_ASSET_ORIGIN").unwrap_or_else(|_| "https://ryba.app".to_string())
}

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    "info,ryba_lib=debug".to_string()
}

/// Get the application data directory
/// ~/Ryba/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Ryba")
}

/// Get the model asset root (topology, metadata, weights)
pub fn model_dir() -> PathBuf {
    app_data_dir().join("model")
}

/// Get the offline cache root. Each precache generation is a subdirectory.
pub fn offline_cache_dir() -> PathBuf {
    app_data_dir().join("offline-cache")
}

/// Name of the precache generation for the current build.
/// Exactly one generation is "current" at a time; activation deletes the rest.
pub fn cache_generation_name() -> String {
    format!("ryba-v{APP_VERSION}")
}
