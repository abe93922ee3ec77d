//! Offline cache status IPC command.
//!
//! The agent itself runs detached; the frontend only ever asks whether
//! offline coverage exists. Status is read from the filesystem, keeping
//! the agent free of shared mutable state with the UI flow.

use crate::config;

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub generation: String,
    pub populated: bool,
    pub entries: usize,
}

#[tauri::command]
pub fn cache_status() -> CacheStatus {
    let generation = config::cache_generation_name();
    let dir = config::offline_cache_dir().join(&generation);
    let entries = std::fs::read_dir(&dir)
        .map(|it| it.count())
        .unwrap_or(0);
    CacheStatus {
        generation,
        populated: entries > 0,
        entries,
    }
}
