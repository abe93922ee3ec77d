pub mod capture; // Camera hardware lease + still-frame capture
pub mod classify; // Confidence gating, translation, sequencing
pub mod commands;
pub mod config;
pub mod core_state;
pub mod ingest; // File / drop / snapshot → canonical image
pub mod model; // Opaque classifier lifecycle
pub mod offline; // Background precache agent

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Ryba starting v{}", config::APP_VERSION);

    let state = Arc::new(core_state::CoreState::new());
    state.set_camera_supported(capture::probe_camera_support());

    // One agent serves both the startup precache and every request the
    // window makes on the asset scheme.
    let agent = Arc::new(offline::OfflineCacheAgent::from_config());
    let install_agent = agent.clone();

    tauri::Builder::default()
        .plugin(tauri_plugin_shell::init())
        .plugin(tauri_plugin_dialog::init())
        .manage(state)
        .register_uri_scheme_protocol(offline::protocol::SCHEME, move |_ctx, request| {
            offline::protocol::respond(&agent, request.uri().path())
        })
        .setup(move |_app| {
            // Offline coverage is best-effort and fully detached from the
            // user flow; a failed install is logged, never surfaced.
            offline::spawn_background_agent(install_agent);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::health_check,
            commands::model::load_model,
            commands::model::model_status,
            commands::capture::start_camera,
            commands::capture::stop_camera,
            commands::capture::take_snapshot,
            commands::image::ingest_file,
            commands::image::ingest_drop,
            commands::image::classify_current,
            commands::image::current_image,
            commands::image::reset,
            commands::cache::cache_status,
        ])
        .run(tauri::generate_context!())
        .expect("error while running Ryba");
}
