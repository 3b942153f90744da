pub mod commands;
pub mod config;
pub mod control;
pub mod error;
pub mod gateway;
pub mod hotkeys;
pub mod instance;
pub mod opacity;
pub mod overlay;
pub mod resolver;
pub mod settings;

pub use config::*;
pub use control::OverlayState;
pub use error::*;
pub use gateway::*;
pub use hotkeys::*;
pub use opacity::*;
pub use overlay::*;
pub use resolver::*;
pub use settings::*;

use std::sync::Mutex;
use tauri::{
    Manager, Wry,
    plugin::{Builder, TauriPlugin},
};
use tracing::info;

pub fn init() -> TauriPlugin<Wry> {
    Builder::<Wry, ()>::new("arch")
        .invoke_handler(tauri::generate_handler![
            commands::content_ready,
            commands::navigate,
            commands::close_window,
            commands::get_settings,
            commands::pick_custom_background,
            commands::clear_custom_background,
            commands::list_windows
        ])
        .setup(|app, _api| {
            let config_dir = app.path().app_config_dir()?;
            let data_dir = app.path().app_data_dir()?;

            let config = ShellConfig::load(&config_dir);
            info!(
                config_dir = %config_dir.display(),
                data_dir = %data_dir.display(),
                "shell configuration loaded"
            );

            let orchestrator = Orchestrator::new(
                TauriHost::new(app.app_handle().clone()),
                config,
                SettingsStore::new(data_dir),
            );
            app.manage(OverlayState(Mutex::new(orchestrator)));

            EmbeddingGateway::install();
            Ok(())
        })
        .build()
}
