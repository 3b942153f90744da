pub mod host;
pub mod manager;
pub mod platform;
pub mod tauri_host;
pub mod window;

#[cfg(test)]
pub(crate) mod mock;

pub use host::WindowHost;
pub use manager::Orchestrator;
pub use platform::{configure_overlay, set_window_alpha};
pub use tauri_host::TauriHost;
pub use window::*;
