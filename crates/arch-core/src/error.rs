use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to create window {0}")]
    WindowCreation(String),
    #[error("Window {0} not found")]
    WindowNotFound(String),
    #[error("Window operation failed on {0}")]
    WindowOperation(String),
    #[error("Settings error: {0}")]
    Settings(String),
    #[error("Tauri error: {0}")]
    TauriError(#[from] tauri::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
