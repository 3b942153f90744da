use tauri::{AppHandle, WebviewWindow, command};
use tauri_plugin_dialog::DialogExt;
use tracing::{debug, info};

use crate::{
    Error, control,
    overlay::{WindowRole, WindowSnapshot},
    settings::AppSettings,
};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

fn role_of(window: &WebviewWindow) -> Result<WindowRole, String> {
    WindowRole::from_label(window.label())
        .ok_or_else(|| Error::WindowNotFound(window.label().to_string()).to_string())
}

/// Readiness signal from embedded content that reports it explicitly.
#[command]
pub async fn content_ready(app: AppHandle, window: WebviewWindow) -> Result<bool, String> {
    let role = role_of(&window)?;
    control::request(&app, move |orchestrator| orchestrator.content_ready(role))
        .await
        .map_err(|e| e.to_string())
}

/// Navigates `role` (the calling window when omitted) to the resolved `target`.
#[command]
pub async fn navigate(
    app: AppHandle,
    window: WebviewWindow,
    target: Option<String>,
    role: Option<WindowRole>,
) -> Result<String, String> {
    let role = match role {
        Some(role) => role,
        None => role_of(&window)?,
    };
    control::request(&app, move |orchestrator| {
        let target = orchestrator.resolve(target.as_deref());
        let resolved = target.as_str().to_string();
        orchestrator.navigate(role, target)?;
        Ok(resolved)
    })
    .await
    .map_err(|e| e.to_string())
}

#[command]
pub async fn close_window(app: AppHandle, window: WebviewWindow) -> Result<(), String> {
    let role = role_of(&window)?;
    control::request(&app, move |orchestrator| orchestrator.close_role(role))
        .await
        .map_err(|e| e.to_string())
}

#[command]
pub async fn get_settings(app: AppHandle) -> Result<AppSettings, String> {
    control::request(&app, |orchestrator| Ok(orchestrator.settings()))
        .await
        .map_err(|e| e.to_string())
}

/// Lets the user pick an image and makes it the primary window's background.
/// Returns false when the picker was dismissed.
#[command]
pub async fn pick_custom_background(app: AppHandle) -> Result<bool, String> {
    let Some(picked) = app
        .dialog()
        .file()
        .set_title("Choose a background image")
        .add_filter("Images", IMAGE_EXTENSIONS)
        .blocking_pick_file()
    else {
        debug!("background picker dismissed");
        return Ok(false);
    };

    let path = picked.into_path().map_err(|e| e.to_string())?;
    info!(path = %path.display(), "background image picked");

    control::request(&app, move |orchestrator| {
        orchestrator.set_custom_background(&path)
    })
    .await
    .map(|_| true)
    .map_err(|e| e.to_string())
}

#[command]
pub async fn clear_custom_background(app: AppHandle) -> Result<(), String> {
    control::request(&app, |orchestrator| orchestrator.clear_custom_background())
        .await
        .map_err(|e| e.to_string())
}

#[command]
pub async fn list_windows(app: AppHandle) -> Result<Vec<WindowSnapshot>, String> {
    control::request(&app, |orchestrator| Ok(orchestrator.snapshots()))
        .await
        .map_err(|e| e.to_string())
}
