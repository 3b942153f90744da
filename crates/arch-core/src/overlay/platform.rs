//! Platform-specific overlay window configuration
//!
//! This module handles configuring overlay windows to:
//! - Stay above normal windows on every virtual desktop/space
//! - Stay out of window switchers and the taskbar
//! - Support whole-window alpha, which Tauri does not expose directly

use tauri::WebviewWindow;
use tracing::debug;

use crate::Error;

/// Configure an overlay window with platform-specific settings
pub fn configure_overlay(window: &WebviewWindow) -> Result<(), Error> {
    debug!(label = window.label(), "configuring overlay window");

    #[cfg(target_os = "macos")]
    configure_overlay_macos(window)?;

    #[cfg(target_os = "windows")]
    configure_overlay_windows(window)?;

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        // always_on_top from the window builder is all Linux needs
        let _ = window;
    }

    Ok(())
}

/// Sets the opacity of the whole window, 0.0 to 1.0.
#[cfg(target_os = "macos")]
pub fn set_window_alpha(window: &WebviewWindow, alpha: f64) -> Result<(), Error> {
    let ns_window_ptr = window
        .ns_window()
        .map_err(|e| Error::WindowOperation(format!("Failed to get NSWindow handle: {}", e)))?;

    // Carried across threads as an address; only dereferenced on the main thread
    let ptr_addr = ns_window_ptr as usize;
    let alpha = alpha.clamp(0.0, 1.0);

    window
        .run_on_main_thread(move || {
            use objc2::rc::Retained;
            use objc2_app_kit::NSWindow;

            // SAFETY: the window outlives this dispatch; we are on the main thread
            let ns_window: Option<Retained<NSWindow>> =
                unsafe { Retained::retain(ptr_addr as *mut NSWindow) };

            if let Some(ns_window) = ns_window {
                ns_window.setAlphaValue(alpha);
            }
        })
        .map_err(|e| Error::WindowOperation(format!("Failed to run on main thread: {}", e)))?;

    Ok(())
}

/// Sets the opacity of the whole window, 0.0 to 1.0.
#[cfg(target_os = "windows")]
pub fn set_window_alpha(window: &WebviewWindow, alpha: f64) -> Result<(), Error> {
    use windows::Win32::Foundation::{COLORREF, HWND};
    use windows::Win32::UI::WindowsAndMessaging::{LWA_ALPHA, SetLayeredWindowAttributes};

    let hwnd = window
        .hwnd()
        .map_err(|e| Error::WindowOperation(format!("Failed to get HWND handle: {}", e)))?;
    let value = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;

    // Requires WS_EX_LAYERED, set in configure_overlay_windows
    unsafe { SetLayeredWindowAttributes(HWND(hwnd.0), COLORREF(0), value, LWA_ALPHA) }
        .map_err(|e| Error::WindowOperation(format!("Failed to set window alpha: {}", e)))?;

    Ok(())
}

/// Sets the opacity of the whole window, 0.0 to 1.0.
///
/// There is no compositor-level alpha on Linux webviews, so the document
/// root is faded instead. The window itself is transparent.
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub fn set_window_alpha(window: &WebviewWindow, alpha: f64) -> Result<(), Error> {
    let alpha = alpha.clamp(0.0, 1.0);
    window.eval(&format!(
        "document.documentElement && (document.documentElement.style.opacity = '{}');",
        alpha
    ))?;
    Ok(())
}

/// macOS-specific overlay configuration
#[cfg(target_os = "macos")]
fn configure_overlay_macos(window: &WebviewWindow) -> Result<(), Error> {
    use objc2::rc::Retained;
    use objc2_app_kit::{NSMainMenuWindowLevel, NSWindow, NSWindowCollectionBehavior};

    let ns_window_ptr = window
        .ns_window()
        .map_err(|e| Error::WindowCreation(format!("Failed to get NSWindow handle: {}", e)))?;

    // SAFETY: The pointer is valid as long as the window exists, and we're
    // retaining it to ensure it stays valid during our operations
    let ns_window: Retained<NSWindow> = unsafe { Retained::retain(ns_window_ptr as *mut NSWindow) }
        .ok_or_else(|| Error::WindowCreation("NSWindow pointer was null".to_string()))?;

    ns_window.setLevel(NSMainMenuWindowLevel);

    // - CanJoinAllSpaces: visible on every space
    // - Stationary: stays put during Mission Control
    // - IgnoresCycle: not in Cmd+Tab
    // - FullScreenAuxiliary: can sit over fullscreen apps
    let behavior = NSWindowCollectionBehavior::CanJoinAllSpaces
        | NSWindowCollectionBehavior::Stationary
        | NSWindowCollectionBehavior::IgnoresCycle
        | NSWindowCollectionBehavior::FullScreenAuxiliary;
    ns_window.setCollectionBehavior(behavior);

    debug!("macOS overlay configuration applied");
    Ok(())
}

/// Windows-specific overlay configuration
#[cfg(target_os = "windows")]
fn configure_overlay_windows(window: &WebviewWindow) -> Result<(), Error> {
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{
        GWL_EXSTYLE, GetWindowLongPtrW, HWND_TOPMOST, SWP_NOMOVE, SWP_NOSIZE, SetWindowLongPtrW,
        SetWindowPos, WS_EX_LAYERED, WS_EX_TOOLWINDOW,
    };

    let hwnd = window
        .hwnd()
        .map_err(|e| Error::WindowCreation(format!("Failed to get HWND handle: {}", e)))?;

    unsafe {
        let hwnd = HWND(hwnd.0);

        // Tool window: no taskbar button, not in Alt+Tab.
        // Layered: required for whole-window alpha.
        let mut ex_style = GetWindowLongPtrW(hwnd, GWL_EXSTYLE);
        ex_style |= WS_EX_TOOLWINDOW.0 as isize;
        ex_style |= WS_EX_LAYERED.0 as isize;
        SetWindowLongPtrW(hwnd, GWL_EXSTYLE, ex_style);

        SetWindowPos(
            hwnd,
            Some(HWND_TOPMOST),
            0,
            0,
            0,
            0,
            SWP_NOMOVE | SWP_NOSIZE,
        )
        .map_err(|e| Error::WindowCreation(format!("Failed to set window position: {}", e)))?;
    }

    debug!("Windows overlay configuration applied");
    Ok(())
}
