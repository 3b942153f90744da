mod logging;
mod protocol;
#[cfg(desktop)]
mod shortcuts;

use std::sync::Arc;

use arch_core::{Error, WindowRole, control, instance};
use tauri::{AppHandle, Manager, RunEvent, WindowEvent};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
use tracing::{error, info, warn};

pub use protocol::{FRAME_PROTOCOL, FrameProxy};

/// Shows the startup failure once, then exits with status 1.
fn fail_startup(app: &AppHandle, error: Error) {
    error!(error = %error, "failed to create the primary window");
    let handle = app.clone();
    app.dialog()
        .message(format!("Arch could not open its window.\n\n{}", error))
        .title("Arch")
        .kind(MessageDialogKind::Error)
        .show(move |_| handle.exit(1));
}

/// Launch arguments plus any URL the OS opened us with.
fn launch_arguments(app: &AppHandle) -> Vec<String> {
    let mut args: Vec<String> = std::env::args().collect();

    #[cfg(desktop)]
    {
        use tauri_plugin_deep_link::DeepLinkExt;
        match app.deep_link().get_current() {
            Ok(Some(urls)) => args.extend(urls.iter().map(|url| url.to_string())),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to read launch URL"),
        }
    }
    #[cfg(not(desktop))]
    let _ = app;

    args
}

#[cfg(desktop)]
fn listen_for_open_urls(app: &AppHandle) {
    use tauri_plugin_deep_link::DeepLinkExt;

    #[cfg(any(windows, target_os = "linux"))]
    if let Err(e) = app.deep_link().register_all() {
        warn!(error = %e, "failed to register the arch:// handler");
    }

    // Forwarded second launches reach us through single-instance only; this
    // listener carries the URLs the OS hands to a running instance (macOS)
    let handle = app.clone();
    app.deep_link().on_open_url(move |event| {
        let urls: Vec<String> = event.urls().iter().map(|url| url.to_string()).collect();
        info!(?urls, "opened with URL");
        control::dispatch(&handle, move |orchestrator| {
            instance::handle_open_urls(orchestrator, urls.as_slice())
        });
    });
}

#[cfg(desktop)]
fn arm_hotkeys(app: &AppHandle) -> Result<(), Error> {
    let bindings = control::run_on_control_thread(app, |orchestrator| {
        Ok(orchestrator.config().hotkeys.clone())
    })?;
    let routes = shortcuts::router(&bindings);
    shortcuts::arm(app, &routes);
    app.manage(shortcuts::ShortcutRoutes(routes));
    Ok(())
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    logging::init();
    info!(version = env!("CARGO_PKG_VERSION"), "starting arch");

    let proxy = Arc::new(FrameProxy::new());
    let mut builder = tauri::Builder::default();

    #[cfg(desktop)]
    {
        // Must be registered first so a second instance exits before doing any work
        builder = builder
            .plugin(tauri_plugin_single_instance::init(|app, args, _cwd| {
                info!(?args, "second launch forwarded");
                control::dispatch(app, move |orchestrator| {
                    instance::handle_second_launch(orchestrator, args.as_slice())
                });
            }))
            .plugin(
                tauri_plugin_global_shortcut::Builder::new()
                    .with_handler(shortcuts::on_shortcut)
                    .build(),
            );
    }

    let app = builder
        .plugin(tauri_plugin_deep_link::init())
        .plugin(tauri_plugin_dialog::init())
        .register_asynchronous_uri_scheme_protocol(
            protocol::FRAME_PROTOCOL,
            move |_ctx, request, responder| {
                let proxy = proxy.clone();
                // Upstream fetches block; keep them off the webview thread
                tauri::async_runtime::spawn_blocking(move || {
                    responder.respond(proxy.handle(request));
                });
            },
        )
        .plugin(arch_core::init())
        .setup(|app| {
            let handle = app.handle().clone();

            #[cfg(desktop)]
            listen_for_open_urls(&handle);

            let args = launch_arguments(&handle);
            let created = control::run_on_control_thread(&handle, move |orchestrator| {
                let target = instance::launch_target(orchestrator, args.as_slice());
                info!(target = target.as_str(), "opening primary window");
                orchestrator.create_primary(target)
            });
            if let Err(e) = created {
                fail_startup(&handle, e);
                return Ok(());
            }

            #[cfg(desktop)]
            if let Err(e) = arm_hotkeys(&handle) {
                warn!(error = %e, "hotkeys unavailable");
            }

            Ok(())
        })
        .on_window_event(|window, event| {
            if let WindowEvent::CloseRequested { api, .. } = event {
                let Some(role) = WindowRole::from_label(window.label()) else {
                    return;
                };
                // Teardown goes through the orchestrator, which detaches content first
                api.prevent_close();
                control::dispatch(window.app_handle(), move |orchestrator| {
                    orchestrator.close_role(role)
                });
            }
        })
        .build(tauri::generate_context!());

    let app = match app {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "failed to build the application");
            std::process::exit(1);
        }
    };

    app.run(|app, event| match event {
        // Closing the last auxiliary window must not end the process
        RunEvent::ExitRequested { code: None, api, .. } => api.prevent_exit(),
        RunEvent::Exit => {
            #[cfg(desktop)]
            if let Err(e) = shortcuts::release(app) {
                warn!(error = %e, "failed to release hotkeys");
            }
            #[cfg(not(desktop))]
            let _ = app;
            info!("exiting");
        }
        _ => {}
    });
}
