use arch_core::{
    Error, HotkeyRouter, control,
    hotkeys::{self, HotkeyAction},
};
use indexmap::IndexMap;
use tauri::{AppHandle, Manager, Runtime};
use tauri_plugin_global_shortcut::{GlobalShortcutExt, Shortcut, ShortcutEvent, ShortcutState};
use tracing::{info, warn};

/// Parsed hotkey table, managed as app state.
pub struct ShortcutRoutes(pub HotkeyRouter<Shortcut>);

pub fn router(bindings: &IndexMap<HotkeyAction, String>) -> HotkeyRouter<Shortcut> {
    HotkeyRouter::from_bindings(bindings, |raw| raw.parse::<Shortcut>())
}

/// Registers every routed shortcut with the OS. A binding taken by another
/// application is logged and skipped.
pub fn arm<R: Runtime>(app: &AppHandle<R>, routes: &HotkeyRouter<Shortcut>) {
    let mut armed = 0;
    for shortcut in routes.keys() {
        match app.global_shortcut().register(shortcut) {
            Ok(()) => armed += 1,
            Err(e) => warn!(shortcut = %shortcut.into_string(), error = %e, "failed to register hotkey"),
        }
    }
    info!(armed, "hotkeys armed");
}

/// Handler installed on the global-shortcut plugin.
pub fn on_shortcut(app: &AppHandle, shortcut: &Shortcut, event: ShortcutEvent) {
    if event.state() != ShortcutState::Pressed {
        return;
    }
    let Some(action) = app
        .try_state::<ShortcutRoutes>()
        .and_then(|routes| routes.0.action(shortcut))
    else {
        return;
    };
    control::dispatch(app, move |orchestrator| hotkeys::dispatch(orchestrator, action));
}

pub fn release<R: Runtime>(app: &AppHandle<R>) -> Result<(), Error> {
    app.global_shortcut()
        .unregister_all()
        .map_err(|e| Error::WindowOperation(format!("failed to release hotkeys: {}", e)))
}

#[cfg(test)]
mod tests {
    use arch_core::default_bindings;
    use tauri_plugin_global_shortcut::{Code, Modifiers};

    use super::*;

    fn primary() -> Modifiers {
        if cfg!(target_os = "macos") {
            Modifiers::SUPER
        } else {
            Modifiers::CONTROL
        }
    }

    #[test]
    fn default_bindings_parse_into_the_action_table() {
        let routes = router(&default_bindings());
        assert_eq!(routes.len(), 5);

        let toggle = Shortcut::new(Some(primary() | Modifiers::ALT), Code::KeyH);
        assert_eq!(routes.action(&toggle), Some(HotkeyAction::ToggleHidden));

        let up = Shortcut::new(Some(primary() | Modifiers::ALT), Code::Equal);
        assert_eq!(routes.action(&up), Some(HotkeyAction::OpacityUp));
    }

    #[test]
    fn garbage_bindings_are_dropped() {
        let mut bindings = default_bindings();
        bindings.insert(HotkeyAction::OpenUtility, "Alt+NotAKey".to_string());
        assert_eq!(router(&bindings).len(), 4);
    }
}
