//! Global hotkey actions and their bindings.
//!
//! Key capture belongs to the host; this module only knows which action a
//! binding maps to and what each action does to the orchestrator.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    Error,
    overlay::{Orchestrator, WindowHost},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HotkeyAction {
    OpacityUp,
    OpacityDown,
    ToggleHidden,
    OpenAssistant,
    OpenUtility,
}

impl HotkeyAction {
    pub const ALL: [HotkeyAction; 5] = [
        HotkeyAction::OpacityUp,
        HotkeyAction::OpacityDown,
        HotkeyAction::ToggleHidden,
        HotkeyAction::OpenAssistant,
        HotkeyAction::OpenUtility,
    ];

    pub fn default_binding(self) -> &'static str {
        match self {
            HotkeyAction::OpacityUp => "CommandOrControl+Alt+Equal",
            HotkeyAction::OpacityDown => "CommandOrControl+Alt+Minus",
            HotkeyAction::ToggleHidden => "CommandOrControl+Alt+H",
            HotkeyAction::OpenAssistant => "CommandOrControl+Alt+A",
            HotkeyAction::OpenUtility => "CommandOrControl+Alt+U",
        }
    }
}

/// Default bindings, in registration order.
pub fn default_bindings() -> IndexMap<HotkeyAction, String> {
    HotkeyAction::ALL
        .into_iter()
        .map(|action| (action, action.default_binding().to_string()))
        .collect()
}

/// Lookup table from a parsed key combination to its action.
#[derive(Debug)]
pub struct HotkeyRouter<K> {
    routes: HashMap<K, HotkeyAction>,
}

impl<K: Hash + Eq + Clone> HotkeyRouter<K> {
    /// Builds the table with `parse`. Bindings that fail to parse, or that
    /// repeat an earlier binding, are logged and skipped.
    pub fn from_bindings<P, E>(bindings: &IndexMap<HotkeyAction, String>, parse: P) -> Self
    where
        P: Fn(&str) -> Result<K, E>,
        E: Display,
    {
        let mut routes = HashMap::new();
        for (action, binding) in bindings {
            match parse(binding) {
                Ok(key) if routes.contains_key(&key) => {
                    warn!(?action, binding, "hotkey already bound, skipping");
                }
                Ok(key) => {
                    routes.insert(key, *action);
                }
                Err(e) => warn!(?action, binding, error = %e, "unparsable hotkey, skipping"),
            }
        }
        Self { routes }
    }

    pub fn action(&self, key: &K) -> Option<HotkeyAction> {
        self.routes.get(key).copied()
    }

    pub fn keys(&self) -> Vec<K> {
        self.routes.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Performs `action` against the orchestrator.
pub fn dispatch<H: WindowHost>(
    orchestrator: &mut Orchestrator<H>,
    action: HotkeyAction,
) -> Result<(), Error> {
    debug!(?action, "hotkey pressed");
    match action {
        HotkeyAction::OpacityUp => {
            let level = orchestrator.increase_opacity()?;
            info!(level, "opacity increased");
        }
        HotkeyAction::OpacityDown => {
            let level = orchestrator.decrease_opacity()?;
            info!(level, "opacity decreased");
        }
        HotkeyAction::ToggleHidden => {
            orchestrator.toggle_hidden()?;
        }
        HotkeyAction::OpenAssistant => orchestrator.create_assistant()?,
        HotkeyAction::OpenUtility => orchestrator.create_utility()?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        config::ShellConfig,
        opacity::TickOutcome,
        overlay::{WindowPhase, WindowRole, mock::MockHost},
        settings::SettingsStore,
    };

    use super::*;

    fn ready_orchestrator() -> (Orchestrator<MockHost>, MockHost, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let host = MockHost::default();
        let mut orchestrator = Orchestrator::new(
            host.clone(),
            ShellConfig::default(),
            SettingsStore::new(dir.path()),
        );
        let target = orchestrator.resolve(None);
        orchestrator.create_primary(target).unwrap();
        orchestrator.content_ready(WindowRole::Primary).unwrap();
        for ticket in orchestrator.take_fade_tickets() {
            while let TickOutcome::Continue(_) = orchestrator.tick_fade(&ticket) {}
        }
        (orchestrator, host, dir)
    }

    #[test]
    fn defaults_cover_every_action_in_order() {
        let bindings = default_bindings();
        assert_eq!(bindings.keys().copied().collect::<Vec<_>>(), HotkeyAction::ALL);
        assert_eq!(bindings[&HotkeyAction::ToggleHidden], "CommandOrControl+Alt+H");
    }

    #[test]
    fn unparsable_and_duplicate_bindings_are_skipped() {
        let mut bindings = default_bindings();
        bindings.insert(HotkeyAction::OpenUtility, "".to_string());
        bindings.insert(HotkeyAction::OpenAssistant, "commandorcontrol+alt+h".to_string());

        let router = HotkeyRouter::from_bindings(&bindings, |raw| {
            if raw.is_empty() {
                Err("empty binding")
            } else {
                Ok(raw.to_ascii_lowercase())
            }
        });

        assert_eq!(router.len(), 3);
        assert_eq!(
            router.action(&"commandorcontrol+alt+h".to_string()),
            Some(HotkeyAction::ToggleHidden)
        );
        assert_eq!(router.action(&"".to_string()), None);
    }

    #[test]
    fn opacity_actions_step_and_clamp() {
        let (mut orchestrator, host, _dir) = ready_orchestrator();

        dispatch(&mut orchestrator, HotkeyAction::OpacityUp).unwrap();
        assert_eq!(orchestrator.opacity_level(), 0.6);
        assert_eq!(host.last_opacity(1), Some(0.6));

        for _ in 0..10 {
            dispatch(&mut orchestrator, HotkeyAction::OpacityUp).unwrap();
        }
        assert_eq!(orchestrator.opacity_level(), 1.0);

        for _ in 0..20 {
            dispatch(&mut orchestrator, HotkeyAction::OpacityDown).unwrap();
        }
        assert_eq!(orchestrator.opacity_level(), 0.02);
        assert_eq!(host.last_opacity(1), Some(0.02));
    }

    #[test]
    fn toggle_action_hides_then_shows() {
        let (mut orchestrator, _host, _dir) = ready_orchestrator();

        dispatch(&mut orchestrator, HotkeyAction::ToggleHidden).unwrap();
        assert_eq!(
            orchestrator.window(WindowRole::Primary).unwrap().phase,
            WindowPhase::Hidden
        );

        dispatch(&mut orchestrator, HotkeyAction::ToggleHidden).unwrap();
        assert_eq!(
            orchestrator.window(WindowRole::Primary).unwrap().phase,
            WindowPhase::Ready
        );
    }

    #[test]
    fn open_actions_are_idempotent() {
        let (mut orchestrator, host, _dir) = ready_orchestrator();

        dispatch(&mut orchestrator, HotkeyAction::OpenAssistant).unwrap();
        dispatch(&mut orchestrator, HotkeyAction::OpenAssistant).unwrap();
        dispatch(&mut orchestrator, HotkeyAction::OpenUtility).unwrap();
        dispatch(&mut orchestrator, HotkeyAction::OpenUtility).unwrap();

        assert_eq!(host.created(WindowRole::Assistant), 1);
        assert_eq!(host.created(WindowRole::Utility), 1);
    }
}
