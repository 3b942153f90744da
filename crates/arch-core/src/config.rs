use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    hotkeys::{HotkeyAction, default_bindings},
    opacity::{
        DEFAULT_FADE_INTERVAL_MS, DEFAULT_FADE_STEP, DEFAULT_OPACITY, DEFAULT_OPACITY_STEP,
        FadeSpec, GlobalOpacity, MIN_OPACITY,
    },
    overlay::{RoleConfig, WindowRole},
    resolver::{DEFAULT_SEARCH_URL, DEFAULT_TARGET},
};

pub const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_ASSISTANT_TARGET: &str = "https://chatgpt.com";

/// Shell configuration, read once at startup from `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShellConfig {
    pub default_target: String,
    pub search_url: String,
    pub assistant_target: String,
    pub initial_opacity: f64,
    pub opacity_step: f64,
    pub opacity_floor: f64,
    pub fade_step: f64,
    pub fade_interval_ms: u64,
    pub hotkeys: IndexMap<HotkeyAction, String>,
    /// Per-role overrides of [`RoleConfig::defaults_for`]
    pub roles: HashMap<WindowRole, RoleConfig>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            default_target: DEFAULT_TARGET.to_string(),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            assistant_target: DEFAULT_ASSISTANT_TARGET.to_string(),
            initial_opacity: DEFAULT_OPACITY,
            opacity_step: DEFAULT_OPACITY_STEP,
            opacity_floor: MIN_OPACITY,
            fade_step: DEFAULT_FADE_STEP,
            fade_interval_ms: DEFAULT_FADE_INTERVAL_MS,
            hotkeys: default_bindings(),
            roles: HashMap::new(),
        }
    }
}

impl ShellConfig {
    /// Reads the config from `dir`. Missing or malformed files yield defaults.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read config");
                return Self::default();
            }
        };

        match serde_json::from_str::<Self>(&content) {
            Ok(mut config) => {
                // Actions left out of a partial hotkey table keep their defaults
                for (action, binding) in default_bindings() {
                    config.hotkeys.entry(action).or_insert(binding);
                }
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse config");
                Self::default()
            }
        }
    }

    pub fn role_config(&self, role: WindowRole) -> RoleConfig {
        self.roles
            .get(&role)
            .cloned()
            .unwrap_or_else(|| RoleConfig::defaults_for(role))
    }

    pub fn opacity(&self) -> GlobalOpacity {
        GlobalOpacity::new(self.initial_opacity, self.opacity_step, self.opacity_floor)
    }

    pub fn fade(&self) -> FadeSpec {
        FadeSpec::new(self.fade_step, self.fade_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use crate::overlay::EmbeddingMode;

    use super::*;

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ShellConfig::load(dir.path());
        assert_eq!(config, ShellConfig::default());
        assert_eq!(config.opacity().level(), 0.5);
        assert_eq!(config.hotkeys.len(), 5);
    }

    #[test]
    fn malformed_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[1, 2").unwrap();
        assert_eq!(ShellConfig::load(dir.path()), ShellConfig::default());
    }

    #[test]
    fn partial_config_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{
                "initialOpacity": 0.8,
                "hotkeys": { "toggleHidden": "Alt+F12" },
                "roles": { "primary": { "width": 800, "height": 600, "embeddingMode": "direct" } }
            }"#,
        )
        .unwrap();

        let config = ShellConfig::load(dir.path());
        assert_eq!(config.opacity().level(), 0.8);
        assert_eq!(config.default_target, DEFAULT_TARGET);
        assert_eq!(config.hotkeys[&HotkeyAction::ToggleHidden], "Alt+F12");
        assert_eq!(config.hotkeys.len(), 5);

        let primary = config.role_config(WindowRole::Primary);
        assert_eq!(primary.width, 800.0);
        assert_eq!(primary.embedding_mode, EmbeddingMode::Direct);
        assert_eq!(
            config.role_config(WindowRole::Utility),
            RoleConfig::defaults_for(WindowRole::Utility)
        );
    }
}
