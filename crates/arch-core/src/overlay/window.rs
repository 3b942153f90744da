use serde::{Deserialize, Serialize};

use crate::resolver::NavigationTarget;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum WindowRole {
    Primary,
    Assistant,
    Utility,
}

impl WindowRole {
    pub const ALL: [WindowRole; 3] = [
        WindowRole::Primary,
        WindowRole::Assistant,
        WindowRole::Utility,
    ];

    /// Window label used by the host runtime.
    pub fn label(self) -> &'static str {
        match self {
            WindowRole::Primary => "primary",
            WindowRole::Assistant => "assistant",
            WindowRole::Utility => "utility",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.label() == label)
    }

    pub fn title(self) -> &'static str {
        match self {
            WindowRole::Primary => "Arch",
            WindowRole::Assistant => "Arch Assistant",
            WindowRole::Utility => "Arch Settings",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Lifecycle phase of a live window. Unborn and destroyed windows are simply
/// absent from the registry.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum WindowPhase {
    Created,
    ContentLoading,
    Ready,
    Hidden,
}

/// How a window hosts its remote content.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EmbeddingMode {
    /// The webview loads the target itself; readiness is the page-load event.
    Direct,
    /// A bundled shell page frames the target and reports readiness over IPC.
    Framed,
}

/// Declarative per-role window configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoleConfig {
    pub width: f64,
    pub height: f64,
    /// Centered when either coordinate is missing
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default = "default_true")]
    pub transparent: bool,
    #[serde(default = "default_true")]
    pub always_on_top: bool,
    #[serde(default = "default_true")]
    pub resizable: bool,
    pub embedding_mode: EmbeddingMode,
    #[serde(default)]
    pub exit_on_close: bool,
}

fn default_true() -> bool {
    true
}

impl RoleConfig {
    pub fn defaults_for(role: WindowRole) -> Self {
        match role {
            WindowRole::Primary => Self {
                width: 400.0,
                height: 400.0,
                x: Some(20.0),
                y: Some(20.0),
                transparent: true,
                always_on_top: true,
                resizable: true,
                embedding_mode: EmbeddingMode::Framed,
                exit_on_close: true,
            },
            WindowRole::Assistant => Self {
                width: 420.0,
                height: 640.0,
                x: None,
                y: None,
                transparent: true,
                always_on_top: true,
                resizable: true,
                embedding_mode: EmbeddingMode::Direct,
                exit_on_close: false,
            },
            WindowRole::Utility => Self {
                width: 360.0,
                height: 260.0,
                x: None,
                y: None,
                transparent: true,
                always_on_top: true,
                resizable: false,
                embedding_mode: EmbeddingMode::Direct,
                exit_on_close: false,
            },
        }
    }
}

/// What a window is showing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum ContentSource {
    Remote(NavigationTarget),
    /// Page shipped with the application, by path relative to the UI root
    Bundled(String),
}

impl ContentSource {
    pub fn describe(&self) -> &str {
        match self {
            ContentSource::Remote(target) => target.as_str(),
            ContentSource::Bundled(page) => page,
        }
    }
}

pub const SETTINGS_PAGE: &str = "settings.html";
pub const FRAME_PAGE: &str = "frame.html";

/// Single-shot readiness signal for one load cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessLatch {
    cycle: u64,
    armed: bool,
}

impl Default for ReadinessLatch {
    fn default() -> Self {
        Self {
            cycle: 1,
            armed: true,
        }
    }
}

impl ReadinessLatch {
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn rearm(&mut self) -> u64 {
        self.cycle += 1;
        self.armed = true;
        self.cycle
    }

    /// True exactly once per cycle.
    pub fn consume(&mut self) -> bool {
        std::mem::replace(&mut self.armed, false)
    }
}

pub struct OverlayWindow<H> {
    pub role: WindowRole,
    pub phase: WindowPhase,
    pub current_opacity: f64,
    pub target_opacity: f64,
    pub content: ContentSource,
    pub config: RoleConfig,
    pub handle: H,
    pub(crate) readiness: ReadinessLatch,
    /// Set when a reveal arrived before the content was ready.
    pub(crate) focus_on_ready: bool,
}

impl<H> OverlayWindow<H> {
    pub fn visibility(&self) -> Visibility {
        match self.phase {
            WindowPhase::Ready => Visibility::Visible,
            WindowPhase::Created | WindowPhase::ContentLoading | WindowPhase::Hidden => {
                Visibility::Hidden
            }
        }
    }

    pub fn ignores_pointer(&self) -> bool {
        self.visibility() == Visibility::Hidden
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            role: self.role,
            phase: self.phase,
            visibility: self.visibility(),
            current_opacity: self.current_opacity,
            target_opacity: self.target_opacity,
            content: self.content.clone(),
            load_cycle: self.readiness.cycle(),
        }
    }
}

/// Serializable view of a window, returned to embedded content.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WindowSnapshot {
    pub role: WindowRole,
    pub phase: WindowPhase,
    pub visibility: Visibility,
    pub current_opacity: f64,
    pub target_opacity: f64,
    pub content: ContentSource,
    pub load_cycle: u64,
}
