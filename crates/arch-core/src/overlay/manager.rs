use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::{
    Error,
    config::ShellConfig,
    opacity::{Animator, Fade, FadeSpec, FadeTicket, GlobalOpacity, TickOutcome},
    overlay::{
        ContentSource, OverlayWindow, ReadinessLatch, RoleConfig, SETTINGS_PAGE, WindowHost,
        WindowPhase, WindowRole, WindowSnapshot,
    },
    resolver::{NavigationTarget, UrlResolver},
    settings::{AppSettings, SettingsStore},
};

/// Owns every live overlay window and all state shared between them.
///
/// Each action runs to completion on the control thread. Fades are returned
/// as [`FadeTicket`]s through [`Orchestrator::take_fade_tickets`]; whoever
/// drives the event loop is responsible for ticking them.
pub struct Orchestrator<H: WindowHost> {
    host: H,
    windows: HashMap<WindowRole, OverlayWindow<H::Handle>>,
    config: ShellConfig,
    resolver: UrlResolver,
    assistant_target: NavigationTarget,
    opacity: GlobalOpacity,
    fade: FadeSpec,
    animator: Animator,
    settings: SettingsStore,
    pending_fades: Vec<FadeTicket>,
    hidden: bool,
    exit_requested: bool,
}

impl<H: WindowHost> Orchestrator<H> {
    pub fn new(host: H, config: ShellConfig, settings: SettingsStore) -> Self {
        let resolver = UrlResolver::new(&config.default_target, &config.search_url);
        // Resolved on a copy so it never becomes the last-known target
        let assistant_target = resolver.clone().resolve(Some(&config.assistant_target));

        Self {
            host,
            windows: HashMap::new(),
            opacity: config.opacity(),
            fade: config.fade(),
            config,
            resolver,
            assistant_target,
            animator: Animator::new(),
            settings,
            pending_fades: Vec::new(),
            hidden: false,
            exit_requested: false,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn resolve(&mut self, raw: Option<&str>) -> NavigationTarget {
        self.resolver.resolve(raw)
    }

    pub fn opacity_level(&self) -> f64 {
        self.opacity.level()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn has_window(&self, role: WindowRole) -> bool {
        self.windows.contains_key(&role)
    }

    pub fn window(&self, role: WindowRole) -> Option<&OverlayWindow<H::Handle>> {
        self.windows.get(&role)
    }

    pub fn live_roles(&self) -> Vec<WindowRole> {
        WindowRole::ALL
            .into_iter()
            .filter(|role| self.windows.contains_key(role))
            .collect()
    }

    pub fn window_state(&self, role: WindowRole) -> Option<WindowSnapshot> {
        self.windows.get(&role).map(OverlayWindow::snapshot)
    }

    pub fn snapshots(&self) -> Vec<WindowSnapshot> {
        self.live_roles()
            .into_iter()
            .filter_map(|role| self.window_state(role))
            .collect()
    }

    pub fn settings(&self) -> AppSettings {
        self.settings.load()
    }

    /// Fades started since the last call.
    pub fn take_fade_tickets(&mut self) -> Vec<FadeTicket> {
        std::mem::take(&mut self.pending_fades)
    }

    /// Set when a window whose role ends the process was closed.
    pub fn take_exit_request(&mut self) -> bool {
        std::mem::take(&mut self.exit_requested)
    }

    // Lifecycle

    /// Creates the primary window, or navigates it if one is already live.
    pub fn create_primary(&mut self, target: NavigationTarget) -> Result<(), Error> {
        if self.windows.contains_key(&WindowRole::Primary) {
            debug!("primary window already live, navigating instead");
            return self.navigate(WindowRole::Primary, target);
        }
        self.create_window(WindowRole::Primary, ContentSource::Remote(target))
    }

    pub fn create_assistant(&mut self) -> Result<(), Error> {
        let content = ContentSource::Remote(self.assistant_target.clone());
        self.create_or_focus(WindowRole::Assistant, content)
    }

    pub fn create_utility(&mut self) -> Result<(), Error> {
        self.create_or_focus(
            WindowRole::Utility,
            ContentSource::Bundled(SETTINGS_PAGE.to_string()),
        )
    }

    fn create_or_focus(&mut self, role: WindowRole, content: ContentSource) -> Result<(), Error> {
        if self.windows.contains_key(&role) {
            debug!(role = role.label(), "window already live, focusing");
            return self.reveal(role);
        }
        self.create_window(role, content)
    }

    fn create_window(&mut self, role: WindowRole, content: ContentSource) -> Result<(), Error> {
        let config = self.config.role_config(role);
        let handle = self.host.create(role, &config, &content)?;
        if let Err(e) = self.host.set_opacity(&handle, 0.0) {
            // Never leave a native window behind that the registry doesn't know about
            if let Err(destroy) = self.host.destroy(handle) {
                warn!(role = role.label(), error = %destroy, "failed to destroy unusable window");
            }
            return Err(e);
        }

        info!(role = role.label(), content = content.describe(), "window created");

        // The host starts loading the initial content as part of creation
        self.windows.insert(
            role,
            OverlayWindow {
                role,
                phase: WindowPhase::ContentLoading,
                current_opacity: 0.0,
                target_opacity: self.opacity.level(),
                content,
                config,
                handle,
                readiness: ReadinessLatch::default(),
                focus_on_ready: false,
            },
        );
        Ok(())
    }

    /// Tears down the window for `role`. Detaches its content first.
    pub fn close_role(&mut self, role: WindowRole) -> Result<(), Error> {
        let Some(window) = self.windows.remove(&role) else {
            debug!(role = role.label(), "close requested for absent window");
            return Ok(());
        };

        self.animator.cancel(role);
        if let Err(e) = self.host.detach_content(&window.handle) {
            warn!(role = role.label(), error = %e, "failed to detach content");
        }
        self.host.destroy(window.handle)?;

        info!(role = role.label(), "window destroyed");
        if window.config.exit_on_close {
            self.exit_requested = true;
        }
        Ok(())
    }

    /// Shows, un-hides and focuses the window for `role`.
    ///
    /// A window still loading its content is only marked; it is focused once
    /// readiness arrives, so nothing invisible ever takes focus.
    pub fn reveal(&mut self, role: WindowRole) -> Result<(), Error> {
        let window = self
            .windows
            .get_mut(&role)
            .ok_or_else(|| Error::WindowNotFound(role.label().to_string()))?;

        let phase = window.phase;
        match phase {
            WindowPhase::Created | WindowPhase::ContentLoading => {
                window.focus_on_ready = true;
                self.hidden = false;
                debug!(role = role.label(), "reveal deferred until content is ready");
                return Ok(());
            }
            WindowPhase::Hidden => {
                self.show_window(role)?;
                self.hidden = false;
            }
            WindowPhase::Ready => {}
        }

        if let Some(window) = self.windows.get(&role) {
            self.host.show(&window.handle)?;
            self.host.focus(&window.handle)?;
        }
        Ok(())
    }

    /// Hides every visible window, or shows every hidden one if none is visible.
    /// Returns whether the shell is hidden afterwards.
    pub fn toggle_hidden(&mut self) -> Result<bool, Error> {
        let visible: Vec<WindowRole> = self.roles_in(WindowPhase::Ready);

        if !visible.is_empty() {
            for role in visible {
                self.hide_window(role)?;
            }
            self.hidden = true;
        } else {
            for role in self.roles_in(WindowPhase::Hidden) {
                self.show_window(role)?;
            }
            self.hidden = false;
        }

        info!(hidden = self.hidden, "toggled visibility");
        Ok(self.hidden)
    }

    fn roles_in(&self, phase: WindowPhase) -> Vec<WindowRole> {
        WindowRole::ALL
            .into_iter()
            .filter(|role| self.windows.get(role).is_some_and(|w| w.phase == phase))
            .collect()
    }

    fn hide_window(&mut self, role: WindowRole) -> Result<(), Error> {
        self.animator.cancel(role);
        let window = self
            .windows
            .get_mut(&role)
            .ok_or_else(|| Error::WindowNotFound(role.label().to_string()))?;

        window.phase = WindowPhase::Hidden;
        window.current_opacity = 0.0;
        self.host.set_opacity(&window.handle, 0.0)?;
        self.host.set_ignore_cursor_events(&window.handle, true)?;
        Ok(())
    }

    fn show_window(&mut self, role: WindowRole) -> Result<(), Error> {
        let level = self.opacity.level();
        let window = self
            .windows
            .get_mut(&role)
            .ok_or_else(|| Error::WindowNotFound(role.label().to_string()))?;

        window.phase = WindowPhase::Ready;
        window.current_opacity = level;
        window.target_opacity = level;
        self.host.set_opacity(&window.handle, level)?;
        self.host.set_ignore_cursor_events(&window.handle, false)?;
        Ok(())
    }

    // Opacity

    /// Sets the global level and writes it to every visible window.
    pub fn apply_opacity(&mut self, level: f64) -> Result<f64, Error> {
        let level = self.opacity.set(level);
        self.broadcast_opacity()?;
        Ok(level)
    }

    pub fn increase_opacity(&mut self) -> Result<f64, Error> {
        self.opacity.increase();
        self.broadcast_opacity()?;
        Ok(self.opacity.level())
    }

    pub fn decrease_opacity(&mut self) -> Result<f64, Error> {
        self.opacity.decrease();
        self.broadcast_opacity()?;
        Ok(self.opacity.level())
    }

    fn broadcast_opacity(&mut self) -> Result<(), Error> {
        let level = self.opacity.level();
        for role in self.roles_in(WindowPhase::Ready) {
            // A direct set wins over any fade still in flight
            self.animator.cancel(role);
            if let Some(window) = self.windows.get_mut(&role) {
                window.current_opacity = level;
                window.target_opacity = level;
                self.host.set_opacity(&window.handle, level)?;
            }
        }
        debug!(level, "opacity broadcast");
        Ok(())
    }

    /// Starts a fade from 0 to `target` and marks the window visible.
    pub fn fade_to(&mut self, role: WindowRole, target: f64) -> Result<FadeTicket, Error> {
        let window = self
            .windows
            .get_mut(&role)
            .ok_or_else(|| Error::WindowNotFound(role.label().to_string()))?;

        window.phase = WindowPhase::Ready;
        window.current_opacity = 0.0;
        window.target_opacity = target;
        self.host.set_opacity(&window.handle, 0.0)?;
        self.host.set_ignore_cursor_events(&window.handle, false)?;
        self.host.show(&window.handle)?;

        let ticket = self
            .animator
            .start(role, Fade::new(0.0, target, self.fade.step), self.fade);
        self.pending_fades.push(ticket);
        Ok(ticket)
    }

    /// Advances the fade identified by `ticket` by one step.
    pub fn tick_fade(&mut self, ticket: &FadeTicket) -> TickOutcome {
        let Some(window) = self.windows.get_mut(&ticket.role) else {
            self.animator.cancel(ticket.role);
            return TickOutcome::Stale;
        };

        let outcome = self.animator.tick(ticket);
        if let TickOutcome::Continue(value) | TickOutcome::Finished(value) = outcome {
            window.current_opacity = value;
            if let Err(e) = self.host.set_opacity(&window.handle, value) {
                warn!(role = ticket.role.label(), error = %e, "failed to apply fade step");
            }
        }
        outcome
    }

    pub fn fade_in_flight(&self, role: WindowRole) -> bool {
        self.animator.in_flight(role)
    }

    // Readiness and navigation

    /// Consumes the readiness signal for the current load cycle of `role`.
    /// Returns false when the signal was stale or the window is gone.
    pub fn content_ready(&mut self, role: WindowRole) -> Result<bool, Error> {
        let Some(window) = self.windows.get_mut(&role) else {
            debug!(role = role.label(), "readiness for absent window ignored");
            return Ok(false);
        };
        if !window.readiness.consume() {
            debug!(
                role = role.label(),
                cycle = window.readiness.cycle(),
                "readiness already consumed for this load cycle"
            );
            return Ok(false);
        }
        let phase = window.phase;
        let focus = std::mem::take(&mut window.focus_on_ready);

        if role == WindowRole::Primary {
            // A broken background falls back to the default look
            if let Err(e) = self.apply_background(role) {
                warn!(role = role.label(), error = %e, "failed to apply custom background");
            }
        }

        match phase {
            WindowPhase::Created | WindowPhase::ContentLoading => {
                if self.hidden {
                    // Shell is hidden; surface the window hidden too
                    if let Some(window) = self.windows.get(&role) {
                        self.host.show(&window.handle)?;
                    }
                    self.hide_window(role)?;
                } else {
                    let level = self.opacity.level();
                    self.fade_to(role, level)?;
                    if focus {
                        if let Some(window) = self.windows.get(&role) {
                            self.host.focus(&window.handle)?;
                        }
                    }
                }
                info!(role = role.label(), "window ready");
            }
            // Re-navigation of a window that is already on screen keeps its state
            WindowPhase::Ready | WindowPhase::Hidden => {
                self.restore_opacity(role)?;
                debug!(role = role.label(), "content reloaded");
            }
        }
        Ok(true)
    }

    /// Writes the recorded opacity back to the window.
    ///
    /// Where alpha lives in the document rather than the native window, every
    /// new document starts fully opaque; this is called on each finished load.
    pub fn restore_opacity(&mut self, role: WindowRole) -> Result<(), Error> {
        let Some(window) = self.windows.get(&role) else {
            return Ok(());
        };
        // A running fade writes its own next step
        if self.animator.in_flight(role) {
            return Ok(());
        }
        self.host.set_opacity(&window.handle, window.current_opacity)
    }

    /// Delivers `target` to the window for `role`, creating it if needed.
    pub fn navigate(&mut self, role: WindowRole, target: NavigationTarget) -> Result<(), Error> {
        let content = ContentSource::Remote(target);
        let Some(window) = self.windows.get_mut(&role) else {
            return self.create_window(role, content);
        };

        if window.content == content && window.readiness.is_armed() {
            debug!(role = role.label(), target = content.describe(), "target already loading");
            return Ok(());
        }

        self.host.navigate(&window.handle, &window.config, &content)?;
        info!(role = role.label(), target = content.describe(), "navigated");

        window.content = content;
        window.readiness.rearm();
        if window.phase == WindowPhase::Created {
            window.phase = WindowPhase::ContentLoading;
        }
        Ok(())
    }

    // Background customization

    fn apply_background(&self, role: WindowRole) -> Result<(), Error> {
        let Some(window) = self.windows.get(&role) else {
            return Ok(());
        };
        match self.settings.load_background() {
            Some(background) => self.host.apply_background(&window.handle, Some(&background)),
            None => Ok(()),
        }
    }

    /// Persists `source` as the background and applies it to the primary window.
    pub fn set_custom_background(&mut self, source: &Path) -> Result<(), Error> {
        self.settings.store_background(source)?;
        info!(source = %source.display(), "custom background stored");
        self.apply_background(WindowRole::Primary)
    }

    pub fn clear_custom_background(&mut self) -> Result<(), Error> {
        self.settings.clear_background()?;
        if let Some(window) = self.windows.get(&WindowRole::Primary) {
            self.host.apply_background(&window.handle, None)?;
        }
        info!("custom background cleared");
        Ok(())
    }

    pub fn role_config(&self, role: WindowRole) -> RoleConfig {
        self.config.role_config(role)
    }
}
