//! Launch requests, from this process's own arguments or forwarded by a
//! second instance.

use tracing::info;

use crate::{
    Error,
    overlay::{Orchestrator, WindowHost, WindowRole},
    resolver::{NavigationTarget, extract_scheme_argument},
};

/// Target for the first window: the first scheme argument, or the default.
pub fn launch_target<H, S>(orchestrator: &mut Orchestrator<H>, args: &[S]) -> NavigationTarget
where
    H: WindowHost,
    S: AsRef<str>,
{
    let raw = extract_scheme_argument(args);
    orchestrator.resolve(raw)
}

/// Handles a launch forwarded by another instance.
///
/// A scheme argument navigates the primary window. Either way the primary
/// window ends up shown and un-hidden, and is recreated if it was closed.
pub fn handle_second_launch<H, S>(orchestrator: &mut Orchestrator<H>, args: &[S]) -> Result<(), Error>
where
    H: WindowHost,
    S: AsRef<str>,
{
    match extract_scheme_argument(args) {
        Some(raw) => {
            let target = orchestrator.resolve(Some(raw));
            info!(target = target.as_str(), "second launch with target");
            orchestrator.navigate(WindowRole::Primary, target)?;
        }
        None if !orchestrator.has_window(WindowRole::Primary) => {
            info!("second launch, recreating primary window");
            let target = orchestrator.resolve(None);
            orchestrator.create_primary(target)?;
        }
        None => info!("second launch without target"),
    }
    orchestrator.reveal(WindowRole::Primary)
}

/// Handles `arch://` URLs delivered by the OS to the running instance.
///
/// The same URL may also arrive as a forwarded launch; the orchestrator drops
/// a navigation to the target a window is already loading.
pub fn handle_open_urls<H, S>(orchestrator: &mut Orchestrator<H>, urls: &[S]) -> Result<(), Error>
where
    H: WindowHost,
    S: AsRef<str>,
{
    if extract_scheme_argument(urls).is_none() {
        return Ok(());
    }
    handle_second_launch(orchestrator, urls)
}

#[cfg(test)]
mod tests {
    use crate::{
        config::ShellConfig,
        hotkeys::{self, HotkeyAction},
        opacity::TickOutcome,
        overlay::{WindowPhase, mock::{HostCall, MockHost}},
        settings::SettingsStore,
    };

    use super::*;

    fn orchestrator() -> (Orchestrator<MockHost>, MockHost, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let host = MockHost::default();
        let orchestrator = Orchestrator::new(
            host.clone(),
            ShellConfig::default(),
            SettingsStore::new(dir.path()),
        );
        (orchestrator, host, dir)
    }

    fn ready(orchestrator: &mut Orchestrator<MockHost>) {
        orchestrator.content_ready(WindowRole::Primary).unwrap();
        for ticket in orchestrator.take_fade_tickets() {
            while let TickOutcome::Continue(_) = orchestrator.tick_fade(&ticket) {}
        }
    }

    #[test]
    fn launch_target_prefers_scheme_argument() {
        let (mut first, _host, _dir) = orchestrator();
        let target = launch_target(&mut first, &["/usr/bin/arch", "arch://rust-lang.org"]);
        assert_eq!(target.as_str(), "https://rust-lang.org");

        let (mut second, _host, _dir) = orchestrator();
        let target = launch_target(&mut second, &["/usr/bin/arch", "--flag"]);
        assert_eq!(target.as_str(), "https://www.google.com");
    }

    #[test]
    fn second_launch_navigates_and_unhides_existing_primary() {
        let (mut orchestrator, host, _dir) = orchestrator();
        let target = launch_target::<_, &str>(&mut orchestrator, &[]);
        orchestrator.create_primary(target).unwrap();
        ready(&mut orchestrator);
        hotkeys::dispatch(&mut orchestrator, HotkeyAction::ToggleHidden).unwrap();
        assert!(orchestrator.is_hidden());

        handle_second_launch(&mut orchestrator, &["arch", "arch://foo.com"]).unwrap();

        assert_eq!(host.created(WindowRole::Primary), 1);
        assert!(
            host.calls()
                .contains(&HostCall::Navigate(1, "https://foo.com".to_string()))
        );
        let window = orchestrator.window(WindowRole::Primary).unwrap();
        assert_eq!(window.phase, WindowPhase::Ready);
        assert!(!orchestrator.is_hidden());
        assert_eq!(host.last_opacity(1), Some(0.5));
        assert_eq!(host.last_ignore_cursor(1), Some(false));
    }

    #[test]
    fn second_launch_without_target_only_reveals() {
        let (mut orchestrator, host, _dir) = orchestrator();
        let target = orchestrator.resolve(None);
        orchestrator.create_primary(target).unwrap();
        ready(&mut orchestrator);

        handle_second_launch(&mut orchestrator, &["arch"]).unwrap();

        assert_eq!(host.created(WindowRole::Primary), 1);
        assert!(
            !host
                .calls()
                .iter()
                .any(|call| matches!(call, HostCall::Navigate(..)))
        );
        assert!(host.calls().ends_with(&[HostCall::Show(1), HostCall::Focus(1)]));
    }

    #[test]
    fn second_launch_recreates_closed_primary() {
        let (mut orchestrator, host, _dir) = orchestrator();
        let target = orchestrator.resolve(None);
        orchestrator.create_primary(target).unwrap();
        orchestrator.close_role(WindowRole::Primary).unwrap();
        orchestrator.take_exit_request();

        handle_second_launch(&mut orchestrator, &["arch", "arch://news.ycombinator.com"]).unwrap();

        assert_eq!(host.created(WindowRole::Primary), 2);
        let window = orchestrator.window(WindowRole::Primary).unwrap();
        assert_eq!(window.content.describe(), "https://news.ycombinator.com");
    }

    #[test]
    fn launch_delivered_twice_navigates_once() {
        let (mut orchestrator, host, _dir) = orchestrator();
        let target = orchestrator.resolve(None);
        orchestrator.create_primary(target).unwrap();
        ready(&mut orchestrator);

        handle_second_launch(&mut orchestrator, &["arch", "arch://foo.com"]).unwrap();
        handle_open_urls(&mut orchestrator, &["arch://foo.com"]).unwrap();

        let navigations: Vec<HostCall> = host
            .calls()
            .into_iter()
            .filter(|call| matches!(call, HostCall::Navigate(..)))
            .collect();
        assert_eq!(
            navigations,
            vec![HostCall::Navigate(1, "https://foo.com".to_string())]
        );
        assert_eq!(orchestrator.window_state(WindowRole::Primary).unwrap().load_cycle, 2);
    }

    #[test]
    fn open_urls_without_scheme_are_ignored() {
        let (mut orchestrator, host, _dir) = orchestrator();
        handle_open_urls(&mut orchestrator, &["https://example.com"]).unwrap();
        assert!(host.calls().is_empty());
    }
}
