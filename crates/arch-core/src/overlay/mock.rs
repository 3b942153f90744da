use std::sync::{Arc, Mutex};

use crate::{
    Error,
    overlay::{ContentSource, RoleConfig, WindowHost, WindowRole},
    settings::Background,
};

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Create(WindowRole, u32),
    Show(u32),
    Focus(u32),
    Opacity(u32, f64),
    IgnoreCursor(u32, bool),
    Navigate(u32, String),
    Background(u32, bool),
    Detach(u32),
    Destroy(u32),
}

#[derive(Default)]
struct Recorder {
    calls: Vec<HostCall>,
    next_id: u32,
    fail_creation: bool,
    fail_background: bool,
    fail_opacity: bool,
}

/// Records every host call; handles are sequential ids starting at 1.
#[derive(Clone, Default)]
pub struct MockHost {
    inner: Arc<Mutex<Recorder>>,
}

impl MockHost {
    pub fn calls(&self) -> Vec<HostCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn fail_creation(&self, fail: bool) {
        self.inner.lock().unwrap().fail_creation = fail;
    }

    pub fn fail_background(&self, fail: bool) {
        self.inner.lock().unwrap().fail_background = fail;
    }

    pub fn fail_opacity(&self, fail: bool) {
        self.inner.lock().unwrap().fail_opacity = fail;
    }

    pub fn created(&self, role: WindowRole) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, HostCall::Create(r, _) if *r == role))
            .count()
    }

    pub fn last_opacity(&self, id: u32) -> Option<f64> {
        self.calls().iter().rev().find_map(|c| match c {
            HostCall::Opacity(handle, value) if *handle == id => Some(*value),
            _ => None,
        })
    }

    pub fn last_ignore_cursor(&self, id: u32) -> Option<bool> {
        self.calls().iter().rev().find_map(|c| match c {
            HostCall::IgnoreCursor(handle, ignore) if *handle == id => Some(*ignore),
            _ => None,
        })
    }

    fn record(&self, call: HostCall) {
        self.inner.lock().unwrap().calls.push(call);
    }
}

impl WindowHost for MockHost {
    type Handle = u32;

    fn create(
        &self,
        role: WindowRole,
        _config: &RoleConfig,
        _content: &ContentSource,
    ) -> Result<u32, Error> {
        let mut recorder = self.inner.lock().unwrap();
        if recorder.fail_creation {
            return Err(Error::WindowCreation(role.label().to_string()));
        }
        recorder.next_id += 1;
        let id = recorder.next_id;
        recorder.calls.push(HostCall::Create(role, id));
        Ok(id)
    }

    fn show(&self, handle: &u32) -> Result<(), Error> {
        self.record(HostCall::Show(*handle));
        Ok(())
    }

    fn focus(&self, handle: &u32) -> Result<(), Error> {
        self.record(HostCall::Focus(*handle));
        Ok(())
    }

    fn set_opacity(&self, handle: &u32, opacity: f64) -> Result<(), Error> {
        let mut recorder = self.inner.lock().unwrap();
        if recorder.fail_opacity {
            return Err(Error::WindowOperation("opacity".to_string()));
        }
        recorder.calls.push(HostCall::Opacity(*handle, opacity));
        Ok(())
    }

    fn set_ignore_cursor_events(&self, handle: &u32, ignore: bool) -> Result<(), Error> {
        self.record(HostCall::IgnoreCursor(*handle, ignore));
        Ok(())
    }

    fn navigate(
        &self,
        handle: &u32,
        _config: &RoleConfig,
        content: &ContentSource,
    ) -> Result<(), Error> {
        self.record(HostCall::Navigate(*handle, content.describe().to_string()));
        Ok(())
    }

    fn apply_background(&self, handle: &u32, background: Option<&Background>) -> Result<(), Error> {
        if self.inner.lock().unwrap().fail_background {
            return Err(Error::WindowOperation("background".to_string()));
        }
        self.record(HostCall::Background(*handle, background.is_some()));
        Ok(())
    }

    fn detach_content(&self, handle: &u32) -> Result<(), Error> {
        self.record(HostCall::Detach(*handle));
        Ok(())
    }

    fn destroy(&self, handle: u32) -> Result<(), Error> {
        self.record(HostCall::Destroy(handle));
        Ok(())
    }
}
