use crate::{
    Error,
    overlay::{ContentSource, RoleConfig, WindowRole},
    settings::Background,
};

/// The windowing system and embedded renderer, as seen by the orchestrator.
///
/// Windows are created invisible and fully transparent; the orchestrator
/// decides when they are shown and at which opacity.
pub trait WindowHost {
    type Handle;

    fn create(
        &self,
        role: WindowRole,
        config: &RoleConfig,
        content: &ContentSource,
    ) -> Result<Self::Handle, Error>;

    fn show(&self, handle: &Self::Handle) -> Result<(), Error>;

    fn focus(&self, handle: &Self::Handle) -> Result<(), Error>;

    fn set_opacity(&self, handle: &Self::Handle, opacity: f64) -> Result<(), Error>;

    fn set_ignore_cursor_events(&self, handle: &Self::Handle, ignore: bool) -> Result<(), Error>;

    /// Pushes new content into an existing window without recreating it.
    fn navigate(
        &self,
        handle: &Self::Handle,
        config: &RoleConfig,
        content: &ContentSource,
    ) -> Result<(), Error>;

    /// Applies (or with `None`, removes) the custom background.
    fn apply_background(
        &self,
        handle: &Self::Handle,
        background: Option<&Background>,
    ) -> Result<(), Error>;

    /// Releases the embedded browsing context ahead of window teardown.
    fn detach_content(&self, handle: &Self::Handle) -> Result<(), Error>;

    fn destroy(&self, handle: Self::Handle) -> Result<(), Error>;
}
