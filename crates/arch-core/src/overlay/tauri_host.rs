use tauri::{
    AppHandle, Manager, Url, WebviewUrl, WebviewWindow, WebviewWindowBuilder,
    webview::PageLoadEvent, window::Color,
};
use tracing::debug;

use crate::{
    Error, control,
    gateway::framed_url,
    overlay::{
        ContentSource, EmbeddingMode, FRAME_PAGE, RoleConfig, WindowHost, WindowRole,
        configure_overlay, set_window_alpha,
    },
    settings::Background,
};

/// Origin the bundled UI is served from.
#[cfg(windows)]
const APP_ORIGIN: &str = "http://tauri.localhost/";
#[cfg(not(windows))]
const APP_ORIGIN: &str = "tauri://localhost/";

const BACKGROUND_STYLE_ID: &str = "arch-background";

/// [`WindowHost`] backed by Tauri webview windows.
#[derive(Clone)]
pub struct TauriHost {
    app: AppHandle,
}

impl TauriHost {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }

    fn initial_url(config: &RoleConfig, content: &ContentSource) -> Result<WebviewUrl, Error> {
        match (config.embedding_mode, content) {
            (_, ContentSource::Bundled(page)) => Ok(WebviewUrl::App(page.into())),
            (EmbeddingMode::Direct, ContentSource::Remote(target)) => {
                Ok(WebviewUrl::External(parse_url(target.as_str())?))
            }
            (EmbeddingMode::Framed, ContentSource::Remote(_)) => {
                Ok(WebviewUrl::App(FRAME_PAGE.into()))
            }
        }
    }
}

fn parse_url(raw: &str) -> Result<Url, Error> {
    raw.parse()
        .map_err(|e| Error::WindowOperation(format!("Invalid URL {}: {}", raw, e)))
}

impl WindowHost for TauriHost {
    type Handle = WebviewWindow;

    fn create(
        &self,
        role: WindowRole,
        config: &RoleConfig,
        content: &ContentSource,
    ) -> Result<WebviewWindow, Error> {
        let url = Self::initial_url(config, content)?;
        let mode = config.embedding_mode;

        let mut builder = WebviewWindowBuilder::new(&self.app, role.label(), url)
            .title(role.title())
            .inner_size(config.width, config.height)
            .decorations(false)
            .transparent(config.transparent)
            .background_color(Color(0, 0, 0, 0))
            .always_on_top(config.always_on_top)
            .resizable(config.resizable)
            .skip_taskbar(true)
            // Shown by the orchestrator once content is ready
            .visible(false)
            .on_page_load(move |window, payload| {
                if payload.event() != PageLoadEvent::Finished {
                    return;
                }
                control::dispatch(window.app_handle(), move |orchestrator| {
                    // Linux keeps alpha on the document, so each new one needs it again
                    orchestrator.restore_opacity(role)?;
                    // Framed windows report readiness themselves once the frame loaded
                    if mode == EmbeddingMode::Direct {
                        orchestrator.content_ready(role)?;
                    }
                    Ok(())
                });
            });

        builder = match (config.x, config.y) {
            (Some(x), Some(y)) => builder.position(x, y),
            _ => builder.center(),
        };

        if let (EmbeddingMode::Framed, ContentSource::Remote(target)) = (mode, content) {
            let src = serde_json::to_string(&framed_url(target))?;
            builder = builder.initialization_script(&format!("window.__ARCH_FRAME_SRC__ = {};", src));
        }

        let window = builder
            .build()
            .map_err(|e| Error::WindowCreation(format!("{}: {}", role.label(), e)))?;

        configure_overlay(&window)?;
        Ok(window)
    }

    fn show(&self, handle: &WebviewWindow) -> Result<(), Error> {
        handle.show()?;
        Ok(())
    }

    fn focus(&self, handle: &WebviewWindow) -> Result<(), Error> {
        handle.set_focus()?;
        Ok(())
    }

    fn set_opacity(&self, handle: &WebviewWindow, opacity: f64) -> Result<(), Error> {
        set_window_alpha(handle, opacity)
    }

    fn set_ignore_cursor_events(&self, handle: &WebviewWindow, ignore: bool) -> Result<(), Error> {
        handle.set_ignore_cursor_events(ignore)?;
        Ok(())
    }

    fn navigate(
        &self,
        handle: &WebviewWindow,
        config: &RoleConfig,
        content: &ContentSource,
    ) -> Result<(), Error> {
        match (config.embedding_mode, content) {
            (_, ContentSource::Bundled(page)) => {
                let url = parse_url(APP_ORIGIN)?
                    .join(page)
                    .map_err(|e| Error::WindowOperation(format!("Invalid page {}: {}", page, e)))?;
                handle.navigate(url)?;
            }
            (EmbeddingMode::Direct, ContentSource::Remote(target)) => {
                handle.navigate(parse_url(target.as_str())?)?;
            }
            (EmbeddingMode::Framed, ContentSource::Remote(target)) => {
                let src = serde_json::to_string(&framed_url(target))?;
                handle.eval(&format!(
                    "window.archFrame ? window.archFrame.load({0}) : (window.__ARCH_FRAME_SRC__ = {0});",
                    src
                ))?;
            }
        }
        debug!(label = handle.label(), target = content.describe(), "content pushed");
        Ok(())
    }

    fn apply_background(
        &self,
        handle: &WebviewWindow,
        background: Option<&Background>,
    ) -> Result<(), Error> {
        let script = match background {
            Some(background) => {
                let css = serde_json::to_string(&background.css())?;
                format!(
                    "(function () {{
                        var el = document.getElementById('{id}');
                        if (!el) {{
                            el = document.createElement('style');
                            el.id = '{id}';
                            (document.head || document.documentElement).appendChild(el);
                        }}
                        el.textContent = {css};
                    }})();",
                    id = BACKGROUND_STYLE_ID,
                    css = css
                )
            }
            None => format!(
                "(function () {{ var el = document.getElementById('{}'); if (el) el.remove(); }})();",
                BACKGROUND_STYLE_ID
            ),
        };
        handle.eval(&script)?;
        Ok(())
    }

    fn detach_content(&self, handle: &WebviewWindow) -> Result<(), Error> {
        handle.navigate(parse_url("about:blank")?)?;
        Ok(())
    }

    fn destroy(&self, handle: WebviewWindow) -> Result<(), Error> {
        // destroy() skips CloseRequested, which we intercept
        handle.destroy()?;
        Ok(())
    }
}
