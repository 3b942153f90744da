//! Response header rewriting for embedded content.
//!
//! Every response delivered to embedded content passes through the gateway,
//! which drops the headers a site uses to refuse being framed. Status and body
//! are never touched and a response is never cancelled.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use tauri::http::{HeaderMap, HeaderName, Response};
use tracing::{debug, info};
use url::Url;

use crate::resolver::NavigationTarget;

/// Headers removed from every intercepted response, compared case-insensitively.
pub const FRAMING_HEADERS: [&str; 2] = ["x-frame-options", "content-security-policy"];

/// Interception filter: every scheme, every host, every path.
pub const INTERCEPT_PATTERN: &str = "*://*/*";

/// URI scheme through which framed windows fetch their target.
pub const FRAME_PROTOCOL: &str = "archframe";

static GATEWAY: OnceLock<EmbeddingGateway> = OnceLock::new();

fn frame_origin() -> String {
    if cfg!(windows) {
        format!("http://{}.localhost", FRAME_PROTOCOL)
    } else {
        format!("{}://localhost", FRAME_PROTOCOL)
    }
}

/// Frame protocol address for `url`: `<origin>/<scheme>/<authority><path>?<query>`.
///
/// The upstream path is kept as a real path, so the browser resolves the
/// framed document's relative references just as it would upstream.
pub fn frame_address(url: &Url) -> String {
    let mut framed = format!(
        "{}/{}/{}",
        frame_origin(),
        url.scheme(),
        url.host_str().unwrap_or_default()
    );
    if let Some(port) = url.port() {
        framed.push_str(&format!(":{}", port));
    }
    framed.push_str(url.path());
    if let Some(query) = url.query() {
        framed.push('?');
        framed.push_str(query);
    }
    framed
}

/// Address a framed window loads in place of `target`, so the response
/// passes through the gateway before reaching the frame.
pub fn framed_url(target: &NavigationTarget) -> String {
    match target.to_url() {
        Some(url) => frame_address(&url),
        None => format!("{}/", frame_origin()),
    }
}

/// The upstream URL a frame protocol address stands for.
///
/// `None` when the path does not start with an http(s) scheme and a host,
/// as for root-relative references made by a framed page.
pub fn unframe(address: &str) -> Option<Url> {
    let parsed = Url::parse(address).ok()?;
    let path = parsed.path().strip_prefix('/')?;
    let mut parts = path.splitn(3, '/');
    let scheme = parts.next().filter(|s| matches!(*s, "http" | "https"))?;
    let authority = parts.next().filter(|a| !a.is_empty())?;
    let rest = parts.next().unwrap_or_default();

    let mut upstream = format!("{}://{}/{}", scheme, authority, rest);
    if let Some(query) = parsed.query() {
        upstream.push('?');
        upstream.push_str(query);
    }
    let url = Url::parse(&upstream).ok()?;
    url.host_str().is_some().then_some(url)
}

pub fn is_framing_header(name: &str) -> bool {
    FRAMING_HEADERS
        .iter()
        .any(|header| name.eq_ignore_ascii_case(header))
}

/// Whether a request URL falls under [`INTERCEPT_PATTERN`].
pub fn intercepts(url: &str) -> bool {
    Url::parse(url)
        .map(|parsed| parsed.host_str().is_some_and(|host| !host.is_empty()))
        .unwrap_or(false)
}

/// Removes all framing headers and returns how many values were dropped.
pub fn strip_framing_headers(headers: &mut HeaderMap) -> usize {
    let names: Vec<HeaderName> = headers
        .keys()
        .filter(|name| is_framing_header(name.as_str()))
        .cloned()
        .collect();

    names
        .into_iter()
        .map(|name| {
            let count = headers.get_all(&name).iter().count();
            headers.remove(&name);
            count
        })
        .sum()
}

/// What the interception point does with the response after the gateway ran.
#[derive(Debug)]
pub struct GatewayVerdict {
    pub cancel: bool,
    pub headers: HeaderMap,
}

#[derive(Debug, Default)]
pub struct EmbeddingGateway {
    stripped: AtomicU64,
}

impl EmbeddingGateway {
    /// Installs the process-wide gateway. Later calls return the same instance.
    pub fn install() -> &'static EmbeddingGateway {
        let mut first = false;
        let gateway = GATEWAY.get_or_init(|| {
            first = true;
            EmbeddingGateway::default()
        });
        if first {
            info!(pattern = INTERCEPT_PATTERN, "content embedding gateway installed");
        } else {
            debug!("content embedding gateway already installed");
        }
        gateway
    }

    pub fn installed() -> Option<&'static EmbeddingGateway> {
        GATEWAY.get()
    }

    /// Header callback for one response. Mutates and allows, never cancels.
    pub fn on_headers_received(&self, url: &str, mut headers: HeaderMap) -> GatewayVerdict {
        if intercepts(url) {
            let removed = strip_framing_headers(&mut headers);
            if removed > 0 {
                self.stripped.fetch_add(removed as u64, Ordering::Relaxed);
                debug!(url, removed, "stripped framing headers");
            }
        }
        GatewayVerdict {
            cancel: false,
            headers,
        }
    }

    pub fn rewrite<B>(&self, url: &str, response: Response<B>) -> Response<B> {
        let (mut parts, body) = response.into_parts();
        let headers = std::mem::take(&mut parts.headers);
        parts.headers = self.on_headers_received(url, headers).headers;
        Response::from_parts(parts, body)
    }

    /// Total number of header values removed since install.
    pub fn stripped_count(&self) -> u64 {
        self.stripped.load(Ordering::Relaxed)
    }
}
