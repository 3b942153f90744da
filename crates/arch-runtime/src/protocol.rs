//! Custom protocol through which framed windows fetch remote content.
//!
//! The frame page loads `archframe://localhost/<scheme>/<host>/<path>`. The
//! request is fetched upstream and the response passes through the embedding
//! gateway before it reaches the frame. Redirects are handed back to the
//! frame rewritten into the same form.
//!
//! Relative references resolve inside that address on their own. Root-relative
//! ones lose the upstream scheme and host; they are resolved against the page
//! named in the Referer, or failing that against the last page fetched.

use std::sync::Mutex;
use std::time::Duration;

use arch_core::{EmbeddingGateway, frame_address, unframe};
use tauri::{
    Url,
    http::{Method, Request, Response, StatusCode, header},
};
use tracing::{debug, warn};

pub use arch_core::FRAME_PROTOCOL;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Request headers forwarded upstream.
const FORWARDED_REQUEST_HEADERS: [&str; 5] = [
    "accept",
    "accept-language",
    "content-type",
    "range",
    "user-agent",
];

/// Response headers that describe the upstream transfer, not the body we return.
const HOP_HEADERS: [&str; 4] = [
    "connection",
    "content-encoding",
    "content-length",
    "transfer-encoding",
];

pub struct FrameProxy {
    agent: ureq::Agent,
    last_page: Mutex<Option<Url>>,
}

impl Default for FrameProxy {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameProxy {
    pub fn new() -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(UPSTREAM_TIMEOUT))
            .http_status_as_error(false)
            // The frame follows redirects itself, so its address stays truthful
            .max_redirects(0)
            .build()
            .into();
        Self {
            agent,
            last_page: Mutex::new(None),
        }
    }

    /// Handles one request to the frame protocol.
    pub fn handle(&self, request: Request<Vec<u8>>) -> Response<Vec<u8>> {
        let uri = request.uri().to_string();
        let referer = request
            .headers()
            .get("referer")
            .and_then(|value| value.to_str().ok());

        let last = self.last_page.lock().ok().and_then(|guard| guard.clone());
        let Some(resolved) = upstream_url(&uri, referer, last.as_ref()) else {
            warn!(uri, "frame request without a resolvable target");
            return plain(StatusCode::BAD_REQUEST, "No target");
        };

        if resolved.explicit && is_page_load(&request) {
            if let Ok(mut guard) = self.last_page.lock() {
                *guard = Some(resolved.url.clone());
            }
        }

        debug!(upstream = resolved.url.as_str(), "proxying frame request");
        match self.fetch(&request, &resolved.url) {
            Ok(response) => gateway().rewrite(resolved.url.as_str(), response),
            Err(e) => {
                warn!(upstream = resolved.url.as_str(), error = %e, "upstream fetch failed");
                plain(StatusCode::BAD_GATEWAY, &format!("Failed to load {}: {}", resolved.url, e))
            }
        }
    }

    fn fetch(&self, request: &Request<Vec<u8>>, url: &Url) -> Result<Response<Vec<u8>>, String> {
        let mut upstream = ureq::http::Request::builder()
            .method(request.method().as_str())
            .uri(url.as_str());
        for name in FORWARDED_REQUEST_HEADERS {
            if let Some(value) = request.headers().get(name) {
                upstream = upstream.header(name, value.as_bytes());
            }
        }

        let body = if request.method() == Method::GET || request.method() == Method::HEAD {
            Vec::new()
        } else {
            request.body().clone()
        };
        let upstream = upstream.body(body).map_err(|e| e.to_string())?;

        let mut response = self.agent.run(upstream).map_err(|e| e.to_string())?;
        let bytes = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_vec()
            .map_err(|e| e.to_string())?;

        let mut builder = Response::builder().status(response.status().as_u16());
        for (name, value) in response.headers() {
            if HOP_HEADERS.contains(&name.as_str()) {
                continue;
            }
            if name.as_str() == header::LOCATION.as_str() {
                if let Some(framed) = value.to_str().ok().and_then(|l| framed_location(url, l)) {
                    builder = builder.header(name.as_str(), framed);
                    continue;
                }
            }
            builder = builder.header(name.as_str(), value.as_bytes());
        }
        Ok(builder
            .header("Access-Control-Allow-Origin", "*")
            .body(bytes)
            .unwrap_or_else(|_| plain(StatusCode::BAD_GATEWAY, "Malformed upstream response")))
    }
}

fn gateway() -> &'static EmbeddingGateway {
    EmbeddingGateway::installed().unwrap_or_else(EmbeddingGateway::install)
}

fn plain(status: StatusCode, message: &str) -> Response<Vec<u8>> {
    let mut response = Response::new(message.as_bytes().to_vec());
    *response.status_mut() = status;
    response
}

/// Whether the request loads a page into the frame rather than a sub-resource.
fn is_page_load(request: &Request<Vec<u8>>) -> bool {
    match header_value(request, "sec-fetch-dest") {
        "" => header_value(request, "accept").contains("text/html"),
        dest => matches!(dest, "document" | "iframe"),
    }
}

fn header_value<'a>(request: &'a Request<Vec<u8>>, name: &str) -> &'a str {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// Rewrites a redirect target so the frame keeps loading through the proxy.
pub fn framed_location(upstream: &Url, location: &str) -> Option<String> {
    let target = upstream.join(location).ok()?;
    matches!(target.scheme(), "http" | "https").then(|| frame_address(&target))
}

#[derive(Debug, PartialEq)]
pub struct Upstream {
    pub url: Url,
    /// Whether the request address carried its upstream scheme and host
    pub explicit: bool,
}

/// Works out which upstream URL a frame protocol request stands for.
pub fn upstream_url(uri: &str, referer: Option<&str>, last_page: Option<&Url>) -> Option<Upstream> {
    if let Some(url) = unframe(uri) {
        return Some(Upstream { url, explicit: true });
    }

    let request = Url::parse(uri).ok()?;
    let base = referer.and_then(unframe).or_else(|| last_page.cloned())?;

    let mut relative = request.path().to_string();
    if let Some(query) = request.query() {
        relative.push('?');
        relative.push_str(query);
    }
    let url = base.join(&relative).ok()?;
    Some(Upstream { url, explicit: false })
}
