//! Turns launch arguments, `arch://` links and free text into navigable targets.
//!
//! Resolution never fails: anything that cannot be read as an address is sent
//! to the search engine, and blank input falls back to the last target that
//! was resolved (or the configured default).

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// The custom URI scheme registered with the OS
pub const SCHEME: &str = "arch";
pub const SCHEME_PREFIX: &str = "arch://";

pub const DEFAULT_TARGET: &str = "https://www.google.com";
pub const DEFAULT_SEARCH_URL: &str = "https://www.google.com/search?q=";

/// An absolute, `https://`-qualified URL that is safe to hand to embedded content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavigationTarget(String);

impl NavigationTarget {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_url(&self) -> Option<Url> {
        Url::parse(&self.0).ok()
    }

    /// Only https addresses with a usable host are accepted.
    fn from_https(candidate: String) -> Option<Self> {
        let parsed = Url::parse(&candidate).ok()?;
        if parsed.scheme() != "https" {
            return None;
        }
        let host = parsed.host_str()?;
        if !host.chars().any(|c| c.is_alphanumeric()) {
            return None;
        }
        Some(Self(candidate))
    }
}

impl fmt::Display for NavigationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stateful resolver; remembers the last target it produced.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    default_target: NavigationTarget,
    search_url: String,
    last_known: Option<NavigationTarget>,
}

impl Default for UrlResolver {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET, DEFAULT_SEARCH_URL)
    }
}

impl UrlResolver {
    /// Invalid configuration values fall back to the built-in defaults.
    pub fn new(default_target: &str, search_url: &str) -> Self {
        let default_target = NavigationTarget::from_https(default_target.trim().to_string())
            .unwrap_or_else(|| {
                debug!(default_target, "configured default target rejected");
                NavigationTarget(DEFAULT_TARGET.to_string())
            });

        let search_url = if search_url.starts_with("https://") && Url::parse(search_url).is_ok() {
            search_url.to_string()
        } else {
            debug!(search_url, "configured search url rejected");
            DEFAULT_SEARCH_URL.to_string()
        };

        Self {
            default_target,
            search_url,
            last_known: None,
        }
    }

    pub fn default_target(&self) -> &NavigationTarget {
        &self.default_target
    }

    pub fn last_known(&self) -> Option<&NavigationTarget> {
        self.last_known.as_ref()
    }

    /// Target used when there is nothing to resolve.
    pub fn fallback(&self) -> NavigationTarget {
        self.last_known
            .clone()
            .unwrap_or_else(|| self.default_target.clone())
    }

    pub fn resolve(&mut self, raw: Option<&str>) -> NavigationTarget {
        let Some(text) = raw.map(strip_scheme).map(str::trim).filter(|t| !t.is_empty()) else {
            return self.fallback();
        };

        let resolved = if looks_like_address(text) {
            coerce_https(text).or_else(|| self.search(text))
        } else {
            self.search(text)
        };

        match resolved {
            Some(target) => {
                debug!(input = text, target = %target, "resolved navigation target");
                self.last_known = Some(target.clone());
                target
            }
            None => self.fallback(),
        }
    }

    fn search(&self, text: &str) -> Option<NavigationTarget> {
        // Links opened from a browser arrive percent-encoded already
        let term = urlencoding::decode(text)
            .map(|t| t.into_owned())
            .unwrap_or_else(|_| text.to_string());
        let term = term.trim();
        if term.is_empty() {
            return None;
        }
        NavigationTarget::from_https(format!(
            "{}{}",
            self.search_url,
            urlencoding::encode(term)
        ))
    }
}

/// First launch argument that carries the custom scheme, if any.
pub fn extract_scheme_argument<S: AsRef<str>>(args: &[S]) -> Option<&str> {
    args.iter()
        .map(AsRef::as_ref)
        .find(|arg| has_prefix_ignore_case(arg, SCHEME_PREFIX))
}

fn strip_scheme(raw: &str) -> &str {
    let mut text = raw.trim();
    loop {
        if has_prefix_ignore_case(text, SCHEME_PREFIX) {
            text = &text[SCHEME_PREFIX.len()..];
        } else if has_prefix_ignore_case(text, "arch:") {
            text = &text["arch:".len()..];
        } else {
            return text;
        }
    }
}

fn looks_like_address(text: &str) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    has_prefix_ignore_case(text, "https://")
        || has_prefix_ignore_case(text, "http://")
        || text.contains('.')
}

fn coerce_https(text: &str) -> Option<NavigationTarget> {
    let mut rest = text;
    loop {
        if has_prefix_ignore_case(rest, "https://") {
            rest = &rest["https://".len()..];
        } else if has_prefix_ignore_case(rest, "http://") {
            rest = &rest["http://".len()..];
        } else {
            break;
        }
    }
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        return None;
    }
    NavigationTarget::from_https(format!("https://{}", rest))
}

fn has_prefix_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.is_char_boundary(prefix.len())
        && text[..prefix.len()].eq_ignore_ascii_case(prefix)
}
