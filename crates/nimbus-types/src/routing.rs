//! URL classification for the offline cache worker.
//!
//! Every intercepted request is classified by URL pattern alone, in a fixed
//! priority order: API before image before everything else. The classifier
//! lives here (rather than in the worker crate) so the same routing can run
//! inside a browser service worker through the WASM bindings.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default weather API host.
pub const DEFAULT_API_HOST: &str = "api.tomorrow.io";

/// File extensions treated as images.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "svg", "webp"];

/// Request category; each maps to exactly one cache strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RequestKind {
    /// Weather API call (network-first).
    Api,
    /// Image asset (stale-while-revalidate).
    Image,
    /// Anything else (cache-first).
    Static,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestKind::Api => "api",
            RequestKind::Image => "image",
            RequestKind::Static => "static",
        };
        f.write_str(name)
    }
}

/// Classifies request URLs by host and path extension.
///
/// ```
/// use nimbus_types::{RequestKind, RouteClassifier};
///
/// let classifier = RouteClassifier::default();
/// assert_eq!(
///     classifier.classify("https://api.tomorrow.io/v4/weather/realtime?location=1,2"),
///     RequestKind::Api
/// );
/// assert_eq!(classifier.classify("./images/photo.JPG"), RequestKind::Image);
/// assert_eq!(classifier.classify("./index.html"), RequestKind::Static);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteClassifier {
    api_hosts: Vec<String>,
}

impl Default for RouteClassifier {
    fn default() -> Self {
        Self::new([DEFAULT_API_HOST])
    }
}

impl RouteClassifier {
    /// Create a classifier treating the given hosts (and their subdomains) as API hosts.
    pub fn new<I, S>(api_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            api_hosts: api_hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Configured API hosts.
    pub fn api_hosts(&self) -> &[String] {
        &self.api_hosts
    }

    /// Classify a URL.
    pub fn classify(&self, url: &str) -> RequestKind {
        if self.is_api(url) {
            RequestKind::Api
        } else if is_image(url) {
            RequestKind::Image
        } else {
            RequestKind::Static
        }
    }

    fn is_api(&self, url: &str) -> bool {
        let Some(host) = host_of(url) else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.api_hosts.iter().any(|api| {
            host == *api
                || host
                    .strip_suffix(api.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

/// Whether the URL path ends with a known image extension.
///
/// The query string and fragment are ignored.
pub fn is_image(url: &str) -> bool {
    let path = path_of(url);
    let Some((_, ext)) = path.rsplit_once('.') else {
        return false;
    };
    if ext.contains('/') {
        return false;
    }
    IMAGE_EXTENSIONS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(ext))
}

/// Host part of an absolute URL, without userinfo or port.
pub fn host_of(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let authority = authority.rsplit('@').next()?;
    let host = if authority.starts_with('[') {
        authority.split(']').next().map(|h| h.trim_start_matches('['))?
    } else {
        authority.split(':').next()?
    };
    (!host.is_empty()).then_some(host)
}

/// Path part of a URL (absolute or relative), without query or fragment.
pub fn path_of(url: &str) -> &str {
    let without_query = url.split(['?', '#']).next().unwrap_or("");
    match without_query.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |idx| &rest[idx..]),
        None => without_query,
    }
}
