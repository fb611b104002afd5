//! Static asset manifest and URL resolution against the app origin.

use crate::error::{Error, Result};

/// Assets cached on install, relative to the app origin.
pub const DEFAULT_MANIFEST: [&str; 7] = [
    "./",
    "./index.html",
    "./css/style.css",
    "./js/app.js",
    "./manifest.json",
    "./images/icon-192.png",
    "./images/icon-512.png",
];

/// Path of the app shell served for offline navigations.
pub const APP_SHELL: &str = "./index.html";

/// Resolve `url` against `base`.
///
/// Absolute URLs are returned unchanged. Root-relative paths replace the
/// base path; other relative paths are joined to the base directory.
///
/// ```
/// use nimbus_worker::resolve_url;
///
/// let base = "http://localhost:8080/app/";
/// assert_eq!(resolve_url(base, "./index.html").unwrap(), "http://localhost:8080/app/index.html");
/// assert_eq!(resolve_url(base, "/manifest.json").unwrap(), "http://localhost:8080/manifest.json");
/// assert_eq!(resolve_url(base, "https://x.test/a").unwrap(), "https://x.test/a");
/// ```
pub fn resolve_url(base: &str, url: &str) -> Result<String> {
    if url.contains("://") {
        return Ok(url.to_string());
    }

    let (scheme, rest) = base
        .split_once("://")
        .ok_or_else(|| Error::InvalidUrl(base.to_string()))?;
    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };
    if authority.is_empty() {
        return Err(Error::InvalidUrl(base.to_string()));
    }
    let root = format!("{scheme}://{authority}");

    if url.starts_with('/') {
        return Ok(format!("{root}{url}"));
    }

    let path = path.split(['?', '#']).next().unwrap_or("/");
    let dir = &path[..=path.rfind('/').unwrap_or(0)];
    let relative = url.strip_prefix("./").unwrap_or(url);
    let relative = if relative == "." { "" } else { relative };
    Ok(format!("{root}{dir}{relative}"))
}

/// Resolve every manifest entry against `origin`.
pub fn resolve_manifest<S: AsRef<str>>(origin: &str, entries: &[S]) -> Result<Vec<String>> {
    entries
        .iter()
        .map(|entry| resolve_url(origin, entry.as_ref()))
        .collect()
}

/// The default manifest as owned strings.
pub fn default_manifest() -> Vec<String> {
    DEFAULT_MANIFEST.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative() {
        let base = "http://localhost:8080";
        assert_eq!(resolve_url(base, "./").unwrap(), "http://localhost:8080/");
        assert_eq!(
            resolve_url(base, "./css/style.css").unwrap(),
            "http://localhost:8080/css/style.css"
        );
        assert_eq!(
            resolve_url("http://h/app/index.html", "js/app.js").unwrap(),
            "http://h/app/js/app.js"
        );
    }

    #[test]
    fn test_resolve_rejects_bad_base() {
        assert!(resolve_url("not a url", "./x").is_err());
        assert!(resolve_url("http://", "./x").is_err());
    }

    #[test]
    fn test_resolve_default_manifest() {
        let urls = resolve_manifest("https://nimbus.test/", &DEFAULT_MANIFEST).unwrap();
        assert_eq!(urls.len(), 7);
        assert_eq!(urls[0], "https://nimbus.test/");
        assert_eq!(urls[6], "https://nimbus.test/images/icon-512.png");
    }
}
