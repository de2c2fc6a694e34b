use crate::UrlError;
use serde::{Serialize, Serializer};
use std::fmt;
use url::Url;

/// A URL in canonical form, used as the deduplication key of a crawl
///
/// Two raw URLs that differ only in scheme/host casing, fragment, or a
/// trailing path slash normalize to equal values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedUrl(Url);

impl NormalizedUrl {
    /// The canonical string form
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Host of the URL; always present for normalized URLs
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        self.0.path()
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Serialize for NormalizedUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Normalizes a URL according to Sumi-Sweep's normalization rules
///
/// # Normalization Steps
///
/// 1. Parse the URL as absolute; reject if malformed
/// 2. Accept only `http` and `https`
/// 3. Lowercase the scheme and host
/// 4. Remove the fragment
/// 5. Collapse trailing slashes on the path, keeping the root `/`
///
/// The query string is kept exactly as given, including parameter order
/// and casing.
///
/// # Examples
///
/// ```
/// use sumi_sweep::url::normalize_url;
///
/// let url = normalize_url("HTTP://Shop.Example.COM/category/1/#top").unwrap();
/// assert_eq!(url.as_str(), "http://shop.example.com/category/1");
/// ```
pub fn normalize_url(url_str: &str) -> Result<NormalizedUrl, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", url_str, e)))?;
    normalize_parsed(url)
}

/// Resolves `href` against `base` and normalizes the result
///
/// # Examples
///
/// ```
/// use sumi_sweep::url::{normalize_relative, normalize_url};
///
/// let base = normalize_url("https://shop.example/category/1").unwrap();
/// let link = normalize_relative(&base, "../product/7/").unwrap();
/// assert_eq!(link.as_str(), "https://shop.example/product/7");
/// ```
pub fn normalize_relative(base: &NormalizedUrl, href: &str) -> Result<NormalizedUrl, UrlError> {
    let url = base
        .as_url()
        .join(href.trim())
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;
    normalize_parsed(url)
}

fn normalize_parsed(mut url: Url) -> Result<NormalizedUrl, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    // The url crate already lowercases special-scheme hosts; this also
    // covers hosts it keeps verbatim.
    let host = match url.host_str() {
        Some(h) if !h.is_empty() => h.to_lowercase(),
        _ => return Err(UrlError::MissingHost(url.to_string())),
    };
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("{}: {}", url, e)))?;

    url.set_fragment(None);

    let path = collapse_trailing_slash(url.path());
    url.set_path(&path);

    Ok(NormalizedUrl(url))
}

/// Removes trailing slashes from a path, unless the path is the root
fn collapse_trailing_slash(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
