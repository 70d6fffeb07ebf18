//! Resource keys
//!
//! A resource key is a request URL relative to the worker origin, without
//! the leading slash: `http://host/assets/a.png` is `assets/a.png`. The
//! entry document is aliased to `/`. Keys hold the decoded path, the same
//! form the manifest generator writes (`my photo.png`, not `my%20photo.png`).

use crate::error::{SwsyncError, SwsyncResult};
use crate::manifest::ROOT_KEY;
use percent_encoding::percent_decode_str;
use std::fmt;
use url::{Position, Url};

/// Query suffix used for browser cache busting
const VERSION_QUERY: &str = "?v=";

/// The origin a worker is served from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    root: Url,
}

impl Origin {
    /// Parse an origin from any URL on it; path, query and fragment are dropped
    pub fn parse(s: &str) -> SwsyncResult<Self> {
        let url = Url::parse(s).map_err(|e| SwsyncError::InvalidUrl {
            url: s.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
            return Err(SwsyncError::InvalidOrigin(s.to_string()));
        }

        let root = Url::parse(&format!("{}/", url.origin().ascii_serialization()))?;
        Ok(Self { root })
    }

    /// Root URL of the origin (`scheme://host[:port]/`)
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Whether `url` is same-origin
    pub fn contains(&self, url: &Url) -> bool {
        url.origin() == self.root.origin()
    }

    /// Remainder of `url` after `origin/`, including any query and fragment.
    ///
    /// The path is percent-decoded; query and fragment are kept verbatim.
    /// Returns `None` for cross-origin URLs.
    pub fn resource_key(&self, url: &Url) -> Option<String> {
        if !self.contains(url) {
            return None;
        }
        let decoded = percent_decode_str(url.path()).decode_utf8_lossy();
        let path = decoded.strip_prefix('/').unwrap_or(&decoded);
        Some(format!("{}{}", path, &url[Position::AfterPath..]))
    }

    /// Key of a stored cache entry; the empty key is the root
    pub fn cache_key(&self, url: &Url) -> Option<String> {
        self.resource_key(url).map(|key| {
            if key.is_empty() {
                ROOT_KEY.to_string()
            } else {
                key
            }
        })
    }

    /// Manifest key a page request is routed by.
    ///
    /// Strips a `?v=` cache-busting suffix, and maps the origin itself,
    /// `origin/` and single-page-app fragment routes (`origin/#/...`) to `/`.
    pub fn route_key(&self, url: &Url) -> Option<String> {
        let key = self.resource_key(url)?;
        let key = match key.find(VERSION_QUERY) {
            Some(pos) => &key[..pos],
            None => key.as_str(),
        };

        if key.is_empty() || key.starts_with('#') {
            Some(ROOT_KEY.to_string())
        } else {
            Some(key.to_string())
        }
    }

    /// Canonical URL for a resource key; the path is percent-encoded again
    pub fn resolve(&self, key: &str) -> SwsyncResult<Url> {
        if key == ROOT_KEY {
            return Ok(self.root.clone());
        }
        self.root.join(key).map_err(|e| SwsyncError::InvalidUrl {
            url: key.to_string(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root.origin().ascii_serialization())
    }
}
