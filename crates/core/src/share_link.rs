//! Shareable links of the form `<base>/?v=<version>`.
//!
//! Visitors opening a share link land on the given version; the client
//! reads the `v` parameter before issuing any content query.

use url::{form_urlencoded, Url};

use crate::error::CoreError;
use crate::version::Version;

/// Query parameter carrying the version label.
pub const VERSION_PARAM: &str = "v";

/// Build the share link for `version` on top of `base`.
///
/// Existing query parameters on `base` are kept, except a previous `v`.
pub fn build_share_url(base: &str, version: &Version) -> Result<String, CoreError> {
    let mut url =
        Url::parse(base).map_err(|e| CoreError::InvalidShareLink(format!("{base}: {e}")))?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != VERSION_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(VERSION_PARAM, version.as_str());

    Ok(url.to_string())
}

/// Extract the version from a full share link.
///
/// Returns `Ok(None)` when the link has no usable `v` parameter.
pub fn parse_share_url(link: &str) -> Result<Option<Version>, CoreError> {
    let url =
        Url::parse(link).map_err(|e| CoreError::InvalidShareLink(format!("{link}: {e}")))?;
    Ok(url.query().and_then(version_from_query))
}

/// Extract the version from a raw query string such as `?v=8&x=1`.
pub fn version_from_query(query: &str) -> Option<Version> {
    let query = query.strip_prefix('?').unwrap_or(query);
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == VERSION_PARAM)
        .and_then(|(_, v)| Version::parse_optional(Some(&v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn v(label: &str) -> Version {
        Version::parse(label).unwrap()
    }

    #[test]
    fn builds_link_on_bare_origin() {
        let link = build_share_url("http://localhost:5173", &v("7")).unwrap();
        assert_eq!(link, "http://localhost:5173/?v=7");
    }

    #[test]
    fn replaces_existing_version_and_keeps_other_params() {
        let link = build_share_url("https://love.example/?v=3&lang=fr", &v("8")).unwrap();
        assert_eq!(link, "https://love.example/?lang=fr&v=8");
    }

    #[test]
    fn encodes_labels_with_spaces() {
        let link = build_share_url("https://love.example", &v("our anniversary")).unwrap();
        assert!(link.ends_with("?v=our+anniversary"));
        assert_eq!(parse_share_url(&link).unwrap(), Some(v("our anniversary")));
    }

    #[test]
    fn parse_ignores_blank_or_missing_param() {
        assert_eq!(parse_share_url("https://love.example/?v=%20").unwrap(), None);
        assert_eq!(parse_share_url("https://love.example/").unwrap(), None);
    }

    #[test]
    fn invalid_base_is_rejected() {
        assert_matches!(
            build_share_url("not a url", &v("7")),
            Err(CoreError::InvalidShareLink(_))
        );
    }

    #[test]
    fn raw_query_parsing() {
        assert_eq!(version_from_query("?v=12&x=1"), Some(v("12")));
        assert_eq!(version_from_query("x=1"), None);
    }
}
