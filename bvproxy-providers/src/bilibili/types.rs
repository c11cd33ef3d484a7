//! Bilibili request/response value types

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::error::BilibiliError;

/// Cookie key the platform uses for the login session.
pub const SESSDATA: &str = "SESSDATA";

#[allow(clippy::unwrap_used)]
static BVID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"BV[a-zA-Z0-9]{10}").unwrap());

/// Find the first `BV` + 10 alphanumerics substring in `input`.
#[must_use]
pub fn extract_bvid(input: &str) -> Option<&str> {
    BVID_RE.find(input).map(|m| m.as_str())
}

/// A validated 12-character BV id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoIdentifier(String);

impl VideoIdentifier {
    pub const LEN: usize = 12;

    /// Validate the full pattern; partial matches are rejected.
    pub fn parse(raw: &str) -> Result<Self, BilibiliError> {
        let valid = raw.len() == Self::LEN
            && raw.starts_with("BV")
            && raw[2..].bytes().all(|b| b.is_ascii_alphanumeric());
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(BilibiliError::InvalidId(raw.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cookie set used to call the upstream API as a browser-like client.
///
/// Built per resolution request and never shared between requests.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionCredential {
    cookies: BTreeMap<String, String>,
}

impl SessionCredential {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Render as a `Cookie` request header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// Cookie values are secrets; only names are printed.
impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("cookies", &self.cookies.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Resolution output for a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackResult {
    pub bvid: VideoIdentifier,
    /// 1-based page that was actually resolved.
    pub page: usize,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bvid() {
        assert_eq!(
            extract_bvid("https://www.bilibili.com/video/BV1xx411c7mD?p=2"),
            Some("BV1xx411c7mD")
        );
        assert_eq!(extract_bvid("/BV1xx411c7mDextra"), Some("BV1xx411c7mD"));
        assert_eq!(extract_bvid("BV1xx411c7"), None);
        assert_eq!(extract_bvid("bv1xx411c7mD"), None);
        assert_eq!(extract_bvid(""), None);
    }

    #[test]
    fn test_extracted_bvid_shape() {
        for input in ["xxBV0123456789yy", "BVabcdefghijKL", "/a/b/BVZZZZZZZZZZ"] {
            let m = extract_bvid(input).unwrap();
            assert_eq!(m.len(), VideoIdentifier::LEN);
            assert!(m.starts_with("BV"));
            assert!(VideoIdentifier::parse(m).is_ok());
        }
    }

    #[test]
    fn test_video_identifier_parse() {
        assert!(VideoIdentifier::parse("BV1xx411c7mD").is_ok());
        assert!(VideoIdentifier::parse("BV1xx411c7mDx").is_err());
        assert!(VideoIdentifier::parse("BV1xx411c7m").is_err());
        assert!(VideoIdentifier::parse("AV1xx411c7mD").is_err());
        assert!(VideoIdentifier::parse("BV1xx411c7m-").is_err());
        assert!(VideoIdentifier::parse("BV1xx411c7mé").is_err());
    }

    #[test]
    fn test_cookie_header_value() {
        let mut cred = SessionCredential::new();
        cred.insert("buvid3", "abc");
        cred.insert(SESSDATA, "secret");
        assert_eq!(cred.header_value(), "SESSDATA=secret; buvid3=abc");
        assert!(!format!("{cred:?}").contains("secret"));
    }
}
