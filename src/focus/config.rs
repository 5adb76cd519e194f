//! Focus enforcement configuration.
//!
//! The allow-list is configuration input, loaded with the rest of the
//! application config. Both fields fall back to the built-in defaults when
//! absent.

use serde::{Deserialize, Serialize};

/// Hostnames that stay reachable during a work session.
const DEFAULT_ALLOW_LIST: &[&str] = &[
    "localhost",
    "devsync-one.vercel.app",
    "stackoverflow.com",
    "developer.mozilla.org",
    "github.com",
    "gitlab.com",
    "linkedin.com",
    "leetcode.com",
    "codechef.com",
    "hackerrank.com",
    "codeforces.com",
    "hackerearth.com",
];

/// URL prefixes of internal/system pages that are never closed.
const DEFAULT_INTERNAL_PREFIXES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "edge://",
    "about:",
    "devtools://",
];

fn default_allow_list() -> Vec<String> {
    DEFAULT_ALLOW_LIST.iter().map(|d| (*d).to_string()).collect()
}

fn default_internal_url_prefixes() -> Vec<String> {
    DEFAULT_INTERNAL_PREFIXES
        .iter()
        .map(|p| (*p).to_string())
        .collect()
}

/// Focus enforcement configuration.
///
/// # Example
///
/// ```
/// use focus_timer::focus::FocusConfig;
///
/// let config = FocusConfig::default();
/// assert!(config.allow_list.contains(&"github.com".to_string()));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FocusConfig {
    /// Ordered bare hostnames (no scheme or path).
    #[serde(default = "default_allow_list")]
    pub allow_list: Vec<String>,

    /// Pages whose URL starts with one of these are internal.
    #[serde(default = "default_internal_url_prefixes")]
    pub internal_url_prefixes: Vec<String>,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            allow_list: default_allow_list(),
            internal_url_prefixes: default_internal_url_prefixes(),
        }
    }
}

impl FocusConfig {
    /// Creates a configuration with a custom allow-list and default prefixes.
    #[must_use]
    pub fn with_allow_list<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allow_list: domains.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FocusConfig::default();
        assert_eq!(config.allow_list.len(), 12);
        assert_eq!(config.allow_list[0], "localhost");
        assert!(config.internal_url_prefixes.contains(&"chrome://".to_string()));
    }

    #[test]
    fn test_with_allow_list() {
        let config = FocusConfig::with_allow_list(["example.com"]);
        assert_eq!(config.allow_list, vec!["example.com".to_string()]);
        assert_eq!(
            config.internal_url_prefixes,
            FocusConfig::default().internal_url_prefixes
        );
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: FocusConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, FocusConfig::default());
    }

    #[test]
    fn test_deserialize_partial() {
        let json = r#"{"allowList": ["docs.rs"]}"#;
        let config: FocusConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.allow_list, vec!["docs.rs".to_string()]);
        assert!(!config.internal_url_prefixes.is_empty());
    }

    #[test]
    fn test_serialize_field_names() {
        let json = serde_json::to_value(FocusConfig::default()).unwrap();
        assert!(json.get("allowList").is_some());
        assert!(json.get("internalUrlPrefixes").is_some());
    }
}
