//! Allow-list matching and hostname extraction.

use url::Url;

use super::FocusError;

/// Ordered set of allowed hostnames.
///
/// A host is allowed when it equals an entry or ends with `"." + entry`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    domains: Vec<String>,
}

impl AllowList {
    /// Builds an allow-list, normalizing entries and dropping duplicates.
    ///
    /// Entries are lowercased and stripped of surrounding dots; empty
    /// entries are ignored. The first occurrence keeps its position.
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for domain in domains {
            let domain = normalize(domain.as_ref());
            if !domain.is_empty() && !normalized.contains(&domain) {
                normalized.push(domain);
            }
        }
        Self {
            domains: normalized,
        }
    }

    /// Returns the entries in order.
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Returns true if `host` matches an entry exactly or as a subdomain.
    pub fn is_allowed(&self, host: &str) -> bool {
        let host = normalize(host);
        if host.is_empty() {
            return false;
        }
        self.domains.iter().any(|domain| {
            host == *domain
                || (host.len() > domain.len()
                    && host.ends_with(domain.as_str())
                    && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
        })
    }
}

fn normalize(host: &str) -> String {
    host.trim().trim_matches('.').to_ascii_lowercase()
}

/// Extracts the lowercase hostname from an absolute URL.
///
/// Parsing follows the WHATWG URL rules browsers use, so the host is the
/// one a navigation would actually reach: `\` separates like `/` in web
/// schemes, userinfo is dropped, percent-encoding is decoded and
/// internationalized names come back as punycode. IPv6 brackets are removed.
///
/// # Errors
///
/// Returns [`FocusError::InvalidUrl`] when the input is not an absolute URL
/// and [`FocusError::MissingHost`] when it has no host (e.g. `file:///`).
pub fn parse_host(url: &str) -> Result<String, FocusError> {
    let parsed = Url::parse(url.trim()).map_err(|_| FocusError::InvalidUrl(url.to_string()))?;
    let host = parsed
        .host_str()
        .map(|h| {
            h.trim_start_matches('[')
                .trim_end_matches(']')
                .trim_end_matches('.')
                .to_ascii_lowercase()
        })
        .filter(|h| !h.is_empty())
        .ok_or_else(|| FocusError::MissingHost(url.to_string()))?;
    Ok(host)
}
