// src/scope.rs

//! Authentication scopes: the (host, port, scheme) triple a set of
//! credentials applies to.
//!
//! Any field may be a wildcard. Scopes are compared with a specificity
//! score so a credentials store can answer a lookup with the most specific
//! match it holds.

use std::fmt;

/// Score contribution of a concrete host match.
const HOST_FACTOR: i32 = 8;
/// Score contribution of a concrete port match.
const PORT_FACTOR: i32 = 4;
/// Score contribution of a concrete scheme match.
const SCHEME_FACTOR: i32 = 1;

/// The (host, port, scheme) triple credentials are valid for.
///
/// `None` fields are wildcards; [`AuthScope::any`] is the universal
/// wildcard. Host is normalized to lowercase and scheme to uppercase at
/// construction. Immutable after construction.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AuthScope {
    host: Option<String>,
    port: Option<u16>,
    scheme: Option<String>,
}

impl AuthScope {
    /// Creates a scope; `None` in any position means "any".
    pub fn new(host: Option<&str>, port: Option<u16>, scheme: Option<&str>) -> AuthScope {
        AuthScope {
            host: host.map(|h| h.to_ascii_lowercase()),
            port,
            scheme: scheme.map(|s| s.to_ascii_uppercase()),
        }
    }

    /// Creates a scope for a concrete host and port, any scheme.
    pub fn host_port(host: &str, port: u16) -> AuthScope {
        AuthScope::new(Some(host), Some(port), None)
    }

    /// The universal wildcard scope, matching everything with score 0.
    pub fn any() -> AuthScope {
        AuthScope {
            host: None,
            port: None,
            scheme: None,
        }
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Scores how well this scope matches `that`.
    ///
    /// Returns `-1` if any field concrete on both sides conflicts, else the
    /// sum of matched-field factors (host 8, port 4, scheme 1). A field
    /// that is a wildcard on either side contributes 0. Higher means more
    /// specific.
    pub fn match_score(&self, that: &AuthScope) -> i32 {
        let mut factor = 0;

        if let (Some(a), Some(b)) = (&self.host, &that.host) {
            if a != b {
                return -1;
            }
            factor += HOST_FACTOR;
        }
        if let (Some(a), Some(b)) = (self.port, that.port) {
            if a != b {
                return -1;
            }
            factor += PORT_FACTOR;
        }
        if let (Some(a), Some(b)) = (&self.scheme, &that.scheme) {
            if a != b {
                return -1;
            }
            factor += SCHEME_FACTOR;
        }

        factor
    }
}

impl fmt::Debug for AuthScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AuthScope({}:{}:{})",
            self.host.as_deref().unwrap_or("<any host>"),
            self.port
                .map(|p| p.to_string())
                .unwrap_or_else(|| "<any port>".into()),
            self.scheme.as_deref().unwrap_or("<any scheme>"),
        )
    }
}

impl fmt::Display for AuthScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_score() {
        let a = AuthScope::new(Some("host"), Some(80), Some("basic"));
        let b = AuthScope::new(Some("host"), Some(80), Some("basic"));
        assert_eq!(a.match_score(&b), 13);
    }

    #[test]
    fn test_any_matches_everything() {
        let any = AuthScope::any();
        assert_eq!(any.match_score(&AuthScope::any()), 0);
        assert!(any.match_score(&AuthScope::new(Some("h"), Some(8080), Some("digest"))) >= 0);
    }

    #[test]
    fn test_conflict_is_negative() {
        let a = AuthScope::new(Some("host"), Some(80), None);
        let b = AuthScope::new(Some("other"), Some(80), None);
        assert_eq!(a.match_score(&b), -1);

        let c = AuthScope::new(Some("host"), Some(443), None);
        assert_eq!(a.match_score(&c), -1);
    }

    #[test]
    fn test_partial_wildcard_scoring() {
        let concrete = AuthScope::new(Some("host"), Some(80), Some("basic"));
        let host_only = AuthScope::new(Some("host"), None, None);
        let port_only = AuthScope::new(None, Some(80), None);

        assert_eq!(host_only.match_score(&concrete), 8);
        assert_eq!(port_only.match_score(&concrete), 4);
    }

    #[test]
    fn test_normalization() {
        let a = AuthScope::new(Some("HOST.Example.COM"), None, Some("basic"));
        assert_eq!(a.host(), Some("host.example.com"));
        assert_eq!(a.scheme(), Some("BASIC"));

        let b = AuthScope::new(Some("host.example.com"), None, Some("BASIC"));
        assert_eq!(a.match_score(&b), 9);
    }
}
