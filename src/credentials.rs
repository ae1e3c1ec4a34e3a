// src/credentials.rs

//! Credential value types and lookup.
//!
//! Credentials are opaque, immutable values handed to an authentication
//! scheme; each scheme decides which variants it can use via
//! `AuthScheme::supports_credentials`. Secrets are redacted from `Debug`
//! output.

use std::collections::HashMap;
use std::fmt;

use crate::scheme::AuthScheme;
use crate::scope::AuthScope;

/// A set of credentials usable by one or more authentication schemes.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Username and password, for challenge-driven Basic and Digest.
    UsernamePassword { username: String, password: String },

    /// Username and password the caller allows to be sent before any
    /// challenge is received (preemptive Basic).
    PreemptiveUsernamePassword { username: String, password: String },

    /// The platform account of the current process, resolved by the native
    /// security context engine (NTLM/Negotiate).
    DefaultNT,

    /// A raw cookie value attached preemptively as a `Cookie` header.
    Cookie { value: String },

    /// A JSON Web Token sent as `Bearer <token>`.
    Jwt { token: String },

    /// A Simple Web Token sent as `WRAP access_token="<token>"`.
    Wrap { token: String },
}

impl Credentials {
    pub fn username_password(username: impl Into<String>, password: impl Into<String>) -> Credentials {
        Credentials::UsernamePassword {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn preemptive(username: impl Into<String>, password: impl Into<String>) -> Credentials {
        Credentials::PreemptiveUsernamePassword {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn cookie(value: impl Into<String>) -> Credentials {
        Credentials::Cookie { value: value.into() }
    }

    pub fn jwt(token: impl Into<String>) -> Credentials {
        Credentials::Jwt { token: token.into() }
    }

    pub fn wrap(token: impl Into<String>) -> Credentials {
        Credentials::Wrap { token: token.into() }
    }

    /// The username and password, if this is either username/password
    /// variant.
    pub(crate) fn username_password_pair(&self) -> Option<(&str, &str)> {
        match self {
            Credentials::UsernamePassword { username, password }
            | Credentials::PreemptiveUsernamePassword { username, password } => {
                Some((username, password))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::PreemptiveUsernamePassword { username, .. } => f
                .debug_struct("PreemptiveUsernamePassword")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::DefaultNT => f.write_str("DefaultNT"),
            Credentials::Cookie { .. } => f.write_str("Cookie(<redacted>)"),
            Credentials::Jwt { .. } => f.write_str("Jwt(<redacted>)"),
            Credentials::Wrap { .. } => f.write_str("Wrap(<redacted>)"),
        }
    }
}

/// On-demand credential lookup, typically backed by a keychain or an
/// interactive prompt in the calling application.
///
/// Invoked by the request loop after a scheme has been selected for a
/// challenge; `Ok(None)` means the caller has nothing for this scope and
/// authentication cannot proceed.
pub trait CredentialsProvider {
    fn credentials(
        &mut self,
        scheme: &dyn AuthScheme,
        host: &str,
        port: u16,
        proxy: bool,
    ) -> crate::Result<Option<Credentials>>;
}

/// In-memory credentials keyed by [`AuthScope`].
///
/// Lookups answer with the credentials registered under the most specific
/// matching scope, falling back through partial wildcards to a registered
/// catch-all.
#[derive(Debug, Default, Clone)]
pub struct CredentialsStore {
    entries: HashMap<AuthScope, Credentials>,
}

impl CredentialsStore {
    pub fn new() -> CredentialsStore {
        CredentialsStore::default()
    }

    /// Registers credentials for a scope, replacing any previous entry for
    /// the identical scope.
    pub fn set_credentials(&mut self, scope: AuthScope, credentials: Credentials) {
        self.entries.insert(scope, credentials);
    }

    /// Finds the best-matching credentials for `scope`, preferring higher
    /// specificity scores.
    pub fn credentials(&self, scope: &AuthScope) -> Option<&Credentials> {
        if let Some(direct) = self.entries.get(scope) {
            return Some(direct);
        }

        let mut best: Option<(i32, &Credentials)> = None;
        for (candidate, credentials) in &self.entries {
            let score = candidate.match_score(scope);
            if score < 0 {
                continue;
            }
            match best {
                Some((existing, _)) if existing >= score => {}
                _ => best = Some((score, credentials)),
            }
        }
        best.map(|(_, credentials)| credentials)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_prefers_most_specific() {
        let mut store = CredentialsStore::new();
        store.set_credentials(AuthScope::any(), Credentials::username_password("any", "a"));
        store.set_credentials(
            AuthScope::new(Some("host"), None, None),
            Credentials::username_password("host", "h"),
        );
        store.set_credentials(
            AuthScope::new(Some("host"), Some(80), Some("basic")),
            Credentials::username_password("exact", "e"),
        );

        let lookup = AuthScope::new(Some("host"), Some(80), Some("basic"));
        let found = store.credentials(&lookup).unwrap();
        assert_eq!(
            found.username_password_pair().unwrap().0,
            "exact"
        );

        let other_port = AuthScope::new(Some("host"), Some(8080), None);
        let found = store.credentials(&other_port).unwrap();
        assert_eq!(found.username_password_pair().unwrap().0, "host");

        let elsewhere = AuthScope::new(Some("elsewhere"), Some(80), None);
        let found = store.credentials(&elsewhere).unwrap();
        assert_eq!(found.username_password_pair().unwrap().0, "any");
    }

    #[test]
    fn test_store_miss_without_catch_all() {
        let mut store = CredentialsStore::new();
        store.set_credentials(
            AuthScope::new(Some("host"), None, None),
            Credentials::username_password("host", "h"),
        );
        let elsewhere = AuthScope::new(Some("elsewhere"), None, None);
        assert!(store.credentials(&elsewhere).is_none());
    }

    #[test]
    fn test_provider_backed_by_store() {
        use crate::scheme::BasicScheme;

        /// Provider answering lookups from a store, scoped by host, port
        /// and the scheme asking.
        struct StoreProvider {
            store: CredentialsStore,
        }

        impl CredentialsProvider for StoreProvider {
            fn credentials(
                &mut self,
                scheme: &dyn AuthScheme,
                host: &str,
                port: u16,
                _proxy: bool,
            ) -> crate::Result<Option<Credentials>> {
                let scope = AuthScope::new(Some(host), Some(port), Some(scheme.scheme_name()));
                Ok(self.store.credentials(&scope).cloned())
            }
        }

        let mut store = CredentialsStore::new();
        store.set_credentials(
            AuthScope::new(Some("host"), None, None),
            Credentials::username_password("alice", "pw"),
        );
        let mut provider = StoreProvider { store };

        let scheme = BasicScheme::new(false);
        let found = provider
            .credentials(&scheme, "host", 443, false)
            .unwrap()
            .unwrap();
        assert_eq!(found.username_password_pair().unwrap().0, "alice");

        let miss = provider.credentials(&scheme, "elsewhere", 443, false).unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::username_password("alice", "s3cret");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("s3cret"));

        let jwt = Credentials::jwt("eyJhbGciOi");
        assert!(!format!("{:?}", jwt).contains("eyJhbGciOi"));
    }
}
