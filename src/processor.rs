// src/processor.rs

//! Scheme selection and challenge dispatch.
//!
//! [`AuthPolicy`] is the explicit configuration the processor runs with —
//! priority order, the insecure-basic flag, and the native engine handle.
//! It replaces any notion of process-wide scheme registries: every
//! processor carries its own policy.

use std::collections::HashMap;
use std::sync::Arc;

use crate::credentials::Credentials;
use crate::engine::{self, SecurityContextEngine};
use crate::scheme::{
    AuthScheme, BasicScheme, CookieScheme, DigestScheme, JwtScheme, NegotiateScheme, WrapScheme,
};
use crate::state::AuthState;
use crate::{error, Result};

/// Builtin scheme preference, most secure first.
const DEFAULT_PRIORITY: &[&str] = &["negotiate", "ntlm", "digest", "basic"];

/// Authentication configuration: scheme priority and scheme construction.
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    priority: Vec<String>,
    allow_insecure_basic: bool,
    engine: Option<Arc<dyn SecurityContextEngine>>,
}

impl Default for AuthPolicy {
    fn default() -> AuthPolicy {
        AuthPolicy {
            priority: DEFAULT_PRIORITY.iter().map(|s| s.to_string()).collect(),
            allow_insecure_basic: false,
            engine: engine::platform_default(),
        }
    }
}

impl AuthPolicy {
    pub fn new() -> AuthPolicy {
        AuthPolicy::default()
    }

    /// Replaces the scheme priority list. Identifiers are the lowercase
    /// scheme names; unknown identifiers are skipped at selection time.
    pub fn with_priority<I, S>(mut self, priority: I) -> AuthPolicy
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.priority = priority
            .into_iter()
            .map(|s| s.into().to_ascii_lowercase())
            .collect();
        self
    }

    /// Allows Basic authentication over plaintext connections.
    pub fn allow_insecure_basic(mut self, allow: bool) -> AuthPolicy {
        self.allow_insecure_basic = allow;
        self
    }

    /// Sets the engine backing NTLM/Negotiate.
    pub fn with_engine(mut self, engine: Arc<dyn SecurityContextEngine>) -> AuthPolicy {
        self.engine = Some(engine);
        self
    }

    pub fn priority(&self) -> &[String] {
        &self.priority
    }

    /// Constructs a fresh scheme instance for a lowercase identifier.
    pub fn create_scheme(&self, id: &str) -> Option<Box<dyn AuthScheme>> {
        match id {
            "basic" => Some(Box::new(BasicScheme::new(self.allow_insecure_basic))),
            "digest" => Some(Box::new(DigestScheme::new())),
            "ntlm" => Some(Box::new(NegotiateScheme::ntlm(self.engine.clone()))),
            "negotiate" => Some(Box::new(NegotiateScheme::negotiate(self.engine.clone()))),
            "cookie" => Some(Box::new(CookieScheme::new())),
            "bearer" => Some(Box::new(JwtScheme::new())),
            "wrap" => Some(Box::new(WrapScheme::new())),
            _ => None,
        }
    }
}

/// Selects a scheme for a challenge set and drives challenge processing.
#[derive(Debug, Default)]
pub struct AuthChallengeProcessor {
    policy: AuthPolicy,
}

impl AuthChallengeProcessor {
    pub fn new(policy: AuthPolicy) -> AuthChallengeProcessor {
        AuthChallengeProcessor { policy }
    }

    pub fn policy(&self) -> &AuthPolicy {
        &self.policy
    }

    /// Picks the preferred scheme among concurrent challenges.
    ///
    /// Walks the policy's priority list and takes the first identifier
    /// present in `challenges` whose scheme also accepts `credentials`
    /// when they are supplied. Failing to find one is the terminal
    /// "cannot authenticate" signal.
    pub fn select_auth_scheme(
        &self,
        challenges: &HashMap<String, String>,
        credentials: Option<&Credentials>,
    ) -> Result<Box<dyn AuthScheme>> {
        for id in &self.policy.priority {
            if !challenges.contains_key(id) {
                log::debug!("challenge for {} authentication scheme not available", id);
                continue;
            }
            let Some(scheme) = self.policy.create_scheme(id) else {
                log::warn!("unsupported scheme {} in priority list", id);
                continue;
            };
            if let Some(credentials) = credentials {
                if !scheme.supports_credentials(credentials) {
                    log::debug!(
                        "{} scheme does not support the available credentials",
                        id
                    );
                    continue;
                }
            }
            log::debug!("{} authentication scheme selected", id);
            return Ok(scheme);
        }
        Err(error::challenge(format!(
            "unable to respond to any of these challenges: {:?}",
            {
                let mut names: Vec<&String> = challenges.keys().collect();
                names.sort();
                names
            }
        )))
    }

    /// Processes the challenge set against the request's [`AuthState`].
    ///
    /// Binds a newly selected scheme unless one is already driving a
    /// multi-step exchange or was bound preemptively; then feeds the bound
    /// scheme its challenge. A missing challenge for the bound scheme on a
    /// retry is a protocol violation by the server.
    pub fn process_challenge<'a>(
        &self,
        state: &'a mut AuthState,
        challenges: &HashMap<String, String>,
        credentials: Option<&Credentials>,
    ) -> Result<&'a mut dyn AuthScheme> {
        if !state.is_preemptive() && state.scheme().is_none() {
            let scheme = self.select_auth_scheme(challenges, credentials)?;
            state.set_auth_scheme(scheme);
        }

        let scheme = state
            .scheme_mut()
            .ok_or_else(|| error::authentication("no authentication scheme bound"))?;
        let id = scheme.scheme_name();
        let raw = challenges.get(id).ok_or_else(|| {
            error::authentication(format!(
                "{} authorization challenge expected, but not found",
                id
            ))
        })?;
        scheme.process_challenge(raw)?;
        Ok(scheme)
    }
}
