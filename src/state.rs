// src/state.rs

//! Per-request authentication progress.
//!
//! One [`AuthState`] tracks a single request's (or, for connection-based
//! schemes, a single connection's) authentication: whether the server has
//! asked for authentication, whether we have answered, and which scheme is
//! bound. Not meant to be shared across concurrent in-flight requests —
//! HTTP's request/response lock-step makes sequential use the natural
//! model, and a connection-based exchange pins its connection anyway.

use crate::credentials::Credentials;
use crate::scheme::{AuthScheme, CookieScheme, JwtScheme, PreemptiveBasicScheme};
use crate::{error, Result};

/// Authentication progress for one request or connection.
#[derive(Debug, Default)]
pub struct AuthState {
    scheme: Option<Box<dyn AuthScheme>>,
    auth_requested: bool,
    auth_attempted: bool,
    preemptive: bool,
}

impl AuthState {
    pub fn new() -> AuthState {
        AuthState::default()
    }

    /// Resets to the initial state, dropping any bound scheme (which
    /// releases connection-based schemes' native contexts).
    pub fn invalidate(&mut self) {
        self.scheme = None;
        self.auth_requested = false;
        self.auth_attempted = false;
        self.preemptive = false;
    }

    /// Whether the server has requested authentication (401/407 seen).
    pub fn is_auth_requested(&self) -> bool {
        self.auth_requested
    }

    pub fn set_auth_requested(&mut self, requested: bool) {
        self.auth_requested = requested;
    }

    /// Whether credentials have been sent for the current challenge.
    pub fn is_auth_attempted(&self) -> bool {
        self.auth_attempted
    }

    pub fn set_auth_attempted(&mut self, attempted: bool) {
        self.auth_attempted = attempted;
    }

    /// Whether the bound scheme was set up preemptively rather than in
    /// response to a challenge.
    pub fn is_preemptive(&self) -> bool {
        self.preemptive
    }

    pub fn scheme(&self) -> Option<&dyn AuthScheme> {
        self.scheme.as_deref()
    }

    pub fn scheme_mut(&mut self) -> Option<&mut (dyn AuthScheme + 'static)> {
        self.scheme.as_mut().map(|s| &mut **s as _)
    }

    /// Binds a scheme selected from a challenge.
    ///
    /// Replacing a preemptively bound scheme with a different scheme type
    /// invalidates the preemptive assumptions: `preemptive` and
    /// `auth_attempted` are cleared. Type identity is the scheme name, so
    /// two instances of the same scheme type do not trigger the reset.
    pub fn set_auth_scheme(&mut self, scheme: Box<dyn AuthScheme>) {
        if let Some(existing) = &self.scheme {
            if self.preemptive && existing.scheme_name() != scheme.scheme_name() {
                log::debug!(
                    "preemptive {} scheme replaced by {}, clearing preemptive state",
                    existing.scheme_name(),
                    scheme.scheme_name()
                );
                self.preemptive = false;
                self.auth_attempted = false;
            }
        }
        self.scheme = Some(scheme);
    }

    /// Binds the first preemptive-capable scheme that accepts
    /// `credentials`, probing Cookie, then Bearer, then preemptive Basic.
    ///
    /// Must happen before any challenge-driven binding; calling with a
    /// scheme already bound is an illegal-state error. Finding no capable
    /// scheme is not an error — it is logged and the request proceeds
    /// unauthenticated until challenged.
    pub fn set_preemptive(&mut self, credentials: &Credentials) -> Result<()> {
        if self.scheme.is_some() {
            return Err(error::state(
                "preemptive authentication cannot replace an already bound scheme",
            ));
        }

        let candidates: [Box<dyn AuthScheme>; 3] = [
            Box::new(CookieScheme::new()),
            Box::new(JwtScheme::new()),
            Box::new(PreemptiveBasicScheme::new()),
        ];
        for candidate in candidates {
            if candidate.supports_credentials(credentials) {
                log::debug!(
                    "preemptive {} authentication enabled",
                    candidate.scheme_name()
                );
                self.scheme = Some(candidate);
                self.preemptive = true;
                return Ok(());
            }
        }

        log::debug!("no preemptive authentication scheme supports the given credentials");
        Ok(())
    }
}
