// src/scheme/negotiate.rs

//! NTLM and Negotiate (Kerberos/SPNEGO) authentication.
//!
//! Both are connection-based multi-step exchanges driven by a native
//! [`SecurityContextEngine`]. The first server challenge is the bare scheme
//! token; each subsequent challenge carries a base64 token that is fed to
//! the native context to obtain the next client token. Native failures are
//! logged and converted into the scheme's error state — `authenticate`
//! then returns `Ok(None)` and the caller treats the attempt as a failed
//! authentication rather than an error propagated from inside the
//! exchange.

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;

use super::AuthScheme;
use crate::credentials::Credentials;
use crate::engine::{
    derive_spn, EngineCredentials, SecurityContext, SecurityContextEngine, SecurityPackage,
};
use crate::request::Request;
use crate::scope::AuthScope;
use crate::{challenge, error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExchangeState {
    None,
    Initiated,
    Exchanging,
    Complete,
    Error,
}

/// Connection-based NTLM/Negotiate scheme over a native security context.
pub struct NegotiateScheme {
    package: SecurityPackage,
    engine: Option<Arc<dyn SecurityContextEngine>>,
    state: ExchangeState,
    context: Option<Box<dyn SecurityContext>>,
    input_token: Option<Vec<u8>>,
}

impl NegotiateScheme {
    pub fn new(
        package: SecurityPackage,
        engine: Option<Arc<dyn SecurityContextEngine>>,
    ) -> NegotiateScheme {
        NegotiateScheme {
            package,
            engine,
            state: ExchangeState::None,
            context: None,
            input_token: None,
        }
    }

    pub fn ntlm(engine: Option<Arc<dyn SecurityContextEngine>>) -> NegotiateScheme {
        NegotiateScheme::new(SecurityPackage::Ntlm, engine)
    }

    pub fn negotiate(engine: Option<Arc<dyn SecurityContextEngine>>) -> NegotiateScheme {
        NegotiateScheme::new(SecurityPackage::Negotiate, engine)
    }

    /// Releases the native context. Must run before re-initiating and on
    /// completion, error, or drop; the context owns native resources.
    fn dispose_context(&mut self) {
        if let Some(mut context) = self.context.take() {
            context.dispose();
        }
    }

    fn engine_credentials(&self, credentials: &Credentials) -> Result<EngineCredentials> {
        match credentials {
            Credentials::DefaultNT => Ok(EngineCredentials::Default),
            _ => {
                let (qualified, password) =
                    credentials.username_password_pair().ok_or_else(|| {
                        error::invalid_credentials(format!(
                            "credentials cannot be used for {} authentication",
                            self.wire_scheme()
                        ))
                    })?;
                // DOMAIN\user form; empty domain for local accounts
                let (domain, username) = match qualified.split_once('\\') {
                    Some((domain, username)) => (domain, username),
                    None => ("", qualified),
                };
                Ok(EngineCredentials::Specified {
                    username: username.to_string(),
                    domain: domain.to_string(),
                    password: password.to_string(),
                })
            }
        }
    }
}

impl AuthScheme for NegotiateScheme {
    fn scheme_name(&self) -> &'static str {
        match self.package {
            SecurityPackage::Ntlm => "ntlm",
            SecurityPackage::Negotiate => "negotiate",
        }
    }

    fn wire_scheme(&self) -> &'static str {
        self.package.name()
    }

    fn supports_credentials(&self, credentials: &Credentials) -> bool {
        let Some(engine) = &self.engine else {
            return false;
        };
        if !engine.is_available() {
            return false;
        }
        match credentials {
            Credentials::DefaultNT => engine.supports_default_credentials(),
            Credentials::UsernamePassword { .. }
            | Credentials::PreemptiveUsernamePassword { .. } => {
                engine.supports_specified_credentials()
            }
            _ => false,
        }
    }

    fn process_challenge(&mut self, raw: &str) -> Result<()> {
        let scheme = challenge::extract_scheme(raw)?;
        if scheme != self.scheme_name() {
            return Err(error::malformed(format!(
                "invalid {} challenge: {:?}",
                self.wire_scheme(),
                raw
            )));
        }

        let token = raw[self.wire_scheme().len()..].trim();
        if token.is_empty() {
            // Bare scheme token: the server is starting (or restarting)
            // the handshake. Any half-finished context is stale now.
            if self.state != ExchangeState::None {
                log::debug!("{} handshake restarted by server", self.wire_scheme());
                self.dispose_context();
            }
            self.state = ExchangeState::Initiated;
            self.input_token = None;
        } else {
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(token)
                .map_err(|e| {
                    error::malformed(format!(
                        "invalid base64 token in {} challenge",
                        self.wire_scheme()
                    ))
                    .with_source(e)
                })?;
            self.input_token = Some(decoded);
            self.state = ExchangeState::Exchanging;
        }
        Ok(())
    }

    fn is_complete(&self) -> bool {
        matches!(self.state, ExchangeState::Complete | ExchangeState::Error)
    }

    fn is_connection_based(&self) -> bool {
        true
    }

    fn authenticate(
        &mut self,
        _scope: &AuthScope,
        credentials: &Credentials,
        request: &Request,
    ) -> Result<Option<String>> {
        if self.state == ExchangeState::Error {
            return Ok(None);
        }

        let engine = match &self.engine {
            Some(engine) if engine.is_available() => Arc::clone(engine),
            _ => {
                return Err(error::authentication(format!(
                    "no security context engine available for {}",
                    self.wire_scheme()
                )))
            }
        };

        if self.context.is_none() {
            let spn = derive_spn(request.url())?;
            let engine_credentials = self.engine_credentials(credentials)?;
            match engine.create_context(self.package, &spn, &engine_credentials) {
                Ok(context) => self.context = Some(context),
                Err(e) => {
                    log::debug!(
                        "{} context creation failed: {}",
                        self.wire_scheme(),
                        e
                    );
                    self.state = ExchangeState::Error;
                    return Ok(None);
                }
            }
            if self.state == ExchangeState::None {
                self.state = ExchangeState::Initiated;
            }
        }

        let input = self.input_token.take();
        let step = match self.context.as_mut() {
            Some(context) => {
                let token = context.step(input.as_deref());
                token.map(|t| (t, context.is_complete()))
            }
            None => return Ok(None),
        };

        match step {
            Ok((token, done)) => {
                if done {
                    self.state = ExchangeState::Complete;
                    self.dispose_context();
                } else {
                    self.state = ExchangeState::Exchanging;
                }
                let encoded = base64::engine::general_purpose::STANDARD.encode(token);
                Ok(Some(format!("{} {}", self.wire_scheme(), encoded)))
            }
            Err(e) => {
                log::warn!("{} exchange failed: {}", self.wire_scheme(), e);
                self.state = ExchangeState::Error;
                self.dispose_context();
                Ok(None)
            }
        }
    }
}

impl Drop for NegotiateScheme {
    fn drop(&mut self) {
        self.dispose_context();
    }
}

impl fmt::Debug for NegotiateScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NegotiateScheme")
            .field("package", &self.package)
            .field("state", &self.state)
            .field("has_context", &self.context.is_some())
            .finish()
    }
}
