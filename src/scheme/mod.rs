// src/scheme/mod.rs

//! Authentication scheme implementations.
//!
//! Each scheme is a small protocol state machine: it consumes server
//! challenges via [`AuthScheme::process_challenge`] and produces the
//! response header value via [`AuthScheme::authenticate`]. Schemes are
//! constructed fresh per authentication attempt — per connection for
//! connection-based schemes, per request otherwise.

mod basic;
mod digest;
mod negotiate;
mod token;

pub use basic::{BasicScheme, PreemptiveBasicScheme};
pub use digest::DigestScheme;
pub use negotiate::NegotiateScheme;
pub use token::{CookieScheme, JwtScheme, WrapScheme};

use std::collections::HashMap;
use std::fmt;

use http::header::{HeaderName, AUTHORIZATION, PROXY_AUTHORIZATION};

use crate::challenge;
use crate::credentials::Credentials;
use crate::request::Request;
use crate::scope::AuthScope;
use crate::{error, Result};

/// One authentication scheme's challenge/response state machine.
pub trait AuthScheme: fmt::Debug + Send {
    /// Lowercase canonical identifier, matching the keys produced by
    /// [`challenge::parse_challenges`].
    fn scheme_name(&self) -> &'static str;

    /// The scheme token exactly as it must appear on the wire
    /// (`Basic`, `Digest`, `NTLM`, `Negotiate`, `Bearer`, `WRAP`).
    fn wire_scheme(&self) -> &'static str;

    /// Whether this scheme can produce a response from `credentials`.
    /// Never fails.
    fn supports_credentials(&self, credentials: &Credentials) -> bool;

    /// Updates internal state from a raw challenge string.
    fn process_challenge(&mut self, challenge: &str) -> Result<()>;

    /// True when no further challenge/response round trip is needed.
    fn is_complete(&self) -> bool;

    /// True when the handshake is bound to the TCP connection rather than
    /// re-negotiated per request (NTLM, Negotiate).
    fn is_connection_based(&self) -> bool;

    /// The request header the response value belongs in.
    fn response_header(&self, proxy: bool) -> HeaderName {
        if proxy {
            PROXY_AUTHORIZATION
        } else {
            AUTHORIZATION
        }
    }

    /// Produces the response header value.
    ///
    /// `Ok(None)` is reserved for connection-based schemes whose native
    /// exchange failed: the failure has been logged and the scheme moved
    /// to its error state; the caller treats it as a failed
    /// authentication, not an error to propagate.
    fn authenticate(
        &mut self,
        scope: &AuthScope,
        credentials: &Credentials,
        request: &Request,
    ) -> Result<Option<String>>;
}

/// Runs `authenticate` and attaches the produced value to the request.
///
/// Returns `false` when the scheme swallowed a native failure and no
/// header was written.
pub fn apply_response_header(
    scheme: &mut dyn AuthScheme,
    scope: &AuthScope,
    credentials: &Credentials,
    request: &mut Request,
    proxy: bool,
) -> Result<bool> {
    let value = scheme.authenticate(scope, credentials, request)?;
    match value {
        Some(value) => {
            let name = scheme.response_header(proxy);
            request.set_header(name, &value)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Challenge parameter storage shared by the RFC 2617 schemes.
#[derive(Debug, Default, Clone)]
pub(crate) struct ChallengeParams {
    params: HashMap<String, String>,
}

impl ChallengeParams {
    /// Parses `challenge`, verifying its scheme token against
    /// `expected_scheme` (a lowercase identifier).
    pub(crate) fn parse(expected_scheme: &str, challenge: &str) -> Result<ChallengeParams> {
        let scheme = challenge::extract_scheme(challenge)?;
        if scheme != expected_scheme {
            return Err(error::malformed(format!(
                "invalid {} challenge: {:?}",
                expected_scheme, challenge
            )));
        }
        Ok(ChallengeParams {
            params: challenge::extract_params(challenge)?,
        })
    }

    pub(crate) fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub(crate) fn realm(&self) -> Option<&str> {
        self.get("realm")
    }
}

/// Appends one `name=value` parameter to a header value under RFC 2617
/// quoting rules, escaping quotes and backslashes inside quoted values.
pub(crate) fn format_parameter(buffer: &mut String, name: &str, value: &str, quote: bool) {
    buffer.push_str(name);
    buffer.push('=');
    if quote {
        buffer.push('"');
        for c in value.chars() {
            if c == '"' || c == '\\' {
                buffer.push('\\');
            }
            buffer.push(c);
        }
        buffer.push('"');
    } else {
        buffer.push_str(value);
    }
}
