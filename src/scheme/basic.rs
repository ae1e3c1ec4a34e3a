// src/scheme/basic.rs

//! HTTP Basic authentication (RFC 2617 section 2), challenge-driven and
//! preemptive.
//!
//! Basic sends the password essentially in the clear, so both schemes
//! refuse to run over a plaintext connection unless the policy flag or the
//! `AUTHWIRE_INSECURE_BASIC` environment escape is set.

use base64::Engine as _;

use super::{AuthScheme, ChallengeParams};
use crate::credentials::Credentials;
use crate::request::Request;
use crate::scope::AuthScope;
use crate::{error, Result};

/// Environment escape allowing Basic over plaintext connections.
pub const INSECURE_BASIC_ENV: &str = "AUTHWIRE_INSECURE_BASIC";

/// Challenge-driven Basic scheme.
#[derive(Debug, Default)]
pub struct BasicScheme {
    params: Option<ChallengeParams>,
    complete: bool,
    allow_insecure: bool,
}

impl BasicScheme {
    pub fn new(allow_insecure: bool) -> BasicScheme {
        BasicScheme {
            params: None,
            complete: false,
            allow_insecure,
        }
    }

    /// The realm from the processed challenge, if any.
    pub fn realm(&self) -> Option<&str> {
        self.params.as_ref().and_then(ChallengeParams::realm)
    }
}

impl AuthScheme for BasicScheme {
    fn scheme_name(&self) -> &'static str {
        "basic"
    }

    fn wire_scheme(&self) -> &'static str {
        "Basic"
    }

    fn supports_credentials(&self, credentials: &Credentials) -> bool {
        credentials.username_password_pair().is_some()
    }

    fn process_challenge(&mut self, challenge: &str) -> Result<()> {
        self.params = Some(ChallengeParams::parse(self.scheme_name(), challenge)?);
        self.complete = true;
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn is_connection_based(&self) -> bool {
        false
    }

    fn authenticate(
        &mut self,
        _scope: &AuthScope,
        credentials: &Credentials,
        request: &Request,
    ) -> Result<Option<String>> {
        basic_header_value(self.allow_insecure, credentials, request).map(Some)
    }
}

/// Preemptive Basic: sends credentials before any challenge is received.
///
/// Only accepts [`Credentials::PreemptiveUsernamePassword`] — the variant
/// is the caller's explicit opt-in to authenticating unchallenged. Shares
/// the basic identifier, so a later Basic challenge continues on the
/// already-bound scheme.
#[derive(Debug, Default)]
pub struct PreemptiveBasicScheme {
    params: Option<ChallengeParams>,
}

impl PreemptiveBasicScheme {
    pub fn new() -> PreemptiveBasicScheme {
        PreemptiveBasicScheme::default()
    }
}

impl AuthScheme for PreemptiveBasicScheme {
    fn scheme_name(&self) -> &'static str {
        "basic"
    }

    fn wire_scheme(&self) -> &'static str {
        "Basic"
    }

    fn supports_credentials(&self, credentials: &Credentials) -> bool {
        matches!(credentials, Credentials::PreemptiveUsernamePassword { .. })
    }

    fn process_challenge(&mut self, challenge: &str) -> Result<()> {
        self.params = Some(ChallengeParams::parse(self.scheme_name(), challenge)?);
        Ok(())
    }

    fn is_complete(&self) -> bool {
        true
    }

    fn is_connection_based(&self) -> bool {
        false
    }

    fn authenticate(
        &mut self,
        _scope: &AuthScope,
        credentials: &Credentials,
        request: &Request,
    ) -> Result<Option<String>> {
        if !matches!(credentials, Credentials::PreemptiveUsernamePassword { .. }) {
            return Err(error::invalid_credentials(
                "preemptive basic authentication requires preemptive username/password credentials",
            ));
        }
        basic_header_value(false, credentials, request).map(Some)
    }
}

/// Builds the `Basic <base64>` header value, enforcing the plaintext gate.
fn basic_header_value(
    allow_insecure: bool,
    credentials: &Credentials,
    request: &Request,
) -> Result<String> {
    let (username, password) = credentials.username_password_pair().ok_or_else(|| {
        error::invalid_credentials("credentials cannot be used for basic authentication")
    })?;

    if !request.is_secure() && !allow_insecure && !insecure_override() {
        return Err(error::security(
            "refusing to send basic credentials over a plaintext connection",
        ));
    }

    let encoded = encode_credentials(username, password, request.credential_charset());
    Ok(format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(encoded)
    ))
}

fn insecure_override() -> bool {
    std::env::var(INSECURE_BASIC_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Encodes `username:password` in the negotiated credential charset.
fn encode_credentials(username: &str, password: &str, charset: &str) -> Vec<u8> {
    let pair = format!("{}:{}", username, password);
    let encoding = encoding_rs::Encoding::for_label(charset.as_bytes()).unwrap_or_else(|| {
        log::warn!("unknown credential charset {:?}, falling back to UTF-8", charset);
        encoding_rs::UTF_8
    });
    let (encoded, _, _) = encoding.encode(&pair);
    encoded.into_owned()
}
