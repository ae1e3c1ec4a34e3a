// src/scheme/token.rs

//! Token-bearing schemes: Cookie, Bearer (JWT) and WRAP.
//!
//! None of these is a true challenge/response protocol — the credential is
//! attached as-is and a single round trip settles the outcome. Cookie
//! operates preemptively only: servers never issue a cookie challenge, so
//! its `process_challenge` always rejects.

use http::header::{HeaderName, COOKIE};

use super::{AuthScheme, ChallengeParams};
use crate::credentials::Credentials;
use crate::request::Request;
use crate::scope::AuthScope;
use crate::{error, Result};

/// Preemptive cookie authentication: the cookie value goes into the
/// `Cookie` request header verbatim.
#[derive(Debug, Default)]
pub struct CookieScheme {
    _priv: (),
}

impl CookieScheme {
    pub fn new() -> CookieScheme {
        CookieScheme::default()
    }
}

impl AuthScheme for CookieScheme {
    fn scheme_name(&self) -> &'static str {
        "cookie"
    }

    fn wire_scheme(&self) -> &'static str {
        "Cookie"
    }

    fn supports_credentials(&self, credentials: &Credentials) -> bool {
        matches!(credentials, Credentials::Cookie { .. })
    }

    fn process_challenge(&mut self, challenge: &str) -> Result<()> {
        // servers never challenge for cookies
        Err(error::malformed(format!(
            "cookie authentication is preemptive only, cannot process challenge: {:?}",
            challenge
        )))
    }

    fn is_complete(&self) -> bool {
        true
    }

    fn is_connection_based(&self) -> bool {
        false
    }

    fn response_header(&self, _proxy: bool) -> HeaderName {
        COOKIE
    }

    fn authenticate(
        &mut self,
        _scope: &AuthScope,
        credentials: &Credentials,
        _request: &Request,
    ) -> Result<Option<String>> {
        match credentials {
            Credentials::Cookie { value } => Ok(Some(value.clone())),
            _ => Err(error::invalid_credentials(
                "credentials cannot be used for cookie authentication",
            )),
        }
    }
}

/// Bearer token (JWT) authentication: `Authorization: Bearer <token>`.
#[derive(Debug, Default)]
pub struct JwtScheme {
    _priv: (),
}

impl JwtScheme {
    pub fn new() -> JwtScheme {
        JwtScheme::default()
    }
}

impl AuthScheme for JwtScheme {
    fn scheme_name(&self) -> &'static str {
        "bearer"
    }

    fn wire_scheme(&self) -> &'static str {
        "Bearer"
    }

    fn supports_credentials(&self, credentials: &Credentials) -> bool {
        matches!(credentials, Credentials::Jwt { .. })
    }

    fn process_challenge(&mut self, challenge: &str) -> Result<()> {
        // a Bearer challenge carries no state we need; only verify the token
        let scheme = crate::challenge::extract_scheme(challenge)?;
        if scheme != self.scheme_name() {
            return Err(error::malformed(format!(
                "invalid Bearer challenge: {:?}",
                challenge
            )));
        }
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
        _request: &Request,
    ) -> Result<Option<String>> {
        match credentials {
            Credentials::Jwt { token } => Ok(Some(format!("Bearer {}", token))),
            _ => Err(error::invalid_credentials(
                "credentials cannot be used for bearer authentication",
            )),
        }
    }
}

/// WRAP (Simple Web Token) authentication:
/// `Authorization: WRAP access_token="<token>"`.
#[derive(Debug, Default)]
pub struct WrapScheme {
    params: Option<ChallengeParams>,
}

impl WrapScheme {
    pub fn new() -> WrapScheme {
        WrapScheme::default()
    }
}

impl AuthScheme for WrapScheme {
    fn scheme_name(&self) -> &'static str {
        "wrap"
    }

    fn wire_scheme(&self) -> &'static str {
        "WRAP"
    }

    fn supports_credentials(&self, credentials: &Credentials) -> bool {
        matches!(credentials, Credentials::Wrap { .. })
    }

    fn process_challenge(&mut self, challenge: &str) -> Result<()> {
        let scheme = crate::challenge::extract_scheme(challenge)?;
        if scheme != self.scheme_name() {
            return Err(error::malformed(format!(
                "invalid WRAP challenge: {:?}",
                challenge
            )));
        }
        // the challenge may carry a realm; keep it if parseable
        self.params = ChallengeParams::parse(self.scheme_name(), challenge).ok();
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
        _request: &Request,
    ) -> Result<Option<String>> {
        match credentials {
            Credentials::Wrap { token } => {
                let mut value = String::from("WRAP ");
                super::format_parameter(&mut value, "access_token", token, true);
                Ok(Some(value))
            }
            _ => Err(error::invalid_credentials(
                "credentials cannot be used for WRAP authentication",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use url::Url;

    fn request() -> Request {
        Request::new(Method::GET, Url::parse("https://host/").unwrap())
    }

    #[test]
    fn test_cookie_rejects_challenges() {
        let mut scheme = CookieScheme::new();
        let err = scheme.process_challenge("Cookie anything").unwrap_err();
        assert!(err.is_malformed_challenge());
        assert!(scheme.is_complete());
    }

    #[test]
    fn test_cookie_writes_cookie_header() {
        let mut scheme = CookieScheme::new();
        assert_eq!(scheme.response_header(false), COOKIE);
        assert_eq!(scheme.response_header(true), COOKIE);

        let creds = Credentials::cookie("FedAuth=abc123");
        let value = scheme
            .authenticate(&AuthScope::any(), &creds, &request())
            .unwrap()
            .unwrap();
        assert_eq!(value, "FedAuth=abc123");
    }

    #[test]
    fn test_bearer_header_value() {
        let mut scheme = JwtScheme::new();
        scheme.process_challenge("Bearer").unwrap();
        assert!(scheme.is_complete());

        let creds = Credentials::jwt("eyJhbGci.payload.sig");
        let value = scheme
            .authenticate(&AuthScope::any(), &creds, &request())
            .unwrap()
            .unwrap();
        assert_eq!(value, "Bearer eyJhbGci.payload.sig");
    }

    #[test]
    fn test_bearer_wrong_challenge() {
        let mut scheme = JwtScheme::new();
        let err = scheme.process_challenge("Basic realm=\"x\"").unwrap_err();
        assert!(err.is_malformed_challenge());
    }

    #[test]
    fn test_wrap_header_value() {
        let mut scheme = WrapScheme::new();
        scheme
            .process_challenge("WRAP realm=\"https://host/\"")
            .unwrap();

        let creds = Credentials::wrap("swt-token");
        let value = scheme
            .authenticate(&AuthScope::any(), &creds, &request())
            .unwrap()
            .unwrap();
        assert_eq!(value, "WRAP access_token=\"swt-token\"");
    }

    #[test]
    fn test_credential_type_filtering() {
        let cookie = CookieScheme::new();
        let bearer = JwtScheme::new();
        let wrap = WrapScheme::new();
        let up = Credentials::username_password("u", "p");

        assert!(!cookie.supports_credentials(&up));
        assert!(!bearer.supports_credentials(&up));
        assert!(!wrap.supports_credentials(&up));

        assert!(cookie.supports_credentials(&Credentials::cookie("c")));
        assert!(bearer.supports_credentials(&Credentials::jwt("j")));
        assert!(wrap.supports_credentials(&Credentials::wrap("w")));
    }
}
