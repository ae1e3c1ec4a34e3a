// src/scheme/digest.rs

//! HTTP Digest authentication as defined in RFC 2617.
//!
//! Both MD5 (default) and MD5-sess are supported. Only `qop=auth` or a
//! missing qop is supported; `qop=auth-int` is rejected at authentication
//! time because the entity body hash is not available at this layer. When
//! both auth and auth-int are offered, auth is used.

use std::time::{SystemTime, UNIX_EPOCH};

use md5::{Digest as _, Md5};

use super::{format_parameter, AuthScheme, ChallengeParams};
use crate::credentials::Credentials;
use crate::request::Request;
use crate::scope::AuthScope;
use crate::{error, Result};

/// The nonce-count is always 1.
///
/// Known limitation: the count never increments across repeated
/// authentications against the same nonce, so a server enforcing
/// nonce-count monotonicity will interpret a repeated request as a replay.
const NC: &str = "00000001";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QopVariant {
    Missing,
    Auth,
    AuthInt,
}

impl QopVariant {
    fn as_str(&self) -> &'static str {
        match self {
            QopVariant::AuthInt => "auth-int",
            _ => "auth",
        }
    }
}

/// Digest scheme state for one authentication attempt.
#[derive(Debug)]
pub struct DigestScheme {
    params: Option<ChallengeParams>,
    qop_variant: QopVariant,
    cnonce: String,
    complete: bool,
}

impl Default for DigestScheme {
    fn default() -> Self {
        Self::new()
    }
}

impl DigestScheme {
    pub fn new() -> DigestScheme {
        DigestScheme {
            params: None,
            qop_variant: QopVariant::Missing,
            cnonce: String::new(),
            complete: false,
        }
    }

    pub fn realm(&self) -> Option<&str> {
        self.params.as_ref().and_then(ChallengeParams::realm)
    }

    fn param(&self, name: &str) -> Option<&str> {
        self.params.as_ref().and_then(|p| p.get(name))
    }

    /// Computes the response digest per RFC 2617 section 3.2.2.
    fn create_digest(
        &self,
        username: &str,
        password: &str,
        method: &str,
        uri: &str,
        charset: &str,
    ) -> Result<String> {
        // processed challenge guarantees these
        let realm = self
            .param("realm")
            .ok_or_else(|| error::authentication("digest challenge not processed"))?;
        let nonce = self
            .param("nonce")
            .ok_or_else(|| error::authentication("digest challenge not processed"))?;
        let algorithm = self.param("algorithm").unwrap_or("MD5");

        if self.qop_variant == QopVariant::AuthInt {
            log::warn!("qop=auth-int is not supported");
            return Err(error::authentication(
                "unsupported qop in HTTP Digest authentication",
            ));
        }

        // 3.2.2.2: A1
        let mut a1 = format!("{}:{}:{}", username, realm, password);
        if algorithm == "MD5-sess" {
            // H( unq(username) ":" unq(realm) ":" passwd ) ":" nonce ":" cnonce
            let session_key = hash_hex(&encode_charset(&a1, charset));
            a1 = format!("{}:{}:{}", session_key, nonce, self.cnonce);
        } else if algorithm != "MD5" {
            log::warn!("unhandled digest algorithm {} requested", algorithm);
        }
        let md5a1 = hash_hex(&encode_charset(&a1, charset));

        // 3.2.2.3: A2 (auth or missing qop only)
        let a2 = format!("{}:{}", method, uri);
        let md5a2 = hash_hex(a2.as_bytes());

        // 3.2.2.1: request-digest
        let digest_value = if self.qop_variant == QopVariant::Missing {
            log::debug!("using null qop method");
            format!("{}:{}:{}", md5a1, nonce, md5a2)
        } else {
            format!(
                "{}:{}:{}:{}:{}:{}",
                md5a1,
                nonce,
                NC,
                self.cnonce,
                self.qop_variant.as_str(),
                md5a2
            )
        };
        Ok(hash_hex(digest_value.as_bytes()))
    }

    /// Assembles the digest-response parameter list.
    ///
    /// Field order: username, realm, nonce, uri, response, then qop/nc/cnonce
    /// when a qop is in effect, then algorithm and opaque when present.
    /// Everything is quoted except `nc` and `qop`.
    fn create_digest_header(
        &self,
        username: &str,
        uri: &str,
        digest: &str,
    ) -> Result<String> {
        let realm = self
            .param("realm")
            .ok_or_else(|| error::authentication("digest challenge not processed"))?;
        let nonce = self
            .param("nonce")
            .ok_or_else(|| error::authentication("digest challenge not processed"))?;

        let mut fields: Vec<(&str, &str, bool)> = vec![
            ("username", username, true),
            ("realm", realm, true),
            ("nonce", nonce, true),
            ("uri", uri, true),
            ("response", digest, true),
        ];
        if self.qop_variant != QopVariant::Missing {
            fields.push(("qop", self.qop_variant.as_str(), false));
            fields.push(("nc", NC, false));
            fields.push(("cnonce", &self.cnonce, true));
        }
        if let Some(algorithm) = self.param("algorithm") {
            fields.push(("algorithm", algorithm, true));
        }
        if let Some(opaque) = self.param("opaque") {
            fields.push(("opaque", opaque, true));
        }

        let mut buffer = String::new();
        for (i, (name, value, quote)) in fields.iter().enumerate() {
            if i > 0 {
                buffer.push_str(", ");
            }
            format_parameter(&mut buffer, name, value, *quote);
        }
        Ok(buffer)
    }

    #[cfg(test)]
    fn set_cnonce(&mut self, cnonce: &str) {
        self.cnonce = cnonce.to_string();
    }
}

impl AuthScheme for DigestScheme {
    fn scheme_name(&self) -> &'static str {
        "digest"
    }

    fn wire_scheme(&self) -> &'static str {
        "Digest"
    }

    fn supports_credentials(&self, credentials: &Credentials) -> bool {
        credentials.username_password_pair().is_some()
    }

    fn process_challenge(&mut self, challenge: &str) -> Result<()> {
        let params = ChallengeParams::parse(self.scheme_name(), challenge)?;

        if params.get("realm").is_none() {
            return Err(error::malformed("missing realm in challenge"));
        }
        if params.get("nonce").is_none() {
            return Err(error::malformed("missing nonce in challenge"));
        }

        let mut unsupported_qop = false;
        self.qop_variant = QopVariant::Missing;
        if let Some(qop) = params.get("qop") {
            for variant in qop.split(',').map(str::trim) {
                if variant == "auth" {
                    // favourite, because auth-int is unsupported
                    self.qop_variant = QopVariant::Auth;
                    break;
                } else if variant == "auth-int" {
                    self.qop_variant = QopVariant::AuthInt;
                } else {
                    unsupported_qop = true;
                    log::warn!("unsupported qop detected: {}", variant);
                }
            }
        }
        if unsupported_qop && self.qop_variant == QopVariant::Missing {
            return Err(error::malformed("none of the qop methods is supported"));
        }

        self.params = Some(params);
        self.cnonce = create_cnonce();
        self.complete = true;
        Ok(())
    }

    fn is_complete(&self) -> bool {
        // a stale nonce means the server wants another round with the new
        // nonce, even though the challenge has been processed
        if self
            .param("stale")
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
        {
            return false;
        }
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
        let (username, password) = credentials.username_password_pair().ok_or_else(|| {
            error::invalid_credentials("credentials cannot be used for digest authentication")
        })?;

        let uri = request.request_uri();
        let method = request.method().as_str().to_string();
        let charset = request.credential_charset().to_string();

        let digest = self.create_digest(username, password, &method, &uri, &charset)?;
        let header = self.create_digest_header(username, &uri, &digest)?;
        Ok(Some(format!("Digest {}", header)))
    }
}

/// Lowercase hex MD5 of `data`, the 32-character form RFC 2617 specifies.
fn hash_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Creates a cnonce value by hashing the current time.
fn create_cnonce() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    hash_hex(millis.to_string().as_bytes())
}

fn encode_charset(value: &str, charset: &str) -> Vec<u8> {
    let encoding = encoding_rs::Encoding::for_label(charset.as_bytes()).unwrap_or_else(|| {
        log::warn!("unknown credential charset {:?}, falling back to UTF-8", charset);
        encoding_rs::UTF_8
    });
    let (encoded, _, _) = encoding.encode(value);
    encoded.into_owned()
}
