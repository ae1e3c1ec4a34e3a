// src/request.rs

//! The request view the authentication core works against.
//!
//! The transport layer owns connection handling; schemes only need the
//! request method, target URI, header map, the negotiated credential
//! charset, and the enclosed entity. [`Request`] is that contract.

use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use http::{HeaderMap, Method};
use url::Url;

use crate::entity::RequestEntity;
use crate::{error, Result};

/// Charset used to encode credentials unless the caller overrides it.
pub const DEFAULT_CREDENTIAL_CHARSET: &str = "ISO-8859-1";

/// An outgoing HTTP request as seen by the authentication layer.
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    credential_charset: String,
    entity: Option<Box<dyn RequestEntity>>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Request {
        Request {
            method,
            url,
            headers: HeaderMap::new(),
            credential_charset: DEFAULT_CREDENTIAL_CHARSET.to_string(),
            entity: None,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Whether the request travels over TLS.
    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// The request-URI as it appears in the request line: path plus query.
    pub fn request_uri(&self) -> String {
        let mut uri = self.url.path().to_string();
        if let Some(query) = self.url.query() {
            uri.push('?');
            uri.push_str(query);
        }
        uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets a header, replacing any previous value.
    pub fn set_header(&mut self, name: HeaderName, value: &str) -> Result<()> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| error::protocol(format!("invalid {} header", name)).with_source(e))?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// The charset credentials are encoded in on the wire.
    pub fn credential_charset(&self) -> &str {
        &self.credential_charset
    }

    pub fn set_credential_charset(&mut self, charset: impl Into<String>) {
        self.credential_charset = charset.into();
    }

    pub fn set_entity(&mut self, entity: Box<dyn RequestEntity>) {
        self.entity = Some(entity);
    }

    pub fn entity_mut(&mut self) -> Option<&mut (dyn RequestEntity + '_)> {
        self.entity.as_mut().map(|e| &mut **e as _)
    }

    /// Derives `Content-Type` and `Content-Length` (or chunked
    /// `Transfer-Encoding`) from the enclosed entity. No-op without one.
    pub fn apply_entity_headers(&mut self) -> Result<()> {
        let (content_type, length) = match self.entity.as_mut() {
            Some(entity) => (entity.content_type(), entity.content_length()),
            None => return Ok(()),
        };

        if let Some(content_type) = content_type {
            if !self.headers.contains_key(CONTENT_TYPE) {
                self.set_header(CONTENT_TYPE, &content_type)?;
            }
        }
        if length >= 0 {
            self.set_header(CONTENT_LENGTH, &length.to_string())?;
        } else {
            self.set_header(TRANSFER_ENCODING, "chunked")?;
        }
        Ok(())
    }

    /// Fails fast when a resend would replay a non-repeatable entity.
    ///
    /// `repeat_count` is the number of sends already performed; the first
    /// send (`repeat_count == 0`) is always allowed.
    pub fn prepare_retry(&mut self, repeat_count: usize) -> Result<()> {
        if repeat_count == 0 {
            return Ok(());
        }
        if let Some(entity) = &self.entity {
            if !entity.is_repeatable() {
                return Err(error::protocol(
                    "unbuffered entity enclosing request cannot be repeated",
                ));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("has_entity", &self.entity.is_some())
            .finish()
    }
}
