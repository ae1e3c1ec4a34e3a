// src/error.rs

//! Error types surfaced by the authentication layer.
//!
//! The taxonomy mirrors the protocol: a challenge can be syntactically bad
//! (`MalformedChallenge`), a response can fail to be produced
//! (`Authentication`, with `InvalidCredentials` as the credential-type
//! mismatch case), the whole challenge set can be unanswerable (`Challenge`),
//! or a policy gate can refuse to proceed (`Security`). `Protocol` covers
//! method-layer violations such as resending an exhausted stream entity.

use std::error::Error as StdError;
use std::fmt;

/// A `Result` alias where the `Err` case is `authwire::Error`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// The error type produced by challenge parsing, scheme selection and
/// credential-response generation.
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    message: String,
    source: Option<BoxError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    /// Challenge header violates the scheme grammar.
    MalformedChallenge,
    /// General failure producing or validating a credential response.
    Authentication,
    /// Credential type not usable with the bound scheme.
    InvalidCredentials,
    /// No scheme could be selected from the challenge set.
    Challenge,
    /// Security policy violation, e.g. Basic over plaintext.
    Security,
    /// Operation not legal in the current authentication state.
    State,
    /// HTTP method-layer contract violation, e.g. non-repeatable resend.
    Protocol,
    /// Native security context engine failure.
    Engine,
}

impl Error {
    pub(crate) fn new(kind: Kind, message: impl Into<String>) -> Error {
        Error {
            inner: Box::new(Inner {
                kind,
                message: message.into(),
                source: None,
            }),
        }
    }

    pub(crate) fn with_source(mut self, source: impl Into<BoxError>) -> Error {
        self.inner.source = Some(source.into());
        self
    }

    /// True if the challenge header could not be parsed for its scheme.
    pub fn is_malformed_challenge(&self) -> bool {
        matches!(self.inner.kind, Kind::MalformedChallenge)
    }

    /// True for any failure to produce or validate a credential response,
    /// including credential-type mismatches.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self.inner.kind,
            Kind::Authentication | Kind::InvalidCredentials
        )
    }

    /// True if the supplied credentials cannot be used with the scheme.
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self.inner.kind, Kind::InvalidCredentials)
    }

    /// True if no acceptable scheme could be selected from the challenge set.
    /// This is the terminal "cannot authenticate" signal.
    pub fn is_challenge(&self) -> bool {
        matches!(self.inner.kind, Kind::Challenge)
    }

    /// True for security-policy refusals such as Basic over plaintext.
    pub fn is_security(&self) -> bool {
        matches!(self.inner.kind, Kind::Security)
    }

    /// True if the operation was not legal in the current state.
    pub fn is_state(&self) -> bool {
        matches!(self.inner.kind, Kind::State)
    }

    /// True for method-layer protocol violations.
    pub fn is_protocol(&self) -> bool {
        matches!(self.inner.kind, Kind::Protocol)
    }

    /// True for native security context engine failures.
    pub fn is_engine(&self) -> bool {
        matches!(self.inner.kind, Kind::Engine)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("authwire::Error");
        builder.field("kind", &self.inner.kind);
        builder.field("message", &self.inner.message);
        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }
        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.inner.kind {
            Kind::MalformedChallenge => "malformed challenge",
            Kind::Authentication => "authentication error",
            Kind::InvalidCredentials => "invalid credentials",
            Kind::Challenge => "challenge error",
            Kind::Security => "authentication security error",
            Kind::State => "illegal authentication state",
            Kind::Protocol => "protocol error",
            Kind::Engine => "security context engine error",
        };
        write!(f, "{}: {}", prefix, self.inner.message)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

// Constructor helpers, one per kind.

pub(crate) fn malformed(message: impl Into<String>) -> Error {
    Error::new(Kind::MalformedChallenge, message)
}

pub(crate) fn authentication(message: impl Into<String>) -> Error {
    Error::new(Kind::Authentication, message)
}

pub(crate) fn invalid_credentials(message: impl Into<String>) -> Error {
    Error::new(Kind::InvalidCredentials, message)
}

pub(crate) fn challenge(message: impl Into<String>) -> Error {
    Error::new(Kind::Challenge, message)
}

pub(crate) fn security(message: impl Into<String>) -> Error {
    Error::new(Kind::Security, message)
}

pub(crate) fn state(message: impl Into<String>) -> Error {
    Error::new(Kind::State, message)
}

pub(crate) fn protocol(message: impl Into<String>) -> Error {
    Error::new(Kind::Protocol, message)
}

pub(crate) fn engine(message: impl Into<String>) -> Error {
    Error::new(Kind::Engine, message)
}
