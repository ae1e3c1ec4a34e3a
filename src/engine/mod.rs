// src/engine/mod.rs

//! The native security context boundary used by the NTLM and Negotiate
//! schemes.
//!
//! Platform security libraries (SSPI on Windows, GSSAPI elsewhere) are
//! abstracted behind [`SecurityContextEngine`]; the scheme layer only sees
//! opaque token exchanges. Engine calls are synchronous and may block in
//! platform code; they are bounded by the surrounding HTTP request's own
//! timeout, not cancelled here.

#[cfg(all(windows, feature = "negotiate"))]
pub(crate) mod sspi;

use std::fmt;
use std::sync::Arc;

use crate::Result;

/// The security package a context negotiates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityPackage {
    Ntlm,
    Negotiate,
}

impl SecurityPackage {
    /// The package name as the platform security library expects it.
    pub fn name(&self) -> &'static str {
        match self {
            SecurityPackage::Ntlm => "NTLM",
            SecurityPackage::Negotiate => "Negotiate",
        }
    }
}

/// Credentials as the native layer consumes them.
#[derive(Clone)]
pub enum EngineCredentials {
    /// The account of the current process.
    Default,
    /// An explicit account. `domain` is empty for local accounts.
    Specified {
        username: String,
        domain: String,
        password: String,
    },
}

impl fmt::Debug for EngineCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineCredentials::Default => f.write_str("Default"),
            EngineCredentials::Specified { username, domain, .. } => f
                .debug_struct("Specified")
                .field("username", username)
                .field("domain", domain)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// A provider of native security contexts.
///
/// Implementations wrap a platform security library. Capability queries let
/// the scheme layer decide up front whether an exchange can be attempted
/// with the credentials at hand.
pub trait SecurityContextEngine: Send + Sync + fmt::Debug {
    /// Whether the underlying platform library can be used at all.
    fn is_available(&self) -> bool;

    /// Whether the engine can authenticate as the current process account.
    fn supports_default_credentials(&self) -> bool;

    /// Whether the engine accepts explicit username/domain/password.
    fn supports_specified_credentials(&self) -> bool;

    /// Creates a client context bound to the target service.
    ///
    /// `spn` is the service principal name, `HTTP/<host>` for HTTP
    /// authentication.
    fn create_context(
        &self,
        package: SecurityPackage,
        spn: &str,
        credentials: &EngineCredentials,
    ) -> Result<Box<dyn SecurityContext>>;
}

/// One client side of a multi-step token exchange.
///
/// The handle owns native resources; [`SecurityContext::dispose`] releases
/// them and must be idempotent. Dropping an undisposed context disposes it.
/// Contexts travel with the scheme that owns them, so they must be `Send`.
pub trait SecurityContext: Send {
    /// Feeds the server's token (if any) and produces the next client
    /// token to send.
    fn step(&mut self, input: Option<&[u8]>) -> Result<Vec<u8>>;

    /// True once the exchange needs no further round trips.
    fn is_complete(&self) -> bool;

    /// Releases native resources. Safe to call more than once.
    fn dispose(&mut self);
}

/// Derives the service principal name for an HTTP target.
///
/// For HTTP authentication the SPN format is `HTTP/<hostname>`.
pub fn derive_spn(url: &url::Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| crate::error::engine("URL has no host for SPN"))?;
    Ok(format!("HTTP/{}", host))
}

/// The platform's default engine, if one exists for this target.
pub fn platform_default() -> Option<Arc<dyn SecurityContextEngine>> {
    #[cfg(all(windows, feature = "negotiate"))]
    {
        let engine = sspi::SspiEngine::new();
        if engine.is_available() {
            return Some(Arc::new(engine));
        }
    }
    None
}
