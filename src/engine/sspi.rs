// src/engine/sspi.rs

//! Windows SSPI (Security Support Provider Interface) engine for
//! Kerberos/NTLM authentication.
//!
//! NOTE: This is a stub implementation. Full SSPI support requires proper
//! Windows FFI bindings that are not fully available in the current
//! windows crate version (v0.59).
//!
//! To properly implement this, we would need:
//! - CredHandle and CtxtHandle types
//! - SEC_WINNT_AUTH_IDENTITY structure
//! - Proper AcquireCredentialsHandleW and InitializeSecurityContextW signatures
//!
//! Until then the engine reports itself unavailable and
//! [`crate::engine::platform_default`] returns `None`; the NTLM/Negotiate
//! schemes stay exercisable through any other [`SecurityContextEngine`]
//! implementation.

use crate::engine::{
    EngineCredentials, SecurityContext, SecurityContextEngine, SecurityPackage,
};
use crate::{error, Result};

/// SSPI-backed engine.
#[derive(Debug)]
pub(crate) struct SspiEngine {
    _priv: (),
}

impl SspiEngine {
    pub(crate) fn new() -> SspiEngine {
        SspiEngine { _priv: () }
    }
}

impl SecurityContextEngine for SspiEngine {
    fn is_available(&self) -> bool {
        // TODO: probe AcquireCredentialsHandleW once the windows crate
        // exposes the full SSPI surface.
        false
    }

    fn supports_default_credentials(&self) -> bool {
        false
    }

    fn supports_specified_credentials(&self) -> bool {
        false
    }

    fn create_context(
        &self,
        package: SecurityPackage,
        _spn: &str,
        _credentials: &EngineCredentials,
    ) -> Result<Box<dyn SecurityContext>> {
        Err(error::engine(format!(
            "SSPI {} context not supported: windows crate lacks required FFI",
            package.name()
        )))
    }
}
