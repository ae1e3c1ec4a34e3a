// src/lib.rs

//! HTTP client authentication negotiation.
//!
//! `authwire` implements the client half of HTTP authentication: parsing
//! `WWW-Authenticate`/`Proxy-Authenticate` challenges, selecting a scheme
//! by configured priority and credential compatibility, and producing
//! `Authorization`/`Proxy-Authorization` header values for Basic, Digest,
//! NTLM, Negotiate (Kerberos/SPNEGO), Cookie, Bearer (JWT) and WRAP.
//!
//! The transport layer stays outside this crate: callers hand in a
//! [`Request`] view of the outgoing request and attach the returned header
//! values before resending. Request bodies go through the
//! [`entity::RequestEntity`] framework, which makes repeatability explicit
//! so a challenge-driven resend never replays an exhausted stream.
//!
//! # Flow
//!
//! 1. The server answers 401/407 with one or more challenge headers.
//! 2. [`challenge::parse_response_challenges`] builds the scheme→challenge map.
//! 3. [`AuthChallengeProcessor::process_challenge`] selects and binds a
//!    scheme on the request's [`AuthState`] and feeds it the challenge.
//! 4. [`scheme::apply_response_header`] produces the response value from
//!    the credentials and attaches it to the request.
//!
//! NTLM and Negotiate run their multi-step native exchanges through the
//! [`engine::SecurityContextEngine`] boundary; native failures surface as
//! a failed authentication, not as errors thrown from inside the exchange.

pub mod challenge;
pub mod credentials;
pub mod engine;
pub mod entity;
pub mod error;
pub mod processor;
pub mod request;
pub mod scheme;
pub mod scope;
pub mod state;

pub use crate::credentials::{Credentials, CredentialsProvider, CredentialsStore};
pub use crate::error::{Error, Result};
pub use crate::processor::{AuthChallengeProcessor, AuthPolicy};
pub use crate::request::Request;
pub use crate::scheme::AuthScheme;
pub use crate::scope::AuthScope;
pub use crate::state::AuthState;
