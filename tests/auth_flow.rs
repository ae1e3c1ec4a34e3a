// tests/auth_flow.rs

//! End-to-end challenge/response flows.
//!
//! These tests drive the full path a request loop takes: parse the
//! response's challenge headers, select and bind a scheme on the request's
//! auth state, and produce the outgoing header value. NTLM/Negotiate runs
//! against a mock security context engine; real platform exchanges need a
//! domain environment and are out of reach here.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use base64::Engine as _;
use http::header::{AUTHORIZATION, COOKIE, WWW_AUTHENTICATE};
use http::{HeaderMap, HeaderValue, Method};
use url::Url;

use authwire::challenge::parse_response_challenges;
use authwire::engine::{
    EngineCredentials, SecurityContext, SecurityContextEngine, SecurityPackage,
};
use authwire::scheme::apply_response_header;
use authwire::{
    AuthChallengeProcessor, AuthPolicy, AuthScope, AuthState, Credentials, Request,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn request(url: &str) -> Request {
    Request::new(Method::GET, Url::parse(url).unwrap())
}

fn challenge_headers(values: &[&str]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for value in values {
        headers.append(WWW_AUTHENTICATE, HeaderValue::from_str(value).unwrap());
    }
    headers
}

fn challenges(values: &[&str]) -> HashMap<String, String> {
    parse_response_challenges(&challenge_headers(values), false).unwrap()
}

#[test]
fn test_basic_flow_over_https() {
    init_logs();
    let processor = AuthChallengeProcessor::new(AuthPolicy::new());
    let mut state = AuthState::new();
    let mut req = request("https://host/protected");
    let creds = Credentials::username_password("u", "p");

    let set = challenges(&["Basic realm=\"x\""]);
    let scheme = processor
        .process_challenge(&mut state, &set, Some(&creds))
        .unwrap();
    assert_eq!(scheme.scheme_name(), "basic");
    assert!(scheme.is_complete());

    let scope = AuthScope::host_port("host", 443);
    let written = apply_response_header(
        state.scheme_mut().unwrap(),
        &scope,
        &creds,
        &mut req,
        false,
    )
    .unwrap();
    assert!(written);
    assert_eq!(req.headers()[AUTHORIZATION], "Basic dTpw");
}

#[test]
fn test_basic_flow_over_plaintext_refused() {
    let processor = AuthChallengeProcessor::new(AuthPolicy::new());
    let mut state = AuthState::new();
    let mut req = request("http://host/protected");
    let creds = Credentials::username_password("u", "p");

    let set = challenges(&["Basic realm=\"x\""]);
    processor
        .process_challenge(&mut state, &set, Some(&creds))
        .unwrap();

    let err = apply_response_header(
        state.scheme_mut().unwrap(),
        &AuthScope::any(),
        &creds,
        &mut req,
        false,
    )
    .unwrap_err();
    assert!(err.is_security());
    assert!(!req.headers().contains_key(AUTHORIZATION));
}

#[test]
fn test_priority_list_prefers_digest_over_basic() {
    let processor = AuthChallengeProcessor::new(
        AuthPolicy::new().with_priority(["ntlm", "digest", "basic"]),
    );
    let set = challenges(&["Basic realm=\"x\"", "Digest realm=\"x\", nonce=\"n\""]);

    let scheme = processor.select_auth_scheme(&set, None).unwrap();
    assert_eq!(scheme.scheme_name(), "digest");
}

#[test]
fn test_digest_flow_produces_authorization() {
    let processor = AuthChallengeProcessor::new(AuthPolicy::new());
    let mut state = AuthState::new();
    let mut req = request("https://host/dir/index.html");
    let creds = Credentials::username_password("user", "secret");

    let set = challenges(&["Digest realm=\"r\", nonce=\"abc\", qop=\"auth\""]);
    processor
        .process_challenge(&mut state, &set, Some(&creds))
        .unwrap();

    apply_response_header(
        state.scheme_mut().unwrap(),
        &AuthScope::any(),
        &creds,
        &mut req,
        false,
    )
    .unwrap();

    let value = req.headers()[AUTHORIZATION].to_str().unwrap();
    assert!(value.starts_with("Digest "));
    assert!(value.contains("username=\"user\""));
    assert!(value.contains("nc=00000001"));
    assert!(value.contains("uri=\"/dir/index.html\""));
}

#[test]
fn test_unanswerable_challenges_fail_selection() {
    let processor = AuthChallengeProcessor::new(AuthPolicy::new());
    let mut state = AuthState::new();

    let set = challenges(&["Unsupported realm=\"x\""]);
    let err = processor
        .process_challenge(&mut state, &set, None)
        .unwrap_err();
    assert!(err.is_challenge());
    assert!(state.scheme().is_none());
}

#[test]
fn test_preemptive_cookie_writes_cookie_header() {
    let mut state = AuthState::new();
    let creds = Credentials::cookie("FedAuth=token");
    state.set_preemptive(&creds).unwrap();
    assert!(state.is_preemptive());

    let mut req = request("https://host/");
    apply_response_header(
        state.scheme_mut().unwrap(),
        &AuthScope::any(),
        &creds,
        &mut req,
        false,
    )
    .unwrap();
    assert_eq!(req.headers()[COOKIE], "FedAuth=token");
    assert!(!req.headers().contains_key(AUTHORIZATION));
}

#[test]
fn test_preemptive_bearer_then_challenge_switch() {
    let processor = AuthChallengeProcessor::new(AuthPolicy::new());
    let mut state = AuthState::new();
    state.set_preemptive(&Credentials::jwt("t")).unwrap();

    // the server ignored the bearer token and challenged with digest;
    // binding the selected digest scheme clears the preemptive state
    let set = challenges(&["Digest realm=\"r\", nonce=\"n\""]);
    let creds = Credentials::username_password("u", "p");
    let scheme = processor
        .process_challenge(&mut state, &set, Some(&creds))
        .map(|s| s.scheme_name());

    // the bound bearer scheme gets no bearer challenge: protocol violation
    assert!(scheme.is_err());

    state.invalidate();
    let scheme = processor
        .process_challenge(&mut state, &set, Some(&creds))
        .unwrap();
    assert_eq!(scheme.scheme_name(), "digest");
    assert!(!state.is_preemptive());
}

// --- NTLM over a mock engine -------------------------------------------

#[derive(Debug)]
struct MockEngine {
    disposals: Arc<AtomicUsize>,
}

struct MockContext {
    steps: usize,
    disposed: bool,
    disposals: Arc<AtomicUsize>,
}

impl SecurityContextEngine for MockEngine {
    fn is_available(&self) -> bool {
        true
    }

    fn supports_default_credentials(&self) -> bool {
        true
    }

    fn supports_specified_credentials(&self) -> bool {
        true
    }

    fn create_context(
        &self,
        _package: SecurityPackage,
        _spn: &str,
        _credentials: &EngineCredentials,
    ) -> authwire::Result<Box<dyn SecurityContext>> {
        Ok(Box::new(MockContext {
            steps: 0,
            disposed: false,
            disposals: Arc::clone(&self.disposals),
        }))
    }
}

impl SecurityContext for MockContext {
    fn step(&mut self, _input: Option<&[u8]>) -> authwire::Result<Vec<u8>> {
        self.steps += 1;
        Ok(format!("ntlm-msg-{}", self.steps).into_bytes())
    }

    fn is_complete(&self) -> bool {
        self.steps >= 2
    }

    fn dispose(&mut self) {
        if !self.disposed {
            self.disposed = true;
            self.disposals.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MockContext {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[test]
fn test_ntlm_exchange_through_processor() {
    init_logs();
    let disposals = Arc::new(AtomicUsize::new(0));
    let engine: Arc<dyn SecurityContextEngine> = Arc::new(MockEngine {
        disposals: Arc::clone(&disposals),
    });
    let processor = AuthChallengeProcessor::new(AuthPolicy::new().with_engine(engine));
    let mut state = AuthState::new();
    let mut req = request("http://server.corp.com/");
    let creds = Credentials::DefaultNT;

    // round 1: bare NTLM challenge
    let set = challenges(&["NTLM"]);
    let scheme = processor
        .process_challenge(&mut state, &set, Some(&creds))
        .unwrap();
    assert_eq!(scheme.scheme_name(), "ntlm");
    assert!(!scheme.is_complete());
    assert!(scheme.is_connection_based());

    let written = apply_response_header(
        state.scheme_mut().unwrap(),
        &AuthScope::any(),
        &creds,
        &mut req,
        false,
    )
    .unwrap();
    assert!(written);
    let value = req.headers()[AUTHORIZATION].to_str().unwrap();
    let expected = base64::engine::general_purpose::STANDARD.encode("ntlm-msg-1");
    assert_eq!(value, format!("NTLM {}", expected));
    assert!(!state.scheme().unwrap().is_complete());

    // round 2: server sends its token; the bound scheme is reused
    let token = base64::engine::general_purpose::STANDARD.encode("server-challenge");
    let set = challenges(&[&format!("NTLM {}", token)]);
    processor
        .process_challenge(&mut state, &set, Some(&creds))
        .unwrap();

    apply_response_header(
        state.scheme_mut().unwrap(),
        &AuthScope::any(),
        &creds,
        &mut req,
        false,
    )
    .unwrap();
    let value = req.headers()[AUTHORIZATION].to_str().unwrap();
    assert!(value.starts_with("NTLM "));

    // exchange finished, native handle released exactly once
    assert!(state.scheme().unwrap().is_complete());
    assert_eq!(disposals.load(Ordering::SeqCst), 1);

    state.invalidate();
    assert_eq!(disposals.load(Ordering::SeqCst), 1);
}

#[test]
fn test_ntlm_skipped_without_engine_when_filtering() {
    // no engine: NTLM cannot support any credentials, selection falls
    // through to basic
    let processor = AuthChallengeProcessor::new(
        AuthPolicy::new()
            .with_priority(["ntlm", "basic"])
            .allow_insecure_basic(true),
    );
    let creds = Credentials::username_password("u", "p");
    let set = challenges(&["NTLM", "Basic realm=\"x\""]);

    let scheme = processor.select_auth_scheme(&set, Some(&creds)).unwrap();
    assert_eq!(scheme.scheme_name(), "basic");
}

#[test]
fn test_challenge_map_last_header_wins() {
    let set = challenges(&["Basic realm=\"first\"", "Basic realm=\"second\""]);
    assert_eq!(set.len(), 1);
    assert_eq!(set["basic"], "Basic realm=\"second\"");
}
