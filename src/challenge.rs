// src/challenge.rs

//! Stateless parsing of `WWW-Authenticate` / `Proxy-Authenticate` header
//! values into scheme names and parameter maps.
//!
//! A challenge is `<scheme> [params-or-token]`. The scheme token is
//! case-insensitive and normalized to lowercase for use as a map key; the
//! remainder is scheme-specific and is only split into `name=value` pairs
//! on demand by [`extract_params`].

use std::collections::HashMap;

use http::header::{HeaderMap, PROXY_AUTHENTICATE, WWW_AUTHENTICATE};

use crate::error;
use crate::Result;

/// Extracts the scheme token from a challenge, lowercased.
///
/// The token is the portion before the first space, or the whole string
/// when there is none. An empty token is a malformed challenge.
pub fn extract_scheme(challenge: &str) -> Result<String> {
    let scheme = match challenge.find(' ') {
        Some(idx) => &challenge[..idx],
        None => challenge,
    };
    if scheme.is_empty() {
        return Err(error::malformed(format!(
            "invalid challenge: {challenge:?}"
        )));
    }
    Ok(scheme.to_ascii_lowercase())
}

/// Extracts the challenge parameters that follow the scheme token.
///
/// Parameters are comma-separated `name=value` pairs; values may be
/// quoted-strings with backslash escapes. Names are lowercased and the last
/// occurrence of a duplicate name wins. A challenge with no space after
/// the scheme token has no parameter section and is malformed.
pub fn extract_params(challenge: &str) -> Result<HashMap<String, String>> {
    let idx = challenge.find(' ').ok_or_else(|| {
        error::malformed(format!("invalid challenge: {challenge:?}"))
    })?;

    let mut params = HashMap::new();
    for element in split_params(&challenge[idx + 1..]) {
        let (name, value) = match element.split_once('=') {
            Some((name, value)) => (name, unquote(value.trim())),
            None => (element.as_str(), String::new()),
        };
        params.insert(name.trim().to_ascii_lowercase(), value);
    }
    Ok(params)
}

/// Parses a set of challenge header values into a map of lowercase scheme
/// name to the raw challenge string.
///
/// One entry per header value; when two headers carry the same scheme the
/// later one overwrites the earlier (last wins, not an error).
pub fn parse_challenges<'a, I>(headers: I) -> Result<HashMap<String, String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut challenges = HashMap::new();
    for value in headers {
        let value = value.trim();
        let scheme = extract_scheme(value)?;
        challenges.insert(scheme, value.to_string());
    }
    Ok(challenges)
}

/// Collects the challenge map from a response header block.
///
/// Reads `Proxy-Authenticate` when `proxy` is set, `WWW-Authenticate`
/// otherwise; values that are not valid UTF-8 are skipped.
pub fn parse_response_challenges(
    headers: &HeaderMap,
    proxy: bool,
) -> Result<HashMap<String, String>> {
    let name = if proxy {
        PROXY_AUTHENTICATE
    } else {
        WWW_AUTHENTICATE
    };
    parse_challenges(
        headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok()),
    )
}

/// Splits a parameter section on commas, ignoring commas inside
/// quoted-strings.
fn split_params(section: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in section.chars() {
        match c {
            _ if escaped => {
                escaped = false;
                current.push(c);
            }
            '\\' if in_quotes => {
                escaped = true;
                current.push(c);
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                if !current.trim().is_empty() {
                    parts.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Removes surrounding quotes from a parameter value and resolves
/// backslash escapes inside them.
fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        let inner = &value[1..value.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut escaped = false;
        for c in inner.chars() {
            if escaped {
                out.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else {
                out.push(c);
            }
        }
        out
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_extract_scheme_lowercases() {
        assert_eq!(extract_scheme("Basic realm=\"x\"").unwrap(), "basic");
        assert_eq!(extract_scheme("NTLM").unwrap(), "ntlm");
        assert_eq!(extract_scheme("Negotiate abc==").unwrap(), "negotiate");
    }

    #[test]
    fn test_extract_scheme_empty_token_fails() {
        let err = extract_scheme(" realm=\"x\"").unwrap_err();
        assert!(err.is_malformed_challenge());
        let err = extract_scheme("").unwrap_err();
        assert!(err.is_malformed_challenge());
    }

    #[test]
    fn test_extract_params() {
        let params = extract_params("Digest realm=\"x\", nonce=\"y\"").unwrap();
        assert_eq!(params.get("realm").map(String::as_str), Some("x"));
        assert_eq!(params.get("nonce").map(String::as_str), Some("y"));
    }

    #[test]
    fn test_extract_params_requires_space() {
        let err = extract_params("Digest").unwrap_err();
        assert!(err.is_malformed_challenge());
    }

    #[test]
    fn test_extract_params_quoted_commas_and_escapes() {
        let params =
            extract_params(r#"Digest realm="a, b", opaque="say \"hi\"", qop=auth"#).unwrap();
        assert_eq!(params.get("realm").map(String::as_str), Some("a, b"));
        assert_eq!(params.get("opaque").map(String::as_str), Some(r#"say "hi""#));
        assert_eq!(params.get("qop").map(String::as_str), Some("auth"));
    }

    #[test]
    fn test_extract_params_duplicate_last_wins() {
        let params = extract_params("Digest realm=\"one\", realm=\"two\"").unwrap();
        assert_eq!(params.get("realm").map(String::as_str), Some("two"));
    }

    #[test]
    fn test_extract_params_names_lowercased() {
        let params = extract_params("Digest Realm=\"x\", NONCE=\"y\"").unwrap();
        assert!(params.contains_key("realm"));
        assert!(params.contains_key("nonce"));
    }

    #[test]
    fn test_parse_challenges_last_wins_per_scheme() {
        let challenges = parse_challenges(vec![
            "Basic realm=\"one\"",
            "Digest realm=\"d\", nonce=\"n\"",
            "Basic realm=\"two\"",
        ])
        .unwrap();
        assert_eq!(challenges.len(), 2);
        assert_eq!(
            challenges.get("basic").map(String::as_str),
            Some("Basic realm=\"two\"")
        );
        assert!(challenges.contains_key("digest"));
    }

    #[test]
    fn test_parse_response_challenges() {
        let mut headers = HeaderMap::new();
        headers.insert(WWW_AUTHENTICATE, HeaderValue::from_static("Negotiate"));
        headers.append(WWW_AUTHENTICATE, HeaderValue::from_static("NTLM"));
        headers.append(
            WWW_AUTHENTICATE,
            HeaderValue::from_static("Basic realm=\"test\""),
        );

        let challenges = parse_response_challenges(&headers, false).unwrap();
        assert!(challenges.contains_key("negotiate"));
        assert!(challenges.contains_key("ntlm"));
        assert!(challenges.contains_key("basic"));
    }

    #[test]
    fn test_parse_response_challenges_proxy_header() {
        let mut headers = HeaderMap::new();
        headers.insert(WWW_AUTHENTICATE, HeaderValue::from_static("Basic realm=\"a\""));
        headers.insert(
            PROXY_AUTHENTICATE,
            HeaderValue::from_static("Digest realm=\"p\", nonce=\"n\""),
        );

        let challenges = parse_response_challenges(&headers, true).unwrap();
        assert_eq!(challenges.len(), 1);
        assert!(challenges.contains_key("digest"));
    }
}
