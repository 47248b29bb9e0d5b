//! Live HTTP transport for record and passthrough paths.
//!
//! # Design
//! The transport executes a normalized [`Request`] over the real network with
//! ureq and converts the wire response back into the recorder's [`Response`]
//! shape. Non-2xx statuses are data, not errors: status interpretation is
//! the caller's business. Transfer failures come back as [`NetworkError`]
//! values carrying a curl-style code so handle-based clients can report them
//! the way the native library would.

use std::time::Duration;

use ureq::http::Version;

use crate::error::NetworkError;
use crate::headers::HeaderMap;
use crate::request::{ClientOpt, Request};
use crate::response::{Response, Status};

/// curl-style code for "could not connect / transfer failed".
const COULDNT_CONNECT: i64 = 7;
/// curl-style code for "unsupported protocol or method".
const UNSUPPORTED: i64 = 1;
/// curl-style code for "malformed URL".
const URL_MALFORMAT: i64 = 3;

/// Performs `request` against the real network.
pub fn execute(request: &Request) -> Result<Response, NetworkError> {
    let url = request
        .url()
        .ok_or_else(|| NetworkError {
            message: "no URL set on request".to_string(),
            code: URL_MALFORMAT,
            url: None,
        })?
        .to_string();

    let agent = build_agent(request);
    let failed = |message: String, code: i64| NetworkError {
        message,
        code,
        url: Some(url.clone()),
    };

    let payload = request_payload(request);
    let result = match (request.method(), payload) {
        ("GET", _) => with_headers(agent.get(&url), request).call(),
        ("HEAD", _) => with_headers(agent.head(&url), request).call(),
        ("DELETE", _) => with_headers(agent.delete(&url), request).call(),
        ("POST", Some(body)) => with_headers(agent.post(&url), request).send(body.as_bytes()),
        ("POST", None) => with_headers(agent.post(&url), request).send_empty(),
        ("PUT", Some(body)) => with_headers(agent.put(&url), request).send(body.as_bytes()),
        ("PUT", None) => with_headers(agent.put(&url), request).send_empty(),
        (other, _) => {
            return Err(failed(
                format!("method '{other}' is not supported by the live transport"),
                UNSUPPORTED,
            ));
        }
    };
    let mut wire = result.map_err(|e| failed(e.to_string(), COULDNT_CONNECT))?;

    let status = Status::Line {
        http_version: version_str(wire.version()).to_string(),
        code: wire.status().as_u16(),
        message: wire
            .status()
            .canonical_reason()
            .unwrap_or_default()
            .to_string(),
    };
    let mut headers = HeaderMap::new();
    for (name, value) in wire.headers() {
        if let Ok(value) = value.to_str() {
            headers.set(name.as_str(), Some(value.to_string()));
        }
    }
    let body = wire
        .body_mut()
        .read_to_string()
        .map_err(|e| failed(e.to_string(), COULDNT_CONNECT))?;

    Ok(Response::new(status, headers, body))
}

/// Copies every set request header onto the wire request.
fn with_headers<Any>(
    mut builder: ureq::RequestBuilder<Any>,
    request: &Request,
) -> ureq::RequestBuilder<Any> {
    for (name, value) in request.headers().iter() {
        if let Some(value) = value {
            builder = builder.header(name, value);
        }
    }
    builder
}

/// Builds the agent, honoring the client-side options that only matter on
/// passthrough paths: timeout, redirect following and the redirect cap.
fn build_agent(request: &Request) -> ureq::Agent {
    let mut config = ureq::Agent::config_builder().http_status_as_error(false);
    if let Some(timeout) = request
        .client_option(ClientOpt::Timeout)
        .and_then(|v| v.as_int())
        .filter(|t| *t > 0)
    {
        config = config.timeout_global(Some(Duration::from_secs(timeout as u64)));
    }
    let follow = request
        .client_option(ClientOpt::FollowLocation)
        .map(|v| v.is_truthy());
    let max_redirects = request
        .client_option(ClientOpt::MaxRedirs)
        .and_then(|v| v.as_int());
    match (follow, max_redirects) {
        (Some(false), _) => config = config.max_redirects(0),
        (_, Some(max)) if max >= 0 => config = config.max_redirects(max as u32),
        _ => {}
    }
    config.build().new_agent()
}

/// The bytes a live POST/PUT carries: the raw body, or post-fields encoded
/// as a form query string.
fn request_payload(request: &Request) -> Option<String> {
    if let Some(body) = request.body() {
        return Some(body.to_string());
    }
    if request.post_fields().is_empty() {
        return None;
    }
    let encoded: Vec<String> = request
        .post_fields()
        .iter()
        .map(|(k, v)| format!("{}={}", form_encode(k), form_encode(v)))
        .collect();
    Some(encoded.join("&"))
}

fn form_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

fn version_str(version: Version) -> &'static str {
    if version == Version::HTTP_09 {
        "0.9"
    } else if version == Version::HTTP_10 {
        "1.0"
    } else if version == Version::HTTP_2 {
        "2"
    } else if version == Version::HTTP_3 {
        "3"
    } else {
        "1.1"
    }
}
