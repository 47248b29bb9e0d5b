//! Built-in request matchers and the composite AND verdict.
//!
//! A matcher is a named predicate over `(stored, incoming)` request pairs.
//! The registry itself lives on [`crate::Configuration`]; this module holds
//! the predicates and the conjunction that decides playback.

use std::rc::Rc;
use std::sync::OnceLock;

use regex::Regex;

use crate::request::Request;

/// A predicate over `(stored, incoming)` request pairs.
pub type MatcherFn = dyn Fn(&Request, &Request) -> bool;

/// Shared, cloneable matcher handle.
pub type Matcher = Rc<MatcherFn>;

/// Case-sensitive equality of the normalized method.
pub fn match_method(stored: &Request, request: &Request) -> bool {
    stored.method() == request.method()
}

/// Equality of the URL path component only.
pub fn match_url(stored: &Request, request: &Request) -> bool {
    stored.path() == request.path()
}

/// Equality of the host component only.
pub fn match_host(stored: &Request, request: &Request) -> bool {
    stored.host() == request.host()
}

/// Equality of the header maps after dropping unset entries.
pub fn match_headers(stored: &Request, request: &Request) -> bool {
    stored.headers().filtered() == request.headers().filtered()
}

/// Byte equality of the raw body.
pub fn match_body(stored: &Request, request: &Request) -> bool {
    stored.body() == request.body()
}

/// Deep equality of the structured post-field mapping.
pub fn match_post_fields(stored: &Request, request: &Request) -> bool {
    stored.post_fields() == request.post_fields()
}

/// Equality of the raw query-string component.
pub fn match_query_string(stored: &Request, request: &Request) -> bool {
    stored.query() == request.query()
}

/// Equality of the SOAP operation, or success when the incoming request is
/// not a SOAP request at all.
///
/// The extraction expression is namespace-prefix-sensitive on purpose; it is
/// kept byte-identical for cassette compatibility.
pub fn match_soap_operation(stored: &Request, request: &Request) -> bool {
    let Some(incoming_operation) = soap_operation(request.body().unwrap_or("")) else {
        // Not a SOAP request.
        return true;
    };
    match soap_operation(stored.body().unwrap_or("")) {
        Some(stored_operation) => stored_operation == incoming_operation,
        None => false,
    }
}

/// First child tag of `<SOAP-ENV:Body>`, if the body carries one.
fn soap_operation(body: &str) -> Option<&str> {
    static BODY_TAG: OnceLock<Regex> = OnceLock::new();
    let re = BODY_TAG.get_or_init(|| Regex::new(r"<SOAP-ENV:Body><(.*?)>").expect("valid regex"));
    re.captures(body).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// The composite verdict: the AND of every enabled matcher. Short-circuits
/// on the first failing predicate.
pub fn request_matches(stored: &Request, incoming: &Request, matchers: &[Matcher]) -> bool {
    matchers.iter().all(|matcher| matcher(stored, incoming))
}
