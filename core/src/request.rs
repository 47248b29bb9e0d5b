//! Normalized outbound request model.
//!
//! # Design
//! Hooks construct a `Request` from their native client surface, mutate it
//! while options arrive, and hand it to the dispatcher frozen. Body and
//! post-fields are mutually exclusive: setting non-empty post-fields clears
//! the body, and clearing post-fields also drops the body and any
//! Content-Type header. Client option codes mirror the native library's
//! integer constants so recorded traffic stays recognizable.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::VcrError;
use crate::headers::HeaderMap;
use crate::hooks::handle::HandleId;

/// Methods the recorder knows by name. Custom verbs are carried verbatim.
pub const HTTP_METHODS: [&str; 8] = [
    "CONNECT", "DELETE", "GET", "HEAD", "OPTIONS", "POST", "PUT", "TRACE",
];

/// A normalized outbound HTTP request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    method: String,
    url: Option<Url>,
    #[serde(default, skip_serializing_if = "HeaderMap::is_empty")]
    headers: HeaderMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    post_fields: BTreeMap<String, String>,
    #[serde(skip)]
    client_options: ClientOptions,
}

impl Request {
    /// Builds a request for `url`. Fails with [`VcrError::InvalidHost`] if
    /// the URL does not carry both a scheme and a host.
    pub fn new(method: &str, url: &str) -> Result<Self, VcrError> {
        let mut request = Self::without_url(method);
        request.set_url(url)?;
        Ok(request)
    }

    /// A request without a URL, as produced by a handle reset.
    pub(crate) fn without_url(method: &str) -> Self {
        Request {
            method: method.to_ascii_uppercase(),
            url: None,
            headers: HeaderMap::new(),
            body: None,
            post_fields: BTreeMap::new(),
            client_options: ClientOptions::default(),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn set_method(&mut self, method: &str) {
        self.method = method.to_ascii_uppercase();
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn url_str(&self) -> String {
        self.url.as_ref().map(Url::to_string).unwrap_or_default()
    }

    /// Replaces the URL, applying the same scheme+host validation as
    /// [`Request::new`].
    pub fn set_url(&mut self, url: &str) -> Result<(), VcrError> {
        let parsed = Url::parse(url).map_err(|_| VcrError::InvalidHost {
            url: url.to_string(),
        })?;
        if parsed.host_str().is_none() || parsed.scheme().is_empty() {
            return Err(VcrError::InvalidHost {
                url: url.to_string(),
            });
        }
        self.url = Some(parsed);
        Ok(())
    }

    pub fn host(&self) -> Option<&str> {
        self.url.as_ref().and_then(Url::host_str)
    }

    pub fn path(&self) -> Option<&str> {
        self.url.as_ref().map(Url::path)
    }

    pub fn query(&self) -> Option<&str> {
        self.url.as_ref().and_then(Url::query)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<Option<String>>) {
        self.headers.set(name, value);
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Sets the raw body. A non-empty body clears the structured post-fields
    /// so the two representations never coexist.
    pub fn set_body(&mut self, body: impl Into<Option<String>>) {
        self.body = body.into();
        if self.body.is_some() {
            self.post_fields.clear();
        }
    }

    pub fn post_fields(&self) -> &BTreeMap<String, String> {
        &self.post_fields
    }

    /// Sets the structured post-fields. Non-empty fields clear the raw body;
    /// empty fields clear both representations and drop any Content-Type
    /// header, mirroring how empty uploads are read back out of storage.
    pub fn set_post_fields(&mut self, fields: BTreeMap<String, String>) {
        if fields.is_empty() {
            self.post_fields.clear();
            self.body = None;
            self.headers.remove("Content-Type");
        } else {
            self.post_fields = fields;
            self.body = None;
        }
    }

    pub fn client_options(&self) -> &ClientOptions {
        &self.client_options
    }

    pub fn client_option(&self, opt: ClientOpt) -> Option<&OptValue> {
        self.client_options.get(opt)
    }

    pub fn set_client_option(&mut self, opt: ClientOpt, value: OptValue) {
        self.client_options.set(opt, value);
    }

    pub fn remove_client_option(&mut self, opt: ClientOpt) {
        self.client_options.remove(opt);
    }
}

// Client options carry callbacks and sinks, so equality is defined over the
// recordable surface only.
impl PartialEq for Request {
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method
            && self.url == other.url
            && self.headers == other.headers
            && self.body == other.body
            && self.post_fields == other.post_fields
    }
}

/// Client option codes, numbered like the native handle-based library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClientOpt {
    Timeout = 13,
    InfileSize = 14,
    Header = 42,
    Post = 47,
    FollowLocation = 52,
    MaxRedirs = 68,
    File = 10001,
    Url = 10002,
    PostFields = 10015,
    UserAgent = 10018,
    HttpHeader = 10023,
    CustomRequest = 10036,
    ReturnTransfer = 19913,
    WriteFunction = 20011,
    ReadFunction = 20012,
    HeaderFunction = 20079,
}

impl ClientOpt {
    /// The native integer code of this option.
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Sink callback for response bodies. Returns the number of bytes consumed.
pub type WriteCallback = Rc<dyn Fn(HandleId, &str) -> usize>;

/// Per-line callback for response header lines. Returns bytes consumed.
pub type HeaderCallback = Rc<dyn Fn(HandleId, &str) -> usize>;

/// Upload callback. Reads up to `size` bytes from the body stream and
/// returns the bytes that become the request body.
pub type ReadCallback = Rc<dyn Fn(HandleId, &mut dyn Read, usize) -> String>;

/// Shared writable sink for the file-download option.
pub type FileSink = Rc<RefCell<dyn Write>>;

/// An option value as supplied by the client.
#[derive(Clone)]
pub enum OptValue {
    Bool(bool),
    Int(i64),
    Str(String),
    /// `Name: Value` header lines.
    List(Vec<String>),
    /// Structured post-field mapping.
    Fields(BTreeMap<String, String>),
    WriteFn(WriteCallback),
    HeaderFn(HeaderCallback),
    ReadFn(ReadCallback),
    File(FileSink),
    Null,
}

impl OptValue {
    /// Native-client truthiness: `0`, `"0"`, empty strings and null are
    /// false, everything else true.
    pub fn is_truthy(&self) -> bool {
        match self {
            OptValue::Bool(b) => *b,
            OptValue::Int(i) => *i != 0,
            OptValue::Str(s) => !s.is_empty() && s != "0",
            OptValue::List(l) => !l.is_empty(),
            OptValue::Fields(f) => !f.is_empty(),
            OptValue::Null => false,
            OptValue::WriteFn(_) | OptValue::HeaderFn(_) | OptValue::ReadFn(_) | OptValue::File(_) => {
                true
            }
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptValue::Int(i) => Some(*i),
            OptValue::Bool(b) => Some(i64::from(*b)),
            OptValue::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for OptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptValue::Bool(b) => write!(f, "Bool({b})"),
            OptValue::Int(i) => write!(f, "Int({i})"),
            OptValue::Str(s) => write!(f, "Str({s:?})"),
            OptValue::List(l) => write!(f, "List({l:?})"),
            OptValue::Fields(m) => write!(f, "Fields({m:?})"),
            OptValue::WriteFn(_) => f.write_str("WriteFn(..)"),
            OptValue::HeaderFn(_) => f.write_str("HeaderFn(..)"),
            OptValue::ReadFn(_) => f.write_str("ReadFn(..)"),
            OptValue::File(_) => f.write_str("File(..)"),
            OptValue::Null => f.write_str("Null"),
        }
    }
}

/// Integer-keyed map of client option codes to values.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    map: BTreeMap<u32, (ClientOpt, OptValue)>,
}

impl ClientOptions {
    pub fn set(&mut self, opt: ClientOpt, value: OptValue) {
        self.map.insert(opt.code(), (opt, value));
    }

    pub fn get(&self, opt: ClientOpt) -> Option<&OptValue> {
        self.map.get(&opt.code()).map(|(_, v)| v)
    }

    pub fn remove(&mut self, opt: ClientOpt) -> Option<OptValue> {
        self.map.remove(&opt.code()).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClientOpt, &OptValue)> {
        self.map.values().map(|(opt, value)| (*opt, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_method_and_parses_url() {
        let request = Request::new("get", "http://example.com/a?b=1").unwrap();
        assert_eq!(request.method(), "GET");
        assert_eq!(request.host(), Some("example.com"));
        assert_eq!(request.path(), Some("/a"));
        assert_eq!(request.query(), Some("b=1"));
    }

    #[test]
    fn url_without_scheme_is_rejected() {
        let err = Request::new("POST", "example.com").unwrap_err();
        assert!(matches!(err, VcrError::InvalidHost { .. }));
    }

    #[test]
    fn url_without_host_is_rejected() {
        let err = Request::new("GET", "file:///etc/hosts").unwrap_err();
        assert!(matches!(err, VcrError::InvalidHost { .. }));
    }

    #[test]
    fn body_and_post_fields_are_mutually_exclusive() {
        let mut request = Request::new("POST", "http://example.com").unwrap();
        request.set_body(Some("raw".to_string()));
        assert_eq!(request.body(), Some("raw"));

        let fields = BTreeMap::from([("a".to_string(), "1".to_string())]);
        request.set_post_fields(fields.clone());
        assert!(request.body().is_none());
        assert_eq!(request.post_fields(), &fields);

        request.set_body(Some("raw again".to_string()));
        assert!(request.post_fields().is_empty());
    }

    #[test]
    fn clearing_post_fields_drops_body_and_content_type() {
        let mut request = Request::new("POST", "http://example.com").unwrap();
        request.set_header("Host", Some("example.com".to_string()));
        request.set_header("Content-Type", Some("application/json".to_string()));
        request.set_body(Some("{}".to_string()));

        request.set_post_fields(BTreeMap::new());

        assert!(request.body().is_none());
        assert!(request.post_fields().is_empty());
        assert_eq!(request.header("Host"), Some("example.com"));
        assert!(request.header("Content-Type").is_none());
    }

    #[test]
    fn serde_skips_client_options() {
        let mut request = Request::new("GET", "http://example.com/").unwrap();
        request.set_client_option(ClientOpt::ReturnTransfer, OptValue::Bool(true));
        let yaml = serde_yaml::to_string(&request).unwrap();
        assert!(!yaml.contains("19913"));

        let back: Request = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, request);
        assert!(back.client_options().is_empty());
    }

    #[test]
    fn opt_value_truthiness_matches_native_client() {
        assert!(!OptValue::Str("0".to_string()).is_truthy());
        assert!(!OptValue::Str(String::new()).is_truthy());
        assert!(!OptValue::Int(0).is_truthy());
        assert!(!OptValue::Null.is_truthy());
        assert!(OptValue::Str("1".to_string()).is_truthy());
        assert!(OptValue::Bool(true).is_truthy());
    }
}
