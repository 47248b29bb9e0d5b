//! Hook for the SOAP client surface.
//!
//! A SOAP call is one HTTP exchange: POST the serialized envelope to the
//! endpoint with the version-appropriate content type and action, then feed
//! the response body back into the client's deserialization path. The hook
//! synthesizes that exchange as a normalized request and routes it through
//! the dispatcher like any other interception.

use std::rc::{Rc, Weak};

use tracing::debug;

use crate::error::VcrError;
use crate::request::Request;

use super::{dispatch, LibraryHook, RequestCallback};

/// SOAP protocol version of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoapVersion {
    Soap11,
    #[default]
    Soap12,
}

/// The SOAP client hook.
#[derive(Default)]
pub struct SoapHook {
    callback: Option<Weak<RequestCallback>>,
}

impl SoapHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Performs one SOAP exchange: `envelope` is POSTed to `location` under
    /// `action`, and the response envelope comes back for deserialization.
    /// One-way calls return `None`. Disabled hooks perform the real
    /// transfer.
    pub fn do_request(
        &self,
        envelope: &str,
        location: &str,
        action: &str,
        version: SoapVersion,
        one_way: bool,
    ) -> Result<Option<String>, VcrError> {
        let mut request = Request::new("POST", location)?;
        request.set_body(Some(envelope.to_string()));
        match version {
            SoapVersion::Soap11 => {
                request.set_header(
                    "Content-Type",
                    Some("text/xml; charset=utf-8;".to_string()),
                );
                request.set_header("SOAPAction", Some(action.to_string()));
            }
            SoapVersion::Soap12 => {
                request.set_header(
                    "Content-Type",
                    Some(format!(
                        "application/soap+xml; charset=utf-8; action=\"{action}\""
                    )),
                );
            }
        }

        debug!(location, action, intercepted = self.is_enabled(), "soap request");
        let response = dispatch(&self.callback, &request)?;
        if one_way {
            return Ok(None);
        }
        Ok(Some(response.body_str().to_string()))
    }
}

impl LibraryHook for SoapHook {
    fn enable(&mut self, callback: &Rc<RequestCallback>) {
        if self.callback.is_some() {
            return;
        }
        self.callback = Some(Rc::downgrade(callback));
    }

    fn disable(&mut self) {
        self.callback = None;
    }

    fn is_enabled(&self) -> bool {
        self.callback.is_some()
    }
}
