//! Interception surfaces for the three client API families.
//!
//! Each hook converts its native client surface into a normalized
//! [`Request`](crate::Request), forwards it through the dispatcher's request
//! callback, and renders the returned [`Response`](crate::Response) back into
//! whatever the client expects to see. Hooks keep only a weak reference to
//! the callback; the dispatcher owns it and revokes it at turn-off. While a
//! hook is disabled its operations fall through to the real network.

pub mod handle;
pub mod soap;
pub mod stream;

use std::rc::{Rc, Weak};

use crate::error::VcrError;
use crate::request::Request;
use crate::response::Response;
use crate::transport;

/// The dispatcher's request callback: resolves one intercepted request into
/// a fully materialized response.
pub type RequestCallback = dyn Fn(&Request) -> Result<Response, VcrError>;

/// Common enable/disable surface of every hook.
pub trait LibraryHook {
    /// Installs the dispatch callback. Enabling an enabled hook is a no-op.
    fn enable(&mut self, callback: &Rc<RequestCallback>);

    /// Uninstalls the dispatch callback. Disabling twice is a no-op.
    fn disable(&mut self);

    fn is_enabled(&self) -> bool;
}

/// Resolves `request` through the hook's callback, or over the real network
/// when the hook is disabled.
fn dispatch(
    callback: &Option<Weak<RequestCallback>>,
    request: &Request,
) -> Result<Response, VcrError> {
    match callback {
        Some(weak) => {
            let callback = weak.upgrade().ok_or(VcrError::DispatcherGone)?;
            callback(request)
        }
        None => Ok(transport::execute(request)?),
    }
}
