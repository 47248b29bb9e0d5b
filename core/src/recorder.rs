//! The recorder facade: lifecycle, hook installation and request dispatch.
//!
//! # Design
//! `Vcr` owns the configuration, the event bus, the active cassette and the
//! three hooks. Turning on builds a single dispatch callback and hands it to
//! every enabled hook; hooks keep only a weak reference, so turning off (or
//! dropping the recorder) revokes interception everywhere at once. The
//! callback routes each intercepted request through the active cassette
//! under the configured matcher set and mode.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use tracing::{debug, info};

use crate::cassette::Cassette;
use crate::config::{Configuration, HookKind, Mode};
use crate::error::VcrError;
use crate::events::{Event, EventBus, EventListener};
use crate::hooks::handle::HandleHook;
use crate::hooks::soap::SoapHook;
use crate::hooks::stream::StreamHook;
use crate::hooks::{LibraryHook, RequestCallback};
use crate::request::Request;
use crate::response::Response;
use crate::transport;

/// The record-and-replay recorder.
pub struct Vcr {
    inner: Rc<RefCell<Recorder>>,
    stream_hook: Rc<RefCell<StreamHook>>,
    handle_hook: Rc<RefCell<HandleHook>>,
    soap_hook: Rc<RefCell<SoapHook>>,
    callback: Option<Rc<RequestCallback>>,
}

/// Dispatcher state shared with the request callback.
struct Recorder {
    config: Configuration,
    cassette: Option<Cassette>,
    events: EventBus,
}

impl Vcr {
    pub fn new(config: Configuration) -> Self {
        Vcr {
            inner: Rc::new(RefCell::new(Recorder {
                config,
                cassette: None,
                events: EventBus::new(),
            })),
            stream_hook: Rc::new(RefCell::new(StreamHook::new())),
            handle_hook: Rc::new(RefCell::new(HandleHook::new())),
            soap_hook: Rc::new(RefCell::new(SoapHook::new())),
            callback: None,
        }
    }

    /// Installs every enabled hook. Turning on while on cycles through a
    /// turn-off first, so hook state matches the current configuration.
    pub fn turn_on(&mut self) {
        if self.is_on() {
            self.turn_off();
        }

        let weak = Rc::downgrade(&self.inner);
        let callback: Rc<RequestCallback> = Rc::new(move |request| {
            let inner = weak.upgrade().ok_or(VcrError::DispatcherGone)?;
            let mut recorder = inner.borrow_mut();
            recorder.handle_request(request)
        });

        let enabled = self.inner.borrow().config.library_hooks();
        for kind in &enabled {
            match kind {
                HookKind::Stream => self.stream_hook.borrow_mut().enable(&callback),
                HookKind::Handle => self.handle_hook.borrow_mut().enable(&callback),
                HookKind::Soap => self.soap_hook.borrow_mut().enable(&callback),
            }
        }
        self.callback = Some(callback);
        info!(hooks = ?enabled, "recorder turned on");
    }

    /// Ejects any active cassette and uninstalls all hooks.
    pub fn turn_off(&mut self) {
        if !self.is_on() {
            return;
        }
        self.eject_cassette();
        self.stream_hook.borrow_mut().disable();
        self.handle_hook.borrow_mut().disable();
        self.soap_hook.borrow_mut().disable();
        self.callback = None;
        info!("recorder turned off");
    }

    pub fn is_on(&self) -> bool {
        self.callback.is_some()
    }

    /// Opens the cassette `name` under the configured root and makes it the
    /// active one, ejecting any previous cassette. Turns the recorder on
    /// first when needed.
    pub fn insert_cassette(&mut self, name: &str) -> Result<(), VcrError> {
        if !self.is_on() {
            self.turn_on();
        }
        let cassette = {
            let recorder = self.inner.borrow();
            Cassette::new(name, &recorder.config)?
        };
        self.inner.borrow_mut().cassette = Some(cassette);
        Ok(())
    }

    /// Flushes and drops the active cassette, if any.
    pub fn eject_cassette(&mut self) {
        let mut recorder = self.inner.borrow_mut();
        if let Some(cassette) = recorder.cassette.take() {
            debug!(cassette = cassette.name(), "cassette ejected");
        }
    }

    /// Name of the active cassette, if one is inserted.
    pub fn cassette_name(&self) -> Option<String> {
        self.inner
            .borrow()
            .cassette
            .as_ref()
            .map(|c| c.name().to_string())
    }

    pub fn configuration(&self) -> Ref<'_, Configuration> {
        Ref::map(self.inner.borrow(), |recorder| &recorder.config)
    }

    pub fn configuration_mut(&mut self) -> RefMut<'_, Configuration> {
        RefMut::map(self.inner.borrow_mut(), |recorder| &mut recorder.config)
    }

    /// Subscribes a listener to the recorder's event bus.
    pub fn subscribe(&mut self, listener: EventListener) {
        self.inner.borrow_mut().events.subscribe(listener);
    }

    /// The byte-stream client surface.
    pub fn stream_hook(&self) -> Rc<RefCell<StreamHook>> {
        Rc::clone(&self.stream_hook)
    }

    /// The handle-based client surface.
    pub fn handle_hook(&self) -> Rc<RefCell<HandleHook>> {
        Rc::clone(&self.handle_hook)
    }

    /// The SOAP client surface.
    pub fn soap_hook(&self) -> Rc<RefCell<SoapHook>> {
        Rc::clone(&self.soap_hook)
    }
}

impl Recorder {
    /// Resolves one intercepted request: replay on match, otherwise follow
    /// the mode rules (record or refuse).
    fn handle_request(&mut self, request: &Request) -> Result<Response, VcrError> {
        self.events.emit(&Event::BeforeHttpRequest {
            request: request.clone(),
        });

        let matchers = self.config.request_matchers();
        let mode = self.config.mode();
        let cassette = self
            .cassette
            .as_mut()
            .ok_or(VcrError::CassetteNotInserted)?;
        let cassette_name = cassette.name().to_string();

        if let Some(recording) = cassette.find_match(request, &matchers)? {
            self.events.emit(&Event::BeforePlayback {
                request: request.clone(),
                cassette: cassette_name.clone(),
            });
            let response = recording.response;
            debug!(
                cassette = %cassette_name,
                url = %request.url_str(),
                "replaying recorded response"
            );
            self.events.emit(&Event::AfterPlayback {
                request: request.clone(),
                response: response.clone(),
                cassette: cassette_name,
            });
            return Ok(response);
        }

        match mode {
            Mode::NewEpisodes => {}
            Mode::Once if cassette.was_empty_at_insert() => {}
            Mode::Once | Mode::None => {
                return Err(VcrError::UnmatchedRequest {
                    method: request.method().to_string(),
                    url: request.url_str(),
                    cassette: cassette_name,
                    mode: mode.to_string(),
                });
            }
        }

        info!(url = %request.url_str(), cassette = %cassette_name, "recording live response");
        let response = transport::execute(request)?;
        self.events.emit(&Event::BeforeRecord {
            request: request.clone(),
            response: response.clone(),
            cassette: cassette_name,
        });
        cassette.record(request, &response)?;
        self.events.emit(&Event::AfterHttpRequest {
            request: request.clone(),
            response: response.clone(),
        });
        Ok(response)
    }
}

impl Drop for Vcr {
    fn drop(&mut self) {
        self.turn_off();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use crate::headers::HeaderMap;
    use crate::hooks::stream::StreamContext;
    use std::cell::RefCell as StdRefCell;

    fn vcr_in(dir: &tempfile::TempDir) -> Vcr {
        let mut config = Configuration::new();
        config.set_cassette_path(dir.path()).unwrap();
        Vcr::new(config)
    }

    #[test]
    fn turn_on_installs_only_enabled_hooks() {
        let dir = tempfile::tempdir().unwrap();
        let mut vcr = vcr_in(&dir);
        vcr.configuration_mut()
            .enable_library_hooks(&[HookKind::Stream]);

        vcr.turn_on();
        assert!(vcr.is_on());
        assert!(vcr.stream_hook().borrow().is_enabled());
        assert!(!vcr.handle_hook().borrow().is_enabled());
        assert!(!vcr.soap_hook().borrow().is_enabled());
    }

    #[test]
    fn turn_off_ejects_and_uninstalls() {
        let dir = tempfile::tempdir().unwrap();
        let mut vcr = vcr_in(&dir);
        vcr.turn_on();
        vcr.insert_cassette("lifecycle").unwrap();
        assert_eq!(vcr.cassette_name().as_deref(), Some("lifecycle"));

        vcr.turn_off();
        assert!(!vcr.is_on());
        assert!(vcr.cassette_name().is_none());
        assert!(!vcr.stream_hook().borrow().is_enabled());
        assert!(!vcr.handle_hook().borrow().is_enabled());
        assert!(!vcr.soap_hook().borrow().is_enabled());
    }

    #[test]
    fn insert_cassette_turns_the_recorder_on() {
        let dir = tempfile::tempdir().unwrap();
        let mut vcr = vcr_in(&dir);
        vcr.insert_cassette("auto").unwrap();
        assert!(vcr.is_on());
        assert_eq!(vcr.cassette_name().as_deref(), Some("auto"));
    }

    #[test]
    fn inserting_again_replaces_the_active_cassette() {
        let dir = tempfile::tempdir().unwrap();
        let mut vcr = vcr_in(&dir);
        vcr.insert_cassette("first").unwrap();
        vcr.insert_cassette("second").unwrap();
        assert_eq!(vcr.cassette_name().as_deref(), Some("second"));
    }

    #[test]
    fn request_without_cassette_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut vcr = vcr_in(&dir);
        vcr.turn_on();

        let hook = vcr.stream_hook();
        let err = hook
            .borrow()
            .open("http://example.com/", &StreamContext::default())
            .unwrap_err();
        assert!(matches!(err, VcrError::CassetteNotInserted));
    }

    #[test]
    fn mode_none_refuses_unmatched_requests() {
        let dir = tempfile::tempdir().unwrap();
        let mut vcr = vcr_in(&dir);
        vcr.configuration_mut().set_mode(Mode::None);
        vcr.insert_cassette("none_mode").unwrap();

        let hook = vcr.stream_hook();
        let err = hook
            .borrow()
            .open("http://example.com/b", &StreamContext::default())
            .unwrap_err();
        assert!(matches!(err, VcrError::UnmatchedRequest { .. }));
    }

    #[test]
    fn playback_emits_events_in_contract_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut vcr = vcr_in(&dir);

        // Seed the cassette through the cassette API, then replay it.
        {
            let config = vcr.configuration();
            let mut cassette = Cassette::new("events", &config).unwrap();
            let request = Request::new("GET", "http://example.com/").unwrap();
            let response = Response::new(200, HeaderMap::new(), "stored".to_string());
            cassette.record(&request, &response).unwrap();
        }

        let seen: Rc<StdRefCell<Vec<&'static str>>> = Rc::new(StdRefCell::new(Vec::new()));
        let probe = Rc::clone(&seen);
        vcr.subscribe(Rc::new(move |event| probe.borrow_mut().push(event.name())));
        vcr.insert_cassette("events").unwrap();

        let hook = vcr.stream_hook();
        let handle = hook
            .borrow()
            .open("http://example.com/", &StreamContext::default())
            .unwrap();
        assert_eq!(handle.response().body(), Some("stored"));

        assert_eq!(
            *seen.borrow(),
            vec![
                "vcr.before_http_request",
                "vcr.before_playback",
                "vcr.after_playback",
            ]
        );
    }

    #[test]
    fn unmatched_request_emits_only_the_before_event() {
        let dir = tempfile::tempdir().unwrap();
        let mut vcr = vcr_in(&dir);
        vcr.configuration_mut()
            .set_mode(Mode::None)
            .set_storage(StorageBackend::Blackhole);

        let seen: Rc<StdRefCell<Vec<&'static str>>> = Rc::new(StdRefCell::new(Vec::new()));
        let probe = Rc::clone(&seen);
        vcr.subscribe(Rc::new(move |event| probe.borrow_mut().push(event.name())));
        vcr.insert_cassette("quiet").unwrap();

        let hook = vcr.stream_hook();
        let _ = hook
            .borrow()
            .open("http://example.com/", &StreamContext::default())
            .unwrap_err();
        assert_eq!(*seen.borrow(), vec!["vcr.before_http_request"]);
    }

    #[test]
    fn dropping_the_recorder_revokes_interception() {
        let dir = tempfile::tempdir().unwrap();
        let hook = {
            let mut vcr = vcr_in(&dir);
            vcr.turn_on();
            vcr.stream_hook()
        };
        // The recorder is gone; its hooks were disabled on drop.
        assert!(!hook.borrow().is_enabled());
    }
}
