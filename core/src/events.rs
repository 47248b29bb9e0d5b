//! Process-wide event bus for recorder notifications.
//!
//! Five event kinds are emitted around interception, playback and recording.
//! Subscribers run synchronously in registration order and receive owned
//! snapshots, so a listener can stash them without borrowing the recorder.

use std::rc::Rc;

use crate::request::Request;
use crate::response::Response;

/// A recorder lifecycle notification.
#[derive(Debug, Clone)]
pub enum Event {
    /// A request was intercepted and is about to be resolved.
    BeforeHttpRequest { request: Request },
    /// A real request completed and its response is about to be returned.
    AfterHttpRequest { request: Request, response: Response },
    /// A stored recording is about to be replayed.
    BeforePlayback { request: Request, cassette: String },
    /// A stored recording was replayed.
    AfterPlayback {
        request: Request,
        response: Response,
        cassette: String,
    },
    /// A real response is about to be appended to the cassette.
    BeforeRecord {
        request: Request,
        response: Response,
        cassette: String,
    },
}

impl Event {
    /// Stable event name, e.g. for log lines or listener filtering.
    pub fn name(&self) -> &'static str {
        match self {
            Event::BeforeHttpRequest { .. } => "vcr.before_http_request",
            Event::AfterHttpRequest { .. } => "vcr.after_http_request",
            Event::BeforePlayback { .. } => "vcr.before_playback",
            Event::AfterPlayback { .. } => "vcr.after_playback",
            Event::BeforeRecord { .. } => "vcr.before_record",
        }
    }
}

/// A subscribed listener.
pub type EventListener = Rc<dyn Fn(&Event)>;

/// Synchronous, registration-ordered event dispatch.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<EventListener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: EventListener) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &Event) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}
