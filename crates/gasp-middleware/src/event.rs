//! Inbound wire message and the session back-reference handed to handlers.
//!
//! ```json
//! { "view": "/", "id": "gbutton0", "type": "click", "data": {}, "state": { ... } }
//! ```

use std::fmt;
use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use gasp_types::{FormState, GaspError, ServerEvent};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::outbox::Outbox;
use crate::route::RouteKey;
use crate::store::SharedStore;

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// What a handler needs to talk back: the outbound queue and the shared
/// store, plus identifying details of the connection the event arrived on.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    session_id: Uuid,
    connected_at: DateTime<Utc>,
    peer: Option<SocketAddr>,
    outbox: Outbox,
    store: SharedStore,
}

impl SessionHandle {
    pub fn new(outbox: Outbox, store: SharedStore) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            connected_at: Utc::now(),
            peer: None,
            outbox,
            store,
        }
    }

    /// Record the remote address (builder-style).
    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Shorthand for `self.outbox().send(event)`.
    pub fn send(&self, event: ServerEvent) {
        self.outbox.send(event);
    }
}

// ---------------------------------------------------------------------------
// ClientEvent
// ---------------------------------------------------------------------------

/// A message received from the browser.
///
/// `state` is the complete form snapshot at the moment of the interaction.
/// The session back-reference is attached by the receiving session and never
/// travels on the wire.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientEvent {
    #[serde(default)]
    pub view: String,
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub state: FormState,
    #[serde(skip)]
    session: Option<SessionHandle>,
}

impl ClientEvent {
    /// An event with empty payload and state.
    pub fn new(
        view: impl Into<String>,
        id: impl Into<String>,
        event_type: impl Into<String>,
    ) -> Self {
        Self {
            view: view.into(),
            id: id.into(),
            event_type: event_type.into(),
            data: Map::new(),
            state: FormState::default(),
            session: None,
        }
    }

    /// Decode one text frame.
    pub fn decode(text: &str) -> Result<Self, GaspError> {
        serde_json::from_str(text).map_err(|e| GaspError::Decode(e.to_string()))
    }

    /// Decode one binary frame holding UTF-8 JSON.
    pub fn decode_slice(bytes: &[u8]) -> Result<Self, GaspError> {
        serde_json::from_slice(bytes).map_err(|e| GaspError::Decode(e.to_string()))
    }

    pub fn attach_session(&mut self, session: SessionHandle) {
        self.session = Some(session);
    }

    /// Builder-style [`ClientEvent::attach_session`].
    pub fn with_session(mut self, session: SessionHandle) -> Self {
        self.attach_session(session);
        self
    }

    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// The owning session's outbox, when the event came from a session.
    pub fn outbox(&self) -> Option<&Outbox> {
        self.session.as_ref().map(SessionHandle::outbox)
    }

    pub fn route_key(&self) -> RouteKey {
        RouteKey::new(&self.view, &self.id, &self.event_type)
    }

    // -----------------------------------------------------------------------
    // Typed access to `data`
    // -----------------------------------------------------------------------

    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn data_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(Value::as_bool)
    }

    pub fn data_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(Value::as_f64)
    }

    /// Decode the entry under `key` into `T`.  `None` when absent.
    pub fn data_as<T: DeserializeOwned>(&self, key: &str) -> Option<Result<T, GaspError>> {
        self.data
            .get(key)
            .map(|v| T::deserialize(v).map_err(|e| GaspError::Decode(e.to_string())))
    }
}

impl fmt::Debug for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientEvent")
            .field("view", &self.view)
            .field("id", &self.id)
            .field("event_type", &self.event_type)
            .field("data", &self.data)
            .field("controls", &self.state.len())
            .field("session", &self.session.as_ref().map(SessionHandle::session_id))
            .finish()
    }
}
