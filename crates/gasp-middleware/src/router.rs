//! [`Router`] – route keys to ordered handler lists.
//!
//! Handlers are registered during setup and the router is frozen (wrapped in
//! an `Arc`) before the first connection is accepted, so dispatch needs no
//! locking and can run from any number of sessions at once.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use gasp_types::GaspError;
use tracing::debug;

use crate::event::ClientEvent;
use crate::route::{RouteKey, WILDCARD};

/// A synchronous event handler.
///
/// Handlers run on the session's inbound worker, so a slow handler delays
/// the next inbound message for that session.
pub type Handler = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

/// Maps [`RouteKey`]s to the handlers registered under them.
#[derive(Clone, Default)]
pub struct Router {
    routes: HashMap<RouteKey, Vec<Handler>>,
    handler_count: usize,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the bucket for `(view, element_id, event_type)`.
    ///
    /// `view` and `element_id` may be [`WILDCARD`].  Binding the same key
    /// several times is allowed; the handlers fire in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`GaspError::InvalidRoute`] when `event_type` is empty or is
    /// itself the wildcard.
    pub fn register<F>(
        &mut self,
        view: &str,
        element_id: &str,
        event_type: &str,
        handler: F,
    ) -> Result<(), GaspError>
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        if event_type.trim().is_empty() {
            return Err(GaspError::InvalidRoute(format!(
                "event type for '{view}#{element_id}' must not be empty"
            )));
        }
        if event_type == WILDCARD {
            return Err(GaspError::InvalidRoute(format!(
                "event type for '{view}#{element_id}' must be literal, not '{WILDCARD}'"
            )));
        }

        let key = RouteKey::new(view, element_id, event_type);
        debug!(route = %key, "registering event handler");
        self.routes.entry(key).or_default().push(Arc::new(handler));
        self.handler_count += 1;
        Ok(())
    }

    /// Invoke every handler matching `event`, tier by tier.
    ///
    /// All four tiers are consulted; an event can fire handlers at several
    /// tiers.  Handler panics are not caught.
    pub fn dispatch(&self, event: &ClientEvent) {
        for (tier, key) in RouteKey::lookup_tiers(&event.view, &event.id, &event.event_type) {
            if let Some(handlers) = self.routes.get(&key) {
                debug!(route = %key, ?tier, handlers = handlers.len(), "dispatching client event");
                for handler in handlers {
                    handler(event);
                }
            }
        }
    }

    /// Total number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handler_count
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Every registered key, sorted.
    pub fn route_keys(&self) -> Vec<&RouteKey> {
        let mut keys: Vec<&RouteKey> = self.routes.keys().collect();
        keys.sort();
        keys
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.route_keys())
            .field("handler_count", &self.handler_count)
            .finish()
    }
}
