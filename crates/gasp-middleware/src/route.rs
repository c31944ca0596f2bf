//! Route keys and the wildcard lookup tiers.
//!
//! A route key is the triple `(view, element id, event type)`.  The view and
//! element id may be the literal wildcard [`WILDCARD`]; the event type is
//! always literal.
//!
//! Resolving an inbound event `(V, I, T)` visits four keys, always in this
//! order:
//!
//! | Tier | Key |
//! |---|---|
//! | [`Tier::Exact`] | `(V, I, T)` |
//! | [`Tier::AnyView`] | `(*, I, T)` |
//! | [`Tier::AnyElement`] | `(V, *, T)` |
//! | [`Tier::AnyViewAndElement`] | `(*, *, T)` |

use std::fmt;

/// Matches any view or any element id.
pub const WILDCARD: &str = "*";

/// Specificity tier of a lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Exact,
    AnyView,
    AnyElement,
    AnyViewAndElement,
}

/// A `(view, element id, event type)` triple, stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    view: String,
    element_id: String,
    event_type: String,
}

impl RouteKey {
    pub fn new(
        view: impl Into<String>,
        element_id: impl Into<String>,
        event_type: impl Into<String>,
    ) -> Self {
        Self {
            view: view.into(),
            element_id: element_id.into(),
            event_type: event_type.into(),
        }
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// `true` when either the view or the element id is [`WILDCARD`].
    pub fn has_wildcard(&self) -> bool {
        self.view == WILDCARD || self.element_id == WILDCARD
    }

    /// The four lookup keys for an inbound `(view, element_id, event_type)`,
    /// most specific first.
    ///
    /// When the inbound event itself carries a wildcard some tiers collapse
    /// onto the same key; each distinct key is returned once, at its first
    /// position.
    pub fn lookup_tiers(view: &str, element_id: &str, event_type: &str) -> Vec<(Tier, RouteKey)> {
        let candidates = [
            (Tier::Exact, RouteKey::new(view, element_id, event_type)),
            (Tier::AnyView, RouteKey::new(WILDCARD, element_id, event_type)),
            (Tier::AnyElement, RouteKey::new(view, WILDCARD, event_type)),
            (Tier::AnyViewAndElement, RouteKey::new(WILDCARD, WILDCARD, event_type)),
        ];

        let mut tiers: Vec<(Tier, RouteKey)> = Vec::with_capacity(candidates.len());
        for (tier, key) in candidates {
            if !tiers.iter().any(|(_, seen)| *seen == key) {
                tiers.push((tier, key));
            }
        }
        tiers
    }
}

impl fmt::Display for RouteKey {
    /// Canonical `view#id!type` form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}!{}", self.view, self.element_id, self.event_type)
    }
}
