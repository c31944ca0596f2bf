//! `gasp-middleware` – event routing and outbound delivery.
//!
//! Moves messages between the browser-facing sessions and application
//! handlers without caring what the controls mean.
//!
//! # Modules
//!
//! - [`route`] – [`RouteKey`] triples and the four wildcard lookup tiers.
//! - [`router`] – [`Router`]: registers handlers and dispatches inbound
//!   [`ClientEvent`]s to every matching tier.
//! - [`queue`] – [`OutboundQueue`]: bounded MPSC buffer with a drop-on-full
//!   policy, drained by a session's outbound worker.
//! - [`outbox`] – [`Outbox`]: the producer handle, with `update_*` helpers
//!   that turn control state into partial or full update events.
//! - [`controls`] – [`Control`] handles (`Textbox`, `Checkbox`, `LineChart`,
//!   …) for one-field updates.
//! - [`event`] – [`ClientEvent`] and the [`SessionHandle`] back-reference.
//! - [`store`] – [`SharedStore`]: a key/value stash handlers share.

pub mod controls;
pub mod event;
pub mod outbox;
pub mod queue;
pub mod route;
pub mod router;
pub mod store;

pub use controls::{
    Button, Checkbox, Control, DEFAULT_LINE_NAME, Dropdown, Label, LineChart, PacketInspector,
    Textbox,
};
pub use event::{ClientEvent, SessionHandle};
pub use outbox::Outbox;
pub use queue::{DEFAULT_QUEUE_CAPACITY, MAX_QUEUE_CAPACITY, OutboundQueue};
pub use route::{RouteKey, Tier, WILDCARD};
pub use router::{Handler, Router};
pub use store::SharedStore;
