//! `gasp-server` – WebSocket transport and HTTP surface.
//!
//! Boots a TCP listener that:
//!
//! 1. **Serves** the caller's views verbatim over plain HTTP (or
//!    `Gasp Server Online` at `/` when none were registered).
//!
//! 2. **Upgrades** requests on the reserved [`WS_PATH`] into a [`Session`]:
//!    an inbound worker that decodes [`ClientEvent`]s and dispatches them
//!    through the frozen [`Router`], and an outbound worker draining the
//!    server's [`OutboundQueue`].
//!
//! 3. **Reports** runtime channel errors to a single-slot [`ErrorSink`]
//!    without ever blocking a worker.
//!
//! # Usage
//!
//! ```rust,no_run
//! use gasp_server::Server;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut server = Server::new("127.0.0.1:8800").expect("valid socket");
//!     server
//!         .add_event_handler("*", "*", "click", |evt| println!("{} clicked", evt.id))
//!         .expect("valid route");
//!     server.run().await.expect("gasp server failed");
//! }
//! ```
//!
//! [`WS_PATH`]: gasp_types::WS_PATH
//! [`ClientEvent`]: gasp_middleware::ClientEvent
//! [`Router`]: gasp_middleware::Router
//! [`OutboundQueue`]: gasp_middleware::OutboundQueue

pub mod errors;
pub mod server;
pub mod session;

pub use errors::ErrorSink;
pub use server::{BoundServer, DEFAULT_SOCKET, Server, validate_socket};
pub use session::{Session, SessionState};
