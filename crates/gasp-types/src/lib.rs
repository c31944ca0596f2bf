//! `gasp-types` – shared vocabulary for the gasp state-synchronization engine.
//!
//! # Modules
//!
//! - [`state`] – per-control-kind state records ([`TextboxState`],
//!   [`CheckboxState`], [`LineChartState`], …) sharing a common
//!   [`ControlState`] base, plus the aggregated [`FormState`] snapshot the
//!   browser sends with every interaction.
//! - [`event`] – the outbound [`ServerEvent`] wire message and the
//!   [`Property`] names used by partial updates.
//!
//! Everything here is plain data: no I/O, no channels.

pub mod event;
pub mod state;

pub use event::{Property, ServerEvent, FORM_UPDATE, WS_INFO};
pub use state::{
    ButtonState, CheckboxState, ControlKind, ControlKindState, ControlState, DropdownState,
    FormState, LabelState, LineChartState, LineState, PacketInspectorState, TextboxState,
};

use thiserror::Error;

/// Reserved HTTP path of the WebSocket channel.
///
/// Views may not be registered at this path.
pub const WS_PATH: &str = "/gaspws";

/// Global error type spanning setup-time validation and runtime channel
/// failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GaspError {
    #[error("socket '{0}' is invalid, should be in format <fqdn>:<port> or <ip_address>:<port>")]
    InvalidSocket(String),

    #[error("path cannot be '{WS_PATH}', which is reserved for the WebSockets channel")]
    ReservedPath,

    #[error("path '{0}' already handled")]
    DuplicatePath(String),

    #[error("invalid route: {0}")]
    InvalidRoute(String),

    #[error("bind error on {addr}: {details}")]
    Bind { addr: String, details: String },

    #[error("WebSocket handshake failed: {0}")]
    Handshake(String),

    #[error("failed to decode client event: {0}")]
    Decode(String),

    #[error("failed to encode server event: {0}")]
    Encode(String),

    #[error("WebSocket write failed: {0}")]
    Write(String),

    #[error("WebSocket channel closed: {0}")]
    ChannelClosed(String),

    #[error("I/O error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_path_error_names_the_channel_path() {
        let err = GaspError::ReservedPath;
        assert!(err.to_string().contains("/gaspws"));
    }

    #[test]
    fn bind_error_display() {
        let err = GaspError::Bind {
            addr: "127.0.0.1:1".to_string(),
            details: "permission denied".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("127.0.0.1:1"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn duplicate_path_error_display() {
        let err = GaspError::DuplicatePath("/view".to_string());
        assert_eq!(err.to_string(), "path '/view' already handled");
    }
}
