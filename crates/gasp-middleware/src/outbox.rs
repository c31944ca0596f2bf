//! [`Outbox`] – producer handle for the outbound queue, plus the update
//! helpers that translate control state into [`ServerEvent`]s.

use gasp_types::{
    ButtonState, CheckboxState, ControlKindState, DropdownState, FormState, GaspError,
    LabelState, LineChartState, PacketInspectorState, Property, ServerEvent, TextboxState,
};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error};

/// Cheap, cloneable sending half of an
/// [`OutboundQueue`][crate::queue::OutboundQueue].
///
/// Every method is non-blocking; events that do not fit are dropped.
#[derive(Clone, Debug)]
pub struct Outbox {
    sender: mpsc::Sender<ServerEvent>,
}

impl Outbox {
    pub(crate) fn new(sender: mpsc::Sender<ServerEvent>) -> Self {
        Self { sender }
    }

    /// Enqueue `event`, dropping it if the queue is full.
    pub fn send(&self, event: ServerEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                debug!(event_type = %dropped.event_type, "outbound queue full; event dropped");
            }
            Err(TrySendError::Closed(dropped)) => {
                debug!(event_type = %dropped.event_type, "outbound queue closed; event dropped");
            }
        }
    }

    /// Free slots left in the queue.
    pub(crate) fn available(&self) -> usize {
        self.sender.capacity()
    }

    // -----------------------------------------------------------------------
    // Update helpers
    // -----------------------------------------------------------------------

    /// Push a full-form replacement (`form_update`, no property list).
    pub fn update(&self, state: &FormState) {
        self.push(ServerEvent::form_update(state));
    }

    /// Push a partial update for one control; the type tag follows the
    /// state's kind.
    pub fn update_control<S: ControlKindState>(&self, state: &S, properties: &[Property]) {
        self.push(ServerEvent::control_update(state, properties));
    }

    pub fn update_textbox(&self, state: &TextboxState, properties: &[Property]) {
        self.update_control(state, properties);
    }

    pub fn update_button(&self, state: &ButtonState, properties: &[Property]) {
        self.update_control(state, properties);
    }

    pub fn update_label(&self, state: &LabelState, properties: &[Property]) {
        self.update_control(state, properties);
    }

    pub fn update_dropdown(&self, state: &DropdownState, properties: &[Property]) {
        self.update_control(state, properties);
    }

    pub fn update_checkbox(&self, state: &CheckboxState, properties: &[Property]) {
        self.update_control(state, properties);
    }

    pub fn update_line_chart(&self, state: &LineChartState, properties: &[Property]) {
        self.update_control(state, properties);
    }

    pub fn update_packet_inspector(&self, state: &PacketInspectorState, properties: &[Property]) {
        self.update_control(state, properties);
    }

    fn push(&self, built: Result<ServerEvent, GaspError>) {
        match built {
            Ok(event) => self.send(event),
            Err(e) => error!(error = %e, "failed to build update event"),
        }
    }
}
