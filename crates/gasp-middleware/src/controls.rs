//! Per-control handles.
//!
//! A [`Control`] pairs a control id with an [`Outbox`] and turns one-field
//! changes into single-property partial updates:
//!
//! ```
//! use gasp_middleware::OutboundQueue;
//!
//! let queue = OutboundQueue::new(8);
//! let label = queue.outbox().label("status");
//! label.update_text("ready");
//!
//! let evt = queue.try_dequeue().unwrap();
//! assert_eq!(evt.event_type, "label_update");
//! ```

use std::marker::PhantomData;

use gasp_types::{
    ButtonState, CheckboxState, ControlKindState, DropdownState, LabelState, LineChartState,
    LineState, PacketInspectorState, Property, TextboxState,
};

use crate::outbox::Outbox;

/// Line name used when [`LineChart::update_values`] is given an empty one.
pub const DEFAULT_LINE_NAME: &str = "line0";

/// Handle to one control of kind `S` on the client.
pub struct Control<S> {
    id: String,
    outbox: Outbox,
    _kind: PhantomData<fn() -> S>,
}

pub type Textbox = Control<TextboxState>;
pub type Button = Control<ButtonState>;
pub type Label = Control<LabelState>;
pub type Dropdown = Control<DropdownState>;
pub type Checkbox = Control<CheckboxState>;
pub type LineChart = Control<LineChartState>;
pub type PacketInspector = Control<PacketInspectorState>;

impl<S> Clone for Control<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            outbox: self.outbox.clone(),
            _kind: PhantomData,
        }
    }
}

impl<S: ControlKindState> Control<S> {
    /// Handle for `id`.  An empty id selects the first auto-numbered control
    /// of the kind, e.g. `gtextbox0`.
    pub fn new(id: impl Into<String>, outbox: Outbox) -> Self {
        let id = id.into();
        let id = if id.is_empty() {
            format!("g{}0", S::KIND.name())
        } else {
            id
        };
        Self {
            id,
            outbox,
            _kind: PhantomData,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn update_text(&self, text: impl Into<String>) {
        let mut state = S::blank(&self.id);
        state.control_mut().text = text.into();
        self.outbox.update_control(&state, &[Property::Text]);
    }

    pub fn update_is_visible(&self, is_visible: bool) {
        let mut state = S::blank(&self.id);
        state.control_mut().is_visible = is_visible;
        self.outbox.update_control(&state, &[Property::IsVisible]);
    }

    pub fn update_is_enabled(&self, is_enabled: bool) {
        let mut state = S::blank(&self.id);
        state.control_mut().is_enabled = is_enabled;
        self.outbox.update_control(&state, &[Property::IsEnabled]);
    }
}

impl Control<CheckboxState> {
    pub fn update_is_checked(&self, is_checked: bool) {
        let mut state = CheckboxState::new(self.id.as_str());
        state.is_checked = is_checked;
        self.outbox.update_checkbox(&state, &[Property::IsChecked]);
    }
}

impl Control<LineChartState> {
    /// Append `values` to the line called `line_name`.
    pub fn update_values(&self, line_name: &str, values: &[f64]) {
        let name = if line_name.is_empty() {
            DEFAULT_LINE_NAME
        } else {
            line_name
        };
        let mut line = LineState::new(name);
        line.new_values = values.to_vec();

        let mut state = LineChartState::new(self.id.as_str());
        state.lines.push(line);
        self.outbox.update_line_chart(&state, &[Property::Values]);
    }
}

impl Control<PacketInspectorState> {
    /// Replace the inspected packet.
    pub fn update_bytes(&self, packet: &[u8]) {
        let mut state = PacketInspectorState::new(self.id.as_str());
        state.set_packet_bytes(packet);
        self.outbox.update_packet_inspector(&state, &[Property::Packet]);
    }
}

impl Outbox {
    pub fn control<S: ControlKindState>(&self, id: impl Into<String>) -> Control<S> {
        Control::new(id, self.clone())
    }

    pub fn textbox(&self, id: impl Into<String>) -> Textbox {
        self.control(id)
    }

    pub fn button(&self, id: impl Into<String>) -> Button {
        self.control(id)
    }

    pub fn label(&self, id: impl Into<String>) -> Label {
        self.control(id)
    }

    pub fn dropdown(&self, id: impl Into<String>) -> Dropdown {
        self.control(id)
    }

    pub fn checkbox(&self, id: impl Into<String>) -> Checkbox {
        self.control(id)
    }

    pub fn line_chart(&self, id: impl Into<String>) -> LineChart {
        self.control(id)
    }

    pub fn packet_inspector(&self, id: impl Into<String>) -> PacketInspector {
        self.control(id)
    }
}
