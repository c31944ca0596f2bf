//! Control state records and the aggregated [`FormState`].
//!
//! Every control kind shares the same [`ControlState`] base (id, text,
//! visibility, enabled flag).  Kind-specific records embed that base with
//! `#[serde(flatten)]` so the wire shape stays flat:
//!
//! ```json
//! { "id": "gcheckbox0", "text": "", "is_visible": true, "is_enabled": true, "is_checked": false }
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Deserializer, Serialize};

use crate::GaspError;

// ────────────────────────────────────────────────────────────────────────────
// ControlKind
// ────────────────────────────────────────────────────────────────────────────

/// Closed set of control kinds the engine can synchronize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Textbox,
    Button,
    Label,
    Dropdown,
    Checkbox,
    LineChart,
    PacketInspector,
}

impl ControlKind {
    /// Every kind, in [`FormState`] field order.
    pub const ALL: [ControlKind; 7] = [
        ControlKind::Textbox,
        ControlKind::Button,
        ControlKind::Label,
        ControlKind::Dropdown,
        ControlKind::Checkbox,
        ControlKind::LineChart,
        ControlKind::PacketInspector,
    ];

    /// Lowercase wire name, e.g. `"linechart"`.
    pub fn name(self) -> &'static str {
        match self {
            ControlKind::Textbox => "textbox",
            ControlKind::Button => "button",
            ControlKind::Label => "label",
            ControlKind::Dropdown => "dropdown",
            ControlKind::Checkbox => "checkbox",
            ControlKind::LineChart => "linechart",
            ControlKind::PacketInspector => "packetinspector",
        }
    }

    /// Type tag of the partial-update event for this kind.
    pub fn update_type(self) -> &'static str {
        match self {
            ControlKind::Textbox => "textbox_update",
            ControlKind::Button => "button_update",
            ControlKind::Label => "label_update",
            ControlKind::Dropdown => "dropdown_update",
            ControlKind::Checkbox => "checkbox_update",
            ControlKind::LineChart => "linechart_update",
            ControlKind::PacketInspector => "packetinspector_update",
        }
    }

    /// Human-readable text carried by the partial-update event.
    pub fn update_text(self) -> String {
        let noun = match self {
            ControlKind::Dropdown => "drop-down",
            other => other.name(),
        };
        format!("the {noun} has been updated server-side")
    }
}

impl std::fmt::Display for ControlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Base state
// ────────────────────────────────────────────────────────────────────────────

/// Fields shared by every control kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlState {
    pub id: String,
    pub text: String,
    pub is_visible: bool,
    pub is_enabled: bool,
}

impl ControlState {
    /// A blank state addressed to `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Implemented by every kind-specific state record.
///
/// Lets update helpers pick the right type tag and lets [`FormState`] look
/// controls up by id without one function per kind.
pub trait ControlKindState: Serialize {
    const KIND: ControlKind;

    /// A blank record addressed to `id`.
    fn blank(id: &str) -> Self
    where
        Self: Sized;

    fn control(&self) -> &ControlState;

    fn control_mut(&mut self) -> &mut ControlState;

    fn id(&self) -> &str {
        &self.control().id
    }
}

macro_rules! base_only_state {
    ($(#[$meta:meta])* $name:ident => $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            #[serde(flatten)]
            pub control: ControlState,
        }

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self {
                    control: ControlState::new(id),
                }
            }
        }

        impl ControlKindState for $name {
            const KIND: ControlKind = $kind;

            fn blank(id: &str) -> Self {
                Self::new(id)
            }

            fn control(&self) -> &ControlState {
                &self.control
            }

            fn control_mut(&mut self) -> &mut ControlState {
                &mut self.control
            }
        }
    };
}

base_only_state!(
    /// State of a single-line text input.
    TextboxState => ControlKind::Textbox
);
base_only_state!(
    /// State of a push button; `text` is its caption.
    ButtonState => ControlKind::Button
);
base_only_state!(
    /// State of a static label.
    LabelState => ControlKind::Label
);
base_only_state!(
    /// State of a drop-down; `text` is the selected option.
    DropdownState => ControlKind::Dropdown
);

/// State of a checkbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckboxState {
    #[serde(flatten)]
    pub control: ControlState,
    #[serde(default)]
    pub is_checked: bool,
}

impl CheckboxState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            control: ControlState::new(id),
            is_checked: false,
        }
    }
}

impl ControlKindState for CheckboxState {
    const KIND: ControlKind = ControlKind::Checkbox;

    fn blank(id: &str) -> Self {
        Self::new(id)
    }

    fn control(&self) -> &ControlState {
        &self.control
    }

    fn control_mut(&mut self) -> &mut ControlState {
        &mut self.control
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Line chart
// ────────────────────────────────────────────────────────────────────────────

/// One named series of a line chart.
///
/// `new_values` holds only the samples appended since the previous update;
/// the browser keeps the history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineState {
    pub name: String,
    pub thickness: u32,
    pub color: String,
    pub new_values: Vec<f64>,
}

impl LineState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// State of a line chart canvas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineChartState {
    #[serde(flatten)]
    pub control: ControlState,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub lines: Vec<LineState>,
}

impl LineChartState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            control: ControlState::new(id),
            ..Self::default()
        }
    }

    /// First line called `name`, if any.
    pub fn line(&self, name: &str) -> Option<&LineState> {
        self.lines.iter().find(|l| l.name == name)
    }
}

impl ControlKindState for LineChartState {
    const KIND: ControlKind = ControlKind::LineChart;

    fn blank(id: &str) -> Self {
        Self::new(id)
    }

    fn control(&self) -> &ControlState {
        &self.control
    }

    fn control_mut(&mut self) -> &mut ControlState {
        &mut self.control
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Packet inspector
// ────────────────────────────────────────────────────────────────────────────

/// State of the bit-level packet inspector.
///
/// `packet` carries the raw bytes base64-encoded; use
/// [`PacketInspectorState::set_packet_bytes`] and
/// [`PacketInspectorState::packet_bytes`] rather than touching it directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketInspectorState {
    #[serde(flatten)]
    pub control: ControlState,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub char_height: u32,
    #[serde(default)]
    pub byte_count: u32,
    #[serde(default)]
    pub packet: String,
}

impl PacketInspectorState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            control: ControlState::new(id),
            ..Self::default()
        }
    }

    /// Encode `bytes` into the `packet` field.
    pub fn set_packet_bytes(&mut self, bytes: &[u8]) {
        self.packet = BASE64.encode(bytes);
    }

    /// Decode the `packet` field.  An empty field decodes to no bytes.
    pub fn packet_bytes(&self) -> Result<Vec<u8>, GaspError> {
        BASE64
            .decode(self.packet.as_bytes())
            .map_err(|e| GaspError::Decode(format!("packet is not valid base64: {e}")))
    }
}

impl ControlKindState for PacketInspectorState {
    const KIND: ControlKind = ControlKind::PacketInspector;

    fn blank(id: &str) -> Self {
        Self::new(id)
    }

    fn control(&self) -> &ControlState {
        &self.control
    }

    fn control_mut(&mut self) -> &mut ControlState {
        &mut self.control
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FormState
// ────────────────────────────────────────────────────────────────────────────

/// Snapshot of every control on a form, grouped by kind.
///
/// The browser sends a complete snapshot with each interaction; the server
/// may push one back as a full refresh.  A kind that is missing or `null` on
/// the wire decodes as an empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub textboxes: Vec<TextboxState>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub buttons: Vec<ButtonState>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub labels: Vec<LabelState>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dropdowns: Vec<DropdownState>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub checkboxes: Vec<CheckboxState>,
    #[serde(default, rename = "linecharts", deserialize_with = "null_as_empty")]
    pub line_charts: Vec<LineChartState>,
    #[serde(default, rename = "packetinspectors", deserialize_with = "null_as_empty")]
    pub packet_inspectors: Vec<PacketInspectorState>,
}

impl FormState {
    pub fn get_textbox(&self, id: &str) -> Option<&TextboxState> {
        find(&self.textboxes, id)
    }

    pub fn get_button(&self, id: &str) -> Option<&ButtonState> {
        find(&self.buttons, id)
    }

    pub fn get_label(&self, id: &str) -> Option<&LabelState> {
        find(&self.labels, id)
    }

    pub fn get_dropdown(&self, id: &str) -> Option<&DropdownState> {
        find(&self.dropdowns, id)
    }

    pub fn get_checkbox(&self, id: &str) -> Option<&CheckboxState> {
        find(&self.checkboxes, id)
    }

    pub fn get_line_chart(&self, id: &str) -> Option<&LineChartState> {
        find(&self.line_charts, id)
    }

    pub fn get_packet_inspector(&self, id: &str) -> Option<&PacketInspectorState> {
        find(&self.packet_inspectors, id)
    }

    pub fn get_textbox_mut(&mut self, id: &str) -> Option<&mut TextboxState> {
        find_mut(&mut self.textboxes, id)
    }

    pub fn get_label_mut(&mut self, id: &str) -> Option<&mut LabelState> {
        find_mut(&mut self.labels, id)
    }

    pub fn get_checkbox_mut(&mut self, id: &str) -> Option<&mut CheckboxState> {
        find_mut(&mut self.checkboxes, id)
    }

    /// Total number of controls across all kinds.
    pub fn len(&self) -> usize {
        self.textboxes.len()
            + self.buttons.len()
            + self.labels.len()
            + self.dropdowns.len()
            + self.checkboxes.len()
            + self.line_charts.len()
            + self.packet_inspectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn find<'a, T: ControlKindState>(items: &'a [T], id: &str) -> Option<&'a T> {
    items.iter().find(|s| s.id() == id)
}

fn find_mut<'a, T: ControlKindState>(items: &'a mut [T], id: &str) -> Option<&'a mut T> {
    items.iter_mut().find(|s| s.id() == id)
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkbox_state_serializes_flat() {
        let mut cb = CheckboxState::new("gcheckbox0");
        cb.is_checked = true;
        let json = serde_json::to_value(&cb).unwrap();
        assert_eq!(json["id"], "gcheckbox0");
        assert_eq!(json["is_checked"], true);
        assert_eq!(json["is_visible"], false);
        assert!(json.get("control").is_none(), "base fields must be flattened");
    }

    #[test]
    fn form_state_decodes_browser_snapshot() {
        let raw = r#"{
            "buttons": [{"id":"gbutton0","text":"Go","is_visible":true,"is_enabled":true}],
            "textboxes": [{"id":"gtextbox0","text":"hello","is_visible":true,"is_enabled":false}],
            "labels": [],
            "dropdowns": [],
            "checkboxes": [{"id":"gcheckbox0","text":"","is_visible":true,"is_enabled":true,"is_checked":true}],
            "linecharts": [{"id":"glinechart0","text":"","is_visible":true,"is_enabled":true,"width":500,"height":200,"lines":[{"name":"line0","thickness":2,"color":"red","new_values":[]}]}],
            "packetinspectors": []
        }"#;
        let state: FormState = serde_json::from_str(raw).unwrap();
        assert_eq!(state.len(), 4);
        assert_eq!(state.get_textbox("gtextbox0").unwrap().control.text, "hello");
        assert!(!state.get_textbox("gtextbox0").unwrap().control.is_enabled);
        assert!(state.get_checkbox("gcheckbox0").unwrap().is_checked);
        let chart = state.get_line_chart("glinechart0").unwrap();
        assert_eq!(chart.width, 500);
        assert_eq!(chart.line("line0").unwrap().color, "red");
    }

    #[test]
    fn form_state_null_and_missing_lists_decode_empty() {
        let state: FormState =
            serde_json::from_str(r#"{"textboxes":null,"buttons":null}"#).unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn lookup_returns_first_match_or_none() {
        let mut first = LabelState::new("dup");
        first.control.text = "first".to_string();
        let mut second = LabelState::new("dup");
        second.control.text = "second".to_string();
        let state = FormState {
            labels: vec![first, second],
            ..FormState::default()
        };
        assert_eq!(state.get_label("dup").unwrap().control.text, "first");
        assert!(state.get_label("missing").is_none());
        assert!(state.get_button("dup").is_none());
    }

    #[test]
    fn get_mut_edits_in_place() {
        let mut state = FormState {
            textboxes: vec![TextboxState::new("name")],
            ..FormState::default()
        };
        state.get_textbox_mut("name").unwrap().control.text = "Rick".to_string();
        assert_eq!(state.textboxes[0].control.text, "Rick");
    }

    #[test]
    fn packet_bytes_are_base64_on_the_wire() {
        let mut pi = PacketInspectorState::new("gpacketinspector0");
        pi.set_packet_bytes(&[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(pi.packet, "3q2+7w==");
        assert_eq!(pi.packet_bytes().unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn invalid_packet_text_is_a_decode_error() {
        let mut pi = PacketInspectorState::new("p");
        pi.packet = "not base64!".to_string();
        assert!(matches!(pi.packet_bytes(), Err(GaspError::Decode(_))));
    }

    #[test]
    fn kind_tags() {
        assert_eq!(ControlKind::LineChart.update_type(), "linechart_update");
        assert_eq!(ControlKind::PacketInspector.name(), "packetinspector");
        assert_eq!(
            ControlKind::Dropdown.update_text(),
            "the drop-down has been updated server-side"
        );
        assert_eq!(TextboxState::KIND, ControlKind::Textbox);
        assert_eq!(ControlKind::ALL.len(), 7);
    }
}
