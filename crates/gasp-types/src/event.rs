//! Outbound wire message.
//!
//! Every message the server pushes to the browser is a [`ServerEvent`]:
//!
//! ```json
//! { "type": "label_update", "text": "...", "data": { "state": {...}, "properties": ["text"] } }
//! ```
//!
//! `data` is an open-ended map.  By convention `<kind>_update` events carry a
//! `state` entry (always including the control `id`) and a `properties`
//! entry listing the fields that actually changed; `form_update` carries only
//! `state` and means "replace everything".

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::GaspError;
use crate::state::{ControlKindState, FormState};

/// Informational event type, e.g. the greeting sent when a client connects.
pub const WS_INFO: &str = "ws_info";

/// Full-form refresh event type.
pub const FORM_UPDATE: &str = "form_update";

/// Name of a control field touched by a partial update.
///
/// The browser applies whatever names it is sent, so the set is open:
/// fields of custom controls travel as [`Property::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Property {
    Text,
    IsVisible,
    IsEnabled,
    IsChecked,
    Values,
    Packet,
    Other(String),
}

impl Property {
    pub fn as_str(&self) -> &str {
        match self {
            Property::Text => "text",
            Property::IsVisible => "is_visible",
            Property::IsEnabled => "is_enabled",
            Property::IsChecked => "is_checked",
            Property::Values => "values",
            Property::Packet => "packet",
            Property::Other(name) => name.as_str(),
        }
    }
}

impl From<&str> for Property {
    fn from(name: &str) -> Self {
        match name {
            "text" => Property::Text,
            "is_visible" => Property::IsVisible,
            "is_enabled" => Property::IsEnabled,
            "is_checked" => Property::IsChecked,
            "values" => Property::Values,
            "packet" => Property::Packet,
            other => Property::Other(other.to_string()),
        }
    }
}

impl From<String> for Property {
    fn from(name: String) -> Self {
        match Property::from(name.as_str()) {
            Property::Other(_) => Property::Other(name),
            known => known,
        }
    }
}

impl From<Property> for String {
    fn from(property: Property) -> Self {
        match property {
            Property::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message pushed from the server to the browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

impl ServerEvent {
    /// An event with no payload.
    pub fn new(event_type: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            text: text.into(),
            data: Map::new(),
        }
    }

    /// A `ws_info` event.
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(WS_INFO, text)
    }

    /// Attach `value` under `key` (builder-style).
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Full-state replacement: a `form_update` event carrying `state` and no
    /// property list.
    pub fn form_update(state: &FormState) -> Result<Self, GaspError> {
        let state = serde_json::to_value(state).map_err(|e| GaspError::Encode(e.to_string()))?;
        Ok(Self::new(FORM_UPDATE, "the form has been updated server-side").with_data("state", state))
    }

    /// Partial update for a single control.
    ///
    /// The type tag comes from the state's [`ControlKind`][crate::ControlKind];
    /// `properties` is carried verbatim and in order.
    pub fn control_update<S: ControlKindState>(
        state: &S,
        properties: &[Property],
    ) -> Result<Self, GaspError> {
        let state = serde_json::to_value(state).map_err(|e| GaspError::Encode(e.to_string()))?;
        let properties = properties
            .iter()
            .map(|p| Value::String(p.as_str().to_string()))
            .collect::<Vec<_>>();
        Ok(Self::new(S::KIND.update_type(), S::KIND.update_text())
            .with_data("state", state)
            .with_data("properties", properties))
    }

    /// Decode the conventional `state` entry, if present.
    pub fn state<T: DeserializeOwned>(&self) -> Result<Option<T>, GaspError> {
        self.data
            .get("state")
            .map(|v| T::deserialize(v).map_err(|e| GaspError::Decode(e.to_string())))
            .transpose()
    }

    /// Decode the conventional `properties` entry.  Absent means none.
    pub fn properties(&self) -> Result<Vec<Property>, GaspError> {
        match self.data.get("properties") {
            Some(v) => Vec::<Property>::deserialize(v).map_err(|e| GaspError::Decode(e.to_string())),
            None => Ok(Vec::new()),
        }
    }

    /// Serialize to the JSON text sent in a WebSocket frame.
    pub fn to_json(&self) -> Result<String, GaspError> {
        serde_json::to_string(self).map_err(|e| GaspError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{CheckboxState, LabelState, LineChartState, LineState, TextboxState};

    #[test]
    fn empty_data_is_omitted_on_the_wire() {
        let json = ServerEvent::info("client connected").to_json().unwrap();
        assert_eq!(json, r#"{"type":"ws_info","text":"client connected"}"#);
    }

    #[test]
    fn control_update_carries_exactly_the_given_properties() {
        let mut cb = CheckboxState::new("gcheckbox3");
        cb.is_checked = true;
        cb.control.text = "ignored by the client".to_string();

        let evt = ServerEvent::control_update(&cb, &[Property::IsChecked, Property::Text]).unwrap();
        assert_eq!(evt.event_type, "checkbox_update");
        assert_eq!(evt.properties().unwrap(), vec![Property::IsChecked, Property::Text]);

        let back: CheckboxState = evt.state().unwrap().unwrap();
        assert_eq!(back.control.id, "gcheckbox3");
        assert!(back.is_checked);
    }

    #[test]
    fn control_update_keeps_id_when_no_property_changed() {
        let evt = ServerEvent::control_update(&LabelState::new("glabel0"), &[]).unwrap();
        assert_eq!(evt.data["state"]["id"], "glabel0");
        assert!(evt.properties().unwrap().is_empty());
        assert_eq!(evt.data["properties"], serde_json::json!([]));
    }

    #[test]
    fn properties_serialize_as_snake_case() {
        let evt = ServerEvent::control_update(
            &TextboxState::new("t"),
            &[Property::IsVisible, Property::IsEnabled],
        )
        .unwrap();
        assert_eq!(evt.data["properties"], serde_json::json!(["is_visible", "is_enabled"]));
    }

    #[test]
    fn form_update_has_state_but_no_properties() {
        let form = FormState {
            labels: vec![LabelState::new("glabel0")],
            ..FormState::default()
        };
        let evt = ServerEvent::form_update(&form).unwrap();
        assert_eq!(evt.event_type, FORM_UPDATE);
        assert!(evt.data.get("properties").is_none());
    }

    #[test]
    fn form_update_round_trips_through_the_wire() {
        let mut chart = LineChartState::new("glinechart0");
        chart.width = 500;
        chart.height = 200;
        chart.lines.push(LineState {
            name: "cpu".to_string(),
            thickness: 2,
            color: "#ff0000".to_string(),
            new_values: vec![0.5, 1.25, -3.0],
        });
        let mut tb = TextboxState::new("gtextbox0");
        tb.control.text = "hello".to_string();
        tb.control.is_visible = true;
        let form = FormState {
            textboxes: vec![tb],
            line_charts: vec![chart],
            checkboxes: vec![CheckboxState::new("gcheckbox0")],
            ..FormState::default()
        };

        let wire = ServerEvent::form_update(&form).unwrap().to_json().unwrap();
        let received: ServerEvent = serde_json::from_str(&wire).unwrap();
        let decoded: FormState = received.state().unwrap().unwrap();
        assert_eq!(decoded, form);
    }

    #[test]
    fn unknown_property_names_decode_as_other() {
        let evt = ServerEvent::new("label_update", "")
            .with_data("properties", serde_json::json!(["colour", "text"]));
        assert_eq!(
            evt.properties().unwrap(),
            vec![Property::Other("colour".to_string()), Property::Text]
        );
    }

    #[test]
    fn custom_property_is_sent_verbatim() {
        let width = Property::from("width");
        assert_eq!(width, Property::Other("width".to_string()));
        assert_eq!(Property::from("is_checked"), Property::IsChecked);

        let evt = ServerEvent::control_update(&LabelState::new("glabel0"), &[width]).unwrap();
        assert_eq!(evt.data["properties"], serde_json::json!(["width"]));
        assert_eq!(serde_json::to_value(Property::Values).unwrap(), "values");
    }

    #[test]
    fn non_string_property_is_a_decode_error() {
        let evt = ServerEvent::new("label_update", "")
            .with_data("properties", serde_json::json!([7]));
        assert!(matches!(evt.properties(), Err(GaspError::Decode(_))));
    }

    #[test]
    fn custom_events_pass_through() {
        let evt = ServerEvent::new("pong", "Hello Rick!");
        let back: ServerEvent = serde_json::from_str(&evt.to_json().unwrap()).unwrap();
        assert_eq!(back, evt);
        assert!(back.state::<LabelState>().unwrap().is_none());
    }
}
