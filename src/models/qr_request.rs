//! The decoded QR-generation request.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Field names understood by the renderer.
pub const CONTENT: &str = "content";
pub const BOX_SIZE: &str = "box_size";
pub const BORDER: &str = "border";
pub const BACKGROUND_COLOR: &str = "background_color";
pub const DOTS_COLOR: &str = "dots_color";
pub const MARKER_BORDER_COLOR: &str = "marker_border_color";
pub const MARKER_CENTER_COLOR: &str = "marker_center_color";

/// A request body decoded as a JSON object.
///
/// The raw fields are kept untouched: the renderer pulls the styling
/// parameters it needs and the metadata record stores every key verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct QrRequest {
    fields: Map<String, Value>,
}

impl QrRequest {
    /// Decode a serialized body. Anything other than a JSON object is rejected.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        let fields: Map<String, Value> = serde_json::from_str(body)?;
        Ok(Self { fields })
    }

    #[cfg(test)]
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Every request field coerced to its string form.
    ///
    /// Strings are kept as-is; any other JSON value uses its compact JSON
    /// rendering (`10`, `true`, `null`, `{"a":1}`).
    pub fn request_data(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|(key, value)| (key.clone(), stringify(value)))
            .collect()
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
