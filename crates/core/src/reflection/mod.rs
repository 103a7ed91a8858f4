//! Serialized type reflections
//!
//! A [`SerializedType`] records the shape of a generated config or variables
//! type. Reflections from separate builds are merged (union of properties,
//! newer values win) rather than replaced, so partial declarations from
//! different plugins accumulate into one type over time.

pub mod values;

pub use values::ConfigValues;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reflection of a single property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedProperty {
    pub name: String,
    /// Type expression, e.g. `string` or `number`
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Default value as a literal source string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub secret: bool,
}

impl SerializedProperty {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            description: None,
            default_value: None,
            optional: false,
            secret: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }
}

/// Reflection of a whole type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedType {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, SerializedProperty>,
    /// Shape signature over property names, types and optionality
    #[serde(default)]
    pub signature: String,
}

impl SerializedType {
    pub fn new(name: impl Into<String>) -> Self {
        let mut reflection = Self {
            name: name.into(),
            description: None,
            properties: BTreeMap::new(),
            signature: String::new(),
        };
        reflection.refresh_signature();
        reflection
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add or replace a property and refresh the signature
    pub fn with_property(mut self, property: SerializedProperty) -> Self {
        self.insert(property);
        self
    }

    pub fn insert(&mut self, property: SerializedProperty) {
        self.properties.insert(property.name.clone(), property);
        self.refresh_signature();
    }

    pub fn property(&self, name: &str) -> Option<&SerializedProperty> {
        self.properties.get(name)
    }

    pub fn property_names(&self) -> Vec<&str> {
        self.properties.keys().map(String::as_str).collect()
    }

    /// Recompute [`Self::signature`] from the current properties
    pub fn refresh_signature(&mut self) {
        self.signature = compute_signature(&self.properties);
    }

    /// Whether two reflections carry identical content
    pub fn same_content(&self, other: &SerializedType) -> bool {
        self.signature == other.signature
            && self.name == other.name
            && self.description == other.description
            && self.properties == other.properties
    }
}

/// md5 over the sorted `(name, type, optional)` triples
pub fn compute_signature(properties: &BTreeMap<String, SerializedProperty>) -> String {
    let shape = properties
        .values()
        .map(|p| format!("{}:{}{}", p.name, p.type_name, if p.optional { "?" } else { "" }))
        .collect::<Vec<_>>()
        .join(";");
    format!("{:x}", md5::compute(shape.as_bytes()))
}

/// Union `incoming` into `existing`. Properties present in both take the incoming value.
///
/// The name and description also come from `incoming` when it sets them.
pub fn merge(existing: SerializedType, incoming: SerializedType) -> SerializedType {
    let mut merged = existing;
    if !incoming.name.is_empty() {
        merged.name = incoming.name;
    }
    if incoming.description.is_some() {
        merged.description = incoming.description;
    }
    merged.properties.extend(incoming.properties);
    merged.refresh_signature();
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reflection(props: &[&str]) -> SerializedType {
        props.iter().fold(SerializedType::new("Vars"), |t, name| {
            t.with_property(SerializedProperty::new(*name, "string"))
        })
    }

    #[test]
    fn test_merge_is_union() {
        let merged = merge(reflection(&["a", "b"]), reflection(&["b", "c"]));
        assert_eq!(merged.property_names(), vec!["a", "b", "c"]);
        assert_eq!(merged.signature, reflection(&["a", "b", "c"]).signature);
    }

    #[test]
    fn test_merge_incoming_values_win() {
        let existing = SerializedType::new("Vars")
            .with_property(SerializedProperty::new("PORT", "number").with_default("3000"));
        let incoming = SerializedType::new("Vars").with_property(
            SerializedProperty::new("PORT", "number")
                .with_default("8080")
                .with_description("Listen port"),
        );

        let merged = merge(existing, incoming);
        let port = merged.property("PORT").unwrap();
        assert_eq!(port.default_value.as_deref(), Some("8080"));
        assert_eq!(port.description.as_deref(), Some("Listen port"));
    }

    #[test]
    fn test_signature_tracks_shape_only() {
        let a = SerializedType::new("A")
            .with_property(SerializedProperty::new("x", "string").with_default("1"));
        let b = SerializedType::new("B")
            .with_property(SerializedProperty::new("x", "string").with_default("2"));
        assert_eq!(a.signature, b.signature);

        let c = SerializedType::new("A").with_property(SerializedProperty::new("x", "string").optional());
        assert_ne!(a.signature, c.signature);
        assert!(!a.same_content(&b));
    }

    #[test]
    fn test_json_shape() {
        let reflection = SerializedType::new("Vars")
            .with_property(SerializedProperty::new("API_TOKEN", "string").secret());
        let json = serde_json::to_value(&reflection).unwrap();

        assert_eq!(json["properties"]["API_TOKEN"]["typeName"], "string");
        assert_eq!(json["properties"]["API_TOKEN"]["secret"], true);
        assert!(json["properties"]["API_TOKEN"].get("defaultValue").is_none());
    }
}
