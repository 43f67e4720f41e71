//! OpenAPI v3 schema types
//!
//! The subset of the Kubernetes `JSONSchemaProps` shape the generator emits.
//! Empty values are omitted on serialization and properties are kept in a
//! sorted map, so serialized output is stable.

pub mod cel;
pub mod markers;
pub mod visitor;
pub mod well_known;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

pub use markers::MarkerRegistry;
pub use visitor::{edit_schema, PathSegment, PreserveUnknownFieldVisitor, SchemaVisitor, StripValidationVisitor, Walk};

/// One node of an OpenAPI v3 schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSchemaProps {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, JsonSchemaProps>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchemaProps>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<JsonSchemaProps>>,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<JsonSchemaProps>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<JsonSchemaProps>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<JsonSchemaProps>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<JsonSchemaProps>>,

    #[serde(default, skip_serializing_if = "Option::is_none", serialize_with = "serialize_number")]
    pub minimum: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none", serialize_with = "serialize_number")]
    pub maximum: Option<f64>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub exclusive_minimum: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub exclusive_maximum: bool,

    #[serde(default, skip_serializing_if = "Option::is_none", serialize_with = "serialize_number")]
    pub multiple_of: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pattern: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<i64>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub unique_items: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<i64>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,

    #[serde(rename = "x-kubernetes-preserve-unknown-fields", default, skip_serializing_if = "Option::is_none")]
    pub x_preserve_unknown_fields: Option<bool>,

    #[serde(rename = "x-kubernetes-int-or-string", default, skip_serializing_if = "is_false")]
    pub x_int_or_string: bool,

    #[serde(rename = "x-kubernetes-embedded-resource", default, skip_serializing_if = "is_false")]
    pub x_embedded_resource: bool,

    #[serde(rename = "x-kubernetes-list-type", default, skip_serializing_if = "Option::is_none")]
    pub x_list_type: Option<String>,

    #[serde(rename = "x-kubernetes-list-map-keys", default, skip_serializing_if = "Vec::is_empty")]
    pub x_list_map_keys: Vec<String>,

    #[serde(rename = "x-kubernetes-validations", default, skip_serializing_if = "Vec::is_empty")]
    pub x_validations: Vec<ValidationRule>,
}

/// A CEL validation rule (`x-kubernetes-validations` entry)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    pub rule: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message_expression: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional_old_self: Option<bool>,
}

impl JsonSchemaProps {
    /// A schema with only `type` set
    pub fn typed(type_: &str) -> Self {
        Self {
            type_: type_.to_string(),
            ..Default::default()
        }
    }

    /// A schema with `type` and `format` set
    pub fn formatted(type_: &str, format: &str) -> Self {
        Self {
            type_: type_.to_string(),
            format: format.to_string(),
            ..Default::default()
        }
    }

    /// `{type: array, items: <item>}`
    pub fn array_of(item: JsonSchemaProps) -> Self {
        Self {
            type_: "array".to_string(),
            items: Some(Box::new(item)),
            ..Default::default()
        }
    }

    /// `{required: [name]}`, used as a oneOf branch
    pub fn requiring(name: &str) -> Self {
        Self {
            required: vec![name.to_string()],
            ..Default::default()
        }
    }

    pub fn preserves_unknown_fields(&self) -> bool {
        self.x_preserve_unknown_fields == Some(true)
    }

    /// Serialize to a JSON value with lexically ordered keys
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Whole numbers are written as integers (`4294967295`, not `4294967295.0`).
fn serialize_number<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < 9.007_199_254_740_992e15 => serializer.serialize_i64(*v as i64),
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_fields_omitted() {
        let schema = JsonSchemaProps::typed("string");
        assert_eq!(schema.to_value().unwrap(), json!({"type": "string"}));
    }

    #[test]
    fn test_whole_numbers_serialize_as_integers() {
        let schema = JsonSchemaProps {
            type_: "integer".to_string(),
            minimum: Some(0.0),
            maximum: Some(4294967295.0),
            multiple_of: Some(0.5),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&schema).unwrap(),
            r#"{"type":"integer","minimum":0,"maximum":4294967295,"multipleOf":0.5}"#
        );
    }

    #[test]
    fn test_extension_field_names() {
        let schema = JsonSchemaProps {
            x_preserve_unknown_fields: Some(true),
            x_int_or_string: true,
            x_validations: vec![ValidationRule {
                rule: "self.a > 0".to_string(),
                message: "a must be positive".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let value = schema.to_value().unwrap();
        assert_eq!(value["x-kubernetes-preserve-unknown-fields"], json!(true));
        assert_eq!(value["x-kubernetes-int-or-string"], json!(true));
        assert_eq!(value["x-kubernetes-validations"][0]["message"], json!("a must be positive"));
    }

    #[test]
    fn test_round_trip_through_json() {
        let schema = JsonSchemaProps {
            properties: BTreeMap::from([("a".to_string(), JsonSchemaProps::formatted("integer", "int32"))]),
            ..JsonSchemaProps::typed("object")
        };
        let text = serde_json::to_string(&schema).unwrap();
        let back: JsonSchemaProps = serde_json::from_str(&text).unwrap();
        assert_eq!(back, schema);
    }
}
