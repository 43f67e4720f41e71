//! Fixed schemas for `google.protobuf` well-known types
//!
//! These short-circuit message expansion: a field of one of these types never
//! recurses into the message definition.

use super::{JsonSchemaProps, ValidationRule};

/// Absolute names of every type with a fixed schema
pub const WELL_KNOWN_TYPES: &[&str] = &[
    "google.protobuf.ListValue",
    "google.protobuf.Struct",
    "google.protobuf.Any",
    "google.protobuf.Value",
    "google.protobuf.BoolValue",
    "google.protobuf.StringValue",
    "google.protobuf.DoubleValue",
    "google.protobuf.Int32Value",
    "google.protobuf.Int64Value",
    "google.protobuf.UInt32Value",
    "google.protobuf.UInt64Value",
    "google.protobuf.FloatValue",
    "google.protobuf.Duration",
    "google.protobuf.Empty",
    "google.protobuf.Timestamp",
];

pub fn is_well_known(absolute_name: &str) -> bool {
    WELL_KNOWN_TYPES.contains(&absolute_name)
}

/// A fresh copy of the schema for `absolute_name`, if it is a well-known type
pub fn well_known_schema(absolute_name: &str) -> Option<JsonSchemaProps> {
    let schema = match absolute_name {
        "google.protobuf.ListValue" => JsonSchemaProps {
            type_: "array".to_string(),
            items: Some(Box::new(JsonSchemaProps {
                type_: "object".to_string(),
                x_preserve_unknown_fields: Some(true),
                ..Default::default()
            })),
            ..Default::default()
        },
        "google.protobuf.Struct" | "google.protobuf.Any" => JsonSchemaProps {
            type_: "object".to_string(),
            x_preserve_unknown_fields: Some(true),
            ..Default::default()
        },
        "google.protobuf.Value" => JsonSchemaProps {
            x_preserve_unknown_fields: Some(true),
            ..Default::default()
        },
        "google.protobuf.BoolValue" => nullable(JsonSchemaProps::typed("boolean")),
        "google.protobuf.StringValue" => nullable(JsonSchemaProps::typed("string")),
        "google.protobuf.DoubleValue" | "google.protobuf.FloatValue" => {
            nullable(JsonSchemaProps::formatted("number", "double"))
        }
        "google.protobuf.Int32Value" => nullable(JsonSchemaProps::formatted("integer", "int32")),
        "google.protobuf.Int64Value" => nullable(JsonSchemaProps::formatted("integer", "int64")),
        "google.protobuf.UInt32Value" => nullable(JsonSchemaProps {
            minimum: Some(0.0),
            maximum: Some(u32::MAX as f64),
            ..JsonSchemaProps::typed("integer")
        }),
        "google.protobuf.UInt64Value" => nullable(JsonSchemaProps {
            minimum: Some(0.0),
            ..JsonSchemaProps::typed("integer")
        }),
        "google.protobuf.Duration" => JsonSchemaProps {
            x_validations: vec![ValidationRule {
                rule: "duration(self) >= duration('1ms')".to_string(),
                message: "must be a valid duration greater than 1ms".to_string(),
                ..Default::default()
            }],
            ..JsonSchemaProps::typed("string")
        },
        "google.protobuf.Empty" => JsonSchemaProps {
            max_properties: Some(0),
            ..JsonSchemaProps::typed("object")
        },
        "google.protobuf.Timestamp" => JsonSchemaProps::formatted("string", "date-time"),
        _ => return None,
    };
    Some(schema)
}

fn nullable(schema: JsonSchemaProps) -> JsonSchemaProps {
    JsonSchemaProps {
        nullable: true,
        ..schema
    }
}
