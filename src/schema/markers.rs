//! Comment validation markers
//!
//! Markers are comment lines of the form `+kubebuilder:validation:Name=value`
//! (or `+Name:arg=value,...` for structured arguments). Each marker name is
//! registered in a [`MarkerRegistry`] together with the elements it may
//! annotate and a parser producing a [`SchemaApplier`].
//!
//! The generator also understands a few `+protoc-gen-crd:` forms that route a
//! marker to a map value or list item schema, or rewrite the schema directly.

use std::fmt;

use serde_json::Value;

use super::cel;
use super::visitor::{edit_schema, StripValidationVisitor};
use super::{JsonSchemaProps, ValidationRule};
use crate::error::{GenError, Result};

pub const KUBEBUILDER_VALIDATION_PREFIX: &str = "+kubebuilder:validation:";
pub const LIST_PREFIX: &str = "+list";
pub const PROTOC_GEN_CRD_PREFIX: &str = "+protoc-gen-crd:";

const MAP_VALUE_VALIDATION: &str = "+protoc-gen-crd:map-value-validation:";
const LIST_VALUE_VALIDATION: &str = "+protoc-gen-crd:list-value-validation:";
const DURATION_VALIDATION_NONE: &str = "+protoc-gen-crd:duration-validation:none";
const INT_OR_STRING: &str = "+protoc-gen-crd:validation:XIntOrString";
const IGNORE_SUB_VALIDATION: &str = "+protoc-gen-crd:validation:IgnoreSubValidation:";

// =============================================================================
// Registry Types
// =============================================================================

/// The kind of element a marker comment is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerTarget {
    Field,
    Type,
}

const FIELD_AND_TYPE: &[MarkerTarget] = &[MarkerTarget::Field, MarkerTarget::Type];
const FIELD_ONLY: &[MarkerTarget] = &[MarkerTarget::Field];

/// A parsed marker that edits a schema node
pub trait SchemaApplier: fmt::Debug {
    fn apply_to_schema(&self, schema: &mut JsonSchemaProps) -> std::result::Result<(), String>;
}

/// Parses the argument text following a marker name
pub type MarkerParser = fn(&str) -> std::result::Result<Box<dyn SchemaApplier>, String>;

pub struct MarkerDefinition {
    pub name: &'static str,
    pub targets: &'static [MarkerTarget],
    parse: MarkerParser,
}

impl fmt::Debug for MarkerDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkerDefinition")
            .field("name", &self.name)
            .field("targets", &self.targets)
            .finish()
    }
}

impl MarkerDefinition {
    pub fn new(name: &'static str, targets: &'static [MarkerTarget], parse: MarkerParser) -> Self {
        Self { name, targets, parse }
    }
}

/// Marker definitions by name
#[derive(Debug)]
pub struct MarkerRegistry {
    definitions: Vec<MarkerDefinition>,
}

impl Default for MarkerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register_builtins();
        registry
    }
}

impl MarkerRegistry {
    pub fn empty() -> Self {
        Self {
            definitions: Vec::new(),
        }
    }

    pub fn register(&mut self, definition: MarkerDefinition) {
        self.definitions.push(definition);
    }

    /// Find the definition whose name is the longest prefix of `marker`
    /// ending at `=`, `:` or the end of the line.
    pub fn lookup(&self, marker: &str, target: MarkerTarget) -> Option<&MarkerDefinition> {
        self.definitions
            .iter()
            .filter(|def| def.targets.contains(&target))
            .filter(|def| {
                marker.strip_prefix(def.name).is_some_and(|rest| {
                    rest.is_empty() || rest.starts_with('=') || rest.starts_with(':')
                })
            })
            .max_by_key(|def| def.name.len())
    }

    /// Parse a single marker line
    pub fn parse(&self, marker: &str, target: MarkerTarget) -> Result<Box<dyn SchemaApplier>> {
        let def = self
            .lookup(marker, target)
            .ok_or_else(|| GenError::UnknownMarker(marker.to_string()))?;
        let args = &marker[def.name.len()..];
        let args = args.strip_prefix(['=', ':']).unwrap_or(args);
        (def.parse)(args).map_err(|reason| GenError::InvalidMarker {
            marker: marker.to_string(),
            reason,
        })
    }

    /// Parse a marker and apply it to `schema`
    pub fn apply(&self, marker: &str, target: MarkerTarget, schema: &mut JsonSchemaProps) -> Result<()> {
        self.parse(marker, target)?
            .apply_to_schema(schema)
            .map_err(|reason| GenError::InvalidMarker {
                marker: marker.to_string(),
                reason,
            })
    }

    /// Apply every marker line found in `comment` to `schema`
    pub fn apply_comment(&self, comment: &str, target: MarkerTarget, schema: &mut JsonSchemaProps) -> Result<()> {
        for line in comment.lines().map(str::trim) {
            if !line.starts_with('+') {
                continue;
            }
            if !(line.contains(KUBEBUILDER_VALIDATION_PREFIX)
                || line.contains(LIST_PREFIX)
                || line.contains(PROTOC_GEN_CRD_PREFIX))
            {
                continue;
            }

            if let Some(rest) = line.strip_prefix(MAP_VALUE_VALIDATION) {
                let value = schema
                    .additional_properties
                    .as_deref_mut()
                    .ok_or_else(|| invalid(line, "map-value-validation applies only to map fields"))?;
                self.apply(&format!("{}{}", KUBEBUILDER_VALIDATION_PREFIX, rest), target, value)?;
            } else if let Some(rest) = line.strip_prefix(LIST_VALUE_VALIDATION) {
                let item = schema
                    .items
                    .as_deref_mut()
                    .ok_or_else(|| invalid(line, "list-value-validation applies only to repeated fields"))?;
                self.apply(&format!("{}{}", KUBEBUILDER_VALIDATION_PREFIX, rest), target, item)?;
            } else if line == DURATION_VALIDATION_NONE {
                // ends marker processing for this element
                schema.x_validations.clear();
                return Ok(());
            } else if line == INT_OR_STRING {
                schema.type_.clear();
                schema.format.clear();
                schema.any_of = vec![JsonSchemaProps::typed("integer"), JsonSchemaProps::typed("string")];
                schema.x_int_or_string = true;
            } else if let Some(rest) = line.strip_prefix(IGNORE_SUB_VALIDATION) {
                let messages: Vec<String> =
                    serde_json::from_str(rest).map_err(|e| invalid(line, &e.to_string()))?;
                edit_schema(schema, &mut StripValidationVisitor::new(messages));
            } else {
                self.apply(line, target, schema)?;
            }
        }
        Ok(())
    }

    fn register_builtins(&mut self) {
        let builtins: [(&'static str, &'static [MarkerTarget], MarkerParser); 22] = [
            ("+kubebuilder:validation:Maximum", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::Maximum(parse_number(a)?)))),
            ("+kubebuilder:validation:Minimum", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::Minimum(parse_number(a)?)))),
            ("+kubebuilder:validation:ExclusiveMaximum", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::ExclusiveMaximum(parse_bool(a)?)))),
            ("+kubebuilder:validation:ExclusiveMinimum", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::ExclusiveMinimum(parse_bool(a)?)))),
            ("+kubebuilder:validation:MultipleOf", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::MultipleOf(parse_number(a)?)))),
            ("+kubebuilder:validation:MaxLength", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::MaxLength(parse_int(a)?)))),
            ("+kubebuilder:validation:MinLength", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::MinLength(parse_int(a)?)))),
            ("+kubebuilder:validation:Pattern", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::Pattern(parse_string(a)?)))),
            ("+kubebuilder:validation:MaxItems", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::MaxItems(parse_int(a)?)))),
            ("+kubebuilder:validation:MinItems", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::MinItems(parse_int(a)?)))),
            ("+kubebuilder:validation:UniqueItems", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::UniqueItems(parse_bool(a)?)))),
            ("+kubebuilder:validation:MaxProperties", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::MaxProperties(parse_int(a)?)))),
            ("+kubebuilder:validation:MinProperties", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::MinProperties(parse_int(a)?)))),
            ("+kubebuilder:validation:Enum", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::Enum(parse_enum(a)?)))),
            ("+kubebuilder:validation:Format", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::Format(parse_string(a)?)))),
            ("+kubebuilder:validation:Type", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::Type(parse_string(a)?)))),
            ("+kubebuilder:validation:Nullable", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::Nullable(parse_bool(a)?)))),
            ("+kubebuilder:validation:XValidation", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::XValidation(parse_validation_rule(a)?)))),
            ("+kubebuilder:validation:XIntOrString", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::XIntOrString(parse_bool(a)?)))),
            ("+kubebuilder:validation:XEmbeddedResource", FIELD_AND_TYPE, |a| Ok(Box::new(Builtin::XEmbeddedResource(parse_bool(a)?)))),
            ("+listType", FIELD_ONLY, |a| Ok(Box::new(Builtin::ListType(parse_list_type(a)?)))),
            ("+listMapKey", FIELD_ONLY, |a| Ok(Box::new(Builtin::ListMapKey(parse_string(a)?)))),
        ];

        for (name, targets, parse) in builtins {
            self.register(MarkerDefinition::new(name, targets, parse));
        }
    }
}

fn invalid(marker: &str, reason: &str) -> GenError {
    GenError::InvalidMarker {
        marker: marker.to_string(),
        reason: reason.to_string(),
    }
}

// =============================================================================
// Builtin Markers
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Builtin {
    Maximum(f64),
    Minimum(f64),
    ExclusiveMaximum(bool),
    ExclusiveMinimum(bool),
    MultipleOf(f64),
    MaxLength(i64),
    MinLength(i64),
    Pattern(String),
    MaxItems(i64),
    MinItems(i64),
    UniqueItems(bool),
    MaxProperties(i64),
    MinProperties(i64),
    Enum(Vec<Value>),
    Format(String),
    Type(String),
    Nullable(bool),
    XValidation(ValidationRule),
    XIntOrString(bool),
    XEmbeddedResource(bool),
    ListType(String),
    ListMapKey(String),
}

fn require_type(schema: &JsonSchemaProps, what: &str, allowed: &[&str]) -> std::result::Result<(), String> {
    if allowed.contains(&schema.type_.as_str()) {
        Ok(())
    } else {
        Err(format!("must apply {} to a {} value, found {:?}", what, allowed.join(" or "), schema.type_))
    }
}

const NUMERIC: &[&str] = &["integer", "number"];

impl SchemaApplier for Builtin {
    fn apply_to_schema(&self, schema: &mut JsonSchemaProps) -> std::result::Result<(), String> {
        match self {
            Builtin::Maximum(v) => {
                require_type(schema, "maximum", NUMERIC)?;
                schema.maximum = Some(*v);
            }
            Builtin::Minimum(v) => {
                require_type(schema, "minimum", NUMERIC)?;
                schema.minimum = Some(*v);
            }
            Builtin::ExclusiveMaximum(v) => {
                require_type(schema, "exclusiveMaximum", NUMERIC)?;
                schema.exclusive_maximum = *v;
            }
            Builtin::ExclusiveMinimum(v) => {
                require_type(schema, "exclusiveMinimum", NUMERIC)?;
                schema.exclusive_minimum = *v;
            }
            Builtin::MultipleOf(v) => {
                require_type(schema, "multipleOf", NUMERIC)?;
                schema.multiple_of = Some(*v);
            }
            Builtin::MaxLength(v) => {
                require_type(schema, "maxLength", &["string"])?;
                schema.max_length = Some(*v);
            }
            Builtin::MinLength(v) => {
                require_type(schema, "minLength", &["string"])?;
                schema.min_length = Some(*v);
            }
            Builtin::Pattern(v) => {
                require_type(schema, "pattern", &["string"])?;
                schema.pattern = v.clone();
            }
            Builtin::MaxItems(v) => {
                require_type(schema, "maxItems", &["array"])?;
                schema.max_items = Some(*v);
            }
            Builtin::MinItems(v) => {
                require_type(schema, "minItems", &["array"])?;
                schema.min_items = Some(*v);
            }
            Builtin::UniqueItems(v) => {
                require_type(schema, "uniqueItems", &["array"])?;
                schema.unique_items = *v;
            }
            Builtin::MaxProperties(v) => {
                require_type(schema, "maxProperties", &["object"])?;
                schema.max_properties = Some(*v);
            }
            Builtin::MinProperties(v) => {
                require_type(schema, "minProperties", &["object"])?;
                schema.min_properties = Some(*v);
            }
            Builtin::Enum(values) => schema.enum_values = values.clone(),
            Builtin::Format(v) => schema.format = v.clone(),
            Builtin::Type(v) => schema.type_ = v.clone(),
            Builtin::Nullable(v) => schema.nullable = *v,
            Builtin::XValidation(rule) => schema.x_validations.push(rule.clone()),
            Builtin::XIntOrString(v) => schema.x_int_or_string = *v,
            Builtin::XEmbeddedResource(v) => schema.x_embedded_resource = *v,
            Builtin::ListType(v) => {
                require_type(schema, "listType", &["array"])?;
                schema.x_list_type = Some(v.clone());
            }
            Builtin::ListMapKey(v) => {
                require_type(schema, "listMapKey", &["array"])?;
                schema.x_list_map_keys.push(v.clone());
            }
        }
        Ok(())
    }
}

// =============================================================================
// Argument Parsing
// =============================================================================

fn parse_number(arg: &str) -> std::result::Result<f64, String> {
    arg.trim()
        .parse::<f64>()
        .map_err(|e| format!("expected a number, got {:?}: {}", arg, e))
}

fn parse_int(arg: &str) -> std::result::Result<i64, String> {
    arg.trim()
        .parse::<i64>()
        .map_err(|e| format!("expected an integer, got {:?}: {}", arg, e))
}

/// A bare flag means `true`
fn parse_bool(arg: &str) -> std::result::Result<bool, String> {
    match arg.trim() {
        "" | "true" => Ok(true),
        "false" => Ok(false),
        other => Err(format!("expected true or false, got {:?}", other)),
    }
}

/// Double-quoted strings are unescaped, backquoted strings are raw, anything
/// else is taken as-is
fn parse_string(arg: &str) -> std::result::Result<String, String> {
    let arg = arg.trim();
    if arg.starts_with('"') {
        serde_json::from_str::<String>(arg).map_err(|e| format!("invalid quoted string {:?}: {}", arg, e))
    } else if let Some(raw) = arg.strip_prefix('`') {
        raw.strip_suffix('`')
            .map(str::to_string)
            .ok_or_else(|| format!("unterminated raw string {:?}", arg))
    } else if arg.is_empty() {
        Err("expected a value".to_string())
    } else {
        Ok(arg.to_string())
    }
}

/// `a;b;c` with each value parsed as JSON when possible, as a string otherwise
fn parse_enum(arg: &str) -> std::result::Result<Vec<Value>, String> {
    let values: Vec<Value> = arg
        .split(';')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| match serde_json::from_str::<Value>(v) {
            Ok(value) => value,
            Err(_) => Value::String(v.trim_matches(['\'', '`']).to_string()),
        })
        .collect();
    if values.is_empty() {
        return Err("enum needs at least one value".to_string());
    }
    Ok(values)
}

fn parse_list_type(arg: &str) -> std::result::Result<String, String> {
    match arg.trim() {
        v @ ("atomic" | "set" | "map") => Ok(v.to_string()),
        other => Err(format!("list type must be atomic, set or map, got {:?}", other)),
    }
}

/// `rule="...",message="...",messageExpression="...",reason=...,fieldPath=...`
fn parse_validation_rule(arg: &str) -> std::result::Result<ValidationRule, String> {
    let mut rule = ValidationRule::default();
    for part in split_args(arg)? {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got {:?}", part))?;
        match key.trim() {
            "rule" => rule.rule = parse_string(value)?,
            "message" => rule.message = parse_string(value)?,
            "messageExpression" => rule.message_expression = parse_string(value)?,
            "reason" => rule.reason = Some(parse_string(value)?),
            "fieldPath" => rule.field_path = parse_string(value)?,
            "optionalOldSelf" => rule.optional_old_self = Some(parse_bool(value)?),
            other => return Err(format!("unknown XValidation argument {:?}", other)),
        }
    }
    if rule.rule.is_empty() {
        return Err("XValidation requires a rule".to_string());
    }
    rule.rule = cel::preprocess(&rule.rule)?;
    Ok(rule)
}

/// Split on commas that are not inside a quoted string
fn split_args(arg: &str) -> std::result::Result<Vec<String>, String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in arg.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if escaped {
                    escaped = false;
                } else if c == '\\' && q == '"' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '`' => {
                    quote = Some(c);
                    current.push(c);
                }
                ',' => parts.push(std::mem::take(&mut current)),
                _ => current.push(c),
            },
        }
    }
    if quote.is_some() {
        return Err(format!("unterminated string in {:?}", arg));
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn apply(comment: &str, schema: &mut JsonSchemaProps) -> Result<()> {
        MarkerRegistry::default().apply_comment(comment, MarkerTarget::Field, schema)
    }

    #[test]
    fn test_numeric_markers() {
        let mut schema = JsonSchemaProps::formatted("integer", "int32");
        apply(
            " Port.\n +kubebuilder:validation:Minimum=1\n +kubebuilder:validation:Maximum=65535\n",
            &mut schema,
        )
        .unwrap();
        assert_eq!(schema.minimum, Some(1.0));
        assert_eq!(schema.maximum, Some(65535.0));
    }

    #[test]
    fn test_marker_type_mismatch_is_an_error() {
        let mut schema = JsonSchemaProps::typed("string");
        let err = apply("+kubebuilder:validation:Maximum=3", &mut schema).unwrap_err();
        assert!(matches!(err, GenError::InvalidMarker { .. }));
    }

    #[test]
    fn test_unknown_marker_is_an_error() {
        let mut schema = JsonSchemaProps::typed("string");
        let err = apply("+kubebuilder:validation:Bogus=3", &mut schema).unwrap_err();
        assert!(matches!(err, GenError::UnknownMarker(_)));
    }

    #[test]
    fn test_prose_mentioning_markers_is_ignored() {
        let mut schema = JsonSchemaProps::typed("string");
        apply(" Use +kubebuilder:validation:Bogus with care.\n", &mut schema).unwrap();
        assert_eq!(schema, JsonSchemaProps::typed("string"));
    }

    #[test]
    fn test_xvalidation() {
        let mut schema = JsonSchemaProps::typed("object");
        apply(
            r#"+kubebuilder:validation:XValidation:message="port must be set, when using tls",rule="has(self.port)""#,
            &mut schema,
        )
        .unwrap();
        assert_eq!(
            schema.x_validations,
            vec![ValidationRule {
                rule: "has(self.port)".to_string(),
                message: "port must be set, when using tls".to_string(),
                ..Default::default()
            }]
        );
    }

    #[test]
    fn test_xvalidation_expands_macros() {
        let mut schema = JsonSchemaProps::typed("object");
        apply(
            r#"+kubebuilder:validation:XValidation:message="only one of a or b",rule="oneof(self.a, self.b)""#,
            &mut schema,
        )
        .unwrap();
        assert_eq!(schema.x_validations[0].rule, "((has(self.a)?1:0)+(has(self.b)?1:0)<=1)");

        let err = apply(r#"+kubebuilder:validation:XValidation:rule="nope(self.a)""#, &mut schema).unwrap_err();
        assert!(matches!(err, GenError::InvalidMarker { .. }));
    }

    #[test]
    fn test_string_markers() {
        let mut schema = JsonSchemaProps::typed("string");
        apply(
            "+kubebuilder:validation:MaxLength=253\n+kubebuilder:validation:Pattern=`^[a-z]+$`\n+kubebuilder:validation:Enum=GET;POST",
            &mut schema,
        )
        .unwrap();
        assert_eq!(schema.max_length, Some(253));
        assert_eq!(schema.pattern, "^[a-z]+$");
        assert_eq!(schema.enum_values, vec![json!("GET"), json!("POST")]);
    }

    #[test]
    fn test_list_markers() {
        let mut schema = JsonSchemaProps::array_of(JsonSchemaProps::typed("string"));
        apply(
            "+listType=set\n+kubebuilder:validation:MaxItems=16\n+protoc-gen-crd:list-value-validation:MinLength=1",
            &mut schema,
        )
        .unwrap();
        assert_eq!(schema.x_list_type.as_deref(), Some("set"));
        assert_eq!(schema.max_items, Some(16));
        assert_eq!(schema.items.unwrap().min_length, Some(1));
    }

    #[test]
    fn test_map_value_validation() {
        let mut schema = JsonSchemaProps {
            additional_properties: Some(Box::new(JsonSchemaProps::typed("string"))),
            ..JsonSchemaProps::typed("object")
        };
        apply("+protoc-gen-crd:map-value-validation:MaxLength=63", &mut schema).unwrap();
        assert_eq!(schema.additional_properties.unwrap().max_length, Some(63));

        let mut scalar = JsonSchemaProps::typed("string");
        assert!(apply("+protoc-gen-crd:map-value-validation:MaxLength=63", &mut scalar).is_err());
    }

    #[test]
    fn test_int_or_string_rewrite() {
        let mut schema = JsonSchemaProps::formatted("string", "byte");
        apply("+protoc-gen-crd:validation:XIntOrString", &mut schema).unwrap();
        assert_eq!(
            schema.to_value().unwrap(),
            json!({"anyOf": [{"type": "integer"}, {"type": "string"}], "x-kubernetes-int-or-string": true})
        );
    }

    #[test]
    fn test_duration_validation_none() {
        let mut schema = crate::schema::well_known::well_known_schema("google.protobuf.Duration").unwrap();
        apply("+protoc-gen-crd:duration-validation:none", &mut schema).unwrap();
        assert!(schema.x_validations.is_empty());
    }

    #[test]
    fn test_duration_validation_none_stops_later_markers() {
        let mut schema = crate::schema::well_known::well_known_schema("google.protobuf.Duration").unwrap();
        apply(
            "+protoc-gen-crd:duration-validation:none\n+kubebuilder:validation:XValidation:rule=\"duration(self) >= duration('1ms')\"",
            &mut schema,
        )
        .unwrap();
        assert!(schema.x_validations.is_empty());

        let mut schema = crate::schema::well_known::well_known_schema("google.protobuf.Duration").unwrap();
        apply(
            "+kubebuilder:validation:XValidation:rule=\"duration(self) >= duration('1ms')\"\n+protoc-gen-crd:duration-validation:none",
            &mut schema,
        )
        .unwrap();
        assert!(schema.x_validations.is_empty());
    }

    #[test]
    fn test_ignore_sub_validation() {
        let rule = |m: &str| ValidationRule {
            rule: "true".to_string(),
            message: m.to_string(),
            ..Default::default()
        };
        let mut schema = JsonSchemaProps {
            properties: [(
                "inner".to_string(),
                JsonSchemaProps {
                    x_validations: vec![rule("a"), rule("b")],
                    ..JsonSchemaProps::typed("object")
                },
            )]
            .into_iter()
            .collect(),
            ..JsonSchemaProps::typed("object")
        };
        apply(r#"+protoc-gen-crd:validation:IgnoreSubValidation:["a"]"#, &mut schema).unwrap();
        assert_eq!(schema.properties["inner"].x_validations, vec![rule("b")]);
    }

    #[test]
    fn test_list_type_not_allowed_on_types() {
        let registry = MarkerRegistry::default();
        assert!(registry.lookup("+listType=set", MarkerTarget::Type).is_none());
        assert!(registry.lookup("+listType=set", MarkerTarget::Field).is_some());
    }

    #[test]
    fn test_custom_marker_registration() {
        #[derive(Debug)]
        struct Deprecated;
        impl SchemaApplier for Deprecated {
            fn apply_to_schema(&self, schema: &mut JsonSchemaProps) -> std::result::Result<(), String> {
                schema.description.push_str(" Deprecated.");
                Ok(())
            }
        }

        let mut registry = MarkerRegistry::empty();
        registry.register(MarkerDefinition::new(
            "+kubebuilder:validation:Deprecated",
            FIELD_AND_TYPE,
            |_| Ok(Box::new(Deprecated)),
        ));
        let mut schema = JsonSchemaProps::typed("string");
        registry
            .apply_comment("+kubebuilder:validation:Deprecated", MarkerTarget::Type, &mut schema)
            .unwrap();
        assert_eq!(schema.description, " Deprecated.");
    }

    #[test]
    fn test_split_args_respects_quotes() {
        let parts = split_args(r#"rule="a,b",message=`x,y`"#).unwrap();
        assert_eq!(parts, vec![r#"rule="a,b""#, "message=`x,y`"]);
        assert!(split_args(r#"rule="open"#).is_err());
    }
}
