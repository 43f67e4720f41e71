//! Structural Schema Linting
//!
//! Kubernetes only accepts CRD schemas that are *structural*: every node
//! specifies its type, and logical junctors (`allOf`, `anyOf`, `oneOf`,
//! `not`) only constrain values without declaring new shape.
//!
//! ## Lints
//! 1. **Type Required**: every node outside junctors has a type, unless it is
//!    int-or-string or preserves unknown fields
//! 2. **Shape**: arrays have items, `properties` and `additionalProperties`
//!    are mutually exclusive, the root is an object
//! 3. **Junctors**: no type, description, nullable, additionalProperties or
//!    `x-kubernetes-*` inside junctors, and every property declared inside a
//!    junctor exists in the structural schema next to it
//! 4. **Extensions**: preserve-unknown-fields is never `false`, int-or-string
//!    has an empty type, list types sit on arrays
//! 5. **Names**: CRD group and plural are DNS subdomains / labels

use std::sync::OnceLock;

use regex::Regex;

use crate::schema::visitor::{format_path, PathSegment};
use crate::schema::JsonSchemaProps;

/// Result of linting a schema
#[derive(Debug, Default)]
pub struct LintResult {
    pub schema_id: String,
    pub errors: Vec<LintError>,
}

impl LintResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// All errors on one line, `; `-separated
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}: {} ({})", e.path, e.message, e.code))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintError {
    pub code: &'static str,
    pub message: String,
    pub path: String,
}

const VALID_TYPES: &[&str] = &["object", "array", "string", "integer", "number", "boolean"];

/// Checks that generated schemas are structural
#[derive(Debug, Default)]
pub struct StructuralLinter;

impl StructuralLinter {
    pub fn new() -> Self {
        Self
    }

    /// Lint a CRD version's root schema
    pub fn lint(&self, schema_id: &str, root: &JsonSchemaProps) -> LintResult {
        let mut result = LintResult {
            schema_id: schema_id.to_string(),
            ..Default::default()
        };
        let mut path = Vec::new();

        if root.type_ != "object" {
            push(&mut result, "root-type", &path, format!("must be object at the root, found {:?}", root.type_));
        }
        self.lint_node(root, &mut path, &mut result);
        result
    }

    fn lint_node(&self, schema: &JsonSchemaProps, path: &mut Vec<PathSegment>, result: &mut LintResult) {
        if schema.type_.is_empty() {
            if !schema.x_int_or_string && !schema.preserves_unknown_fields() {
                push(result, "type-required", path, "type must not be empty for specified fields".to_string());
            }
        } else if !VALID_TYPES.contains(&schema.type_.as_str()) {
            push(result, "type-invalid", path, format!("unsupported type {:?}", schema.type_));
        }

        if schema.x_int_or_string && !schema.type_.is_empty() {
            push(result, "int-or-string-type", path, "type must be empty if x-kubernetes-int-or-string is true".to_string());
        }
        if schema.x_preserve_unknown_fields == Some(false) {
            push(result, "preserve-unknown-false", path, "x-kubernetes-preserve-unknown-fields must be true or undefined".to_string());
        }
        if schema.type_ == "array" && schema.items.is_none() {
            push(result, "items-required", path, "items must be specified for arrays".to_string());
        }
        if !schema.properties.is_empty() && schema.additional_properties.is_some() {
            push(result, "properties-exclusive", path, "additionalProperties and properties are mutually exclusive".to_string());
        }
        if schema.x_list_type.is_some() && schema.type_ != "array" {
            push(result, "list-type-array", path, "x-kubernetes-list-type must only be used on arrays".to_string());
        }
        if schema.x_list_type.as_deref() == Some("map") && schema.x_list_map_keys.is_empty() {
            push(result, "list-map-keys", path, "x-kubernetes-list-map-keys must be set for map lists".to_string());
        }
        if schema.x_embedded_resource && schema.type_ != "object" {
            push(result, "embedded-object", path, "x-kubernetes-embedded-resource requires type object".to_string());
        }

        for (segment, junctor) in junctors(schema) {
            path.push(segment);
            self.lint_junctor(junctor, schema, path, result);
            path.pop();
        }

        for (name, property) in &schema.properties {
            path.push(PathSegment::Property(name.clone()));
            self.lint_node(property, path, result);
            path.pop();
        }
        if let Some(items) = &schema.items {
            path.push(PathSegment::Items);
            self.lint_node(items, path, result);
            path.pop();
        }
        if let Some(additional) = &schema.additional_properties {
            path.push(PathSegment::AdditionalProperties);
            self.lint_node(additional, path, result);
            path.pop();
        }
    }

    /// `structural` is the nearest enclosing node outside any junctor
    fn lint_junctor(
        &self,
        schema: &JsonSchemaProps,
        structural: &JsonSchemaProps,
        path: &mut Vec<PathSegment>,
        result: &mut LintResult,
    ) {
        let int_or_string_branch = structural.x_int_or_string
            && schema.properties.is_empty()
            && (schema.type_ == "integer" || schema.type_ == "string");
        if !schema.type_.is_empty() && !int_or_string_branch {
            push(result, "junctor-type", path, "type must be empty inside junctors".to_string());
        }
        if !schema.description.is_empty() {
            push(result, "junctor-description", path, "description must be empty inside junctors".to_string());
        }
        if schema.nullable {
            push(result, "junctor-nullable", path, "nullable must be false inside junctors".to_string());
        }
        if schema.additional_properties.is_some() {
            push(result, "junctor-additional-properties", path, "additionalProperties must be empty inside junctors".to_string());
        }
        if schema.x_preserve_unknown_fields.is_some()
            || schema.x_int_or_string
            || schema.x_embedded_resource
            || schema.x_list_type.is_some()
            || !schema.x_list_map_keys.is_empty()
            || !schema.x_validations.is_empty()
        {
            push(result, "junctor-extension", path, "x-kubernetes-* fields must be empty inside junctors".to_string());
        }

        for (name, property) in &schema.properties {
            path.push(PathSegment::Property(name.clone()));
            match structural.properties.get(name) {
                Some(outer) => self.lint_junctor(property, outer, path, result),
                None => push(result, "junctor-unknown-property", path, "must be specified in the structural schema".to_string()),
            }
            path.pop();
        }
        if let Some(items) = &schema.items {
            path.push(PathSegment::Items);
            match &structural.items {
                Some(outer) => self.lint_junctor(items, outer, path, result),
                None => push(result, "junctor-unknown-items", path, "must be specified in the structural schema".to_string()),
            }
            path.pop();
        }
        // `required` inside a junctor may name any property, as in the apiserver

        for (segment, nested) in junctors(schema) {
            path.push(segment);
            self.lint_junctor(nested, structural, path, result);
            path.pop();
        }
    }
}

fn junctors(schema: &JsonSchemaProps) -> impl Iterator<Item = (PathSegment, &JsonSchemaProps)> {
    let all_of = schema.all_of.iter().enumerate().map(|(i, s)| (PathSegment::AllOf(i), s));
    let one_of = schema.one_of.iter().enumerate().map(|(i, s)| (PathSegment::OneOf(i), s));
    let any_of = schema.any_of.iter().enumerate().map(|(i, s)| (PathSegment::AnyOf(i), s));
    let not = schema.not.iter().map(|s| (PathSegment::Not, s.as_ref()));
    all_of.chain(one_of).chain(any_of).chain(not)
}

fn push(result: &mut LintResult, code: &'static str, path: &[PathSegment], message: String) {
    let path = match format_path(path) {
        p if p.is_empty() => "<root>".to_string(),
        p => p,
    };
    result.errors.push(LintError { code, message, path });
}

// =============================================================================
// Resource Names
// =============================================================================

fn dns_subdomain() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").expect("valid regex")
    })
}

fn dns_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"))
}

/// Check a CRD's group and plural against Kubernetes naming rules
pub fn lint_names(group: &str, plural: &str) -> Vec<LintError> {
    let mut errors = Vec::new();
    if group.len() > 253 || !dns_subdomain().is_match(group) || !group.contains('.') {
        errors.push(LintError {
            code: "group-name",
            message: format!("group {:?} must be a DNS subdomain with at least one dot", group),
            path: "spec.group".to_string(),
        });
    }
    if plural.len() > 63 || !dns_label().is_match(plural) {
        errors.push(LintError {
            code: "plural-name",
            message: format!("plural {:?} must be a lowercase DNS label", plural),
            path: "spec.names.plural".to_string(),
        });
    }
    errors
}
