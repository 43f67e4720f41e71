//! Schema tree walking
//!
//! [`edit_schema`] walks a schema depth-first, handing each node and its path
//! from the root to a [`SchemaVisitor`]. Children are visited in the order
//! items, allOf, oneOf, anyOf, not, properties, additionalProperties.

use std::collections::HashSet;
use std::fmt;

use super::JsonSchemaProps;

// =============================================================================
// Paths
// =============================================================================

/// One step from a schema node to a child node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Property(String),
    Items,
    AdditionalProperties,
    AllOf(usize),
    OneOf(usize),
    AnyOf(usize),
    Not,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Property(name) => write!(f, "properties[{}]", name),
            PathSegment::Items => write!(f, "items"),
            PathSegment::AdditionalProperties => write!(f, "additionalProperties"),
            PathSegment::AllOf(i) => write!(f, "allOf[{}]", i),
            PathSegment::OneOf(i) => write!(f, "oneOf[{}]", i),
            PathSegment::AnyOf(i) => write!(f, "anyOf[{}]", i),
            PathSegment::Not => write!(f, "not"),
        }
    }
}

/// Format a path as `properties[spec].items.properties[name]`
pub fn format_path(path: &[PathSegment]) -> String {
    path.iter().map(ToString::to_string).collect::<Vec<_>>().join(".")
}

/// Parse a dotted field path where `[]` steps into array items,
/// e.g. `fooBaz.qux.[].value`
pub fn parse_field_path(path: &str) -> Vec<PathSegment> {
    path.split('.')
        .filter(|s| !s.is_empty())
        .map(|s| match s {
            "[]" => PathSegment::Items,
            name => PathSegment::Property(name.to_string()),
        })
        .collect()
}

// =============================================================================
// Walking
// =============================================================================

/// What to do after visiting a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Descend,
    Skip,
}

pub trait SchemaVisitor {
    fn visit(&mut self, path: &[PathSegment], schema: &mut JsonSchemaProps) -> Walk;
}

/// Walk `schema` depth-first, letting `visitor` edit each node
pub fn edit_schema(schema: &mut JsonSchemaProps, visitor: &mut dyn SchemaVisitor) {
    let mut path = Vec::new();
    walk(schema, &mut path, visitor);
}

fn walk(schema: &mut JsonSchemaProps, path: &mut Vec<PathSegment>, visitor: &mut dyn SchemaVisitor) {
    if visitor.visit(path, schema) == Walk::Skip {
        return;
    }

    if let Some(items) = schema.items.as_deref_mut() {
        walk_child(items, PathSegment::Items, path, visitor);
    }
    for (i, sub) in schema.all_of.iter_mut().enumerate() {
        walk_child(sub, PathSegment::AllOf(i), path, visitor);
    }
    for (i, sub) in schema.one_of.iter_mut().enumerate() {
        walk_child(sub, PathSegment::OneOf(i), path, visitor);
    }
    for (i, sub) in schema.any_of.iter_mut().enumerate() {
        walk_child(sub, PathSegment::AnyOf(i), path, visitor);
    }
    if let Some(not) = schema.not.as_deref_mut() {
        walk_child(not, PathSegment::Not, path, visitor);
    }
    for (name, property) in schema.properties.iter_mut() {
        walk_child(property, PathSegment::Property(name.clone()), path, visitor);
    }
    if let Some(additional) = schema.additional_properties.as_deref_mut() {
        walk_child(additional, PathSegment::AdditionalProperties, path, visitor);
    }
}

fn walk_child(
    schema: &mut JsonSchemaProps,
    segment: PathSegment,
    path: &mut Vec<PathSegment>,
    visitor: &mut dyn SchemaVisitor,
) {
    path.push(segment);
    walk(schema, path, visitor);
    path.pop();
}

// =============================================================================
// Visitors
// =============================================================================

/// Sets `x-kubernetes-preserve-unknown-fields: true` on the node at exactly
/// one path, leaving every other node untouched
#[derive(Debug, Clone)]
pub struct PreserveUnknownFieldVisitor {
    target: Vec<PathSegment>,
    applied: bool,
}

impl PreserveUnknownFieldVisitor {
    pub fn new(field_path: &str) -> Self {
        Self {
            target: parse_field_path(field_path),
            applied: false,
        }
    }

    /// Whether the target path existed in the visited schema
    pub fn applied(&self) -> bool {
        self.applied
    }
}

impl SchemaVisitor for PreserveUnknownFieldVisitor {
    fn visit(&mut self, path: &[PathSegment], schema: &mut JsonSchemaProps) -> Walk {
        if path == self.target.as_slice() {
            schema.x_preserve_unknown_fields = Some(true);
            self.applied = true;
            Walk::Skip
        } else if self.target.starts_with(path) {
            Walk::Descend
        } else {
            Walk::Skip
        }
    }
}

/// Removes `x-kubernetes-validations` entries with the given messages from a
/// node and all of its descendants
#[derive(Debug, Clone, Default)]
pub struct StripValidationVisitor {
    messages: HashSet<String>,
}

impl StripValidationVisitor {
    pub fn new<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }
}

impl SchemaVisitor for StripValidationVisitor {
    fn visit(&mut self, _path: &[PathSegment], schema: &mut JsonSchemaProps) -> Walk {
        schema.x_validations.retain(|rule| !self.messages.contains(&rule.message));
        Walk::Descend
    }
}
