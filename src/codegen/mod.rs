//! Schema Generation
//!
//! Walks the descriptor model and produces one OpenAPI v3 schema per
//! top-level message and enum of the files being generated.
//!
//! Architecture:
//! - GenerationContext: which files, messages and enums are in scope, plus
//!   the front-matter description overrides those files declare
//! - OpenApiGenerator: the recursive message/field walk
//! - SchemaSet: the sorted output, keyed by absolute type name
//!
//! Message-typed fields are expanded inline. Well-known types short-circuit
//! to fixed schemas, and a reference back into a message already being
//! expanded is cut with an object that preserves unknown fields.

pub mod config;
pub mod names;

use std::collections::{BTreeMap, HashMap, HashSet};

use prost_types::field_descriptor_proto::Type;
use serde_json::Value;
use tracing::{debug, warn};

pub use config::{DescriptionStyle, GeneratorOptions};

use crate::error::{GenError, Result};
use crate::model::{CoreDesc, EnumId, FieldDescriptor, FieldId, FieldType, FileId, MessageId, Model, TypeGraph};
use crate::schema::markers::MarkerTarget;
use crate::schema::well_known::well_known_schema;
use crate::schema::{JsonSchemaProps, MarkerRegistry, ValidationRule};

// =============================================================================
// GenerationContext
// =============================================================================

/// The set of files being generated and everything derived from them.
///
/// Built once per request and passed explicitly to every stage that needs
/// to know what is in scope.
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    files: Vec<FileId>,
    /// Every message of the files, nested ones included, by absolute name
    messages: BTreeMap<String, MessageId>,
    /// Every enum of the files, nested ones included, by absolute name
    enums: BTreeMap<String, EnumId>,
    /// Spec descriptions declared with `$schema:` front matter
    descriptions: HashMap<String, String>,
}

impl GenerationContext {
    /// Context for the files named in a request's `file_to_generate`
    pub fn new(model: &Model, files_to_generate: &[String]) -> Result<Self> {
        let files = files_to_generate
            .iter()
            .map(|name| model.file_by_name(name).ok_or_else(|| GenError::UnknownFile(name.clone())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::for_files(model, files))
    }

    /// Context for an already resolved list of files
    pub fn for_files(model: &Model, files: Vec<FileId>) -> Self {
        let mut messages = BTreeMap::new();
        let mut enums = BTreeMap::new();
        let mut descriptions = HashMap::new();

        for &id in &files {
            let file = model.file(id);
            for &message in &file.all_messages {
                messages.insert(model.absolute_name(model.message(message)), message);
            }
            for &e in &file.all_enums {
                enums.insert(model.absolute_name(model.enum_type(e)), e);
            }
            for schema in file.matter.schema_names() {
                descriptions.insert(
                    schema.to_string(),
                    format!("{} See more details at: {}", file.matter.description, file.matter.home_location),
                );
            }
        }

        Self {
            files,
            messages,
            enums,
            descriptions,
        }
    }

    pub fn files(&self) -> &[FileId] {
        &self.files
    }

    pub fn messages(&self) -> impl Iterator<Item = (&str, MessageId)> {
        self.messages.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn enums(&self) -> impl Iterator<Item = (&str, EnumId)> {
        self.enums.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Front-matter description override for the message `absolute_name`
    pub fn description(&self, absolute_name: &str) -> Option<&str> {
        self.descriptions.get(absolute_name).map(String::as_str)
    }
}

// =============================================================================
// SchemaSet
// =============================================================================

/// Generated schemas keyed by absolute type name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaSet {
    schemas: BTreeMap<String, JsonSchemaProps>,
}

impl SchemaSet {
    pub fn insert(&mut self, name: impl Into<String>, schema: JsonSchemaProps) {
        self.schemas.insert(name.into(), schema);
    }

    pub fn get(&self, name: &str) -> Option<&JsonSchemaProps> {
        self.schemas.get(name)
    }

    /// Like [`SchemaSet::get`], failing with [`GenError::SchemaNotFound`]
    pub fn require(&self, name: &str) -> Result<&JsonSchemaProps> {
        self.get(name).ok_or_else(|| GenError::SchemaNotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonSchemaProps)> {
        self.schemas.iter().map(|(name, schema)| (name.as_str(), schema))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

// =============================================================================
// OpenApiGenerator
// =============================================================================

/// Generates OpenAPI v3 schemas from the descriptor model
#[derive(Debug)]
pub struct OpenApiGenerator<'m> {
    model: &'m Model,
    options: GeneratorOptions,
    markers: MarkerRegistry,
    /// Messages that take part in a reference cycle
    recursive: HashSet<MessageId>,
}

impl<'m> OpenApiGenerator<'m> {
    pub fn new(model: &'m Model, options: GeneratorOptions) -> Self {
        Self::with_markers(model, options, MarkerRegistry::default())
    }

    /// Generator using a custom marker registry
    pub fn with_markers(model: &'m Model, options: GeneratorOptions, markers: MarkerRegistry) -> Self {
        let graph = TypeGraph::build(model);
        for group in graph.recursive_groups() {
            debug!(types = ?group, "Recursive message group");
        }
        Self {
            model,
            options,
            markers,
            recursive: graph.recursive_messages(),
        }
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Schemas for every top-level message and enum in `ctx`.
    ///
    /// Nested types are expanded inside the schemas of the fields that use
    /// them and get no entry of their own.
    pub fn generate(&self, ctx: &GenerationContext) -> Result<SchemaSet> {
        let mut set = SchemaSet::default();

        for (name, id) in ctx.messages() {
            if self.model.message(id).parent.is_some() {
                continue;
            }
            if let Some(schema) = self.message_schema(id)? {
                set.insert(name, schema);
            }
        }
        for (name, id) in ctx.enums() {
            if self.model.enum_type(id).parent.is_none() {
                set.insert(name, self.enum_schema(id));
            }
        }

        debug!(schemas = set.len(), "Generated schemas");
        Ok(set)
    }

    /// Schema for one message; `None` for map entry messages
    pub fn message_schema(&self, id: MessageId) -> Result<Option<JsonSchemaProps>> {
        self.generate_message_schema(id, &mut Vec::new())
    }

    /// Schema for an enum. Enum schemas carry no description.
    pub fn enum_schema(&self, id: EnumId) -> JsonSchemaProps {
        if self.options.enum_as_int_or_string {
            return JsonSchemaProps {
                x_int_or_string: true,
                ..Default::default()
            };
        }
        JsonSchemaProps {
            enum_values: self
                .enum_value_names(id)
                .into_iter()
                .map(|name| Value::String(name.to_string()))
                .collect(),
            ..JsonSchemaProps::typed("string")
        }
    }

    fn generate_message_schema(&self, id: MessageId, stack: &mut Vec<MessageId>) -> Result<Option<JsonSchemaProps>> {
        // maps are handled through the field that holds them
        if self.model.message(id).is_map_entry() {
            return Ok(None);
        }
        stack.push(id);
        let schema = self.build_message_schema(id, stack);
        stack.pop();
        schema.map(Some)
    }

    fn build_message_schema(&self, id: MessageId, stack: &mut Vec<MessageId>) -> Result<JsonSchemaProps> {
        let message = self.model.message(id);
        let mut schema = JsonSchemaProps {
            description: self.describe(message),
            ..JsonSchemaProps::typed("object")
        };
        let mut oneofs: Vec<Vec<String>> = vec![Vec::new(); message.proto.oneof_decl.len()];

        for &field_id in &message.fields {
            let field = self.model.field(field_id);
            let name = field.json_name();
            let property = self.field_schema(field_id, stack)?;

            for alt in names::alt_names(field.leading_comments()) {
                schema.properties.insert(alt, property.clone());
            }
            schema.properties.insert(name.clone(), property);

            if field.required {
                schema.required.push(name.clone());
            }
            if let Some(group) = field.real_oneof_index().and_then(|i| oneofs.get_mut(i)) {
                group.push(name);
            }
        }

        oneofs.retain(|group| !group.is_empty());
        if self.options.cel_oneof {
            schema.x_validations.extend(oneofs.iter().map(|group| cel_oneof(group)));
        } else {
            match oneofs.as_slice() {
                [] => {}
                [group] => schema.one_of = oneof_branches(group),
                groups => {
                    schema.all_of = groups
                        .iter()
                        .map(|group| JsonSchemaProps {
                            one_of: oneof_branches(group),
                            ..Default::default()
                        })
                        .collect();
                }
            }
        }

        self.markers
            .apply_comment(message.leading_comments(), MarkerTarget::Type, &mut schema)?;
        Ok(schema)
    }

    fn field_schema(&self, id: FieldId, stack: &mut Vec<MessageId>) -> Result<JsonSchemaProps> {
        let field = self.model.field(id);
        let mut description = self.describe(field);
        let mut is_map = false;

        let mut schema = match field.kind() {
            Type::Float | Type::Double => JsonSchemaProps::formatted("number", "double"),
            Type::Int32 | Type::Sint32 | Type::Sfixed32 => JsonSchemaProps::formatted("integer", "int32"),
            Type::Int64 | Type::Sint64 | Type::Sfixed64 => JsonSchemaProps::formatted("integer", "int64"),
            Type::Uint64 | Type::Fixed64 => JsonSchemaProps {
                minimum: Some(0.0),
                ..JsonSchemaProps::typed("integer")
            },
            Type::Uint32 | Type::Fixed32 => JsonSchemaProps {
                minimum: Some(0.0),
                maximum: Some(f64::from(u32::MAX)),
                ..JsonSchemaProps::typed("integer")
            },
            Type::Bool => JsonSchemaProps::typed("boolean"),
            Type::String => JsonSchemaProps::typed("string"),
            Type::Bytes => JsonSchemaProps::formatted("string", "binary"),
            Type::Message | Type::Group => {
                let message_id = self.message_type(field)?;
                let message = self.model.message(message_id);
                let absolute = self.model.absolute_name(message);

                if let Some(known) = well_known_schema(&absolute) {
                    known
                } else if message.is_map_entry() {
                    is_map = true;
                    let value = message.fields.get(1).copied().ok_or_else(|| GenError::WrongKind {
                        referrer: self.model.absolute_name(field),
                        type_name: absolute.clone(),
                        expected: "map entry with a value field",
                    })?;
                    JsonSchemaProps {
                        additional_properties: Some(Box::new(self.field_schema(value, stack)?)),
                        ..JsonSchemaProps::typed("object")
                    }
                } else if self.recursive.contains(&message_id) && stack.contains(&message_id) {
                    warn!(
                        field = %self.model.absolute_name(field),
                        type_name = %absolute,
                        "Cutting recursive message reference"
                    );
                    JsonSchemaProps {
                        x_preserve_unknown_fields: Some(true),
                        ..JsonSchemaProps::typed("object")
                    }
                } else {
                    self.generate_message_schema(message_id, stack)?.unwrap_or_default()
                }
            }
            Type::Enum => {
                let enum_id = self.enum_type(field)?;
                let values = self.enum_value_names(enum_id);
                description = format!(
                    "{}\n\nValid Options: {}",
                    description,
                    names::valid_options(&values).join(", ")
                );
                self.enum_schema(enum_id)
            }
        };
        schema.description = description;

        if field.is_repeated() && !is_map {
            let mut item = schema;
            let description = std::mem::take(&mut item.description);
            schema = JsonSchemaProps {
                description,
                ..JsonSchemaProps::array_of(item)
            };
        }

        self.markers
            .apply_comment(field.leading_comments(), MarkerTarget::Field, &mut schema)?;
        Ok(schema)
    }

    fn message_type(&self, field: &FieldDescriptor) -> Result<MessageId> {
        match field.field_type {
            Some(FieldType::Message(id)) => Ok(id),
            Some(FieldType::Enum(_)) => Err(GenError::WrongKind {
                referrer: self.model.absolute_name(field),
                type_name: field.proto.type_name().to_string(),
                expected: "message",
            }),
            None => Err(self.unresolved(field)),
        }
    }

    fn enum_type(&self, field: &FieldDescriptor) -> Result<EnumId> {
        match field.field_type {
            Some(FieldType::Enum(id)) => Ok(id),
            Some(FieldType::Message(_)) => Err(GenError::WrongKind {
                referrer: self.model.absolute_name(field),
                type_name: field.proto.type_name().to_string(),
                expected: "enum",
            }),
            None => Err(self.unresolved(field)),
        }
    }

    fn unresolved(&self, field: &FieldDescriptor) -> GenError {
        GenError::UnresolvedType {
            referrer: self.model.absolute_name(field),
            type_name: field.proto.type_name().to_string(),
        }
    }

    fn enum_value_names(&self, id: EnumId) -> Vec<&str> {
        self.model
            .enum_type(id)
            .values
            .iter()
            .map(|v| self.model.enum_value(*v).name())
            .collect()
    }

    fn describe(&self, desc: &dyn CoreDesc) -> String {
        names::describe(desc.leading_comments(), &self.options)
    }
}

/// `[{not: {anyOf: [req...]}}, req...]`: at most one of `names` is set
fn oneof_branches(names: &[String]) -> Vec<JsonSchemaProps> {
    let required: Vec<JsonSchemaProps> = names.iter().map(|n| JsonSchemaProps::requiring(n)).collect();
    let none = JsonSchemaProps {
        not: Some(Box::new(JsonSchemaProps {
            any_of: required.clone(),
            ..Default::default()
        })),
        ..Default::default()
    };
    std::iter::once(none).chain(required).collect()
}

fn cel_oneof(names: &[String]) -> ValidationRule {
    let clauses: Vec<String> = names.iter().map(|n| format!("(has(self.{})?1:0)", n)).collect();
    ValidationRule {
        rule: format!("{}<=1", clauses.join("+")),
        message: format!("At most one of [{}] should be set", names.join(" ")),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::*;
    use crate::model::{DescRef, RequiredFields};
    use prost_types::FileDescriptorProto;
    use serde_json::json;

    fn model_of(files: Vec<FileDescriptorProto>) -> Model {
        let names: Vec<String> = files.iter().map(|f| f.name().to_string()).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        Model::new(&request(files, &names), false).unwrap()
    }

    fn message_id(model: &Model, type_name: &str) -> MessageId {
        match model.lookup(type_name) {
            Some(DescRef::Message(id)) => id,
            other => panic!("{} is not a message: {:?}", type_name, other),
        }
    }

    fn schema_of(model: &Model, type_name: &str, options: GeneratorOptions) -> serde_json::Value {
        let generator = OpenApiGenerator::new(model, options);
        generator
            .message_schema(message_id(model, type_name))
            .unwrap()
            .unwrap()
            .to_value()
            .unwrap()
    }

    // =========================================================================
    // Scalars and descriptions
    // =========================================================================

    #[test]
    fn test_scalar_table() {
        let file = file("a.proto", "a")
            .message(
                message("M")
                    .field(field("f", Type::Float))
                    .field(field("i32", Type::Sint32))
                    .field(field("i64", Type::Sfixed64))
                    .field(field("u64", Type::Fixed64))
                    .field(field("u32", Type::Uint32))
                    .field(field("b", Type::Bool))
                    .field(field("s", Type::String))
                    .field(field("raw", Type::Bytes)),
            )
            .build();
        let model = model_of(vec![file]);
        let schema = schema_of(&model, ".a.M", GeneratorOptions::default());

        assert_eq!(
            schema["properties"],
            json!({
                "f": {"type": "number", "format": "double"},
                "i32": {"type": "integer", "format": "int32"},
                "i64": {"type": "integer", "format": "int64"},
                "u64": {"type": "integer", "minimum": 0},
                "u32": {"type": "integer", "minimum": 0, "maximum": 4294967295u64},
                "b": {"type": "boolean"},
                "s": {"type": "string"},
                "raw": {"type": "string", "format": "binary"},
            })
        );
    }

    #[test]
    fn test_descriptions_and_json_names() {
        let file = file("a.proto", "a")
            .message(
                message("M")
                    .comment(" A message. Details follow.\n")
                    .field(field("host_name", Type::String).json_name("hostName").comment(" The host.\n"))
                    .field(field("hidden", Type::String).comment(" Internal. $hide_from_docs\n")),
            )
            .build();
        let model = model_of(vec![file]);

        let schema = schema_of(&model, ".a.M", GeneratorOptions::default());
        assert_eq!(schema["description"], json!("A message."));
        assert_eq!(schema["properties"]["hostName"]["description"], json!("The host."));
        assert!(schema["properties"]["hidden"].get("description").is_none());

        let quiet = GeneratorOptions {
            include_description: false,
            ..Default::default()
        };
        let schema = schema_of(&model, ".a.M", quiet);
        assert!(schema.get("description").is_none());
        assert!(schema["properties"]["hostName"].get("description").is_none());
    }

    // =========================================================================
    // Enums, maps, repeated
    // =========================================================================

    #[test]
    fn test_enum_field() {
        let file = file("a.proto", "a")
            .message(
                message("M")
                    .field(field("mode", Type::Enum).type_name(".a.Mode").comment(" The mode.\n"))
                    .field(field("bare", Type::Enum).type_name(".a.Mode")),
            )
            .enumeration(enumeration("Mode", &["MODE_UNSPECIFIED", "ON", "OFF"]).comment(" Modes.\n"))
            .build();
        let model = model_of(vec![file]);
        let schema = schema_of(&model, ".a.M", GeneratorOptions::default());

        assert_eq!(
            schema["properties"]["mode"],
            json!({
                "type": "string",
                "enum": ["MODE_UNSPECIFIED", "ON", "OFF"],
                "description": "The mode.\n\nValid Options: ON, OFF"
            })
        );
        assert_eq!(schema["properties"]["bare"]["description"], json!("\n\nValid Options: ON, OFF"));
    }

    #[test]
    fn test_enum_as_int_or_string() {
        let file = file("a.proto", "a")
            .message(message("M").field(field("mode", Type::Enum).type_name(".a.Mode")))
            .enumeration(enumeration("Mode", &["ON", "OFF"]))
            .build();
        let model = model_of(vec![file]);
        let options = GeneratorOptions {
            enum_as_int_or_string: true,
            ..Default::default()
        };
        let schema = schema_of(&model, ".a.M", options);
        assert_eq!(
            schema["properties"]["mode"],
            json!({"x-kubernetes-int-or-string": true, "description": "\n\nValid Options: ON, OFF"})
        );
    }

    #[test]
    fn test_map_field() {
        let file = file("a.proto", "a")
            .message(
                message("M")
                    .field(
                        field("labels", Type::Message)
                            .type_name(".a.M.LabelsEntry")
                            .repeated()
                            .comment(" Labels to match.\n"),
                    )
                    .nested(map_entry("LabelsEntry", field("value", Type::String))),
            )
            .build();
        let model = model_of(vec![file]);
        let schema = schema_of(&model, ".a.M", GeneratorOptions::default());
        assert_eq!(
            schema["properties"]["labels"],
            json!({
                "type": "object",
                "additionalProperties": {"type": "string"},
                "description": "Labels to match."
            })
        );
    }

    #[test]
    fn test_repeated_field_moves_description() {
        let file = file("a.proto", "a")
            .message(message("M").field(field("hosts", Type::String).repeated().comment(" Hosts to route.\n")))
            .build();
        let model = model_of(vec![file]);
        let schema = schema_of(&model, ".a.M", GeneratorOptions::default());
        assert_eq!(
            schema["properties"]["hosts"],
            json!({"type": "array", "items": {"type": "string"}, "description": "Hosts to route."})
        );
    }

    #[test]
    fn test_well_known_type_at_depth() {
        let wkt = file("google/protobuf/duration.proto", "google.protobuf")
            .message(message("Duration").field(field("seconds", Type::Int64)))
            .build();
        let file = file("a.proto", "a")
            .dependency("google/protobuf/duration.proto")
            .message(message("Outer").field(field("inner", Type::Message).type_name(".a.Inner")))
            .message(
                message("Inner")
                    .field(field("timeout", Type::Message).type_name(".google.protobuf.Duration").comment(" Timeout.\n")),
            )
            .build();
        let model = model_of(vec![wkt, file]);
        let schema = schema_of(&model, ".a.Outer", GeneratorOptions::default());
        assert_eq!(
            schema["properties"]["inner"]["properties"]["timeout"],
            json!({
                "type": "string",
                "description": "Timeout.",
                "x-kubernetes-validations": [{
                    "rule": "duration(self) >= duration('1ms')",
                    "message": "must be a valid duration greater than 1ms"
                }]
            })
        );
    }

    // =========================================================================
    // Oneofs, required, alt names
    // =========================================================================

    fn oneof_file() -> FileDescriptorProto {
        file("a.proto", "a")
            .message(
                message("M")
                    .oneof("first")
                    .oneof("second")
                    .oneof("_maybe")
                    .field(field("a", Type::String).oneof(0))
                    .field(field("b", Type::String).oneof(0))
                    .field(field("c", Type::String).oneof(1))
                    .field(field("maybe", Type::String).proto3_optional(2)),
            )
            .message(
                message("Single")
                    .oneof("only")
                    .field(field("x", Type::String).oneof(0))
                    .field(field("y", Type::String).oneof(0)),
            )
            .build()
    }

    #[test]
    fn test_single_oneof() {
        let model = model_of(vec![oneof_file()]);
        let schema = schema_of(&model, ".a.Single", GeneratorOptions::default());
        assert_eq!(
            schema["oneOf"],
            json!([
                {"not": {"anyOf": [{"required": ["x"]}, {"required": ["y"]}]}},
                {"required": ["x"]},
                {"required": ["y"]}
            ])
        );
        assert!(schema.get("allOf").is_none());
    }

    #[test]
    fn test_several_oneofs_use_all_of() {
        let model = model_of(vec![oneof_file()]);
        let schema = schema_of(&model, ".a.M", GeneratorOptions::default());
        let all_of = schema["allOf"].as_array().unwrap();
        // the proto3 optional wrapper is not a real oneof
        assert_eq!(all_of.len(), 2);
        assert_eq!(all_of[1]["oneOf"][1], json!({"required": ["c"]}));
        assert!(schema["properties"].get("maybe").is_some());
    }

    #[test]
    fn test_cel_oneof() {
        let model = model_of(vec![oneof_file()]);
        let options = GeneratorOptions {
            cel_oneof: true,
            ..Default::default()
        };
        let schema = schema_of(&model, ".a.M", options);
        assert_eq!(
            schema["x-kubernetes-validations"][0],
            json!({"rule": "(has(self.a)?1:0)+(has(self.b)?1:0)<=1", "message": "At most one of [a b] should be set"})
        );
        assert!(schema.get("allOf").is_none());
    }

    #[test]
    fn test_required_and_alt_names() {
        let file = file("a.proto", "a")
            .message(
                message("M")
                    .field(field("name", Type::String))
                    .field(field("long_name", Type::String).comment(" Long.\n +kubebuilder:altName=ln\n")),
            )
            .build();
        let mut required = RequiredFields::default();
        required.insert("a.proto", vec![4, 0, 2, 0]);
        let model = Model::with_required_fields(&request(vec![file], &["a.proto"]), false, &required).unwrap();
        let schema = schema_of(&model, ".a.M", GeneratorOptions::default());

        assert_eq!(schema["required"], json!(["name"]));
        assert_eq!(schema["properties"]["ln"], schema["properties"]["longName"]);
    }

    // =========================================================================
    // Markers and recursion
    // =========================================================================

    #[test]
    fn test_field_and_type_markers() {
        let file = file("a.proto", "a")
            .message(
                message("M")
                    .comment(" M.\n +kubebuilder:validation:MaxProperties=2\n")
                    .field(field("port", Type::Uint32).comment(" Port.\n +kubebuilder:validation:Maximum=65535\n"))
                    .field(
                        field("hosts", Type::String)
                            .repeated()
                            .comment(" +protoc-gen-crd:list-value-validation:MaxLength=10\n"),
                    ),
            )
            .build();
        let model = model_of(vec![file]);
        let schema = schema_of(&model, ".a.M", GeneratorOptions::default());
        assert_eq!(schema["maxProperties"], json!(2));
        assert_eq!(schema["properties"]["port"]["maximum"], json!(65535));
        assert_eq!(schema["properties"]["hosts"]["items"]["maxLength"], json!(10));
    }

    #[test]
    fn test_unknown_marker_is_an_error() {
        let file = file("a.proto", "a")
            .message(message("M").field(field("x", Type::String).comment(" +kubebuilder:validation:Bogus=1\n")))
            .build();
        let model = model_of(vec![file]);
        let generator = OpenApiGenerator::new(&model, GeneratorOptions::default());
        let err = generator.message_schema(message_id(&model, ".a.M")).unwrap_err();
        assert!(matches!(err, GenError::UnknownMarker(_)));
    }

    #[test]
    fn test_recursion_is_cut() {
        let file = file("a.proto", "a")
            .message(
                message("Node")
                    .field(field("name", Type::String))
                    .field(field("children", Type::Message).type_name(".a.Node").repeated()),
            )
            .build();
        let model = model_of(vec![file]);
        let schema = schema_of(&model, ".a.Node", GeneratorOptions::default());
        assert_eq!(
            schema["properties"]["children"],
            json!({"type": "array", "items": {"type": "object", "x-kubernetes-preserve-unknown-fields": true}})
        );
    }

    // =========================================================================
    // Context and schema set
    // =========================================================================

    #[test]
    fn test_generate_top_level_only() {
        let file = file("a.proto", "a")
            .message(
                message("M")
                    .field(field("labels", Type::Message).type_name(".a.M.LabelsEntry").repeated())
                    .nested(map_entry("LabelsEntry", field("value", Type::String)))
                    .nested(message("Inner"))
                    .nested_enum(enumeration("Inner_Mode", &["A"])),
            )
            .enumeration(enumeration("Mode", &["A", "B"]))
            .build();
        let model = model_of(vec![file]);
        let ctx = GenerationContext::new(&model, &["a.proto".to_string()]).unwrap();
        let set = OpenApiGenerator::new(&model, GeneratorOptions::default()).generate(&ctx).unwrap();

        let names: Vec<&str> = set.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a.M", "a.Mode"]);
        assert!(matches!(set.require("a.M.Inner"), Err(GenError::SchemaNotFound(_))));
    }

    #[test]
    fn test_context_front_matter_descriptions() {
        let file = file("a.proto", "a")
            .package_comment(
                "",
                &[" $description: Foo things.\n $location: https://example.com/foo\n $schema: a.Foo\n"],
            )
            .message(message("Foo"))
            .build();
        let model = model_of(vec![file]);
        let ctx = GenerationContext::new(&model, &["a.proto".to_string()]).unwrap();
        assert_eq!(
            ctx.description("a.Foo"),
            Some("Foo things. See more details at: https://example.com/foo")
        );
        assert_eq!(ctx.description("a.Bar"), None);
    }

    #[test]
    fn test_context_unknown_file() {
        let model = model_of(vec![file("a.proto", "a").build()]);
        let err = GenerationContext::new(&model, &["missing.proto".to_string()]).unwrap_err();
        assert!(matches!(err, GenError::UnknownFile(ref name) if name == "missing.proto"));
    }
}
