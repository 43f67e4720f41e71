//! OpenAPI 3.0.1 documents
//!
//! Wraps the schemas of a set of files in a minimal OpenAPI document:
//!
//! ```json
//! {
//!   "openapi": "3.0.1",
//!   "info": {"title": "...", "version": "v1alpha3"},
//!   "components": {"schemas": {"istio.networking.v1alpha3.VirtualService": {}}}
//! }
//! ```
//!
//! Output is one document per package by default, one per file with
//! `per_file`, or a single `openapiv3` document with `single_file`.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use prost_types::compiler::code_generator_response::File;
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::codegen::names::describe;
use crate::codegen::{DescriptionStyle, GenerationContext, GeneratorOptions, OpenApiGenerator};
use crate::error::{GenError, Result};
use crate::model::{FileId, Model, PackageDescriptor, RequiredFields};
use crate::plugin::{extract_params, parse_bool_param, response};
use crate::schema::JsonSchemaProps;

pub const OPENAPI_VERSION: &str = "3.0.1";
pub const DEFAULT_TITLE: &str = "OpenAPI Spec for Istio APIs.";
pub const SINGLE_FILE_NAME: &str = "openapiv3";

// =============================================================================
// Options
// =============================================================================

/// How documents are split and encoded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenApiOptions {
    /// One document per proto file instead of per package
    pub per_file: bool,
    /// One document for everything; wins over `per_file`
    pub single_file: bool,
    /// YAML instead of JSON
    pub yaml: bool,
}

impl OpenApiOptions {
    fn extension(&self) -> &'static str {
        if self.yaml {
            "yaml"
        } else {
            "json"
        }
    }
}

/// Parse `protoc-gen-openapi` parameters.
///
/// Descriptions default to the first paragraph of each comment.
pub fn openapi_options(parameter: &str) -> Result<(OpenApiOptions, GeneratorOptions)> {
    let mut output = OpenApiOptions::default();
    let mut generator = GeneratorOptions {
        description_style: DescriptionStyle::FirstParagraph,
        ..Default::default()
    };

    for (key, value) in extract_params(parameter) {
        let flag = parse_bool_param(&key, &value);
        match key.as_str() {
            "per_file" => output.per_file = flag?,
            "single_file" => output.single_file = flag?,
            "yaml" => output.yaml = flag?,
            "include_description" => generator.include_description = flag?,
            "enum_as_int_or_string" => generator.enum_as_int_or_string = flag?,
            _ => return Err(GenError::UnknownParameter(key)),
        }
    }
    Ok((output, generator))
}

// =============================================================================
// Document
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: Info,
    pub components: Components,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    pub schemas: BTreeMap<String, JsonSchemaProps>,
}

impl OpenApiDocument {
    pub fn encode(&self, options: &OpenApiOptions) -> Result<String> {
        if options.yaml {
            // via Value so mapping keys come out sorted
            Ok(serde_yaml::to_string(&serde_json::to_value(self)?)?)
        } else {
            Ok(serde_json::to_string_pretty(self)?)
        }
    }
}

/// One generated document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenApiFile {
    pub name: String,
    pub content: String,
}

// =============================================================================
// Generation
// =============================================================================

/// Generate OpenAPI documents for `files`
pub fn generate_documents(
    model: &Model,
    files: &[FileId],
    options: &OpenApiOptions,
    generator_options: &GeneratorOptions,
) -> Result<Vec<OpenApiFile>> {
    let generator = OpenApiGenerator::new(model, generator_options.clone());
    let wanted: HashSet<FileId> = files.iter().copied().collect();
    let mut out = Vec::new();

    if options.single_file {
        let ctx = GenerationContext::for_files(model, files.to_vec());
        let doc = document(&generator, &ctx, DEFAULT_TITLE.to_string(), String::new())?;
        out.push(OpenApiFile {
            name: format!("{}.{}", SINGLE_FILE_NAME, options.extension()),
            content: doc.encode(options)?,
        });
        return Ok(out);
    }

    for package in model.packages() {
        let members: Vec<FileId> = package.files.iter().copied().filter(|f| wanted.contains(f)).collect();
        if members.is_empty() {
            continue;
        }
        let version = api_version(&package.name);

        if options.per_file {
            for &file in &members {
                let fd = model.file(file);
                let title = title(package, Some(&fd.matter.description));
                let ctx = GenerationContext::for_files(model, vec![file]);
                let doc = document(&generator, &ctx, title, version.clone())?;
                let stem = Path::new(fd.name())
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default();
                out.push(OpenApiFile {
                    name: format!("{}.{}", stem, options.extension()),
                    content: doc.encode(options)?,
                });
            }
        } else {
            let provider = package.file.map(|f| model.file(f).matter.description.as_str());
            let title = title(package, provider);
            let ctx = GenerationContext::for_files(model, members);
            let doc = document(&generator, &ctx, title, version)?;
            out.push(OpenApiFile {
                name: format!("{}.{}", package.name, options.extension()),
                content: doc.encode(options)?,
            });
        }
    }

    info!(documents = out.len(), "Generated OpenAPI documents");
    Ok(out)
}

/// Handle a `protoc-gen-openapi` request
pub fn generate_openapi(request: &CodeGeneratorRequest, required: &RequiredFields) -> Result<CodeGeneratorResponse> {
    let (options, generator_options) = openapi_options(request.parameter())?;
    let model = Model::with_required_fields(request, options.per_file, required)?;
    let ctx = GenerationContext::new(&model, &request.file_to_generate)?;

    let files = generate_documents(&model, ctx.files(), &options, &generator_options)?
        .into_iter()
        .map(|doc| File {
            name: Some(doc.name),
            content: Some(doc.content),
            ..Default::default()
        })
        .collect();
    Ok(response(files))
}

fn document(
    generator: &OpenApiGenerator<'_>,
    ctx: &GenerationContext,
    title: String,
    version: String,
) -> Result<OpenApiDocument> {
    let schemas = generator.generate(ctx)?;
    debug!(schemas = schemas.len(), title = %title, "Building OpenAPI document");
    Ok(OpenApiDocument {
        openapi: OPENAPI_VERSION.to_string(),
        info: Info { title, version },
        components: Components {
            schemas: schemas.iter().map(|(name, schema)| (name.to_string(), schema.clone())).collect(),
        },
    })
}

/// Front-matter description, else the package comment, else the default
fn title(package: &PackageDescriptor, front_matter: Option<&str>) -> String {
    if let Some(desc) = front_matter.filter(|d| !d.is_empty()) {
        return desc.to_string();
    }
    let paragraph = GeneratorOptions {
        description_style: DescriptionStyle::FirstParagraph,
        ..Default::default()
    };
    let from_package = package
        .location
        .as_ref()
        .map(|loc| describe(loc.leading(), &paragraph))
        .unwrap_or_default();
    if !from_package.is_empty() {
        return from_package;
    }
    DEFAULT_TITLE.to_string()
}

/// `istio.networking.v1alpha3` → `v1alpha3`
fn api_version(package: &str) -> String {
    package.rsplit('.').next().unwrap_or_default().to_string()
}
