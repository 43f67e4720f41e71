//! Protobuf CRD Generator
//!
//! Builds a descriptor model from protoc input and generates OpenAPI v3
//! schemas and Kubernetes CustomResourceDefinitions from it.
//!
//! ## Features
//!
//! - **Descriptor Model**: Cross-linked packages, files, messages, enums and
//!   services with comments and front matter
//! - **Schema Generation**: One structural schema per top-level message or enum
//! - **CRD Assembly**: `+cue-gen` tagged messages become CRD versions, split
//!   into stable and extended release channels
//! - **Validation Markers**: `+kubebuilder:validation:*` comments refine schemas
//! - **OpenAPI Documents**: Per package, per file or single-document output
//!
//! ## Architecture
//!
//! ```text
//! CodeGeneratorRequest
//!   └── model::Model            descriptors, comments, front matter
//!         └── codegen           message/enum → JsonSchemaProps
//!               ├── crd         tags → CRDs → kubernetes/{stable,extended}.gen.yaml
//!               └── openapi     OpenAPI 3.0.1 documents
//! ```

pub mod codegen;
pub mod config;
pub mod crd;
pub mod error;
pub mod golden;
pub mod lint;
pub mod model;
pub mod openapi;
pub mod plugin;
pub mod schema;

pub use codegen::{GenerationContext, GeneratorOptions, OpenApiGenerator, SchemaSet};
pub use config::GenConfig;
pub use crd::{generate_channels, ChannelOutput, CustomResourceDefinition, ReleaseChannel};
pub use error::{GenError, Result};
pub use lint::{LintResult, StructuralLinter};
pub use model::{Model, RequiredFields, TypeGraph};
pub use openapi::{generate_openapi, OpenApiDocument, OpenApiOptions};
pub use plugin::{generate_crds, read_request, write_response};
pub use schema::JsonSchemaProps;
