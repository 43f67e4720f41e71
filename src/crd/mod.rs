//! CustomResourceDefinition assembly
//!
//! Messages tagged with `+cue-gen` become versions of a CRD. Schemas are
//! generated once and assembled into two release channels:
//!
//! - `kubernetes/extended.gen.yaml`: every tagged message
//! - `kubernetes/stable.gen.yaml`: tagged messages not marked
//!   `releaseChannel:extended`

pub mod assemble;
pub mod output;
pub mod tags;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

pub use assemble::CrdAssembler;
pub use output::{render, BANNER};

use crate::codegen::{GenerationContext, GeneratorOptions, OpenApiGenerator};
use crate::error::Result;
use crate::model::Model;
use crate::schema::JsonSchemaProps;

pub const API_VERSION: &str = "apiextensions.k8s.io/v1";
pub const KIND: &str = "CustomResourceDefinition";

// =============================================================================
// Release Channels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseChannel {
    Extended,
    Stable,
}

impl ReleaseChannel {
    pub const ALL: [ReleaseChannel; 2] = [ReleaseChannel::Extended, ReleaseChannel::Stable];

    /// Path of the generated file, relative to the plugin output directory
    pub fn file_name(self) -> &'static str {
        match self {
            ReleaseChannel::Extended => "kubernetes/extended.gen.yaml",
            ReleaseChannel::Stable => "kubernetes/stable.gen.yaml",
        }
    }

    /// Whether a message tagged for `tagged` belongs in this channel
    pub fn includes(self, tagged: ReleaseChannel) -> bool {
        self == ReleaseChannel::Extended || tagged == ReleaseChannel::Stable
    }
}

impl fmt::Display for ReleaseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseChannel::Extended => write!(f, "extended"),
            ReleaseChannel::Stable => write!(f, "stable"),
        }
    }
}

// =============================================================================
// CRD Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomResourceDefinition {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: CrdSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrdSpec {
    pub group: String,
    pub names: CrdNames,
    pub scope: Scope,
    pub versions: Vec<CrdVersion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scope {
    #[default]
    Namespaced,
    Cluster,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdNames {
    pub plural: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub singular: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub short_names: Vec<String>,
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub list_kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
}

impl CrdNames {
    /// Default names for a kind: `Foo` → `foo`, `foos`, `FooList`
    pub fn for_kind(kind: &str) -> Self {
        let singular = kind.to_lowercase();
        Self {
            plural: format!("{}s", singular),
            singular,
            short_names: Vec::new(),
            kind: kind.to_string(),
            list_kind: format!("{}List", kind),
            categories: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdVersion {
    pub name: String,
    pub served: bool,
    pub storage: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_warning: Option<String>,
    pub schema: CrdValidation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subresources: Option<Subresources>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_printer_columns: Vec<PrinterColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrdValidation {
    #[serde(rename = "openAPIV3Schema")]
    pub open_api_v3_schema: JsonSchemaProps,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subresources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusSubresource>,
}

/// Serializes as `{}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSubresource {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub json_path: String,
}

// =============================================================================
// Channel Output
// =============================================================================

/// One rendered channel file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutput {
    pub channel: ReleaseChannel,
    pub file_name: &'static str,
    pub content: String,
}

/// Generate schemas for the files in `ctx` once and render every channel
/// from them.
pub fn generate_channels(
    model: &Model,
    ctx: &GenerationContext,
    options: &GeneratorOptions,
) -> Result<Vec<ChannelOutput>> {
    let generator = OpenApiGenerator::new(model, options.clone());
    let schemas = generator.generate(ctx)?;
    let assembler = CrdAssembler::new(model, ctx, &schemas)?;

    ReleaseChannel::ALL
        .iter()
        .map(|&channel| {
            let crds = assembler.assemble(channel)?;
            info!(channel = %channel, crds = crds.len(), "Rendered channel");
            Ok(ChannelOutput {
                channel,
                file_name: channel.file_name(),
                content: render(&crds)?,
            })
        })
        .collect()
}
