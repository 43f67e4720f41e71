//! Tag-driven CRD assembly
//!
//! Each tagged message contributes one or more versions to the CRD named
//! `<plural>.<group>`. The spec schema comes from the shared [`SchemaSet`];
//! everything else comes from the message's `+cue-gen` tags.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::tags::{extract_key_value, parse_gen_tags, REPEATED_SEPARATOR};
use super::{
    CrdNames, CrdSpec, CrdValidation, CrdVersion, CustomResourceDefinition, ObjectMeta, PrinterColumn,
    ReleaseChannel, Scope, StatusSubresource, Subresources, API_VERSION, KIND,
};
use crate::codegen::{GenerationContext, SchemaSet};
use crate::error::{GenError, Result};
use crate::lint::{lint_names, StructuralLinter};
use crate::model::{CoreDesc, Model};
use crate::schema::{edit_schema, JsonSchemaProps, PreserveUnknownFieldVisitor};

/// Status schema used by a bare `subresource:status` tag
pub const DEFAULT_STATUS_SCHEMA: &str = "istio.meta.v1alpha1.IstioStatus";

const KNOWN_KEYS: &[&str] = &[
    "groupName",
    "version",
    "versions",
    "storageVersion",
    "resource",
    "printerColumn",
    "subresource",
    "spec",
    "deprecationReplacement",
    "annotations",
    "labels",
    "scope",
    "releaseChannel",
    "preserveUnknownFields",
];

// =============================================================================
// CrdTags
// =============================================================================

/// The `+cue-gen` tags of one message, parsed
#[derive(Debug, Clone, PartialEq)]
pub struct CrdTags {
    pub group: String,
    /// Versions this message serves, in declaration order
    pub versions: Vec<String>,
    pub storage_version: Option<String>,
    /// `resource` overrides: categories, plural, kind, shortNames, singular, listKind
    pub resource: BTreeMap<String, String>,
    pub printer_columns: Vec<PrinterColumn>,
    /// Absolute name of the status schema, when a status subresource is declared
    pub status: Option<String>,
    pub spec_required: bool,
    pub deprecation_replacement: Option<String>,
    pub annotations: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub scope: Scope,
    pub channel: ReleaseChannel,
    /// Dotted paths below `spec` whose unknown fields are preserved
    pub preserve_unknown_fields: Vec<String>,
}

impl CrdTags {
    pub fn parse(message: &str, tags: &BTreeMap<String, String>) -> Result<Self> {
        for key in tags.keys().filter(|k| !KNOWN_KEYS.contains(&k.as_str())) {
            warn!(schema = message, key = %key, "Ignoring unknown +cue-gen key");
        }

        let invalid = |what: String| GenError::InvalidTag(format!("{}: {}", message, what));
        let get = |key: &str| tags.get(key).map(String::as_str);

        let group = get("groupName")
            .filter(|g| !g.is_empty())
            .ok_or_else(|| invalid("missing groupName".to_string()))?
            .to_string();

        let mut versions: Vec<String> = get("versions")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        let mut storage_version = versions.first().cloned();
        if let Some(version) = get("version").filter(|v| !v.is_empty()) {
            // a single `version` is only the storage version when asked for
            storage_version = tags.contains_key("storageVersion").then(|| version.to_string());
            versions = vec![version.to_string()];
        }
        if versions.is_empty() {
            return Err(GenError::MissingVersion {
                crd: message.to_string(),
            });
        }

        let printer_columns = get("printerColumn")
            .unwrap_or_default()
            .split(REPEATED_SEPARATOR)
            .filter(|column| !column.is_empty())
            .map(parse_printer_column)
            .collect::<Result<Vec<_>>>()?;

        let status = match get("subresource") {
            None => None,
            Some(subresource) => {
                let (kind, schema) = subresource.split_once('=').unwrap_or((subresource, ""));
                if kind == "status" {
                    let schema = if schema.is_empty() { DEFAULT_STATUS_SCHEMA } else { schema };
                    Some(schema.to_string())
                } else {
                    warn!(schema = message, subresource = %kind, "Ignoring unsupported subresource");
                    None
                }
            }
        };

        let scope = match get("scope") {
            None | Some("") | Some("Namespaced") => Scope::Namespaced,
            Some("Cluster") => Scope::Cluster,
            Some(other) => return Err(invalid(format!("unknown scope {:?}", other))),
        };

        let channel = match get("releaseChannel") {
            None | Some("") | Some("stable") => ReleaseChannel::Stable,
            Some("extended") => ReleaseChannel::Extended,
            Some(other) => return Err(invalid(format!("unknown releaseChannel {:?}", other))),
        };

        Ok(Self {
            group,
            versions,
            storage_version,
            resource: extract_key_value(get("resource").unwrap_or_default())?,
            printer_columns,
            status,
            spec_required: get("spec") == Some("required"),
            deprecation_replacement: get("deprecationReplacement").map(str::to_string),
            annotations: extract_key_value(get("annotations").unwrap_or_default())?,
            labels: extract_key_value(get("labels").unwrap_or_default())?,
            scope,
            channel,
            preserve_unknown_fields: get("preserveUnknownFields")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }

    /// Names for the CRD of message `kind`, with `resource` overrides applied
    pub fn names(&self, kind: &str) -> CrdNames {
        let mut names = CrdNames::for_kind(kind);
        for (key, value) in &self.resource {
            match key.as_str() {
                "categories" => merge(&mut names.categories, value),
                "shortNames" => merge(&mut names.short_names, value),
                "plural" => names.plural = value.clone(),
                "singular" => names.singular = value.clone(),
                "kind" => names.kind = value.clone(),
                "listKind" => names.list_kind = value.clone(),
                _ => {}
            }
        }
        names
    }
}

fn parse_printer_column(text: &str) -> Result<PrinterColumn> {
    let mut column = PrinterColumn::default();
    for (key, value) in extract_key_value(text)? {
        match key.as_str() {
            "name" => column.name = value,
            "type" => column.type_ = value,
            "description" => column.description = value,
            "JSONPath" => column.json_path = value,
            _ => {}
        }
    }
    Ok(column)
}

/// Append comma-separated `values` not already present
fn merge(into: &mut Vec<String>, values: &str) {
    for value in values.split(',') {
        if !into.iter().any(|v| v == value) {
            into.push(value.to_string());
        }
    }
}

// =============================================================================
// CrdAssembler
// =============================================================================

#[derive(Debug)]
struct CrdSource {
    /// Absolute message name
    message: String,
    kind: String,
    tags: CrdTags,
}

/// Builds CRDs for each release channel from one schema set
#[derive(Debug)]
pub struct CrdAssembler<'a> {
    ctx: &'a GenerationContext,
    schemas: &'a SchemaSet,
    sources: Vec<CrdSource>,
    linter: StructuralLinter,
}

impl<'a> CrdAssembler<'a> {
    /// Collect the tagged messages of `ctx`
    pub fn new(model: &Model, ctx: &'a GenerationContext, schemas: &'a SchemaSet) -> Result<Self> {
        let mut sources = Vec::new();
        for (name, id) in ctx.messages() {
            let message = model.message(id);
            let tags = parse_gen_tags(message.leading_comments())?;
            if tags.is_empty() {
                continue;
            }
            debug!(schema = name, "Found CRD tags");
            sources.push(CrdSource {
                message: name.to_string(),
                kind: message.name().to_string(),
                tags: CrdTags::parse(name, &tags)?,
            });
        }

        Ok(Self {
            ctx,
            schemas,
            sources,
            linter: StructuralLinter::new(),
        })
    }

    /// Number of tagged messages
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// CRDs of one channel, sorted by group and name, versions sorted by name
    pub fn assemble(&self, channel: ReleaseChannel) -> Result<Vec<CustomResourceDefinition>> {
        let mut crds: BTreeMap<String, CustomResourceDefinition> = BTreeMap::new();

        for source in self.sources.iter().filter(|s| channel.includes(s.tags.channel)) {
            let names = source.tags.names(&source.kind);
            let crd_name = format!("{}.{}", names.plural, source.tags.group);

            let errors = lint_names(&source.tags.group, &names.plural);
            if !errors.is_empty() {
                return Err(GenError::InvalidNames {
                    crd: crd_name,
                    errors: errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; "),
                });
            }

            let root = self.root_schema(source)?;
            for version in &source.tags.versions {
                let version = self.version(source, &crd_name, version, &root)?;
                let crd = crds
                    .entry(crd_name.clone())
                    .or_insert_with(|| new_crd(&crd_name, names.clone(), &source.tags));
                if crd.spec.versions.iter().any(|v| v.name == version.name) {
                    return Err(GenError::DuplicateVersion {
                        crd: crd_name,
                        version: version.name,
                    });
                }
                crd.spec.versions.push(version);
            }
        }

        let mut crds: Vec<CustomResourceDefinition> = crds.into_values().collect();
        for crd in &mut crds {
            crd.spec.versions.sort_by(|a, b| a.name.cmp(&b.name));
        }
        crds.sort_by_cached_key(|crd| format!("{}{}", crd.spec.group, crd.metadata.name));
        Ok(crds)
    }

    /// `{type: object, properties: {spec: ...}}` shared by every version
    fn root_schema(&self, source: &CrdSource) -> Result<JsonSchemaProps> {
        let mut spec = self.schemas.require(&source.message)?.clone();
        if let Some(description) = self.ctx.description(&source.message) {
            spec.description = description.to_string();
        }

        for path in &source.tags.preserve_unknown_fields {
            let mut visitor = PreserveUnknownFieldVisitor::new(path);
            edit_schema(&mut spec, &mut visitor);
            if !visitor.applied() {
                return Err(GenError::InvalidTag(format!(
                    "{}: preserveUnknownFields path {:?} not found",
                    source.message, path
                )));
            }
        }

        Ok(JsonSchemaProps {
            properties: BTreeMap::from([("spec".to_string(), spec)]),
            ..JsonSchemaProps::typed("object")
        })
    }

    fn version(&self, source: &CrdSource, crd_name: &str, version: &str, root: &JsonSchemaProps) -> Result<CrdVersion> {
        let tags = &source.tags;
        let mut schema = root.clone();

        let subresources = match &tags.status {
            Some(status_name) => {
                // third-party controllers write status, so unknown fields are kept
                let status = JsonSchemaProps {
                    x_preserve_unknown_fields: Some(true),
                    ..self.schemas.require(status_name)?.clone()
                };
                schema.properties.insert("status".to_string(), status);
                Some(Subresources {
                    status: Some(StatusSubresource {}),
                })
            }
            None => None,
        };

        if tags.spec_required {
            schema.required.push("spec".to_string());
        }

        let deprecation_warning = tags
            .deprecation_replacement
            .as_ref()
            .map(|replacement| format!("{} version {:?} is deprecated, use {:?}", crd_name, version, replacement));

        let result = self.linter.lint(&format!("{}/{}", crd_name, version), &schema);
        if !result.is_clean() {
            return Err(GenError::NotStructural {
                name: result.schema_id.clone(),
                errors: result.summary(),
            });
        }

        Ok(CrdVersion {
            name: version.to_string(),
            served: true,
            storage: tags.storage_version.as_deref() == Some(version),
            deprecated: deprecation_warning.is_some(),
            deprecation_warning,
            schema: CrdValidation {
                open_api_v3_schema: schema,
            },
            subresources,
            additional_printer_columns: tags.printer_columns.clone(),
        })
    }
}

fn new_crd(name: &str, names: CrdNames, tags: &CrdTags) -> CustomResourceDefinition {
    CustomResourceDefinition {
        api_version: API_VERSION.to_string(),
        kind: KIND.to_string(),
        metadata: ObjectMeta {
            name: name.to_string(),
            annotations: tags.annotations.clone(),
            labels: tags.labels.clone(),
        },
        spec: CrdSpec {
            group: tags.group.clone(),
            names,
            scope: tags.scope,
            versions: Vec::new(),
        },
    }
}
