//! YAML rendering of CRD channel files

use super::CustomResourceDefinition;
use crate::error::Result;

pub const BANNER: &str = "# DO NOT EDIT - Generated by Cue OpenAPI generator based on Istio APIs.\n";

const DOCUMENT_SEPARATOR: &str = "---\n";

/// Render CRDs as one multi-document YAML file.
///
/// Each CRD goes through `serde_json::Value` first so mapping keys come out
/// sorted regardless of struct field order.
pub fn render(crds: &[CustomResourceDefinition]) -> Result<String> {
    let mut out = String::from(BANNER);
    for (i, crd) in crds.iter().enumerate() {
        if i > 0 {
            out.push_str(DOCUMENT_SEPARATOR);
        }
        let value = serde_json::to_value(crd)?;
        out.push_str(&fixup(&serde_yaml::to_string(&value)?));
    }
    Ok(out)
}

/// Helm needs the resource-policy annotation key quoted
fn fixup(yaml: &str) -> String {
    yaml.replace("helm.sh/resource-policy: keep", "\"helm.sh/resource-policy\": keep")
}

#[cfg(test)]
mod tests {
    use super::super::{CrdNames, CrdSpec, CrdValidation, CrdVersion, ObjectMeta, Scope, API_VERSION, KIND};
    use super::*;
    use crate::schema::JsonSchemaProps;
    use std::collections::BTreeMap;

    fn crd(name: &str, annotations: &[(&str, &str)]) -> CustomResourceDefinition {
        CustomResourceDefinition {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ObjectMeta {
                name: format!("{}s.foo.io", name.to_lowercase()),
                annotations: annotations.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<BTreeMap<_, _>>(),
                labels: BTreeMap::new(),
            },
            spec: CrdSpec {
                group: "foo.io".to_string(),
                names: CrdNames::for_kind(name),
                scope: Scope::Namespaced,
                versions: vec![CrdVersion {
                    name: "v1".to_string(),
                    served: true,
                    storage: true,
                    deprecated: false,
                    deprecation_warning: None,
                    schema: CrdValidation {
                        open_api_v3_schema: JsonSchemaProps::typed("object"),
                    },
                    subresources: None,
                    additional_printer_columns: Vec::new(),
                }],
            },
        }
    }

    #[test]
    fn test_empty_output_is_banner() {
        assert_eq!(render(&[]).unwrap(), BANNER);
    }

    #[test]
    fn test_documents_separated() {
        let out = render(&[crd("Foo", &[]), crd("Bar", &[])]).unwrap();
        assert!(out.starts_with(BANNER));
        assert_eq!(out.matches(DOCUMENT_SEPARATOR).count(), 1);
        assert!(!out.ends_with(DOCUMENT_SEPARATOR));
    }

    #[test]
    fn test_keys_sorted() {
        let out = render(&[crd("Foo", &[])]).unwrap();
        let api = out.find("apiVersion:").unwrap();
        let kind = out.find("\nkind:").unwrap();
        let metadata = out.find("\nmetadata:").unwrap();
        let spec = out.find("\nspec:").unwrap();
        assert!(api < kind && kind < metadata && metadata < spec);
    }

    #[test]
    fn test_helm_annotation_quoted() {
        let out = render(&[crd("Foo", &[("helm.sh/resource-policy", "keep")])]).unwrap();
        assert!(out.contains("\"helm.sh/resource-policy\": keep"));
    }
}
