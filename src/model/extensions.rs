//! `google.api.field_behavior` recovery
//!
//! The generated descriptor types drop unknown fields, and the
//! `field_behavior` extension (field 1052 of `FieldOptions`) is unknown to
//! them. The raw input is decoded a second time through a narrow shadow of
//! the descriptor schema that only keeps the path down to that extension.

use std::collections::{HashMap, HashSet};

use prost::Message;

use super::location::path;
use crate::error::Result;

/// `google.api.FieldBehavior.REQUIRED`
pub const FIELD_BEHAVIOR_REQUIRED: i32 = 2;

#[derive(Clone, PartialEq, Message)]
pub(crate) struct ShadowRequest {
    #[prost(message, repeated, tag = "15")]
    pub proto_file: Vec<ShadowFile>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct ShadowFileSet {
    #[prost(message, repeated, tag = "1")]
    pub file: Vec<ShadowFile>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct ShadowFile {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(message, repeated, tag = "4")]
    pub message_type: Vec<ShadowMessage>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct ShadowMessage {
    #[prost(message, repeated, tag = "2")]
    pub field: Vec<ShadowField>,
    #[prost(message, repeated, tag = "3")]
    pub nested_type: Vec<ShadowMessage>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct ShadowField {
    #[prost(message, optional, tag = "8")]
    pub options: Option<ShadowFieldOptions>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct ShadowFieldOptions {
    #[prost(int32, repeated, packed = "false", tag = "1052")]
    pub field_behavior: Vec<i32>,
}

/// Fields marked `(google.api.field_behavior) = REQUIRED`, keyed by file name
/// and the field's source-location path vector.
#[derive(Debug, Clone, Default)]
pub struct RequiredFields {
    by_file: HashMap<String, HashSet<Vec<i32>>>,
}

impl RequiredFields {
    /// Scan an encoded `CodeGeneratorRequest`
    pub fn from_request_bytes(buf: &[u8]) -> Result<Self> {
        let request = ShadowRequest::decode(buf)?;
        Ok(Self::from_files(&request.proto_file))
    }

    /// Scan an encoded `FileDescriptorSet`
    pub fn from_descriptor_set_bytes(buf: &[u8]) -> Result<Self> {
        let set = ShadowFileSet::decode(buf)?;
        Ok(Self::from_files(&set.file))
    }

    fn from_files(files: &[ShadowFile]) -> Self {
        let mut required = Self::default();
        for file in files {
            let name = file.name.clone().unwrap_or_default();
            for (i, message) in file.message_type.iter().enumerate() {
                required.scan_message(&name, message, vec![path::FILE_MESSAGE, i as i32]);
            }
        }
        required
    }

    fn scan_message(&mut self, file: &str, message: &ShadowMessage, prefix: Vec<i32>) {
        for (i, field) in message.field.iter().enumerate() {
            let is_required = field
                .options
                .as_ref()
                .is_some_and(|o| o.field_behavior.contains(&FIELD_BEHAVIOR_REQUIRED));
            if is_required {
                let mut field_path = prefix.clone();
                field_path.extend([path::MESSAGE_FIELD, i as i32]);
                self.insert(file, field_path);
            }
        }
        for (i, nested) in message.nested_type.iter().enumerate() {
            let mut nested_path = prefix.clone();
            nested_path.extend([path::MESSAGE_MESSAGE, i as i32]);
            self.scan_message(file, nested, nested_path);
        }
    }

    pub fn insert(&mut self, file: &str, field_path: Vec<i32>) {
        self.by_file.entry(file.to_string()).or_default().insert(field_path);
    }

    pub fn contains(&self, file: &str, field_path: &[i32]) -> bool {
        self.by_file
            .get(file)
            .is_some_and(|paths| paths.contains(field_path))
    }

    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(behaviors: &[i32]) -> ShadowField {
        ShadowField {
            options: Some(ShadowFieldOptions {
                field_behavior: behaviors.to_vec(),
            }),
        }
    }

    #[test]
    fn test_required_fields_from_request() {
        let request = ShadowRequest {
            proto_file: vec![ShadowFile {
                name: Some("foo/v1/foo.proto".to_string()),
                message_type: vec![ShadowMessage {
                    field: vec![field(&[]), field(&[FIELD_BEHAVIOR_REQUIRED])],
                    nested_type: vec![ShadowMessage {
                        field: vec![field(&[1, FIELD_BEHAVIOR_REQUIRED])],
                        nested_type: vec![],
                    }],
                }],
            }],
        };
        let bytes = request.encode_to_vec();

        let required = RequiredFields::from_request_bytes(&bytes).unwrap();
        assert!(required.contains("foo/v1/foo.proto", &[4, 0, 2, 1]));
        assert!(required.contains("foo/v1/foo.proto", &[4, 0, 3, 0, 2, 0]));
        assert!(!required.contains("foo/v1/foo.proto", &[4, 0, 2, 0]));
        assert!(!required.contains("other.proto", &[4, 0, 2, 1]));
    }

    #[test]
    fn test_output_only_is_not_required() {
        let set = ShadowFileSet {
            file: vec![ShadowFile {
                name: Some("a.proto".to_string()),
                message_type: vec![ShadowMessage {
                    field: vec![field(&[3])],
                    nested_type: vec![],
                }],
            }],
        };
        let required = RequiredFields::from_descriptor_set_bytes(&set.encode_to_vec()).unwrap();
        assert!(required.is_empty());
    }
}
