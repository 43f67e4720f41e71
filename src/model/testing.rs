//! Descriptor fixtures for tests
//!
//! Builds `FileDescriptorProto`s together with the `SourceCodeInfo` comments a
//! real protoc run would attach. Only depends on `prost_types` so integration
//! tests can include it with `#[path]`.

#![allow(dead_code)]

use prost_types::compiler::CodeGeneratorRequest;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    source_code_info, DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto,
    FieldDescriptorProto, FileDescriptorProto, MessageOptions, MethodDescriptorProto,
    OneofDescriptorProto, ServiceDescriptorProto, SourceCodeInfo,
};

type Comments = Vec<(Vec<i32>, String)>;

fn rebase(prefix: &[i32], comments: Comments) -> Comments {
    comments
        .into_iter()
        .map(|(path, text)| {
            let mut full = prefix.to_vec();
            full.extend(path);
            (full, text)
        })
        .collect()
}

// =============================================================================
// Fields
// =============================================================================

pub struct FieldBuilder {
    proto: FieldDescriptorProto,
    comment: Option<String>,
}

pub fn field(name: &str, kind: Type) -> FieldBuilder {
    FieldBuilder {
        proto: FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(1),
            label: Some(Label::Optional as i32),
            r#type: Some(kind as i32),
            ..Default::default()
        },
        comment: None,
    }
}

impl FieldBuilder {
    pub fn type_name(mut self, name: &str) -> Self {
        self.proto.type_name = Some(name.to_string());
        self
    }

    pub fn repeated(mut self) -> Self {
        self.proto.label = Some(Label::Repeated as i32);
        self
    }

    pub fn json_name(mut self, name: &str) -> Self {
        self.proto.json_name = Some(name.to_string());
        self
    }

    pub fn oneof(mut self, index: i32) -> Self {
        self.proto.oneof_index = Some(index);
        self
    }

    pub fn proto3_optional(mut self, index: i32) -> Self {
        self.proto.oneof_index = Some(index);
        self.proto.proto3_optional = Some(true);
        self
    }

    pub fn comment(mut self, text: &str) -> Self {
        self.comment = Some(text.to_string());
        self
    }
}

// =============================================================================
// Enums
// =============================================================================

pub struct EnumBuilder {
    proto: EnumDescriptorProto,
    comment: Option<String>,
}

pub fn enumeration(name: &str, values: &[&str]) -> EnumBuilder {
    EnumBuilder {
        proto: EnumDescriptorProto {
            name: Some(name.to_string()),
            value: values
                .iter()
                .enumerate()
                .map(|(i, v)| EnumValueDescriptorProto {
                    name: Some(v.to_string()),
                    number: Some(i as i32),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        },
        comment: None,
    }
}

impl EnumBuilder {
    pub fn comment(mut self, text: &str) -> Self {
        self.comment = Some(text.to_string());
        self
    }
}

// =============================================================================
// Messages
// =============================================================================

pub struct MessageBuilder {
    proto: DescriptorProto,
    comment: Option<String>,
    /// Comments below this message, relative to its path
    comments: Comments,
}

pub fn message(name: &str) -> MessageBuilder {
    MessageBuilder {
        proto: DescriptorProto {
            name: Some(name.to_string()),
            ..Default::default()
        },
        comment: None,
        comments: Vec::new(),
    }
}

/// A `map<string, V>` entry message named `<Name>Entry`
pub fn map_entry(name: &str, value: FieldBuilder) -> MessageBuilder {
    let mut key = field("key", Type::String);
    key.proto.number = Some(1);
    let mut value = value;
    value.proto.name = Some("value".to_string());
    value.proto.number = Some(2);
    let mut entry = message(name).field(key).field(value);
    entry.proto.options = Some(MessageOptions {
        map_entry: Some(true),
        ..Default::default()
    });
    entry
}

impl MessageBuilder {
    pub fn comment(mut self, text: &str) -> Self {
        self.comment = Some(text.to_string());
        self
    }

    pub fn field(mut self, mut field: FieldBuilder) -> Self {
        let index = self.proto.field.len() as i32;
        field.proto.number = Some(index + 1);
        if let Some(comment) = field.comment {
            self.comments.push((vec![2, index], comment));
        }
        self.proto.field.push(field.proto);
        self
    }

    pub fn oneof(mut self, name: &str) -> Self {
        self.proto.oneof_decl.push(OneofDescriptorProto {
            name: Some(name.to_string()),
            ..Default::default()
        });
        self
    }

    pub fn nested(mut self, nested: MessageBuilder) -> Self {
        let index = self.proto.nested_type.len() as i32;
        if let Some(comment) = nested.comment {
            self.comments.push((vec![3, index], comment));
        }
        self.comments.extend(rebase(&[3, index], nested.comments));
        self.proto.nested_type.push(nested.proto);
        self
    }

    pub fn nested_enum(mut self, nested: EnumBuilder) -> Self {
        let index = self.proto.enum_type.len() as i32;
        if let Some(comment) = nested.comment {
            self.comments.push((vec![4, index], comment));
        }
        self.proto.enum_type.push(nested.proto);
        self
    }
}

// =============================================================================
// Files
// =============================================================================

pub struct FileBuilder {
    proto: FileDescriptorProto,
    comments: Comments,
    detached: Vec<String>,
}

pub fn file(name: &str, package: &str) -> FileBuilder {
    FileBuilder {
        proto: FileDescriptorProto {
            name: Some(name.to_string()),
            package: (!package.is_empty()).then(|| package.to_string()),
            syntax: Some("proto3".to_string()),
            ..Default::default()
        },
        comments: Vec::new(),
        detached: Vec::new(),
    }
}

impl FileBuilder {
    pub fn dependency(mut self, name: &str) -> Self {
        self.proto.dependency.push(name.to_string());
        self
    }

    /// Comment on the package statement plus detached front-matter paragraphs
    pub fn package_comment(mut self, leading: &str, detached: &[&str]) -> Self {
        if !leading.is_empty() {
            self.comments.push((vec![2], leading.to_string()));
        }
        self.detached = detached.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn message(mut self, message: MessageBuilder) -> Self {
        let index = self.proto.message_type.len() as i32;
        if let Some(comment) = message.comment {
            self.comments.push((vec![4, index], comment));
        }
        self.comments.extend(rebase(&[4, index], message.comments));
        self.proto.message_type.push(message.proto);
        self
    }

    pub fn enumeration(mut self, e: EnumBuilder) -> Self {
        let index = self.proto.enum_type.len() as i32;
        if let Some(comment) = e.comment {
            self.comments.push((vec![5, index], comment));
        }
        self.proto.enum_type.push(e.proto);
        self
    }

    pub fn service(mut self, name: &str, methods: &[(&str, &str, &str)]) -> Self {
        self.proto.service.push(ServiceDescriptorProto {
            name: Some(name.to_string()),
            method: methods
                .iter()
                .map(|(m, input, output)| MethodDescriptorProto {
                    name: Some(m.to_string()),
                    input_type: Some(input.to_string()),
                    output_type: Some(output.to_string()),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        });
        self
    }

    pub fn build(self) -> FileDescriptorProto {
        let mut locations: Vec<source_code_info::Location> = self
            .comments
            .into_iter()
            .map(|(path, text)| source_code_info::Location {
                path,
                leading_comments: Some(text),
                ..Default::default()
            })
            .collect();

        if !self.detached.is_empty() {
            match locations.iter_mut().find(|l| l.path == [2]) {
                Some(package) => package.leading_detached_comments = self.detached,
                None => locations.push(source_code_info::Location {
                    path: vec![2],
                    leading_detached_comments: self.detached,
                    ..Default::default()
                }),
            }
        }

        let mut proto = self.proto;
        proto.source_code_info = Some(SourceCodeInfo { location: locations });
        proto
    }
}

pub fn request(files: Vec<FileDescriptorProto>, to_generate: &[&str]) -> CodeGeneratorRequest {
    CodeGeneratorRequest {
        file_to_generate: to_generate.iter().map(|f| f.to_string()).collect(),
        proto_file: files,
        ..Default::default()
    }
}
