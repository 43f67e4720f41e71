//! Descriptor Model
//!
//! Cross-referenced view of the `FileDescriptorProto`s in a protoc request.
//! Descriptors live in per-kind arenas and refer to each other through typed
//! ids, so message cycles (a message containing itself, or two messages
//! referencing each other) are plain data. Name lookup goes through
//! `all_desc_by_name`, keyed by the fully-qualified dotted name with a leading
//! dot, the same form protoc uses in `type_name`.
//!
//! The model is built once by [`Model::new`]; every field type, method type
//! and file dependency is resolved during construction and the model is
//! immutable afterwards.

pub mod extensions;
pub mod front_matter;
pub mod graph;
pub mod location;

use std::collections::HashMap;

use prost_types::compiler::CodeGeneratorRequest;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, MethodDescriptorProto, ServiceDescriptorProto,
};
use tracing::{debug, warn};

use crate::error::{GenError, Result};
pub use extensions::RequiredFields;
pub use front_matter::FrontMatter;
pub use graph::TypeGraph;
pub use location::{comment_info, Location};

// =============================================================================
// Arena Ids
// =============================================================================

macro_rules! arena_id {
    ($($(#[$doc:meta])* $name:ident),* $(,)?) => {$(
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }
    )*};
}

arena_id!(
    /// Index of a file in the model
    FileId,
    /// Index of a package in the model
    PackageId,
    MessageId,
    FieldId,
    EnumId,
    EnumValueId,
    ServiceId,
    MethodId,
);

/// Reference to any named descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescRef {
    Message(MessageId),
    Field(FieldId),
    Enum(EnumId),
    EnumValue(EnumValueId),
    Service(ServiceId),
    Method(MethodId),
}

/// Resolved type of a message-, group- or enum-typed field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Message(MessageId),
    Enum(EnumId),
}

// =============================================================================
// Shared Descriptor Core
// =============================================================================

/// State common to every named descriptor
#[derive(Debug, Clone)]
pub struct BaseDesc {
    /// Name segments below the package, e.g. `["Outer", "Inner", "field"]`
    pub qualified_name: Vec<String>,
    pub file: FileId,
    /// Source location, with any `$class:` tag stripped from its comments
    pub location: Option<Location>,
    pub hidden: bool,
    pub class: String,
}

/// Behavior shared by all descriptor kinds
pub trait CoreDesc {
    fn base(&self) -> &BaseDesc;

    fn qualified_name(&self) -> &[String] {
        &self.base().qualified_name
    }

    /// Qualified name joined with dots, without the package
    fn dotted_name(&self) -> String {
        self.base().qualified_name.join(".")
    }

    /// Unqualified name
    fn name(&self) -> &str {
        self.base().qualified_name.last().map(String::as_str).unwrap_or("")
    }

    fn file(&self) -> FileId {
        self.base().file
    }

    fn location(&self) -> Option<&Location> {
        self.base().location.as_ref()
    }

    fn is_hidden(&self) -> bool {
        self.base().hidden
    }

    fn class(&self) -> &str {
        &self.base().class
    }

    fn leading_comments(&self) -> &str {
        self.location().map(Location::leading).unwrap_or("")
    }
}

macro_rules! impl_core_desc {
    ($($ty:ty),*) => {$(
        impl CoreDesc for $ty {
            fn base(&self) -> &BaseDesc {
                &self.base
            }
        }
    )*};
}

// =============================================================================
// Descriptors
// =============================================================================

/// A proto package and the files that declare it
#[derive(Debug, Clone)]
pub struct PackageDescriptor {
    pub name: String,
    /// Member files; the documenting file, if any, comes first
    pub files: Vec<FileId>,
    /// Location of the package statement that carries the package comment
    pub location: Option<Location>,
    /// The file providing the package comment
    pub file: Option<FileId>,
}

#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub proto: FileDescriptorProto,
    pub package: PackageId,
    /// Top-level messages
    pub messages: Vec<MessageId>,
    /// Top-level enums
    pub enums: Vec<EnumId>,
    pub services: Vec<ServiceId>,
    /// Every message in the file, nested ones included
    pub all_messages: Vec<MessageId>,
    /// Every enum in the file, nested ones included
    pub all_enums: Vec<EnumId>,
    pub dependencies: Vec<FileId>,
    pub matter: FrontMatter,
    locations: HashMap<Vec<i32>, Location>,
}

impl FileDescriptor {
    pub fn name(&self) -> &str {
        self.proto.name()
    }

    /// Look up the source location of the element at `path`
    pub fn find(&self, path: &[i32]) -> Option<&Location> {
        self.locations.get(path)
    }
}

#[derive(Debug, Clone)]
pub struct MessageDescriptor {
    pub base: BaseDesc,
    pub proto: DescriptorProto,
    pub parent: Option<MessageId>,
    pub messages: Vec<MessageId>,
    pub enums: Vec<EnumId>,
    pub fields: Vec<FieldId>,
}

impl MessageDescriptor {
    pub fn is_map_entry(&self) -> bool {
        self.proto.options.as_ref().is_some_and(|o| o.map_entry())
    }
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub base: BaseDesc,
    pub proto: FieldDescriptorProto,
    pub parent: MessageId,
    /// Resolved message or enum type; `None` for scalar fields
    pub field_type: Option<FieldType>,
    /// Marked `(google.api.field_behavior) = REQUIRED`
    pub required: bool,
}

impl FieldDescriptor {
    pub fn kind(&self) -> Type {
        self.proto.r#type()
    }

    pub fn is_repeated(&self) -> bool {
        self.proto.label() == Label::Repeated
    }

    /// Index into the parent's `oneof_decl`, ignoring proto3 `optional` wrappers
    pub fn real_oneof_index(&self) -> Option<usize> {
        if self.proto.proto3_optional() {
            return None;
        }
        self.proto.oneof_index.and_then(|i| usize::try_from(i).ok())
    }

    /// JSON name as assigned by protoc, or derived from the field name
    pub fn json_name(&self) -> String {
        match self.proto.json_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => to_json_name(self.proto.name()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnumDescriptor {
    pub base: BaseDesc,
    pub proto: EnumDescriptorProto,
    pub parent: Option<MessageId>,
    pub values: Vec<EnumValueId>,
}

#[derive(Debug, Clone)]
pub struct EnumValueDescriptor {
    pub base: BaseDesc,
    pub proto: EnumValueDescriptorProto,
    pub parent: EnumId,
}

#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub base: BaseDesc,
    pub proto: ServiceDescriptorProto,
    pub methods: Vec<MethodId>,
}

#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub base: BaseDesc,
    pub proto: MethodDescriptorProto,
    pub parent: ServiceId,
    pub input: Option<MessageId>,
    pub output: Option<MessageId>,
}

impl_core_desc!(
    MessageDescriptor,
    FieldDescriptor,
    EnumDescriptor,
    EnumValueDescriptor,
    ServiceDescriptor,
    MethodDescriptor
);

// =============================================================================
// Model
// =============================================================================

/// Arena of all descriptors in a request
#[derive(Debug, Clone, Default)]
pub struct Model {
    packages: Vec<PackageDescriptor>,
    files: Vec<FileDescriptor>,
    messages: Vec<MessageDescriptor>,
    fields: Vec<FieldDescriptor>,
    enums: Vec<EnumDescriptor>,
    enum_values: Vec<EnumValueDescriptor>,
    services: Vec<ServiceDescriptor>,
    methods: Vec<MethodDescriptor>,
    all_files_by_name: HashMap<String, FileId>,
    all_desc_by_name: HashMap<String, DescRef>,
}

impl Model {
    /// Build the model for every file in `request`.
    ///
    /// `per_file` suppresses the warning for packages documented in more than
    /// one file.
    pub fn new(request: &CodeGeneratorRequest, per_file: bool) -> Result<Self> {
        Self::with_required_fields(request, per_file, &RequiredFields::default())
    }

    /// Build the model, marking the fields listed in `required`
    pub fn with_required_fields(
        request: &CodeGeneratorRequest,
        per_file: bool,
        required: &RequiredFields,
    ) -> Result<Self> {
        let mut model = Model::default();
        let mut package_ids: HashMap<String, PackageId> = HashMap::new();

        for proto in &request.proto_file {
            let package_name = package_name(proto);
            let package = *package_ids.entry(package_name.clone()).or_insert_with(|| {
                model.packages.push(PackageDescriptor {
                    name: package_name,
                    files: Vec::new(),
                    location: None,
                    file: None,
                });
                PackageId(model.packages.len() - 1)
            });
            model.add_file(proto, package, per_file, required)?;
        }

        for package in &mut model.packages {
            if let Some(doc_file) = package.file {
                package.files.sort_by_key(|f| *f != doc_file);
            }
        }

        model.resolve_field_types()?;
        model.resolve_method_types()?;
        model.resolve_dependencies();

        debug!(
            files = model.files.len(),
            messages = model.messages.len(),
            enums = model.enums.len(),
            "descriptor model built"
        );
        Ok(model)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn packages(&self) -> &[PackageDescriptor] {
        &self.packages
    }

    pub fn package(&self, id: PackageId) -> &PackageDescriptor {
        &self.packages[id.0]
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &FileDescriptor)> {
        self.files.iter().enumerate().map(|(i, f)| (FileId(i), f))
    }

    pub fn file(&self, id: FileId) -> &FileDescriptor {
        &self.files[id.0]
    }

    pub fn file_by_name(&self, name: &str) -> Option<FileId> {
        self.all_files_by_name.get(name).copied()
    }

    pub fn messages(&self) -> impl Iterator<Item = (MessageId, &MessageDescriptor)> {
        self.messages.iter().enumerate().map(|(i, m)| (MessageId(i), m))
    }

    pub fn message(&self, id: MessageId) -> &MessageDescriptor {
        &self.messages[id.0]
    }

    pub fn field(&self, id: FieldId) -> &FieldDescriptor {
        &self.fields[id.0]
    }

    pub fn enum_type(&self, id: EnumId) -> &EnumDescriptor {
        &self.enums[id.0]
    }

    pub fn enum_value(&self, id: EnumValueId) -> &EnumValueDescriptor {
        &self.enum_values[id.0]
    }

    pub fn service(&self, id: ServiceId) -> &ServiceDescriptor {
        &self.services[id.0]
    }

    pub fn method(&self, id: MethodId) -> &MethodDescriptor {
        &self.methods[id.0]
    }

    /// Look up a descriptor by its protoc type name (`.pkg.Outer.Inner`)
    pub fn lookup(&self, type_name: &str) -> Option<DescRef> {
        self.all_desc_by_name.get(type_name).copied()
    }

    /// Shared view of any descriptor
    pub fn core(&self, desc: DescRef) -> &dyn CoreDesc {
        match desc {
            DescRef::Message(id) => self.message(id),
            DescRef::Field(id) => self.field(id),
            DescRef::Enum(id) => self.enum_type(id),
            DescRef::EnumValue(id) => self.enum_value(id),
            DescRef::Service(id) => self.service(id),
            DescRef::Method(id) => self.method(id),
        }
    }

    /// Package name followed by the dotted qualified name
    pub fn absolute_name(&self, desc: &dyn CoreDesc) -> String {
        let package = self.package(self.file(desc.file()).package);
        format!("{}.{}", package.name, desc.dotted_name())
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    fn add_file(
        &mut self,
        proto: &FileDescriptorProto,
        package: PackageId,
        per_file: bool,
        required: &RequiredFields,
    ) -> Result<()> {
        let file_id = FileId(self.files.len());
        let locations: HashMap<Vec<i32>, Location> = proto
            .source_code_info
            .iter()
            .flat_map(|info| info.location.iter())
            .map(|loc| (loc.path.clone(), Location::from(loc)))
            .collect();
        let package_location = locations.get(&[location::path::FILE_PACKAGE][..]).cloned();
        let matter = FrontMatter::extract(proto.name(), package_location.as_ref());

        self.files.push(FileDescriptor {
            proto: proto.clone(),
            package,
            messages: Vec::new(),
            enums: Vec::new(),
            services: Vec::new(),
            all_messages: Vec::new(),
            all_enums: Vec::new(),
            dependencies: Vec::new(),
            matter,
            locations,
        });
        self.all_files_by_name.insert(proto.name().to_string(), file_id);

        let pkg = &mut self.packages[package.0];
        pkg.files.push(file_id);
        if let Some(loc) = package_location.filter(Location::has_comment) {
            if pkg.location.is_none() {
                pkg.location = Some(loc);
                pkg.file = Some(file_id);
            } else if !per_file {
                warn!(
                    package = %pkg.name,
                    file = proto.name(),
                    "package has a conflicting package comment"
                );
            }
        }

        // Descriptor keys follow protoc's type_name form, built from the
        // declared package even when the package name had to be derived.
        let prefix = match proto.package() {
            "" => ".".to_string(),
            declared => format!(".{}.", declared),
        };
        let ctx = FileContext {
            file: file_id,
            file_name: proto.name(),
            prefix: &prefix,
            required,
        };

        for (i, message) in proto.message_type.iter().enumerate() {
            let id = self.add_message(
                &ctx,
                message,
                None,
                vec![location::path::FILE_MESSAGE, i as i32],
                &[],
            )?;
            self.files[file_id.0].messages.push(id);
        }
        for (i, e) in proto.enum_type.iter().enumerate() {
            let id = self.add_enum(&ctx, e, None, vec![location::path::FILE_ENUM, i as i32], &[])?;
            self.files[file_id.0].enums.push(id);
        }
        for (i, service) in proto.service.iter().enumerate() {
            let id = self.add_service(&ctx, service, vec![location::path::FILE_SERVICE, i as i32])?;
            self.files[file_id.0].services.push(id);
        }
        Ok(())
    }

    fn base_desc(&self, file: FileId, path: &[i32], qualified_name: Vec<String>) -> BaseDesc {
        let info = comment_info(self.files[file.0].find(path));
        BaseDesc {
            qualified_name,
            file,
            location: info.location,
            hidden: info.hidden,
            class: info.class,
        }
    }

    fn register(&mut self, ctx: &FileContext<'_>, qualified_name: &[String], desc: DescRef) -> Result<()> {
        let key = format!("{}{}", ctx.prefix, qualified_name.join("."));
        if self.all_desc_by_name.insert(key.clone(), desc).is_some() {
            return Err(GenError::DuplicateDescriptor(key));
        }
        Ok(())
    }

    fn add_message(
        &mut self,
        ctx: &FileContext<'_>,
        proto: &DescriptorProto,
        parent: Option<MessageId>,
        path: Vec<i32>,
        outer: &[String],
    ) -> Result<MessageId> {
        let mut qualified_name = outer.to_vec();
        qualified_name.push(proto.name().to_string());

        let id = MessageId(self.messages.len());
        let base = self.base_desc(ctx.file, &path, qualified_name.clone());
        self.messages.push(MessageDescriptor {
            base,
            proto: proto.clone(),
            parent,
            messages: Vec::new(),
            enums: Vec::new(),
            fields: Vec::new(),
        });
        self.files[ctx.file.0].all_messages.push(id);
        self.register(ctx, &qualified_name, DescRef::Message(id))?;

        for (i, field) in proto.field.iter().enumerate() {
            let mut field_path = path.clone();
            field_path.extend([location::path::MESSAGE_FIELD, i as i32]);
            let mut field_name = qualified_name.clone();
            field_name.push(field.name().to_string());

            let field_id = FieldId(self.fields.len());
            let base = self.base_desc(ctx.file, &field_path, field_name.clone());
            self.fields.push(FieldDescriptor {
                base,
                proto: field.clone(),
                parent: id,
                field_type: None,
                required: ctx.required.contains(ctx.file_name, &field_path),
            });
            self.messages[id.0].fields.push(field_id);
            self.register(ctx, &field_name, DescRef::Field(field_id))?;
        }

        for (i, nested) in proto.nested_type.iter().enumerate() {
            let mut nested_path = path.clone();
            nested_path.extend([location::path::MESSAGE_MESSAGE, i as i32]);
            let nested_id = self.add_message(ctx, nested, Some(id), nested_path, &qualified_name)?;
            self.messages[id.0].messages.push(nested_id);
        }

        for (i, e) in proto.enum_type.iter().enumerate() {
            let mut enum_path = path.clone();
            enum_path.extend([location::path::MESSAGE_ENUM, i as i32]);
            let enum_id = self.add_enum(ctx, e, Some(id), enum_path, &qualified_name)?;
            self.messages[id.0].enums.push(enum_id);
        }

        Ok(id)
    }

    fn add_enum(
        &mut self,
        ctx: &FileContext<'_>,
        proto: &EnumDescriptorProto,
        parent: Option<MessageId>,
        path: Vec<i32>,
        outer: &[String],
    ) -> Result<EnumId> {
        let mut qualified_name = outer.to_vec();
        qualified_name.push(proto.name().to_string());

        let id = EnumId(self.enums.len());
        let base = self.base_desc(ctx.file, &path, qualified_name.clone());
        self.enums.push(EnumDescriptor {
            base,
            proto: proto.clone(),
            parent,
            values: Vec::new(),
        });
        self.files[ctx.file.0].all_enums.push(id);
        self.register(ctx, &qualified_name, DescRef::Enum(id))?;

        for (i, value) in proto.value.iter().enumerate() {
            let mut value_path = path.clone();
            value_path.extend([location::path::ENUM_VALUE, i as i32]);
            let mut value_name = qualified_name.clone();
            value_name.push(value.name().to_string());

            let value_id = EnumValueId(self.enum_values.len());
            let base = self.base_desc(ctx.file, &value_path, value_name.clone());
            self.enum_values.push(EnumValueDescriptor {
                base,
                proto: value.clone(),
                parent: id,
            });
            self.enums[id.0].values.push(value_id);
            self.register(ctx, &value_name, DescRef::EnumValue(value_id))?;
        }

        Ok(id)
    }

    fn add_service(
        &mut self,
        ctx: &FileContext<'_>,
        proto: &ServiceDescriptorProto,
        path: Vec<i32>,
    ) -> Result<ServiceId> {
        let qualified_name = vec![proto.name().to_string()];
        let id = ServiceId(self.services.len());
        let base = self.base_desc(ctx.file, &path, qualified_name.clone());
        self.services.push(ServiceDescriptor {
            base,
            proto: proto.clone(),
            methods: Vec::new(),
        });
        self.register(ctx, &qualified_name, DescRef::Service(id))?;

        for (i, method) in proto.method.iter().enumerate() {
            let mut method_path = path.clone();
            method_path.extend([location::path::SERVICE_METHOD, i as i32]);
            let method_name = vec![proto.name().to_string(), method.name().to_string()];

            let method_id = MethodId(self.methods.len());
            let base = self.base_desc(ctx.file, &method_path, method_name.clone());
            self.methods.push(MethodDescriptor {
                base,
                proto: method.clone(),
                parent: id,
                input: None,
                output: None,
            });
            self.services[id.0].methods.push(method_id);
            self.register(ctx, &method_name, DescRef::Method(method_id))?;
        }

        Ok(id)
    }

    // -------------------------------------------------------------------------
    // Resolution
    // -------------------------------------------------------------------------

    fn resolve_field_types(&mut self) -> Result<()> {
        for i in 0..self.fields.len() {
            let field = &self.fields[i];
            if !matches!(field.kind(), Type::Message | Type::Group | Type::Enum) {
                continue;
            }
            let type_name = field.proto.type_name();
            let resolved = match self.lookup(type_name) {
                Some(DescRef::Message(id)) => FieldType::Message(id),
                Some(DescRef::Enum(id)) => FieldType::Enum(id),
                Some(_) => {
                    return Err(GenError::WrongKind {
                        referrer: self.absolute_name(field),
                        type_name: type_name.to_string(),
                        expected: "message or enum",
                    })
                }
                None => {
                    return Err(GenError::UnresolvedType {
                        referrer: self.absolute_name(field),
                        type_name: type_name.to_string(),
                    })
                }
            };
            self.fields[i].field_type = Some(resolved);
        }
        Ok(())
    }

    fn resolve_method_types(&mut self) -> Result<()> {
        for i in 0..self.methods.len() {
            let method = &self.methods[i];
            let input = self.resolve_message_type(method, method.proto.input_type())?;
            let output = self.resolve_message_type(method, method.proto.output_type())?;
            self.methods[i].input = Some(input);
            self.methods[i].output = Some(output);
        }
        Ok(())
    }

    fn resolve_message_type(&self, referrer: &MethodDescriptor, type_name: &str) -> Result<MessageId> {
        match self.lookup(type_name) {
            Some(DescRef::Message(id)) => Ok(id),
            Some(_) => Err(GenError::WrongKind {
                referrer: self.absolute_name(referrer),
                type_name: type_name.to_string(),
                expected: "message",
            }),
            None => Err(GenError::UnresolvedType {
                referrer: self.absolute_name(referrer),
                type_name: type_name.to_string(),
            }),
        }
    }

    fn resolve_dependencies(&mut self) {
        for i in 0..self.files.len() {
            let mut dependencies = Vec::new();
            for dep in &self.files[i].proto.dependency {
                match self.all_files_by_name.get(dep) {
                    Some(id) => dependencies.push(*id),
                    None => debug!(file = self.files[i].name(), dependency = %dep, "dependency not in request"),
                }
            }
            self.files[i].dependencies = dependencies;
        }
    }
}

/// Per-file state threaded through descriptor construction
struct FileContext<'a> {
    file: FileId,
    file_name: &'a str,
    prefix: &'a str,
    required: &'a RequiredFields,
}

/// The declared package, or the file's base name without its last extension
pub fn package_name(file: &FileDescriptorProto) -> String {
    if let Some(package) = file.package.as_deref().filter(|p| !p.is_empty()) {
        return package.to_string();
    }
    let base = file.name().rsplit('/').next().unwrap_or_default();
    match base.rfind('.') {
        Some(dot) => base[..dot].to_string(),
        None => base.to_string(),
    }
}

/// protoc's default JSON name: underscores removed, following letter upper-cased
pub fn to_json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod testing;
