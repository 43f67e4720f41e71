//! Error types for descriptor modeling and schema generation

use thiserror::Error;

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, GenError>;

/// Generator errors
#[derive(Error, Debug)]
pub enum GenError {
    #[error("{referrer}: unable to resolve type {type_name}")]
    UnresolvedType { referrer: String, type_name: String },

    #[error("{referrer}: type {type_name} is not a {expected}")]
    WrongKind {
        referrer: String,
        type_name: String,
        expected: &'static str,
    },

    #[error("Duplicate descriptor name: {0}")]
    DuplicateDescriptor(String),

    #[error("File to generate not present in request: {0}")]
    UnknownFile(String),

    #[error("Unknown plugin parameter: {0}")]
    UnknownParameter(String),

    #[error("Invalid value for plugin parameter {key}: {value}")]
    InvalidParameter { key: String, value: String },

    #[error("Invalid +cue-gen tag: {0}")]
    InvalidTag(String),

    #[error("Invalid key/value list {input:?}: {reason}")]
    InvalidKeyValue { input: String, reason: String },

    #[error("Unknown validation marker: {0}")]
    UnknownMarker(String),

    #[error("Invalid validation marker {marker}: {reason}")]
    InvalidMarker { marker: String, reason: String },

    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    #[error("CRD {crd} has no version")]
    MissingVersion { crd: String },

    #[error("CRD {crd} declares version {version} more than once")]
    DuplicateVersion { crd: String, version: String },

    #[error("CRD {crd} has invalid names: {errors}")]
    InvalidNames { crd: String, errors: String },

    #[error("Schema for {name} is not structural: {errors}")]
    NotStructural { name: String, errors: String },

    #[error("Protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
