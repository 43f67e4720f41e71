//! protoc plugin plumbing
//!
//! protoc writes a serialized `CodeGeneratorRequest` to the plugin's stdin
//! and reads a `CodeGeneratorResponse` from its stdout. Parameters arrive
//! as a comma-separated `key=value` list in `request.parameter`.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use prost::Message;
use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};
use tracing::{debug, info};

use crate::codegen::{GenerationContext, GeneratorOptions};
use crate::crd::generate_channels;
use crate::error::{GenError, Result};
use crate::model::{Model, RequiredFields};

/// Split a plugin parameter string into key/value pairs; a bare key maps to
/// an empty value.
pub fn extract_params(parameter: &str) -> BTreeMap<String, String> {
    parameter
        .split(',')
        .filter(|p| !p.is_empty())
        .map(|p| match p.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (p.to_string(), String::new()),
        })
        .collect()
}

/// Case-insensitive `true`/`false`
pub fn parse_bool_param(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(GenError::InvalidParameter {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Generator options from `protoc-gen-crd` parameters
pub fn crd_options(parameter: &str) -> Result<GeneratorOptions> {
    let mut options = GeneratorOptions::default();
    for (key, value) in extract_params(parameter) {
        match key.as_str() {
            "include_description" => options.include_description = parse_bool_param(&key, &value)?,
            "enum_as_int_or_string" => options.enum_as_int_or_string = parse_bool_param(&key, &value)?,
            _ => return Err(GenError::UnknownParameter(key)),
        }
    }
    Ok(options)
}

/// Read a request from `reader`, along with the required-field annotations
/// its descriptors carry.
pub fn read_request<R: Read>(mut reader: R) -> Result<(CodeGeneratorRequest, RequiredFields)> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    let request = CodeGeneratorRequest::decode(buf.as_slice())?;
    let required = RequiredFields::from_request_bytes(&buf)?;
    debug!(
        files = request.proto_file.len(),
        to_generate = request.file_to_generate.len(),
        "Read CodeGeneratorRequest"
    );
    Ok((request, required))
}

pub fn write_response<W: Write>(mut writer: W, response: &CodeGeneratorResponse) -> Result<()> {
    writer.write_all(&response.encode_to_vec())?;
    writer.flush()?;
    Ok(())
}

/// A successful response carrying `files`
pub fn response(files: Vec<File>) -> CodeGeneratorResponse {
    CodeGeneratorResponse {
        supported_features: Some(Feature::Proto3Optional as u64),
        file: files,
        ..Default::default()
    }
}

/// Generate the CRD channel files for a request
pub fn generate_crds(request: &CodeGeneratorRequest, required: &RequiredFields) -> Result<CodeGeneratorResponse> {
    let options = crd_options(request.parameter())?;
    let model = Model::with_required_fields(request, false, required)?;
    let ctx = GenerationContext::new(&model, &request.file_to_generate)?;

    let files = generate_channels(&model, &ctx, &options)?
        .into_iter()
        .map(|output| File {
            name: Some(output.file_name.to_string()),
            content: Some(output.content),
            ..Default::default()
        })
        .collect::<Vec<_>>();

    info!(files = files.len(), "Generated CRD files");
    Ok(response(files))
}
