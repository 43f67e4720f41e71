//! Configuration for the `crd-gen` CLI
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (crdgen.toml)
//! - Environment variables (CRDGEN__*)
//!
//! The protoc plugins take their options from plugin parameters instead.
//!
//! ## Example config file (crdgen.toml):
//! ```toml
//! [generator]
//! include_description = true
//! enum_as_int_or_string = false
//! cel_oneof = false
//!
//! [output]
//! dir = "."
//!
//! [openapi]
//! yaml = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::codegen::GeneratorOptions;
use crate::crd::ReleaseChannel;
use crate::openapi::OpenApiOptions;

/// Main configuration for `crd-gen`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenConfig {
    /// Schema generation options
    #[serde(default)]
    pub generator: GeneratorOptions,

    /// Where generated files go
    #[serde(default)]
    pub output: OutputConfig,

    /// OpenAPI document layout
    #[serde(default)]
    pub openapi: OpenApiOptions,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for generated files
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Stable channel file, relative to `dir`
    #[serde(default = "default_stable_file")]
    pub stable_file: PathBuf,

    /// Extended channel file, relative to `dir`
    #[serde(default = "default_extended_file")]
    pub extended_file: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_stable_file() -> PathBuf {
    PathBuf::from(ReleaseChannel::Stable.file_name())
}

fn default_extended_file() -> PathBuf {
    PathBuf::from(ReleaseChannel::Extended.file_name())
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            stable_file: default_stable_file(),
            extended_file: default_extended_file(),
        }
    }
}

impl OutputConfig {
    /// Full path of the file for `channel`
    pub fn channel_path(&self, channel: ReleaseChannel) -> PathBuf {
        let file = match channel {
            ReleaseChannel::Stable => &self.stable_file,
            ReleaseChannel::Extended => &self.extended_file,
        };
        self.dir.join(file)
    }
}

impl GenConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["crdgen.toml", ".crdgen.toml", "config/crdgen.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "istio", "crdgen") {
            let xdg_config = config_dir.config_dir().join("crdgen.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // CRDGEN__GENERATOR__CEL_ONEOF=true
        builder = builder.add_source(Environment::with_prefix("CRDGEN").separator("__").try_parsing(true));

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}
