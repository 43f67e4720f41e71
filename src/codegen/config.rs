//! Generator Options
//!
//! Knobs that change the shape of generated schemas. Everything here is
//! serializable so it can sit in the `[generator]` section of the CLI
//! configuration file as well as be filled from protoc plugin parameters.

use serde::{Deserialize, Serialize};

/// How much of a leading comment becomes a schema description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionStyle {
    /// Words up to and including the first one ending in `.`
    #[default]
    FirstSentence,
    /// The first blank-line separated paragraph, joined onto one line
    FirstParagraph,
}

/// Options controlling schema generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    /// Emit `description` from leading comments
    pub include_description: bool,

    /// Emit enums as `x-kubernetes-int-or-string` instead of a string enum
    pub enum_as_int_or_string: bool,

    /// Express oneof exclusivity as a CEL rule instead of `oneOf` branches
    pub cel_oneof: bool,

    pub description_style: DescriptionStyle,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            include_description: true,
            enum_as_int_or_string: false,
            cel_oneof: false,
            description_style: DescriptionStyle::FirstSentence,
        }
    }
}
