//! Comment-derived text
//!
//! Descriptions and alternative property names are both read from an
//! element's leading comment.

use super::config::{DescriptionStyle, GeneratorOptions};

const HIDE_FROM_DOCS: &str = "$hide_from_docs";
const ALT_NAME_TAG: &str = "+kubebuilder:altName=";

/// Turn a leading comment into a single-line description.
///
/// Returns an empty string when descriptions are disabled, when the comment
/// is hidden from docs, or (for [`DescriptionStyle::FirstSentence`]) when no
/// word ends a sentence.
pub fn describe(comment: &str, options: &GeneratorOptions) -> String {
    if !options.include_description {
        return String::new();
    }
    let comment = comment.trim();
    if comment.contains(HIDE_FROM_DOCS) {
        return String::new();
    }
    match options.description_style {
        DescriptionStyle::FirstSentence => first_sentence(comment),
        DescriptionStyle::FirstParagraph => first_paragraph(comment),
    }
}

fn first_sentence(comment: &str) -> String {
    let words: Vec<&str> = comment.split_whitespace().collect();
    match words.iter().position(|w| w.ends_with('.')) {
        Some(end) => words[..=end].join(" "),
        None => String::new(),
    }
}

fn first_paragraph(comment: &str) -> String {
    let paragraph = comment.split("\n\n").next().unwrap_or_default();
    // `$` lines are documentation directives, not prose
    if paragraph.starts_with('$') {
        return String::new();
    }
    paragraph.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Alternative property names declared with `+kubebuilder:altName=NAME`
pub fn alt_names(comment: &str) -> Vec<String> {
    comment
        .split_once(ALT_NAME_TAG)
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .map(|name| vec![name.to_string()])
        .unwrap_or_default()
}

/// Enum value names listed in a field description, skipping a leading
/// placeholder value such as `UNSPECIFIED`
pub fn valid_options<'a>(values: &[&'a str]) -> Vec<&'a str> {
    values
        .iter()
        .enumerate()
        .filter(|(i, name)| !(*i == 0 && is_placeholder(name)))
        .map(|(_, name)| *name)
        .collect()
}

fn is_placeholder(name: &str) -> bool {
    ["UNSPECIFIED", "UNSET", "UNDEFINED", "INVALID"]
        .iter()
        .any(|marker| name.contains(marker))
}
