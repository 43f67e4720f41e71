//! Source locations and comment metadata
//!
//! Every descriptor is addressed inside its file by a path vector: the
//! sequence of field numbers and indices leading from the `FileDescriptorProto`
//! root to the element, as recorded in `SourceCodeInfo`.

use prost_types::source_code_info;

// =============================================================================
// Path Vector Constants
// =============================================================================

/// Field numbers used to build source-location path vectors
pub mod path {
    /// `FileDescriptorProto.package`
    pub const FILE_PACKAGE: i32 = 2;
    /// `FileDescriptorProto.message_type`
    pub const FILE_MESSAGE: i32 = 4;
    /// `FileDescriptorProto.enum_type`
    pub const FILE_ENUM: i32 = 5;
    /// `FileDescriptorProto.service`
    pub const FILE_SERVICE: i32 = 6;
    /// `DescriptorProto.field`
    pub const MESSAGE_FIELD: i32 = 2;
    /// `DescriptorProto.nested_type`
    pub const MESSAGE_MESSAGE: i32 = 3;
    /// `DescriptorProto.enum_type`
    pub const MESSAGE_ENUM: i32 = 4;
    /// `EnumDescriptorProto.value`
    pub const ENUM_VALUE: i32 = 2;
    /// `ServiceDescriptorProto.method`
    pub const SERVICE_METHOD: i32 = 2;
}

const CLASS_TAG: &str = "$class: ";
const HIDE_FROM_DOCS: &str = "$hide_from_docs";
const NOT_IMPLEMENTED_HIDE: &str = "[#not-implemented-hide:]";

// =============================================================================
// Location
// =============================================================================

/// Comments and span attached to one element of a proto file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: Vec<i32>,
    pub span: Vec<i32>,
    pub leading_comments: Option<String>,
    pub trailing_comments: Option<String>,
    pub leading_detached_comments: Vec<String>,
}

impl From<&source_code_info::Location> for Location {
    fn from(loc: &source_code_info::Location) -> Self {
        Self {
            path: loc.path.clone(),
            span: loc.span.clone(),
            leading_comments: loc.leading_comments.clone(),
            trailing_comments: loc.trailing_comments.clone(),
            leading_detached_comments: loc.leading_detached_comments.clone(),
        }
    }
}

impl Location {
    pub fn leading(&self) -> &str {
        self.leading_comments.as_deref().unwrap_or("")
    }

    pub fn trailing(&self) -> &str {
        self.trailing_comments.as_deref().unwrap_or("")
    }

    /// The leading comment, or the trailing one when there is no leading comment
    pub fn comment(&self) -> &str {
        match self.leading() {
            "" => self.trailing(),
            leading => leading,
        }
    }

    /// True when the element carries any attached (non-detached) comment
    pub fn has_comment(&self) -> bool {
        !self.leading().is_empty() || !self.trailing().is_empty()
    }
}

// =============================================================================
// Comment Metadata
// =============================================================================

/// Visibility and class metadata extracted from an element's comment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentInfo {
    /// The location with any `$class:` tag removed from its comments
    pub location: Option<Location>,
    pub hidden: bool,
    pub class: String,
}

/// Extract the `$class:` tag and hidden markers from a location.
///
/// Stripping is idempotent: feeding the returned location back in yields the
/// same location and an empty class.
pub fn comment_info(location: Option<&Location>) -> CommentInfo {
    let Some(loc) = location else {
        return CommentInfo::default();
    };

    let comment = loc.comment();
    let hidden = comment.contains(HIDE_FROM_DOCS) || comment.contains(NOT_IMPLEMENTED_HIDE);
    let class = extract_class(comment).unwrap_or_default();

    let mut stripped = loc.clone();
    if !class.is_empty() {
        let tag = format!("{}{}", CLASS_TAG, class);
        // only the comment the class was read from
        let source = if loc.leading().is_empty() {
            &mut stripped.trailing_comments
        } else {
            &mut stripped.leading_comments
        };
        *source = source.as_ref().map(|c| c.replacen(&tag, "", 1));
    }

    CommentInfo {
        location: Some(stripped),
        hidden,
        class,
    }
}

/// The value of a `$class: NAME` tag; the name ends at the next whitespace
/// or at the end of the comment.
fn extract_class(comment: &str) -> Option<String> {
    let start = comment.find(CLASS_TAG)? + CLASS_TAG.len();
    let rest = &comment[start..];
    let end = rest.find([' ', '\t', '\n']).unwrap_or(rest.len());
    let class = &rest[..end];
    (!class.is_empty()).then(|| class.to_string())
}
