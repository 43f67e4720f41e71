//! Front matter carried in the detached comments above a `package` statement
//!
//! ```text
//! // $title: Virtual Service
//! // $description: Configuration affecting label/content routing.
//! // $location: https://istio.io/docs/reference/config/networking/virtual-service.html
//! // $schema: istio.networking.v1alpha3.VirtualService
//!
//! package istio.networking.v1alpha3;
//! ```

use tracing::warn;

use super::location::Location;

const TITLE_TAG: &str = "$title: ";
const OVERVIEW_TAG: &str = "$overview: ";
const DESCRIPTION_TAG: &str = "$description: ";
const LOCATION_TAG: &str = "$location: ";
const MODE_TAG: &str = "$mode: ";
const FRONT_MATTER_TAG: &str = "$front_matter: ";

/// Documentation metadata for one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub title: String,
    pub overview: String,
    pub description: String,
    pub home_location: String,
    pub mode: String,
    /// `$front_matter:` lines and unrecognized `$key: value` lines, without the tag
    pub extra: Vec<String>,
    pub location: Option<Location>,
}

impl FrontMatter {
    /// Parse front matter from the package statement location of `file_name`.
    pub fn extract(file_name: &str, location: Option<&Location>) -> Self {
        let mut matter = FrontMatter {
            location: location.cloned(),
            ..Default::default()
        };

        let Some(loc) = location else {
            return matter;
        };

        for paragraph in &loc.leading_detached_comments {
            for line in paragraph.lines().map(str::trim) {
                if let Some(v) = line.strip_prefix(TITLE_TAG) {
                    set_single(&mut matter.title, v, "title", file_name);
                } else if let Some(v) = line.strip_prefix(OVERVIEW_TAG) {
                    set_single(&mut matter.overview, v, "overview", file_name);
                } else if let Some(v) = line.strip_prefix(DESCRIPTION_TAG) {
                    set_single(&mut matter.description, v, "description", file_name);
                } else if let Some(v) = line.strip_prefix(LOCATION_TAG) {
                    set_single(&mut matter.home_location, v, "location", file_name);
                } else if let Some(v) = line.strip_prefix(MODE_TAG) {
                    set_single(&mut matter.mode, v, "mode", file_name);
                } else if let Some(v) = line.strip_prefix(FRONT_MATTER_TAG) {
                    matter.extra.push(v.to_string());
                } else if let Some(v) = line.strip_prefix('$') {
                    matter.extra.push(v.to_string());
                }
            }
        }

        matter
    }

    /// Messages whose CRD description should point at this file's home location
    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.extra
            .iter()
            .filter_map(|line| line.split_once("schema: ").map(|(_, name)| name.trim()))
    }
}

fn set_single(slot: &mut String, value: &str, name: &str, file_name: &str) {
    if !slot.is_empty() {
        warn!(file = file_name, "duplicate {} front matter entry, using the last one", name);
    }
    *slot = value.to_string();
}
