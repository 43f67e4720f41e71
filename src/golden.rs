//! Golden file checks
//!
//! `crd-gen generate --check` compares freshly generated output against the
//! files on disk instead of overwriting them, so CI can catch stale
//! generated CRDs.

use std::fs;
use std::path::{Path, PathBuf};

use similar::{ChangeTag, TextDiff};
use tracing::{debug, info};

use crate::error::Result;

/// A generated file and where it belongs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub content: String,
}

/// How a file on disk compares to its generated content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoldenStatus {
    Match,
    Missing,
    Differs(GoldenDiff),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldenDiff {
    pub inserted: usize,
    pub deleted: usize,
    /// Unified diff from the file on disk to the generated content
    pub unified: String,
}

impl GoldenDiff {
    pub fn between(path: &Path, on_disk: &str, generated: &str) -> Self {
        let diff = TextDiff::from_lines(on_disk, generated);

        let mut inserted = 0;
        let mut deleted = 0;
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => inserted += 1,
                ChangeTag::Delete => deleted += 1,
                ChangeTag::Equal => {}
            }
        }

        let name = path.display().to_string();
        let unified = diff
            .unified_diff()
            .context_radius(3)
            .header(&format!("a/{}", name), &format!("b/{}", name))
            .to_string();

        Self {
            inserted,
            deleted,
            unified,
        }
    }
}

/// Compare one generated file against disk
pub fn compare(file: &GeneratedFile) -> Result<GoldenStatus> {
    if !file.path.exists() {
        return Ok(GoldenStatus::Missing);
    }
    let on_disk = fs::read_to_string(&file.path)?;
    if on_disk == file.content {
        Ok(GoldenStatus::Match)
    } else {
        Ok(GoldenStatus::Differs(GoldenDiff::between(&file.path, &on_disk, &file.content)))
    }
}

/// Files that are missing or out of date
pub fn check(files: &[GeneratedFile]) -> Result<Vec<(PathBuf, GoldenStatus)>> {
    let mut stale = Vec::new();
    for file in files {
        let status = compare(file)?;
        debug!(path = %file.path.display(), up_to_date = status == GoldenStatus::Match, "Checked golden file");
        if status != GoldenStatus::Match {
            stale.push((file.path.clone(), status));
        }
    }
    Ok(stale)
}

/// Write generated files, creating parent directories as needed
pub fn write_all(files: &[GeneratedFile]) -> Result<()> {
    for file in files {
        if let Some(parent) = file.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file.path, &file.content)?;
        info!(path = %file.path.display(), bytes = file.content.len(), "Wrote generated file");
    }
    Ok(())
}
