//! Source locations attached to symbols and diagnostics.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A span in one source file.
///
/// Mirrors the four-coordinate span CPython's `ast` module attaches to every
/// node, plus the file it belongs to (locations are meaningful across file
/// boundaries once imports are followed, so the file must travel with the
/// span rather than being implied by context).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub lineno: u32,
    pub col_offset: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_lineno: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_col_offset: Option<u32>,
    pub file: PathBuf,
}

impl Location {
    pub fn new(lineno: u32, col_offset: u32, file: impl Into<PathBuf>) -> Self {
        Location {
            lineno,
            col_offset,
            end_lineno: None,
            end_col_offset: None,
            file: file.into(),
        }
    }

    pub fn with_span(
        lineno: u32,
        col_offset: u32,
        end_lineno: u32,
        end_col_offset: u32,
        file: impl Into<PathBuf>,
    ) -> Self {
        Location {
            lineno,
            col_offset,
            end_lineno: Some(end_lineno),
            end_col_offset: Some(end_col_offset),
            file: file.into(),
        }
    }

    pub fn defined_in(&self) -> &Path {
        &self.file
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.lineno, self.col_offset)
    }
}
