//! Logical folder paths and filename sanitization
//!
//! Every path a client sends is parsed into a [`LogicalPath`] before it can
//! reach the filesystem. Parsing is purely lexical: `..` segments, NUL bytes
//! and backslashes are rejected, empty and `.` segments are dropped. The
//! resulting path always starts with `/`; the storage root is `/`.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;

use crate::core::error::AppError;

lazy_static! {
    /// Characters outside `[-\w.]` are stripped from uploaded filenames
    static ref UNSAFE_FILENAME_CHARS: Regex = Regex::new(r"[^-\w.]").unwrap();
}

/// Normalized `/`-separated path relative to the storage root
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalPath(String);

impl LogicalPath {
    pub fn root() -> Self {
        LogicalPath("/".to_string())
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if raw.contains('\0') || raw.contains('\\') {
            return Err(AppError::BadRequest(format!("Invalid path: {}", raw)));
        }

        let mut segments = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(AppError::BadRequest(format!(
                        "Path traversal is not allowed: {}",
                        raw
                    )))
                }
                s => segments.push(s),
            }
        }

        Ok(LogicalPath(format!("/{}", segments.join("/"))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Last segment, `None` for the root
    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Containing folder; the root is its own parent
    pub fn parent(&self) -> LogicalPath {
        match self.0.rfind('/') {
            Some(0) | None => LogicalPath::root(),
            Some(idx) => LogicalPath(self.0[..idx].to_string()),
        }
    }

    /// Append one already-validated name segment
    pub fn join(&self, name: &str) -> Result<LogicalPath, AppError> {
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(AppError::BadRequest(format!("Invalid name: {}", name)));
        }
        LogicalPath::parse(&format!("{}/{}", self.0, name))
    }

    /// Segment-aware containment: `/ab` contains `/ab/c` but not `/abc`
    pub fn is_within(&self, ancestor: &LogicalPath) -> bool {
        if ancestor.is_root() || self == ancestor {
            return true;
        }
        self.0
            .strip_prefix(ancestor.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Path relative to the storage root, suitable for `Path::join`
    pub fn to_relative(&self) -> PathBuf {
        self.segments().collect()
    }

    /// `(name, path)` pairs for every ancestor below the root, self included
    pub fn breadcrumbs(&self) -> Vec<(String, LogicalPath)> {
        let mut current = String::new();
        self.segments()
            .map(|segment| {
                current.push('/');
                current.push_str(segment);
                (segment.to_string(), LogicalPath(current.clone()))
            })
            .collect()
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reduce a client-supplied filename to a safe single segment.
///
/// Directory components are discarded, whitespace becomes `_`, and anything
/// outside `[-\w.]` is dropped. Returns `None` when nothing usable remains.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or("").trim();
    let underscored: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(&underscored, "").to_string();

    match cleaned.as_str() {
        "" | "." | ".." => None,
        _ => Some(cleaned),
    }
}

/// Split `report.tar.gz` into (`report.tar`, `.gz`); dotfiles keep their name
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(0) | None => (name, ""),
        Some(idx) => name.split_at(idx),
    }
}

/// Lowercased extension including the dot, empty when there is none
pub fn extension_of(name: &str) -> String {
    split_extension(name).1.to_lowercase()
}
