use crate::error::{LaunchError, Result};
use std::cmp::Ordering;
use std::fmt;

/// Characters to skip at the start of the application's first output line
/// (its "Discord" banner) before the version begins.
pub const VERSION_LINE_OFFSET: usize = 7;

/// Length of the `discord-` prefix of a release package file name.
pub const PACKAGE_PREFIX_LEN: usize = 8;

/// Length of the `.deb` suffix of a release package file name.
pub const PACKAGE_SUFFIX_LEN: usize = 4;

/// A dotted numeric version such as `0.0.329`.
///
/// Segments compare numerically, and missing trailing segments count as
/// zero, so `1.2` and `1.2.0` are equal.
#[derive(Debug, Clone)]
pub struct Version {
    segments: Vec<u64>,
}

impl Version {
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(LaunchError::MalformedVersion(text.to_string()));
        }

        let segments = trimmed
            .split('.')
            .map(|segment| {
                if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                segment.parse::<u64>().ok()
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| LaunchError::MalformedVersion(text.to_string()))?;

        Ok(Self { segments })
    }

    /// Parses the version the application reports on its first stdout line.
    pub fn from_version_line(line: &str) -> Result<Self> {
        let tail = line
            .get(VERSION_LINE_OFFSET..)
            .ok_or_else(|| LaunchError::MalformedVersion(line.trim_end().to_string()))?;
        Self::parse(tail)
    }

    /// Parses the version embedded in a package file name like
    /// `discord-0.0.329.deb`.
    pub fn from_package_file_name(file_name: &str) -> Result<Self> {
        let end = file_name
            .len()
            .checked_sub(PACKAGE_SUFFIX_LEN)
            .filter(|end| *end >= PACKAGE_PREFIX_LEN)
            .ok_or_else(|| LaunchError::MalformedVersion(file_name.to_string()))?;
        let middle = file_name
            .get(PACKAGE_PREFIX_LEN..end)
            .ok_or_else(|| LaunchError::MalformedVersion(file_name.to_string()))?;
        Self::parse(middle)
    }

    fn segment(&self, idx: usize) -> u64 {
        self.segments.get(idx).copied().unwrap_or(0)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        (0..len)
            .map(|idx| self.segment(idx).cmp(&other.segment(idx)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(u64::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}
