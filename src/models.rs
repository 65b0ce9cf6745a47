use crate::version::Version;
use std::path::PathBuf;

/// Where the latest package lives upstream and where it lands locally.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadDescriptor {
    pub url: String,
    pub file_name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LatestRelease {
    pub version: Version,
    pub download: DownloadDescriptor,
}

/// Exit status and captured output of a privileged command.
#[derive(Debug, Clone, Default)]
pub struct InstallResult {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl InstallResult {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}
