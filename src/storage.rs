use crate::error::{LaunchError, Result};
use crate::models::DownloadDescriptor;
use reqwest::Url;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// The directory downloaded packages are written to. Files are never
/// cleaned up.
#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub fn from_path(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Builds the descriptor for `url`: its last path segment becomes the
    /// local file name.
    pub fn descriptor(&self, url: &Url) -> Result<DownloadDescriptor> {
        let file_name = url
            .path_segments()
            .and_then(|segments| segments.last())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                LaunchError::UpstreamProtocol(format!("no file name in download URL {url}"))
            })?
            .to_string();

        Ok(DownloadDescriptor {
            url: url.to_string(),
            path: self.dir.join(&file_name),
            file_name,
        })
    }
}

/// Fetches a package payload to a local path.
pub trait PackageFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Streams the payload over HTTP with a progress bar.
#[derive(Debug, Default)]
pub struct HttpFetcher {
    show_progress: bool,
}

impl HttpFetcher {
    pub fn new(show_progress: bool) -> Self {
        Self { show_progress }
    }
}

impl PackageFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        // A failed request must not clobber a package already at `dest`.
        let partial = partial_path(dest);
        let file = File::create(&partial).map_err(|e| {
            LaunchError::Download(format!("could not create {}: {e}", partial.display()))
        })?;

        let mut download = self_update::Download::from_url(url);
        download.show_progress(self.show_progress);
        download
            .download_to(file)
            .map_err(|e| LaunchError::Download(format!("{url}: {e}")))?;

        fs::rename(&partial, dest).map_err(|e| {
            LaunchError::Download(format!(
                "could not move {} to {}: {e}",
                partial.display(),
                dest.display()
            ))
        })?;
        log::debug!("wrote {}", dest.display());
        Ok(())
    }
}

/// `dest` with `.part` appended to its file name.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
