use crate::error::{LaunchError, Result};
use crate::models::LatestRelease;
use crate::storage::Storage;
use crate::version::Version;
use reqwest::blocking::Client;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{StatusCode, Url};

/// Source of the newest published release.
pub trait ReleaseChannel {
    fn latest(&self) -> Result<LatestRelease>;
}

/// The upstream stable channel. Its endpoint answers every request with a
/// redirect to the current `.deb`, whose file name carries the version.
pub struct StableChannel {
    client: Client,
    url: Url,
    storage: Storage,
}

impl StableChannel {
    pub fn new(url: &str, storage: Storage) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| LaunchError::UpstreamProtocol(format!("invalid channel URL {url}: {e}")))?;
        let client = Client::builder()
            .redirect(Policy::none())
            .user_agent(concat!("discord-launcher/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LaunchError::UpstreamProtocol(format!("could not build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            storage,
        })
    }
}

impl ReleaseChannel for StableChannel {
    fn latest(&self) -> Result<LatestRelease> {
        log::debug!("probing {}", self.url);
        let response = self
            .client
            .head(self.url.clone())
            .send()
            .map_err(|e| LaunchError::UpstreamProtocol(format!("{}: {e}", self.url)))?;

        let location = response
            .headers()
            .get(LOCATION)
            .map(|value| {
                value.to_str().map(str::to_string).map_err(|_| {
                    LaunchError::UpstreamProtocol("Location header is not valid text".to_string())
                })
            })
            .transpose()?;

        resolve_redirect(&self.url, response.status(), location.as_deref(), &self.storage)
    }
}

/// Turns the probe's status and `Location` header into the latest release.
pub fn resolve_redirect(
    probe_url: &Url,
    status: StatusCode,
    location: Option<&str>,
    storage: &Storage,
) -> Result<LatestRelease> {
    if !is_release_redirect(status) {
        return Err(LaunchError::UpstreamProtocol(format!(
            "expected a redirect from {probe_url}, got {status}"
        )));
    }

    let location = location.ok_or_else(|| {
        LaunchError::UpstreamProtocol(format!("{status} without a Location header"))
    })?;
    let target = probe_url.join(location).map_err(|e| {
        LaunchError::UpstreamProtocol(format!("unparsable Location {location:?}: {e}"))
    })?;

    let download = storage.descriptor(&target)?;
    let version = Version::from_package_file_name(&download.file_name)?;
    log::debug!("latest release {version} at {}", download.url);

    Ok(LatestRelease { version, download })
}

fn is_release_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}
