use crate::error::{LaunchError, Result};
use crate::installer::Installer;
use crate::models::LatestRelease;
use crate::system::System;
use crate::update::ReleaseChannel;
use crate::version::Version;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    LaunchExisting,
    InstallThenLaunch,
}

/// Only a strictly newer release is installed.
pub fn decide(current: &Version, latest: &Version) -> Decision {
    if latest > current {
        Decision::InstallThenLaunch
    } else {
        Decision::LaunchExisting
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Launched { version: Version },
    Updated { from: Version, to: Version },
}

/// Versions on both sides plus what would be done about them.
#[derive(Debug, Clone)]
pub struct Status {
    pub current: Version,
    pub latest: LatestRelease,
    pub decision: Decision,
}

pub struct LauncherOptions {
    pub app_binary: String,
    pub package_binary: String,
    pub bootstrap: bool,
}

/// Locates the binaries, compares versions, installs if needed and starts
/// the application.
pub struct Launcher<'a> {
    system: &'a dyn System,
    channel: &'a dyn ReleaseChannel,
    installer: Installer<'a>,
    options: LauncherOptions,
}

struct Binaries {
    app: PathBuf,
    package: PathBuf,
}

impl<'a> Launcher<'a> {
    pub fn new(
        system: &'a dyn System,
        channel: &'a dyn ReleaseChannel,
        installer: Installer<'a>,
        options: LauncherOptions,
    ) -> Self {
        Self {
            system,
            channel,
            installer,
            options,
        }
    }

    pub fn run(&self) -> Result<Outcome> {
        let binaries = self.locate_binaries()?;
        let status = self.status(&binaries)?;

        match status.decision {
            Decision::LaunchExisting => {
                println!("\nStarting {}...", self.options.app_binary);
                self.system.launch(&binaries.app)?;
                Ok(Outcome::Launched {
                    version: status.current,
                })
            }
            Decision::InstallThenLaunch => {
                println!("Downloading the latest version: {}", status.latest.version);
                self.installer
                    .install(&binaries.package, &status.latest.download)?;
                println!(
                    "\nRunning the newly installed {}...",
                    self.options.app_binary
                );
                self.system.launch(&binaries.app)?;
                Ok(Outcome::Updated {
                    from: status.current,
                    to: status.latest.version,
                })
            }
        }
    }

    /// Everything `run` does up to the decision, without touching the
    /// installation.
    pub fn check(&self) -> Result<Status> {
        let package = self.system.locate(&self.options.package_binary)?;
        let app = self.system.locate(&self.options.app_binary)?;
        self.status(&Binaries { app, package })
    }

    fn locate_binaries(&self) -> Result<Binaries> {
        log::debug!("locating binaries");
        let package = self.system.locate(&self.options.package_binary)?;

        let app = match self.system.locate(&self.options.app_binary) {
            Ok(app) => app,
            Err(LaunchError::BinaryNotFound { .. }) if self.options.bootstrap => {
                self.bootstrap(&package)?
            }
            Err(err) => return Err(err),
        };

        Ok(Binaries { app, package })
    }

    fn bootstrap(&self, package: &Path) -> Result<PathBuf> {
        let name = &self.options.app_binary;
        println!("{name} not found. Installing {name}...");

        let latest = self.channel.latest()?;
        println!("Downloading {name} {}...", latest.version);
        self.installer.install(package, &latest.download)?;

        self.system.locate(name).map_err(|_| {
            println!("You may need to restart your terminal or add {name} to your PATH");
            LaunchError::PostInstallNotFound { name: name.clone() }
        })
    }

    fn status(&self, binaries: &Binaries) -> Result<Status> {
        log::debug!("reading version of {}", binaries.app.display());
        let current = self.system.read_version(&binaries.app)?;
        println!("Current version: {current}");

        log::debug!("resolving latest release");
        let latest = self.channel.latest()?;
        println!("Latest version: {}", latest.version);

        let decision = decide(&current, &latest.version);
        log::debug!("decision: {decision:?}");
        Ok(Status {
            current,
            latest,
            decision,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Authorization;
    use crate::models::{DownloadDescriptor, InstallResult};
    use crate::storage::PackageFetcher;
    use std::cell::{Cell, RefCell};
    use tempfile::{tempdir, TempDir};

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    struct FakeSystem {
        on_path: RefCell<Vec<String>>,
        installs_app: bool,
        version: Option<&'static str>,
        launched: RefCell<Vec<PathBuf>>,
    }

    impl FakeSystem {
        fn new(on_path: &[&str], version: Option<&'static str>) -> Self {
            Self {
                on_path: RefCell::new(on_path.iter().map(|s| s.to_string()).collect()),
                installs_app: true,
                version,
                launched: RefCell::new(Vec::new()),
            }
        }

        /// Called by the fake auth once a privileged install succeeds.
        fn installed(&self) {
            if self.installs_app && !self.on_path.borrow().iter().any(|n| n == "discord") {
                self.on_path.borrow_mut().push("discord".to_string());
            }
        }
    }

    impl System for FakeSystem {
        fn locate(&self, name: &str) -> Result<PathBuf> {
            if self.on_path.borrow().iter().any(|n| n == name) {
                Ok(PathBuf::from("/usr/bin").join(name))
            } else {
                Err(LaunchError::BinaryNotFound {
                    name: name.to_string(),
                })
            }
        }

        fn read_version(&self, _app: &Path) -> Result<Version> {
            match self.version {
                Some(text) => Version::parse(text),
                None => Err(LaunchError::VersionRead("no output".to_string())),
            }
        }

        fn launch(&self, app: &Path) -> Result<()> {
            self.launched.borrow_mut().push(app.to_path_buf());
            Ok(())
        }
    }

    struct FakeChannel {
        version: &'static str,
        probes: Cell<u32>,
        dir: TempDir,
        broken: bool,
    }

    impl FakeChannel {
        fn new(version: &'static str) -> Self {
            Self {
                version,
                probes: Cell::new(0),
                dir: tempdir().unwrap(),
                broken: false,
            }
        }

        /// Answers every probe as if the endpoint stopped redirecting.
        fn broken() -> Self {
            Self {
                broken: true,
                ..Self::new("0.0.0")
            }
        }
    }

    impl ReleaseChannel for FakeChannel {
        fn latest(&self) -> Result<LatestRelease> {
            self.probes.set(self.probes.get() + 1);
            if self.broken {
                return Err(LaunchError::UpstreamProtocol(
                    "expected a redirect, got 200 OK".to_string(),
                ));
            }
            let file_name = format!("discord-{}.deb", self.version);
            Ok(LatestRelease {
                version: v(self.version),
                download: DownloadDescriptor {
                    url: format!(
                        "https://dl.discordapp.net/apps/linux/{}/{file_name}",
                        self.version
                    ),
                    path: self.dir.path().join(&file_name),
                    file_name,
                },
            })
        }
    }

    /// Pretends to download without touching the network.
    struct CountingFetcher {
        fetches: Cell<u32>,
    }

    impl PackageFetcher for CountingFetcher {
        fn fetch(&self, _url: &str, dest: &Path) -> Result<()> {
            self.fetches.set(self.fetches.get() + 1);
            std::fs::write(dest, b"deb").map_err(|e| LaunchError::Download(e.to_string()))
        }
    }

    struct FakeAuth<'s> {
        system: &'s FakeSystem,
        code: i32,
        calls: Cell<u32>,
    }

    impl Authorization for FakeAuth<'_> {
        fn run_privileged(&self, _argv: &[String]) -> Result<InstallResult> {
            self.calls.set(self.calls.get() + 1);
            if self.code == 0 {
                self.system.installed();
            }
            Ok(InstallResult {
                code: Some(self.code),
                ..Default::default()
            })
        }
    }

    fn launcher<'a>(
        system: &'a FakeSystem,
        channel: &'a FakeChannel,
        fetcher: &'a CountingFetcher,
        auth: &'a FakeAuth<'a>,
        bootstrap: bool,
    ) -> Launcher<'a> {
        let options = LauncherOptions {
            app_binary: "discord".to_string(),
            package_binary: "dpkg".to_string(),
            bootstrap,
        };
        Launcher::new(system, channel, Installer::new(fetcher, auth, None), options)
    }

    fn fetcher() -> CountingFetcher {
        CountingFetcher {
            fetches: Cell::new(0),
        }
    }

    fn auth(system: &FakeSystem, code: i32) -> FakeAuth<'_> {
        FakeAuth {
            system,
            code,
            calls: Cell::new(0),
        }
    }

    #[test]
    fn test_decide() {
        assert_eq!(decide(&v("0.0.328"), &v("0.0.329")), Decision::InstallThenLaunch);
        assert_eq!(decide(&v("0.0.329"), &v("0.0.329")), Decision::LaunchExisting);
        assert_eq!(decide(&v("0.0.329"), &v("0.0.300")), Decision::LaunchExisting);
    }

    #[test]
    fn test_newer_release_is_installed_then_launched() {
        let system = FakeSystem::new(&["dpkg", "discord"], Some("0.0.328"));
        let channel = FakeChannel::new("0.0.329");
        let fetcher = fetcher();
        let auth = auth(&system, 0);
        let launcher = launcher(&system, &channel, &fetcher, &auth, true);

        let outcome = launcher.run().unwrap();

        assert_eq!(
            outcome,
            Outcome::Updated {
                from: v("0.0.328"),
                to: v("0.0.329")
            }
        );
        assert_eq!(fetcher.fetches.get(), 1);
        assert_eq!(auth.calls.get(), 1);
        assert_eq!(*system.launched.borrow(), vec![PathBuf::from("/usr/bin/discord")]);
    }

    #[test]
    fn test_same_or_older_release_launches_without_download() {
        for latest in ["0.0.329", "0.0.300"] {
            let system = FakeSystem::new(&["dpkg", "discord"], Some("0.0.329"));
            let channel = FakeChannel::new(latest);
            let fetcher = fetcher();
            let auth = auth(&system, 0);
            let launcher = launcher(&system, &channel, &fetcher, &auth, true);

            let outcome = launcher.run().unwrap();

            assert_eq!(outcome, Outcome::Launched { version: v("0.0.329") });
            assert_eq!(fetcher.fetches.get(), 0);
            assert_eq!(auth.calls.get(), 0);
            assert_eq!(system.launched.borrow().len(), 1);
        }
    }

    #[test]
    fn test_missing_package_binary_is_fatal() {
        let system = FakeSystem::new(&["discord"], Some("0.0.329"));
        let channel = FakeChannel::new("0.0.330");
        let fetcher = fetcher();
        let auth = auth(&system, 0);
        let launcher = launcher(&system, &channel, &fetcher, &auth, true);

        let result = launcher.run();

        assert!(matches!(result, Err(LaunchError::BinaryNotFound { ref name }) if name == "dpkg"));
        assert_eq!(channel.probes.get(), 0);
        assert!(system.launched.borrow().is_empty());
    }

    #[test]
    fn test_missing_app_without_bootstrap_is_fatal() {
        let system = FakeSystem::new(&["dpkg"], Some("0.0.329"));
        let channel = FakeChannel::new("0.0.329");
        let fetcher = fetcher();
        let auth = auth(&system, 0);
        let launcher = launcher(&system, &channel, &fetcher, &auth, false);

        let result = launcher.run();

        assert!(matches!(result, Err(LaunchError::BinaryNotFound { ref name }) if name == "discord"));
        assert_eq!(fetcher.fetches.get(), 0);
    }

    #[test]
    fn test_bootstrap_installs_then_launches() {
        let system = FakeSystem::new(&["dpkg"], Some("0.0.329"));
        let channel = FakeChannel::new("0.0.329");
        let fetcher = fetcher();
        let auth = auth(&system, 0);
        let launcher = launcher(&system, &channel, &fetcher, &auth, true);

        let outcome = launcher.run().unwrap();

        assert_eq!(outcome, Outcome::Launched { version: v("0.0.329") });
        assert_eq!(fetcher.fetches.get(), 1);
        assert_eq!(auth.calls.get(), 1);
        // Once for the bootstrap install, once for the regular check.
        assert_eq!(channel.probes.get(), 2);
        assert_eq!(system.launched.borrow().len(), 1);
    }

    #[test]
    fn test_bootstrap_binary_still_missing() {
        let mut system = FakeSystem::new(&["dpkg"], Some("0.0.329"));
        system.installs_app = false;
        let channel = FakeChannel::new("0.0.329");
        let fetcher = fetcher();
        let auth = auth(&system, 0);
        let launcher = launcher(&system, &channel, &fetcher, &auth, true);

        let result = launcher.run();

        assert!(matches!(result, Err(LaunchError::PostInstallNotFound { .. })));
        assert!(system.launched.borrow().is_empty());
    }

    #[test]
    fn test_bootstrap_cancelled() {
        let system = FakeSystem::new(&["dpkg"], Some("0.0.329"));
        let channel = FakeChannel::new("0.0.329");
        let fetcher = fetcher();
        let auth = auth(&system, 126);
        let launcher = launcher(&system, &channel, &fetcher, &auth, true);

        assert!(matches!(launcher.run(), Err(LaunchError::AuthCancelled)));
        assert!(system.launched.borrow().is_empty());
    }

    #[test]
    fn test_unreadable_version_stops_before_network() {
        let system = FakeSystem::new(&["dpkg", "discord"], None);
        let channel = FakeChannel::new("0.0.330");
        let fetcher = fetcher();
        let auth = auth(&system, 0);
        let launcher = launcher(&system, &channel, &fetcher, &auth, true);

        assert!(matches!(launcher.run(), Err(LaunchError::VersionRead(_))));
        assert_eq!(channel.probes.get(), 0);
    }

    #[test]
    fn test_check_never_installs() {
        let system = FakeSystem::new(&["dpkg", "discord"], Some("0.0.328"));
        let channel = FakeChannel::new("0.0.329");
        let fetcher = fetcher();
        let auth = auth(&system, 0);
        let launcher = launcher(&system, &channel, &fetcher, &auth, true);

        let status = launcher.check().unwrap();

        assert_eq!(status.decision, Decision::InstallThenLaunch);
        assert_eq!(status.current, v("0.0.328"));
        assert_eq!(fetcher.fetches.get(), 0);
        assert!(system.launched.borrow().is_empty());
    }

    #[test]
    fn test_upstream_error_stops_before_download() {
        let system = FakeSystem::new(&["dpkg", "discord"], Some("0.0.328"));
        let channel = FakeChannel::broken();
        let fetcher = fetcher();
        let auth = auth(&system, 0);
        let launcher = launcher(&system, &channel, &fetcher, &auth, true);

        let result = launcher.run();

        assert!(matches!(result, Err(LaunchError::UpstreamProtocol(_))));
        assert_eq!(channel.probes.get(), 1);
        assert_eq!(fetcher.fetches.get(), 0);
        assert_eq!(auth.calls.get(), 0);
        assert!(system.launched.borrow().is_empty());
    }

    #[test]
    fn test_upstream_error_during_bootstrap() {
        let system = FakeSystem::new(&["dpkg"], Some("0.0.329"));
        let channel = FakeChannel::broken();
        let fetcher = fetcher();
        let auth = auth(&system, 0);
        let launcher = launcher(&system, &channel, &fetcher, &auth, true);

        let result = launcher.run();

        assert!(matches!(result, Err(LaunchError::UpstreamProtocol(_))));
        assert_eq!(channel.probes.get(), 1);
        assert_eq!(fetcher.fetches.get(), 0);
        assert_eq!(auth.calls.get(), 0);
        assert!(system.launched.borrow().is_empty());
    }
}
