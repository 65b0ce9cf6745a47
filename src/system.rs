use crate::error::{LaunchError, Result};
use crate::version::Version;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// The host operations the launcher needs: finding executables and running
/// the application.
pub trait System {
    /// Resolves `name` against `$PATH`.
    fn locate(&self, name: &str) -> Result<PathBuf>;

    /// Starts the application only to read the version it prints first.
    fn read_version(&self, app: &Path) -> Result<Version>;

    /// Starts the application in its own session and leaves it running.
    fn launch(&self, app: &Path) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct HostSystem;

impl System for HostSystem {
    fn locate(&self, name: &str) -> Result<PathBuf> {
        which::which(name).map_err(|_| LaunchError::BinaryNotFound {
            name: name.to_string(),
        })
    }

    fn read_version(&self, app: &Path) -> Result<Version> {
        let child = Command::new(app)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| LaunchError::VersionRead(format!("{}: {e}", app.display())))?;
        let mut child = KillOnDrop(child);

        let stdout = child
            .0
            .stdout
            .take()
            .ok_or_else(|| LaunchError::VersionRead("stdout was not captured".to_string()))?;
        let mut line = String::new();
        BufReader::new(stdout)
            .read_line(&mut line)
            .map_err(|e| LaunchError::VersionRead(e.to_string()))?;

        if line.is_empty() {
            return Err(LaunchError::VersionRead(format!(
                "{} printed nothing",
                app.display()
            )));
        }

        Version::from_version_line(&line)
    }

    fn launch(&self, app: &Path) -> Result<()> {
        let mut command = Command::new(app);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // SAFETY: setsid is async-signal-safe and touches no parent state.
            unsafe {
                command.pre_exec(|| {
                    if libc::setsid() == -1 {
                        return Err(std::io::Error::last_os_error());
                    }
                    Ok(())
                });
            }
        }

        let child = command.spawn().map_err(|source| LaunchError::Launch {
            name: app.display().to_string(),
            source,
        })?;
        log::debug!("started {} as pid {}", app.display(), child.id());
        Ok(())
    }
}

/// Kills and reaps the wrapped child however the reader returns.
struct KillOnDrop(Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}
