use crate::auth::{Authorization, AUTH_CANCELLED_CODES};
use crate::error::{LaunchError, Result};
use crate::models::{DownloadDescriptor, InstallResult};
use crate::storage::PackageFetcher;
use crate::utils::print_captured;
use std::path::Path;

/// Downloads a release package and installs it with the package binary,
/// falling back to one dependency repair when the install fails.
pub struct Installer<'a> {
    fetcher: &'a dyn PackageFetcher,
    auth: &'a dyn Authorization,
    repair_command: Option<Vec<String>>,
}

impl<'a> Installer<'a> {
    pub fn new(
        fetcher: &'a dyn PackageFetcher,
        auth: &'a dyn Authorization,
        repair_command: Option<Vec<String>>,
    ) -> Self {
        Self {
            fetcher,
            auth,
            repair_command,
        }
    }

    pub fn install(&self, package_binary: &Path, download: &DownloadDescriptor) -> Result<InstallResult> {
        self.download(download)?;

        println!("Authentication required to install {}...", download.file_name);
        let argv = vec![
            package_binary.display().to_string(),
            "-i".to_string(),
            download.path.display().to_string(),
        ];
        let result = self.auth.run_privileged(&argv)?;
        print_captured(&result);

        match result.code {
            Some(0) => Ok(result),
            Some(code) if AUTH_CANCELLED_CODES.contains(&code) => Err(LaunchError::AuthCancelled),
            code => self.repair(code),
        }
    }

    fn download(&self, download: &DownloadDescriptor) -> Result<()> {
        self.fetcher.fetch(&download.url, &download.path)?;

        if !download.path.exists() {
            return Err(LaunchError::Download(format!(
                "{} doesn't exist after download",
                download.path.display()
            )));
        }
        println!("File downloaded successfully: {}", download.path.display());
        Ok(())
    }

    fn repair(&self, install_code: Option<i32>) -> Result<InstallResult> {
        let status = describe_code(install_code);
        let Some(repair_command) = &self.repair_command else {
            return Err(LaunchError::Install(format!("package install {status}")));
        };

        log::warn!("package install {status}, attempting to fix dependencies");
        println!("Attempting to fix dependencies...");
        let result = self.auth.run_privileged(repair_command)?;
        print_captured(&result);

        if result.success() {
            println!("Dependencies fixed.");
            Ok(result)
        } else {
            Err(LaunchError::Install(format!(
                "package install {status} and `{}` {}",
                repair_command.join(" "),
                describe_code(result.code)
            )))
        }
    }
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {code}"),
        None => "was terminated by a signal".to_string(),
    }
}
