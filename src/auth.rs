use crate::error::{LaunchError, Result};
use crate::models::InstallResult;
use crate::utils::redact;
use std::io::{ErrorKind, Write};
use std::process::{Command, Output, Stdio};

/// Exit codes pkexec uses when the user dismisses or fails the prompt.
pub const AUTH_CANCELLED_CODES: [i32; 2] = [126, 127];

/// Runs a command with elevated privileges.
pub trait Authorization {
    fn run_privileged(&self, argv: &[String]) -> Result<InstallResult>;
}

/// Source of the password for [`PasswordAuth`]. `None` means the user
/// cancelled.
pub trait PasswordPrompt {
    fn prompt(&self, message: &str) -> Result<Option<String>>;
}

/// Hands the command to the system authentication agent, which asks the
/// user itself. The helper's exit code is all this process sees.
pub struct AgentAuth {
    helper: String,
}

impl AgentAuth {
    pub fn new(helper: &str) -> Self {
        Self {
            helper: helper.to_string(),
        }
    }
}

impl Authorization for AgentAuth {
    fn run_privileged(&self, argv: &[String]) -> Result<InstallResult> {
        log::debug!("{} {}", self.helper, argv.join(" "));
        let output = Command::new(&self.helper)
            .args(argv)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| LaunchError::Install(format!("could not run {}: {e}", self.helper)))?;
        Ok(into_result(output, None))
    }
}

/// Asks for the password up front and pipes it to `sudo -S`.
pub struct PasswordAuth<P> {
    helper: String,
    prompt: P,
}

impl<P: PasswordPrompt> PasswordAuth<P> {
    pub fn new(helper: &str, prompt: P) -> Self {
        Self {
            helper: helper.to_string(),
            prompt,
        }
    }
}

impl<P: PasswordPrompt> Authorization for PasswordAuth<P> {
    fn run_privileged(&self, argv: &[String]) -> Result<InstallResult> {
        let message = format!("Password required to run {}", argv.join(" "));
        let password = match self.prompt.prompt(&message)? {
            Some(password) if !password.is_empty() => password,
            _ => return Err(LaunchError::AuthCancelled),
        };

        log::debug!("{} -S {}", self.helper, argv.join(" "));
        let mut child = Command::new(&self.helper)
            .args(["-S", "-k", "-p", ""])
            .args(argv)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LaunchError::Install(format!("could not run {}: {e}", self.helper)))?;

        if let Some(mut stdin) = child.stdin.take() {
            let written = stdin
                .write_all(password.as_bytes())
                .and_then(|()| stdin.write_all(b"\n"));
            match written {
                Ok(()) => {}
                // sudo may exit before it reads anything.
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(LaunchError::Install(format!(
                        "could not pass password to {}: {e}",
                        self.helper
                    )));
                }
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| LaunchError::Install(format!("{} failed: {e}", self.helper)))?;
        Ok(into_result(output, Some(&password)))
    }
}

fn into_result(output: Output, secret: Option<&str>) -> InstallResult {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let secret = secret.unwrap_or("");

    InstallResult {
        code: output.status.code(),
        stdout: redact(&stdout, secret),
        stderr: redact(&stderr, secret),
    }
}
