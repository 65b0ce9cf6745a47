use crate::models::InstallResult;

/// Replaces every occurrence of `secret` in `text`.
pub fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, "********")
}

/// Echoes captured command output. stderr is only shown when present.
pub fn print_captured(result: &InstallResult) {
    println!("{}", result.stdout);
    if !result.stderr.is_empty() {
        println!("{}", result.stderr);
    }
}
