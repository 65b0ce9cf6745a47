use crate::launcher::{Decision, Status};

/// Renders the summary printed by `check`.
pub fn render(status: &Status) -> String {
    let verdict = match status.decision {
        Decision::LaunchExisting => "Up to date".to_string(),
        Decision::InstallThenLaunch => format!(
            "Update available: {} -> {}",
            status.current, status.latest.version
        ),
    };

    let mut lines = vec![
        "Discord Launcher Check".to_string(),
        "======================".to_string(),
        format!("Installed version: {}", status.current),
        format!("Latest version:    {}", status.latest.version),
        format!("Package:           {}", status.latest.download.url),
    ];
    if status.decision == Decision::InstallThenLaunch {
        lines.push(format!(
            "Download target:   {}",
            status.latest.download.path.display()
        ));
    }
    lines.push(String::new());
    lines.push(verdict);

    lines.join("\n")
}
