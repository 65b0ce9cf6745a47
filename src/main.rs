mod auth;
mod config;
mod error;
mod installer;
mod launcher;
mod models;
mod report;
mod storage;
mod system;
mod tui;
mod update;
mod utils;
mod version;

use anyhow::Result;
use auth::{AgentAuth, Authorization, PasswordAuth};
use clap::{Parser, Subcommand};
use config::AuthMethod;
use installer::Installer;
use launcher::{Launcher, LauncherOptions, Outcome};
use storage::{HttpFetcher, Storage};
use system::HostSystem;
use tui::PasswordModal;
use update::StableChannel;

#[derive(Parser)]
#[command(name = "discord-launcher")]
#[command(about = "Updates Discord from the stable .deb channel, then starts it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// How to authorize the package install
    #[arg(long, value_enum, global = true)]
    auth: Option<AuthMethod>,
    /// Fail instead of installing Discord when it is missing
    #[arg(long, global = true)]
    no_bootstrap: bool,
    /// Skip the dependency repair after a failed install
    #[arg(long, global = true)]
    no_repair: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Update if a newer release exists, then start Discord (default)
    Launch,
    /// Compare the installed and latest versions without changing anything
    Check,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut config = config::load_config()?;
    if let Some(auth) = cli.auth {
        config.auth = auth;
    }
    if cli.no_bootstrap {
        config.bootstrap = false;
    }
    if cli.no_repair {
        config.repair_dependencies = false;
    }
    log::debug!("config: {config:?}");

    let system = HostSystem;
    let channel = StableChannel::new(
        &config.channel_url,
        Storage::from_path(config.download_dir()),
    )?;
    let fetcher = HttpFetcher::new(true);
    let auth: Box<dyn Authorization> = match config.auth {
        AuthMethod::Agent => Box::new(AgentAuth::new(&config.agent_helper)),
        AuthMethod::Password => Box::new(PasswordAuth::new(&config.sudo_helper, PasswordModal)),
    };
    let installer = Installer::new(&fetcher, auth.as_ref(), config.repair());
    let launcher = Launcher::new(
        &system,
        &channel,
        installer,
        LauncherOptions {
            app_binary: config.app_binary.clone(),
            package_binary: config.package_binary.clone(),
            bootstrap: config.bootstrap,
        },
    );

    match cli.command.unwrap_or(Commands::Launch) {
        Commands::Launch => match launcher.run()? {
            Outcome::Launched { version } => log::info!("launched {version}"),
            Outcome::Updated { from, to } => log::info!("updated {from} -> {to} and launched"),
        },
        Commands::Check => {
            let status = launcher.check()?;
            println!("\n{}", report::render(&status));
        }
    }

    Ok(())
}
