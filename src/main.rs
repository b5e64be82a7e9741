// Entrypoint for the CLI application.
// - Resolve configuration (flags > env > file > defaults) and start logging.
// - `deploy` builds a Hosting client and runs the flow; `manifest` only
//   hashes the directory locally.

use anyhow::{bail, Context, Result};
use clap::Parser;
use firebase_deploy::cli::{Cli, Commands, DeployArgs};
use firebase_deploy::config::DeployConfig;
use firebase_deploy::credentials::{Certificate, Credentials};
use firebase_deploy::logging::init_logging;
use firebase_deploy::ui::{self, ConsoleObserver};
use firebase_deploy::{Deployer, FileSet, HostingClient};
use reqwest::blocking::Client;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let mut config = DeployConfig::load(cli.config.as_deref(), &cwd)?;
    let env: HashMap<String, String> = std::env::vars().collect();
    config.apply_env(&env);
    config.apply_overrides(cli.overrides());

    init_logging(&config.logging)?;

    match &cli.command {
        Commands::Deploy(args) => deploy(config, args),
        Commands::Manifest { .. } => {
            let dir = config.public.unwrap_or_else(|| PathBuf::from("."));
            let files = FileSet::from_dir(&dir)
                .with_context(|| format!("Failed to hash {}", dir.display()))?;
            ui::print_manifest(&files);
            Ok(())
        }
    }
}

fn deploy(mut config: DeployConfig, args: &DeployArgs) -> Result<()> {
    config.apply_default_credentials();
    ui::prompt_missing(&mut config)?;
    config.validate()?;

    let site = config.site.clone().unwrap_or_default();
    let dir = config.public.clone().unwrap_or_else(|| PathBuf::from("."));
    if !ui::confirm_deploy(&site, &dir.display().to_string(), args.yes)? {
        bail!("Deploy cancelled");
    }

    let client = Client::builder()
        .build()
        .context("Failed to build HTTP client")?;
    let credentials = match (&config.token, &config.credentials) {
        (Some(token), _) => Credentials::Token(token.clone()),
        (None, Some(path)) => Credentials::ServiceAccount(
            Certificate::from_file(path, client.clone())
                .with_context(|| format!("Failed to load credentials from {}", path.display()))?,
        ),
        (None, None) => bail!("No credentials configured"),
    };

    let api = HostingClient::new(client, config.api_base.clone(), credentials);
    let mut deployer = Deployer::new(api, site);
    let mut observer = ConsoleObserver::new();
    deployer.deploy(&dir, &mut observer)?;
    Ok(())
}
