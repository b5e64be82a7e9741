// Command-line arguments. `main` turns them into config overrides.

use crate::config::Overrides;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Deploy a static directory to Firebase Hosting
#[derive(Debug, Parser)]
#[command(name = "firebase-deploy", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: ./firebase-deploy.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Shorthand for --log-level debug
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload a directory as a new version and release it
    Deploy(DeployArgs),
    /// Show the hashed manifest for a directory without contacting the API
    Manifest {
        /// Directory to hash
        dir: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Directory to deploy
    pub dir: Option<PathBuf>,

    /// Hosting site name, the `site` in site.web.app
    #[arg(long)]
    pub site: Option<String>,

    /// Service-account key JSON file
    #[arg(long)]
    pub credentials: Option<PathBuf>,

    /// Access token to use instead of a service account
    #[arg(long)]
    pub token: Option<String>,

    /// Hosting API base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

impl Cli {
    /// Command-line values that override config and environment.
    pub fn overrides(&self) -> Overrides {
        let log_level = self
            .log_level
            .clone()
            .or_else(|| self.verbose.then(|| "debug".to_string()));
        let mut o = Overrides {
            log_level,
            log_format: self.log_format.clone(),
            ..Overrides::default()
        };
        match &self.command {
            Commands::Deploy(args) => {
                o.site = args.site.clone();
                o.public = args.dir.clone();
                o.credentials = args.credentials.clone();
                o.token = args.token.clone();
                o.api_base = args.api_url.clone();
            }
            Commands::Manifest { dir } => {
                o.public = dir.clone();
            }
        }
        o
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn deploy_flags_become_overrides() {
        let cli = Cli::parse_from([
            "firebase-deploy",
            "deploy",
            "public",
            "--site",
            "my-site",
            "--token",
            "ya29.x",
            "-v",
        ]);
        let o = cli.overrides();
        assert_eq!(o.site.as_deref(), Some("my-site"));
        assert_eq!(o.public, Some(PathBuf::from("public")));
        assert_eq!(o.token.as_deref(), Some("ya29.x"));
        assert_eq!(o.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn explicit_log_level_beats_verbose() {
        let cli = Cli::parse_from(["firebase-deploy", "-v", "--log-level", "trace", "manifest"]);
        assert_eq!(cli.overrides().log_level.as_deref(), Some("trace"));
    }
}
