// Library root
// -----------
// Deploys a static directory to Firebase Hosting. The binary (`main.rs`)
// wires these modules together; the deploy flow itself lives in `deploy`
// and only depends on the `HostingApi` trait, so it can run against a fake
// API in tests.
//
// Module responsibilities:
// - `files`: walk the directory, gzip and hash every file.
// - `credentials`: service-account key to bearer token.
// - `api`: blocking HTTP client for the Hosting REST endpoints.
// - `deploy`: the ordered create/populate/upload/finalize/release flow.
// - `config`, `logging`, `cli`, `ui`: the command-line shell around it.
pub mod api;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod deploy;
pub mod error;
pub mod files;
pub mod logging;
pub mod ui;

pub use api::{HostingApi, HostingClient};
pub use deploy::{DeployObserver, DeployReport, Deployer};
pub use error::{DeployError, Result};
pub use files::FileSet;
