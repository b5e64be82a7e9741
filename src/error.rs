// Error types shared by the library. The binary wraps these in
// `anyhow` at the top level; everything below `main` returns
// `Result<_, DeployError>`.

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The protocol step an API failure happened in. The display form is the
/// tag printed in front of the server's error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CreateVersion,
    PopulateFiles,
    UploadFiles,
    FinalizeVersion,
    Release,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Step::CreateVersion => "failed_to_create_version",
            Step::PopulateFiles => "failed_to_populate_files",
            Step::UploadFiles => "failed_to_upload_files",
            Step::FinalizeVersion => "failed_to_finalize_version",
            Step::Release => "failed_to_deploy_version",
        };
        f.write_str(tag)
    }
}

/// Error object returned by the Hosting API inside `{"error": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}] {}", self.code, self.status, self.message)
    }
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("File name is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),

    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Token signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("[{step}] {error}")]
    Api { step: Step, error: ApiError },

    #[error("[{0}] server requested unknown hash {1}")]
    UnknownHash(Step, String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl DeployError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DeployError::Io {
            path: path.into(),
            source,
        }
    }

    /// The step tag for failures that came back from the API.
    pub fn step(&self) -> Option<Step> {
        match self {
            DeployError::Api { step, .. } | DeployError::UnknownHash(step, _) => Some(*step),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_matches_cli_format() {
        let err = DeployError::Api {
            step: Step::PopulateFiles,
            error: ApiError {
                code: 403,
                message: "The caller does not have permission".into(),
                status: "PERMISSION_DENIED".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "[failed_to_populate_files] [403 PERMISSION_DENIED] The caller does not have permission"
        );
        assert_eq!(err.step(), Some(Step::PopulateFiles));
    }

    #[test]
    fn release_step_uses_deploy_tag() {
        assert_eq!(Step::Release.to_string(), "failed_to_deploy_version");
    }
}
