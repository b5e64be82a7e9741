// API client module: a small blocking HTTP client for the Firebase
// Hosting REST API. Every call maps to one step of the deploy protocol
// and reports failures tagged with that step.
//
// https://firebase.google.com/docs/hosting/api-deploy

use crate::credentials::Credentials;
use crate::error::{ApiError, DeployError, Result, Step};
use reqwest::blocking::{Client, Request, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://firebasehosting.googleapis.com/v1beta1";

/// The Hosting operations the deploy flow needs. `HostingClient` talks to
/// the real service; tests substitute an in-memory implementation.
pub trait HostingApi {
    /// Bearer token used for the following requests.
    fn access_token(&mut self) -> Result<String>;

    /// Create a new version and return its id.
    fn create_version(&mut self, site: &str) -> Result<String>;

    fn populate_files(
        &mut self,
        site: &str,
        version_id: &str,
        files: &BTreeMap<String, String>,
    ) -> Result<PopulateFilesResponse>;

    fn upload_file(&mut self, upload_url: &str, hash: &str, gzipped: &[u8]) -> Result<()>;

    fn finalize_version(&mut self, site: &str, version_id: &str) -> Result<()>;

    fn release_version(&mut self, site: &str, version_id: &str) -> Result<Release>;
}

#[derive(Debug, Deserialize)]
struct Version {
    #[serde(default)]
    name: String,
}

#[derive(Serialize)]
struct PopulateFilesRequest<'a> {
    files: &'a BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulateFilesResponse {
    #[serde(default)]
    pub upload_required_hashes: Vec<String>,
    #[serde(default)]
    pub upload_url: String,
}

#[derive(Serialize)]
struct StatusUpdate<'a> {
    status: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub release_time: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ApiError,
}

/// Blocking client holding the HTTP connection pool, the API base URL and
/// the credentials used to mint bearer tokens.
pub struct HostingClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl HostingClient {
    pub fn new(client: Client, base_url: impl Into<String>, credentials: Credentials) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        HostingClient {
            client,
            base_url,
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn version_url(&self, site: &str, version_id: &str) -> String {
        format!("{}/sites/{}/versions/{}", self.base_url, site, version_id)
    }

    /// Authorization header map, built fresh so an expired token is
    /// refreshed before the request goes out.
    fn auth_headers(&mut self) -> Result<HeaderMap> {
        let token = self.credentials.token()?;
        let mut headers = HeaderMap::new();
        let val = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| DeployError::Credentials(format!("invalid access token: {}", e)))?;
        headers.insert(AUTHORIZATION, val);
        Ok(headers)
    }

    fn authorized(&mut self, req: RequestBuilder) -> Result<Request> {
        let headers = self.auth_headers()?;
        Ok(req.headers(headers).build()?)
    }

    fn execute<T: DeserializeOwned>(&mut self, step: Step, req: Request) -> Result<T> {
        let res = self.client.execute(req)?;
        parse_response(step, res)
    }

    pub fn create_version_request(&mut self, site: &str) -> Result<Request> {
        let url = format!("{}/sites/{}/versions", self.base_url, site);
        let req = self.client.post(&url).json(&serde_json::json!({}));
        self.authorized(req)
    }

    pub fn populate_files_request(
        &mut self,
        site: &str,
        version_id: &str,
        files: &BTreeMap<String, String>,
    ) -> Result<Request> {
        let url = format!("{}:populateFiles", self.version_url(site, version_id));
        let req = self.client.post(&url).json(&PopulateFilesRequest { files });
        self.authorized(req)
    }

    pub fn upload_file_request(
        &mut self,
        upload_url: &str,
        hash: &str,
        gzipped: &[u8],
    ) -> Result<Request> {
        let url = format!("{}/{}", upload_url.trim_end_matches('/'), hash);
        let req = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(gzipped.to_vec());
        self.authorized(req)
    }

    pub fn finalize_version_request(&mut self, site: &str, version_id: &str) -> Result<Request> {
        let url = self.version_url(site, version_id);
        let req = self
            .client
            .patch(&url)
            .query(&[("update_mask", "status")])
            .json(&StatusUpdate {
                status: "FINALIZED",
            });
        self.authorized(req)
    }

    pub fn release_version_request(&mut self, site: &str, version_id: &str) -> Result<Request> {
        let url = format!("{}/sites/{}/releases", self.base_url, site);
        let version_name = format!("sites/{}/versions/{}", site, version_id);
        let req = self
            .client
            .post(&url)
            .query(&[("versionName", version_name.as_str())])
            .json(&serde_json::json!({}));
        self.authorized(req)
    }
}

impl HostingApi for HostingClient {
    fn access_token(&mut self) -> Result<String> {
        self.credentials.token()
    }

    fn create_version(&mut self, site: &str) -> Result<String> {
        let req = self.create_version_request(site)?;
        let version: Version = self.execute(Step::CreateVersion, req)?;
        version_id_from_name(&version.name).ok_or_else(|| {
            DeployError::UnexpectedResponse(format!("version name '{}' has no id", version.name))
        })
    }

    fn populate_files(
        &mut self,
        site: &str,
        version_id: &str,
        files: &BTreeMap<String, String>,
    ) -> Result<PopulateFilesResponse> {
        let req = self.populate_files_request(site, version_id, files)?;
        self.execute(Step::PopulateFiles, req)
    }

    fn upload_file(&mut self, upload_url: &str, hash: &str, gzipped: &[u8]) -> Result<()> {
        let req = self.upload_file_request(upload_url, hash, gzipped)?;
        let _: serde_json::Value = self.execute(Step::UploadFiles, req)?;
        Ok(())
    }

    fn finalize_version(&mut self, site: &str, version_id: &str) -> Result<()> {
        let req = self.finalize_version_request(site, version_id)?;
        let _: serde_json::Value = self.execute(Step::FinalizeVersion, req)?;
        Ok(())
    }

    fn release_version(&mut self, site: &str, version_id: &str) -> Result<Release> {
        let req = self.release_version_request(site, version_id)?;
        self.execute(Step::Release, req)
    }
}

/// `sites/<site>/versions/<id>` -> `<id>`.
pub fn version_id_from_name(name: &str) -> Option<String> {
    name.rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn parse_response<T: DeserializeOwned>(step: Step, res: Response) -> Result<T> {
    let status = res.status();
    let body = res.text()?;
    debug!(%step, status = status.as_u16(), bytes = body.len(), "API response");
    if !status.is_success() {
        return Err(DeployError::Api {
            step,
            error: error_from_body(status, &body),
        });
    }
    decode_body(&body)
}

/// Successful bodies may be empty (blob uploads); treat that as `{}`.
fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    let body = if body.trim().is_empty() { "{}" } else { body };
    Ok(serde_json::from_str(body)?)
}

/// Error object from the body, or one synthesized from the HTTP status when
/// the body is empty or not the documented shape.
fn error_from_body(status: reqwest::StatusCode, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => ApiError {
            code: status.as_u16(),
            message: body.trim().to_string(),
            status: status
                .canonical_reason()
                .unwrap_or("UNKNOWN")
                .to_uppercase()
                .replace(' ', "_"),
        },
    }
}
