// The deploy flow: authenticate, create version, populate files, upload
// the blobs the server is missing, finalize, release. Each step runs only
// after the previous one succeeded; the first failure ends the deploy.

use crate::api::HostingApi;
use crate::credentials::mask_token;
use crate::error::{DeployError, Result, Step};
use crate::files::FileSet;
use std::path::Path;
use tracing::{info, instrument};

/// Receives progress notifications while a deploy runs. All methods have
/// empty defaults so callers only implement what they display.
pub trait DeployObserver {
    fn authenticated(&mut self, _masked_token: &str) {}
    fn version_created(&mut self, _version_id: &str) {}
    fn files_populated(&mut self, _file_count: usize, _upload_required: usize) {}
    fn file_uploaded(&mut self, _index: usize, _file_count: usize, _hash: &str) {}
    fn finalized(&mut self, _version_id: &str) {}
    fn released(&mut self, _domain: &str) {}
}

/// Observer that ignores every notification.
pub struct Silent;

impl DeployObserver for Silent {}

/// Summary of a successful deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub version_id: String,
    pub file_count: usize,
    pub uploaded: usize,
    pub domain: String,
    /// Release resource name, `sites/<site>/releases/<id>`.
    pub release: String,
}

pub struct Deployer<A: HostingApi> {
    api: A,
    site: String,
}

impl<A: HostingApi> Deployer<A> {
    /// `site` is the Hosting site name, the `site` in `site.web.app`.
    pub fn new(api: A, site: impl Into<String>) -> Self {
        Deployer {
            api,
            site: site.into(),
        }
    }

    pub fn into_api(self) -> A {
        self.api
    }

    pub fn is_valid(&self) -> bool {
        !self.site.trim().is_empty()
    }

    /// Build the manifest for `root` and push it as a new released version.
    #[instrument(skip(self, observer), fields(site = %self.site))]
    pub fn deploy(&mut self, root: &Path, observer: &mut dyn DeployObserver) -> Result<DeployReport> {
        if !self.is_valid() {
            return Err(DeployError::Config("site name is empty".into()));
        }

        let token = self.api.access_token()?;
        let masked = mask_token(&token);
        info!(token = %masked, "Authenticated");
        observer.authenticated(&masked);

        let version_id = self.api.create_version(&self.site)?;
        info!(%version_id, "Created version");
        observer.version_created(&version_id);

        let files = FileSet::from_dir(root)?;
        let populated = self
            .api
            .populate_files(&self.site, &version_id, &files.path_to_hash)?;
        let file_count = files.len();
        let required = populated.upload_required_hashes.len();
        info!(files = file_count, upload_required = required, "Populated files");
        observer.files_populated(file_count, required);

        let mut uploaded = 0;
        for hash in &populated.upload_required_hashes {
            let blob = files
                .blob(hash)
                .ok_or_else(|| DeployError::UnknownHash(Step::UploadFiles, hash.clone()))?;
            self.api.upload_file(&populated.upload_url, hash, blob)?;
            uploaded += 1;
            observer.file_uploaded(uploaded, file_count, hash);
        }
        info!(uploaded, "Uploaded files");

        self.api.finalize_version(&self.site, &version_id)?;
        info!(%version_id, "Finalized version");
        observer.finalized(&version_id);

        let release = self.api.release_version(&self.site, &version_id)?;
        let domain = format!("{}.web.app", self.site);
        info!(%domain, release = %release.name, "Released version");
        observer.released(&domain);

        Ok(DeployReport {
            version_id,
            file_count,
            uploaded,
            domain,
            release: release.name,
        })
    }
}
