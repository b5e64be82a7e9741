// Manifest builder: walks the public directory and produces the two
// mappings the populateFiles/upload steps need.
//
// https://firebase.google.com/docs/hosting/api-deploy#specify-files

use crate::error::{DeployError, Result};
use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Files to deploy, keyed both by site path and by content hash.
#[derive(Debug, Default, Clone)]
pub struct FileSet {
    /// Site path (`/index.html`) to hash of the gzipped content.
    pub path_to_hash: BTreeMap<String, String>,
    /// Hash to gzipped bytes. Identical files share one entry.
    pub hash_to_bytes: HashMap<String, Vec<u8>>,
}

impl FileSet {
    /// Walk `root` recursively and gzip + hash every regular file in it.
    pub fn from_dir(root: &Path) -> Result<Self> {
        let meta = std::fs::metadata(root).map_err(|e| DeployError::io(root, e))?;
        if !meta.is_dir() {
            return Err(DeployError::NotADirectory(root.to_path_buf()));
        }

        let mut files = FileSet::default();
        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .min_depth(1);

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let bytes = std::fs::read(path).map_err(|e| DeployError::io(path, e))?;
            files.insert(site_path(root, path)?, &bytes)?;
        }

        debug!(
            files = files.len(),
            blobs = files.hash_to_bytes.len(),
            "Built deploy manifest"
        );
        Ok(files)
    }

    /// Add one file's raw content under `site_path`.
    pub fn insert(&mut self, site_path: String, content: &[u8]) -> Result<()> {
        let compressed = gzip(content).map_err(|e| DeployError::io(&site_path, e))?;
        let hash = content_hash(&compressed);
        self.path_to_hash.insert(site_path, hash.clone());
        self.hash_to_bytes.entry(hash).or_insert(compressed);
        Ok(())
    }

    /// Number of site paths in the manifest.
    pub fn len(&self) -> usize {
        self.path_to_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path_to_hash.is_empty()
    }

    pub fn blob(&self, hash: &str) -> Option<&[u8]> {
        self.hash_to_bytes.get(hash).map(Vec::as_slice)
    }

    pub fn total_compressed_bytes(&self) -> u64 {
        self.hash_to_bytes.values().map(|b| b.len() as u64).sum()
    }
}

/// `/`-rooted, `/`-separated path of `path` relative to `root`.
fn site_path(root: &Path, path: &Path) -> Result<String> {
    let rel = path.strip_prefix(root).map_err(|_| {
        DeployError::io(
            path,
            std::io::Error::other(format!("not under {}", root.display())),
        )
    })?;
    let parts = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<&str>>>()
        .ok_or_else(|| DeployError::NonUtf8Path(path.to_path_buf()))?;
    Ok(format!("/{}", parts.join("/")))
}

/// Gzip with a zeroed mtime so identical content always hashes the same.
pub fn gzip(content: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder: GzEncoder<Vec<u8>> =
        GzBuilder::new().mtime(0).write(Vec::new(), Compression::default());
    encoder.write_all(content)?;
    encoder.finish()
}

/// Lowercase hex SHA-256.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    fn create_site() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("index.html"), b"<h1>hi</h1>").unwrap();
        fs::write(root.join("404.html"), b"missing").unwrap();
        fs::create_dir_all(root.join("assets").join("css")).unwrap();
        fs::write(root.join("assets").join("css").join("site.css"), b"body{}").unwrap();
        fs::write(root.join("assets").join("copy.html"), b"<h1>hi</h1>").unwrap();
        dir
    }

    #[test]
    fn paths_are_relative_to_root() {
        let dir = create_site();
        let files = FileSet::from_dir(dir.path()).unwrap();

        let paths: Vec<&str> = files.path_to_hash.keys().map(String::as_str).collect();
        assert_eq!(
            paths,
            vec![
                "/404.html",
                "/assets/copy.html",
                "/assets/css/site.css",
                "/index.html"
            ]
        );
    }

    #[test]
    fn identical_content_shares_a_blob() {
        let dir = create_site();
        let files = FileSet::from_dir(dir.path()).unwrap();

        assert_eq!(files.len(), 4);
        assert_eq!(files.hash_to_bytes.len(), 3);
        assert_eq!(
            files.path_to_hash["/index.html"],
            files.path_to_hash["/assets/copy.html"]
        );
        for hash in files.path_to_hash.values() {
            assert!(files.blob(hash).is_some());
        }
    }

    #[test]
    fn hash_is_of_compressed_bytes() {
        let dir = create_site();
        let files = FileSet::from_dir(dir.path()).unwrap();

        let hash = &files.path_to_hash["/index.html"];
        let blob = files.blob(hash).unwrap();
        assert_eq!(&content_hash(blob), hash);
        assert_eq!(hash.len(), 64);

        let mut out = Vec::new();
        GzDecoder::new(blob).read_to_end(&mut out).unwrap();
        assert_eq!(out, b"<h1>hi</h1>");
    }

    #[test]
    fn hashing_is_stable_across_runs() {
        assert_eq!(
            content_hash(&gzip(b"same").unwrap()),
            content_hash(&gzip(b"same").unwrap())
        );
    }

    #[test]
    fn empty_dir_gives_empty_manifest() {
        let dir = TempDir::new().unwrap();
        let files = FileSet::from_dir(dir.path()).unwrap();
        assert!(files.is_empty());
        assert_eq!(files.total_compressed_bytes(), 0);
    }

    #[test]
    fn file_root_is_rejected() {
        let dir = create_site();
        let err = FileSet::from_dir(&dir.path().join("index.html")).unwrap_err();
        assert!(matches!(err, DeployError::NotADirectory(_)));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_file_name_is_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"bad\xffname.html")), b"x").unwrap();

        let err = FileSet::from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, DeployError::NonUtf8Path(_)));
    }

    #[test]
    fn missing_root_is_io_error() {
        let err = FileSet::from_dir(Path::new("/nonexistent/public/dir")).unwrap_err();
        assert!(matches!(err, DeployError::Io { .. }));
    }
}
