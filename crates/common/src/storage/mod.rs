//! Photo storage for uploaded recipe and step pictures
//!
//! Uploads of one request go to a private staging directory first, outside
//! the served photos tree. The batch is promoted into the public photos tree only once every database
//! row is in place, and discarded when the request fails, so a failed
//! creation does not leave orphaned files behind.

use crate::config::StorageConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

const STEPS_DIR: &str = "steps";
const MAX_FILE_NAME_LEN: usize = 100;

/// A file received from a multipart form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    /// Name the client sent; never trusted as a path
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Where in the photos tree an upload belongs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoKind {
    Main,
    Step,
}

impl PhotoKind {
    fn subdir(self) -> Option<&'static str> {
        match self {
            PhotoKind::Main => None,
            PhotoKind::Step => Some(STEPS_DIR),
        }
    }
}

/// Photos directory on disk plus the public prefix stored in the database
#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
    staging_root: PathBuf,
    public_path: String,
}

impl PhotoStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: PathBuf::from(&config.photos_dir),
            staging_root: config.staging_path(),
            public_path: config.public_path.trim_matches('/').to_string(),
        }
    }

    /// Directory photos are served from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory batches stage their uploads in
    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    /// Create the photos tree and the staging directory
    pub async fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.root.join(STEPS_DIR))
            .await
            .map_err(|e| storage_error("create", &self.root, e))?;
        fs::create_dir_all(&self.staging_root)
            .await
            .map_err(|e| storage_error("create", &self.staging_root, e))
    }

    /// Start a batch for one request
    pub fn begin(&self) -> PhotoBatch {
        let id = Uuid::new_v4().simple().to_string();

        PhotoBatch {
            store: self.clone(),
            staging: self.staging_root.join(&id),
            tag: id[..8].to_string(),
            stamp: Utc::now().timestamp_micros(),
            staged: Vec::new(),
            promoted: Vec::new(),
        }
    }

    fn public_url(&self, kind: PhotoKind, file_name: &str) -> String {
        [Some(self.public_path.as_str()), kind.subdir(), Some(file_name)]
            .into_iter()
            .flatten()
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn target_path(&self, kind: PhotoKind, file_name: &str) -> PathBuf {
        match kind.subdir() {
            Some(subdir) => self.root.join(subdir).join(file_name),
            None => self.root.join(file_name),
        }
    }
}

#[derive(Debug)]
struct StagedPhoto {
    staged: PathBuf,
    target: PathBuf,
}

/// Uploads of a single request, staged until the request succeeds
#[derive(Debug)]
pub struct PhotoBatch {
    store: PhotoStore,
    staging: PathBuf,
    /// Short batch id, keeps same-instant uploads of one name apart
    tag: String,
    stamp: i64,
    staged: Vec<StagedPhoto>,
    promoted: Vec<PathBuf>,
}

impl PhotoBatch {
    /// Write an upload to the staging area and return the path it will
    /// have once promoted, relative to the public prefix.
    pub async fn stage(&mut self, kind: PhotoKind, upload: PhotoUpload) -> Result<String> {
        // Index keeps two uploads with the same name apart
        let file_name = format!(
            "{}_{}_{}_{}",
            self.stamp,
            self.tag,
            self.staged.len(),
            sanitize_file_name(&upload.file_name)
        );

        fs::create_dir_all(&self.staging)
            .await
            .map_err(|e| storage_error("create", &self.staging, e))?;

        let staged = self.staging.join(&file_name);
        fs::write(&staged, &upload.bytes)
            .await
            .map_err(|e| storage_error("write", &staged, e))?;

        debug!(file = %file_name, bytes = upload.bytes.len(), "Photo staged");

        self.staged.push(StagedPhoto {
            staged,
            target: self.store.target_path(kind, &file_name),
        });

        Ok(self.store.public_url(kind, &file_name))
    }

    /// Number of staged uploads
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    /// Move every staged upload to its final path
    pub async fn promote(&mut self) -> Result<()> {
        for photo in self.staged.drain(..) {
            if let Some(parent) = photo.target.parent() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| storage_error("create", parent, e))?;
            }

            fs::rename(&photo.staged, &photo.target)
                .await
                .map_err(|e| storage_error("move", &photo.target, e))?;

            self.promoted.push(photo.target);
        }

        self.remove_staging().await;
        Ok(())
    }

    /// Drop the staging area once the request has succeeded
    pub async fn finish(self) {
        self.remove_staging().await;
        metrics::record_photos_stored(self.promoted.len());
    }

    /// Remove everything this batch wrote, staged or promoted
    pub async fn discard(self) {
        self.remove_staging().await;

        for path in &self.promoted {
            if let Err(e) = fs::remove_file(path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove promoted photo");
            }
        }
    }

    async fn remove_staging(&self) {
        match fs::remove_dir_all(&self.staging).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.staging.display(), error = %e, "Failed to remove staging directory");
            }
        }
    }
}

fn storage_error(action: &str, path: &Path, err: std::io::Error) -> AppError {
    AppError::Storage {
        message: format!("Failed to {} {}: {}", action, path.display(), err),
    }
}

/// Reduce a client-supplied file name to a safe single path component
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        return "photo".to_string();
    }

    // Keep the tail so the extension survives truncation
    let skip = cleaned.len().saturating_sub(MAX_FILE_NAME_LEN);
    cleaned[skip..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> PhotoStore {
        PhotoStore::new(&StorageConfig::rooted_at(dir.join("photos")))
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("soup.jpg"), "soup.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\pics\\my soup.png"), "my_soup.png");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "photo");
        assert_eq!(sanitize_file_name("tomate-ñ.jpg"), "tomate-_.jpg");

        let long = format!("{}.jpg", "a".repeat(300));
        let cleaned = sanitize_file_name(&long);
        assert_eq!(cleaned.len(), MAX_FILE_NAME_LEN);
        assert!(cleaned.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_stage_then_promote() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.ensure_dirs().await.unwrap();

        let mut batch = store.begin();
        let main = batch
            .stage(PhotoKind::Main, PhotoUpload::new("soup.jpg", b"main".to_vec()))
            .await
            .unwrap();
        let step = batch
            .stage(PhotoKind::Step, PhotoUpload::new("soup.jpg", b"step".to_vec()))
            .await
            .unwrap();

        assert!(main.starts_with("photos/"));
        assert!(main.ends_with("_0_soup.jpg"));
        assert!(step.starts_with("photos/steps/"));
        assert!(step.ends_with("_1_soup.jpg"));

        // Nothing public before promotion
        let main_path = dir.path().join(&main);
        assert!(!main_path.exists());

        batch.promote().await.unwrap();
        batch.finish().await;

        assert_eq!(std::fs::read(&main_path).unwrap(), b"main");
        assert_eq!(std::fs::read(dir.path().join(&step)).unwrap(), b"step");
        assert!(!store.staging_root().read_dir().unwrap().any(|_| true));
    }

    #[tokio::test]
    async fn test_staging_is_outside_served_tree() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.ensure_dirs().await.unwrap();

        let mut batch = store.begin();
        batch
            .stage(PhotoKind::Main, PhotoUpload::new("soup.jpg", b"raw".to_vec()))
            .await
            .unwrap();

        assert!(batch.staging.starts_with(dir.path().join(".photos-staging")));
        assert!(!batch.staging.starts_with(store.root()));

        let served: Vec<_> = std::fs::read_dir(store.root())
            .unwrap()
            .flatten()
            .map(|entry| entry.file_name())
            .collect();
        assert_eq!(served, vec![std::ffi::OsString::from(STEPS_DIR)]);

        batch.discard().await;
    }

    #[tokio::test]
    async fn test_same_name_in_parallel_batches() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let mut first = store.begin();
        let mut second = store.begin();
        // Same microsecond as far as file names go
        second.stamp = first.stamp;

        let a = first
            .stage(PhotoKind::Main, PhotoUpload::new("soup.jpg", b"first".to_vec()))
            .await
            .unwrap();
        let b = second
            .stage(PhotoKind::Main, PhotoUpload::new("soup.jpg", b"second".to_vec()))
            .await
            .unwrap();
        assert_ne!(a, b);

        first.promote().await.unwrap();
        first.finish().await;
        second.promote().await.unwrap();
        second.discard().await;

        assert_eq!(std::fs::read(dir.path().join(&a)).unwrap(), b"first");
        assert!(!dir.path().join(&b).exists());
    }

    #[tokio::test]
    async fn test_discard_before_promotion() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let mut batch = store.begin();
        let staging = batch.staging.clone();
        batch
            .stage(PhotoKind::Main, PhotoUpload::new("a.png", vec![1, 2, 3]))
            .await
            .unwrap();
        assert!(staging.exists());

        batch.discard().await;
        assert!(!staging.exists());
    }

    #[tokio::test]
    async fn test_discard_after_promotion_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let mut batch = store.begin();
        let url = batch
            .stage(PhotoKind::Step, PhotoUpload::new("b.png", vec![9]))
            .await
            .unwrap();
        batch.promote().await.unwrap();

        let path = dir.path().join(&url);
        assert!(path.exists());

        batch.discard().await;
        assert!(!path.exists());
    }

    #[test]
    fn test_public_url_without_prefix() {
        let store = PhotoStore::new(&StorageConfig {
            photos_dir: "/srv/photos".into(),
            public_path: "/".into(),
            staging_dir: None,
        });
        assert_eq!(store.public_url(PhotoKind::Step, "x.jpg"), "steps/x.jpg");
        assert_eq!(store.target_path(PhotoKind::Main, "x.jpg"), PathBuf::from("/srv/photos/x.jpg"));
    }
}
