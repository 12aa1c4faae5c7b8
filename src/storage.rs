//! Object storage access.
//!
//! Sources and outputs are addressed as [`Location`]s: a local directory, a
//! `file://` URL, or an `s3://` / `s3a://` bucket prefix. [`Storage`] wraps an
//! [`ObjectStore`] client rooted at that location; all reads, listings,
//! deletes and writes go through it, so the pipeline never touches the
//! filesystem or the network directly.
//!
//! S3 credentials are passed into the client builder from [`AwsConfig`]. When
//! none are configured the builder falls back to its own provider chain.

use crate::config::AwsConfig;
use crate::error::{EtlError, Result};
use futures::{StreamExt as _, TryStreamExt as _};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore, PutPayload};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Where a dataset lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Directory on the local filesystem
    Local(PathBuf),
    /// Prefix inside an S3 bucket; `prefix` has no leading or trailing `/`
    S3 { bucket: String, prefix: String },
}

impl Location {
    /// Parse a location string.
    ///
    /// `s3a://` is accepted as an alias of `s3://`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EtlError::InvalidLocation("empty location".to_owned()));
        }

        if let Some(rest) = s.strip_prefix("s3://").or_else(|| s.strip_prefix("s3a://")) {
            let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return Err(EtlError::InvalidLocation(format!("missing bucket in {s}")));
            }
            return Ok(Self::S3 {
                bucket: bucket.to_owned(),
                prefix: prefix.trim_matches('/').to_owned(),
            });
        }

        if let Some(path) = s.strip_prefix("file://") {
            return Ok(Self::Local(PathBuf::from(path)));
        }

        if let Some((scheme, _)) = s.split_once("://") {
            return Err(EtlError::InvalidLocation(format!(
                "unsupported scheme '{scheme}' in {s}"
            )));
        }

        Ok(Self::Local(PathBuf::from(s)))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::S3 { bucket, prefix } if prefix.is_empty() => write!(f, "s3://{bucket}"),
            Self::S3 { bucket, prefix } => write!(f, "s3://{bucket}/{prefix}"),
        }
    }
}

/// An object store client rooted at a location.
#[derive(Debug, Clone)]
pub struct Storage {
    store: Arc<dyn ObjectStore>,
    root: ObjectPath,
    label: String,
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl Storage {
    /// Wrap an existing client; `root` is prepended to every relative path.
    pub fn new(store: Arc<dyn ObjectStore>, root: ObjectPath, label: impl Into<String>) -> Self {
        Self {
            store,
            root,
            label: label.into(),
        }
    }

    /// Open a source location. Local directories must already exist.
    pub fn open_source(location: &Location, aws: &AwsConfig) -> Result<Self> {
        if let Location::Local(dir) = location
            && !dir.is_dir()
        {
            return Err(EtlError::MissingSource(dir.display().to_string()));
        }
        Self::open(location, aws)
    }

    /// Open an output location, creating a local directory when needed.
    pub fn open_sink(location: &Location, aws: &AwsConfig) -> Result<Self> {
        if let Location::Local(dir) = location {
            std::fs::create_dir_all(dir)?;
        }
        Self::open(location, aws)
    }

    fn open(location: &Location, aws: &AwsConfig) -> Result<Self> {
        let label = location.to_string();
        match location {
            Location::Local(dir) => {
                let store = LocalFileSystem::new_with_prefix(dir)?;
                Ok(Self::new(Arc::new(store), ObjectPath::default(), label))
            }
            Location::S3 { bucket, prefix } => {
                let mut builder = AmazonS3Builder::new()
                    .with_bucket_name(bucket)
                    .with_region(&aws.region);
                if let Some((key_id, secret)) = aws.credentials() {
                    builder = builder
                        .with_access_key_id(key_id)
                        .with_secret_access_key(secret);
                }
                let store = builder.build()?;
                Ok(Self::new(
                    Arc::new(store),
                    ObjectPath::from(prefix.as_str()),
                    label,
                ))
            }
        }
    }

    /// Absolute object path for a `/`-separated path relative to the root.
    pub fn path(&self, relative: &str) -> ObjectPath {
        let relative = ObjectPath::from(relative.trim_matches('/'));
        ObjectPath::from_iter(self.root.parts().chain(relative.parts()))
    }

    /// Every object under `prefix`, sorted by path.
    ///
    /// A prefix that does not exist yields an empty list.
    pub async fn list(&self, prefix: &ObjectPath) -> Result<Vec<ObjectMeta>> {
        let listed: std::result::Result<Vec<ObjectMeta>, object_store::Error> =
            self.store.list(Some(prefix)).try_collect().await;
        let mut objects = match listed {
            Ok(objects) => objects,
            Err(object_store::Error::NotFound { .. }) => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        objects.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(objects)
    }

    /// Objects making up one source dataset.
    ///
    /// Selects files exactly `depth` directories below `prefix` whose
    /// extension is `extension`, skipping hidden names (leading `.` or `_`).
    /// An empty selection is an error: the dataset does not exist.
    pub async fn list_dataset(
        &self,
        prefix: &str,
        depth: usize,
        extension: &str,
    ) -> Result<Vec<ObjectMeta>> {
        let dataset = self.path(prefix);
        let objects: Vec<ObjectMeta> = self
            .list(&dataset)
            .await?
            .into_iter()
            .filter(|meta| is_dataset_file(&meta.location, &dataset, depth, extension))
            .collect();

        if objects.is_empty() {
            return Err(EtlError::MissingSource(format!(
                "{}/{}",
                self.label.trim_end_matches('/'),
                prefix.trim_matches('/')
            )));
        }
        tracing::debug!("Found {} objects under {}", objects.len(), dataset);
        Ok(objects)
    }

    /// Fetch objects with up to `concurrency` requests in flight and map each
    /// body through `f`. Results keep the order of `objects`.
    pub async fn fetch_each<T, F>(
        &self,
        objects: &[ObjectMeta],
        concurrency: usize,
        f: F,
    ) -> Result<Vec<T>>
    where
        F: Fn(&ObjectPath, &[u8]) -> T,
    {
        let f = &f;
        futures::stream::iter(objects)
            .map(|meta| async move {
                let bytes = self.store.get(&meta.location).await?.bytes().await?;
                tracing::debug!("Read {} ({} bytes)", meta.location, bytes.len());
                Ok::<T, EtlError>(f(&meta.location, &bytes))
            })
            .buffered(concurrency.max(1))
            .try_collect()
            .await
    }

    /// Read one object in full.
    pub async fn read(&self, path: &ObjectPath) -> Result<Vec<u8>> {
        let bytes = self.store.get(path).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Write one object, replacing any previous content.
    pub async fn put(&self, path: &ObjectPath, bytes: Vec<u8>) -> Result<()> {
        self.store.put(path, PutPayload::from(bytes)).await?;
        Ok(())
    }

    /// Delete every object under `prefix`; returns how many were removed.
    pub async fn clear(&self, prefix: &ObjectPath) -> Result<usize> {
        let objects = self.list(prefix).await?;
        for meta in &objects {
            self.store.delete(&meta.location).await?;
        }
        Ok(objects.len())
    }
}

fn is_dataset_file(location: &ObjectPath, dataset: &ObjectPath, depth: usize, extension: &str) -> bool {
    let Some(parts) = location.prefix_match(dataset) else {
        return false;
    };
    if parts.count() != depth + 1 {
        return false;
    }
    let Some(name) = location.filename() else {
        return false;
    };
    if name.starts_with('.') || name.starts_with('_') {
        return false;
    }
    location
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}
