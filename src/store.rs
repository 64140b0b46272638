use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::io::{self, Write};
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::error::AtlasError;

/// The three object store operations the catalog, exporter and submission
/// pipeline depend on.
pub trait ObjectStore: Send + Sync {
    /// Immediate child "folders" of the bucket root, without the trailing `/`,
    /// in the backend's listing order.
    fn list_top_level_folders(&self, bucket: &str) -> Result<Vec<String>, AtlasError>;

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, AtlasError>;

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<(), AtlasError>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for Box<T> {
    fn list_top_level_folders(&self, bucket: &str) -> Result<Vec<String>, AtlasError> {
        (**self).list_top_level_folders(bucket)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, AtlasError> {
        (**self).get_object(bucket, key)
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<(), AtlasError> {
        (**self).put_object(bucket, key, content, content_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content: Vec<u8>,
    pub content_type: String,
}

/// In-process object store. Listing order is lexicographic, like S3.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    failing_keys: Mutex<HashSet<String>>,
    fail_listing: Mutex<bool>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bucket: &str, key: &str, content: impl Into<Vec<u8>>) {
        let mut guard = self.objects.lock().unwrap_or_else(|err| err.into_inner());
        guard.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                content: content.into(),
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        let guard = self.objects.lock().unwrap_or_else(|err| err.into_inner());
        guard.get(&(bucket.to_string(), key.to_string())).cloned()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let guard = self.objects.lock().unwrap_or_else(|err| err.into_inner());
        guard
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, key)| key.clone())
            .collect()
    }

    /// Make every get or put of `key` fail with a storage error.
    pub fn fail_on(&self, key: &str) {
        let mut guard = self.failing_keys.lock().unwrap_or_else(|err| err.into_inner());
        guard.insert(key.to_string());
    }

    pub fn fail_listing(&self) {
        let mut guard = self.fail_listing.lock().unwrap_or_else(|err| err.into_inner());
        *guard = true;
    }

    fn check_failure(&self, key: &str) -> Result<(), AtlasError> {
        let guard = self.failing_keys.lock().unwrap_or_else(|err| err.into_inner());
        if guard.contains(key) {
            return Err(AtlasError::Storage(format!("injected failure for {key}")));
        }
        Ok(())
    }
}

impl ObjectStore for MemoryObjectStore {
    fn list_top_level_folders(&self, bucket: &str) -> Result<Vec<String>, AtlasError> {
        if *self.fail_listing.lock().unwrap_or_else(|err| err.into_inner()) {
            return Err(AtlasError::Storage("injected listing failure".to_string()));
        }
        let guard = self.objects.lock().unwrap_or_else(|err| err.into_inner());
        let folders = guard
            .keys()
            .filter(|(b, _)| b == bucket)
            .filter_map(|(_, key)| key.split_once('/').map(|(folder, _)| folder.to_string()))
            .collect::<BTreeSet<_>>();
        Ok(folders.into_iter().collect())
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, AtlasError> {
        self.check_failure(key)?;
        let guard = self.objects.lock().unwrap_or_else(|err| err.into_inner());
        guard
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.content.clone())
            .ok_or_else(|| AtlasError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<(), AtlasError> {
        self.check_failure(key)?;
        let mut guard = self.objects.lock().unwrap_or_else(|err| err.into_inner());
        guard.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                content: content.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

/// Object store laid out on local disk as `{root}/{bucket}/{key}`.
///
/// Content types are not persisted; writes go through a temp file in the
/// target directory and are renamed into place.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: Utf8PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn bucket_root(&self, bucket: &str) -> Result<Utf8PathBuf, AtlasError> {
        validate_segment(bucket)?;
        Ok(self.root.join(bucket))
    }

    pub fn object_path(&self, bucket: &str, key: &str) -> Result<Utf8PathBuf, AtlasError> {
        let mut path = self.bucket_root(bucket)?;
        let segments = key.split('/').collect::<Vec<_>>();
        for segment in &segments {
            validate_segment(segment).map_err(|_| AtlasError::InvalidObjectKey(key.to_string()))?;
        }
        for segment in segments {
            path.push(segment);
        }
        Ok(path)
    }
}

impl ObjectStore for FsObjectStore {
    fn list_top_level_folders(&self, bucket: &str) -> Result<Vec<String>, AtlasError> {
        let bucket_root = self.bucket_root(bucket)?;
        // Nothing has been written yet.
        if !bucket_root.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(bucket_root.as_std_path())
            .map_err(|err| AtlasError::Storage(err.to_string()))?;
        let mut folders = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| AtlasError::Storage(err.to_string()))?;
            let is_dir = entry
                .file_type()
                .map_err(|err| AtlasError::Storage(err.to_string()))?
                .is_dir();
            if !is_dir {
                continue;
            }
            // An empty directory has no objects under it, so S3 would not list it.
            if fs::read_dir(entry.path())
                .map_err(|err| AtlasError::Storage(err.to_string()))?
                .next()
                .is_none()
            {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with(".tmp") {
                    folders.push(name.to_string());
                }
            }
        }
        folders.sort();
        Ok(folders)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, AtlasError> {
        let path = self.object_path(bucket, key)?;
        tracing::debug!(%path, "reading object");
        fs::read(path.as_std_path()).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => AtlasError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            _ => AtlasError::Storage(format!("read {path}: {err}")),
        })
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content: &[u8],
        _content_type: &str,
    ) -> Result<(), AtlasError> {
        let path = self.object_path(bucket, key)?;
        tracing::debug!(%path, bytes = content.len(), "writing object");
        write_bytes_atomic(&path, content)
    }
}

fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), AtlasError> {
    let parent = path
        .parent()
        .ok_or_else(|| AtlasError::Storage(format!("invalid destination path {path}")))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| AtlasError::Storage(err.to_string()))?;
    let mut temp = Builder::new()
        .prefix(".tmp-atlas")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| AtlasError::Storage(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| AtlasError::Storage(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| AtlasError::Storage(err.to_string()))?;
    Ok(())
}

fn validate_segment(segment: &str) -> Result<(), AtlasError> {
    let invalid = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('\\')
        || segment.contains('\0');
    if invalid {
        return Err(AtlasError::InvalidObjectKey(segment.to_string()));
    }
    Ok(())
}
