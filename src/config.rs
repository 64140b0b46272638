use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::AtlasError;
use crate::s3_store::{S3ObjectStore, S3Settings};
use crate::store::{FsObjectStore, MemoryObjectStore, ObjectStore};

pub const DEFAULT_CONFIG_FILE: &str = "atlas.json";
pub const BUCKET_ENV: &str = "ATLAS_BUCKET";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub bucket: Option<String>,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    S3 {
        region: String,
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        access_key: Option<String>,
        #[serde(default)]
        secret_key: Option<String>,
        #[serde(default)]
        path_style: bool,
    },
    Fs {
        root: Utf8PathBuf,
    },
    Memory,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub bucket: String,
    pub storage: StorageConfig,
}

impl ResolvedConfig {
    pub fn open_store(&self) -> Result<Box<dyn ObjectStore>, AtlasError> {
        let store: Box<dyn ObjectStore> = match &self.storage {
            StorageConfig::S3 {
                region,
                endpoint,
                access_key,
                secret_key,
                path_style,
            } => Box::new(S3ObjectStore::new(&S3Settings {
                region: region.clone(),
                endpoint: endpoint.clone(),
                access_key: access_key.clone(),
                secret_key: secret_key.clone(),
                path_style: *path_style,
            })?),
            StorageConfig::Fs { root } => Box::new(FsObjectStore::new(root.clone())),
            StorageConfig::Memory => {
                tracing::warn!(
                    bucket = %self.bucket,
                    "memory backend selected; nothing written survives this process"
                );
                Box::new(MemoryObjectStore::new())
            }
        };
        Ok(store)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, AtlasError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(AtlasError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| AtlasError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| AtlasError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config, std::env::var(BUCKET_ENV).ok())
    }

    /// `bucket_override` (normally `ATLAS_BUCKET`) wins over the file.
    pub fn resolve_config(
        config: Config,
        bucket_override: Option<String>,
    ) -> Result<ResolvedConfig, AtlasError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let bucket = bucket_override
            .filter(|value| !value.trim().is_empty())
            .or(config.bucket)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AtlasError::ConfigParse("bucket name is required".to_string()))?;

        Ok(ResolvedConfig {
            schema_version,
            bucket,
            storage: config.storage,
        })
    }
}
