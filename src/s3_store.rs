use s3::creds::Credentials;
use s3::{Bucket, Region};

use crate::error::AtlasError;
use crate::store::ObjectStore;

#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub path_style: bool,
}

/// S3 (or S3-compatible) object store using the blocking `rust-s3` client.
#[derive(Clone)]
pub struct S3ObjectStore {
    region: Region,
    credentials: Credentials,
    path_style: bool,
}

impl S3ObjectStore {
    /// Credentials missing from `settings` are resolved from the usual AWS
    /// environment variables and profile files.
    pub fn new(settings: &S3Settings) -> Result<Self, AtlasError> {
        let region = match &settings.endpoint {
            Some(endpoint) => Region::Custom {
                region: settings.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => settings
                .region
                .parse::<Region>()
                .map_err(|err| AtlasError::ConfigParse(format!("invalid S3 region: {err}")))?,
        };
        let credentials = Credentials::new(
            settings.access_key.as_deref(),
            settings.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|err| AtlasError::Storage(format!("S3 credentials: {err}")))?;

        Ok(Self {
            region,
            credentials,
            path_style: settings.path_style,
        })
    }

    fn bucket(&self, name: &str) -> Result<Box<Bucket>, AtlasError> {
        let bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())
            .map_err(|err| AtlasError::Storage(err.to_string()))?;
        Ok(if self.path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }
}

impl ObjectStore for S3ObjectStore {
    fn list_top_level_folders(&self, bucket: &str) -> Result<Vec<String>, AtlasError> {
        let pages = self
            .bucket(bucket)?
            .list(String::new(), Some("/".to_string()))
            .map_err(|err| AtlasError::Storage(format!("list {bucket}: {err}")))?;
        let folders = pages
            .into_iter()
            .flat_map(|page| page.common_prefixes.unwrap_or_default())
            .map(|prefix| prefix.prefix.trim_matches('/').to_string())
            .filter(|name| !name.is_empty())
            .collect();
        Ok(folders)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, AtlasError> {
        let response = self
            .bucket(bucket)?
            .get_object(key)
            .map_err(|err| AtlasError::Storage(format!("get {key}: {err}")))?;
        match response.status_code() {
            200..=299 => Ok(response.bytes().to_vec()),
            404 => Err(AtlasError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            status => Err(AtlasError::Storage(format!(
                "get {key}: S3 returned status {status}"
            ))),
        }
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<(), AtlasError> {
        let response = self
            .bucket(bucket)?
            .put_object_with_content_type(key, content, content_type)
            .map_err(|err| AtlasError::Storage(format!("put {key}: {err}")))?;
        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(AtlasError::Storage(format!(
                "put {key}: S3 returned status {status}"
            )));
        }
        Ok(())
    }
}
