use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::AtlasError;

pub const DEFAULT_TITLE: &str = "Untitled";
pub const NOT_AVAILABLE: &str = "NA";

/// Summary document stored as `{id}/{id}_info.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    pub title: String,
    pub instrument: String,
    pub gene: String,
    pub region: String,
    pub country: String,
    pub sample_type: String,
    pub samples: u64,
    pub timestamp: String,
}

impl ProjectDescriptor {
    pub fn to_json_pretty(&self) -> Result<Vec<u8>, AtlasError> {
        serde_json::to_vec_pretty(self).map_err(|err| AtlasError::Descriptor(err.to_string()))
    }
}

/// Descriptor as read back from storage. Older or hand-written documents may
/// omit fields, so everything is optional and defaulted when mapped to a row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoredDescriptor {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub instrument: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub gene: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub sample_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub samples: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl StoredDescriptor {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(bytes)?;
        if !value.is_object() {
            return Err(serde::de::Error::custom("descriptor is not a JSON object"));
        }
        serde_json::from_value(value)
    }
}

/// Numbers and booleans in text fields are shown as written.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(other) => Err(D::Error::custom(format!("expected text, found {other}"))),
    }
}

/// Whole-number floats such as `5.0` count; fractions, negatives and strings do not.
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => {
            if let Some(count) = number.as_u64() {
                return Ok(Some(count));
            }
            match number.as_f64() {
                Some(value) if value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 => {
                    Ok(Some(value as u64))
                }
                _ => Err(D::Error::custom(format!("expected a sample count, found {number}"))),
            }
        }
        Some(other) => Err(D::Error::custom(format!("expected a sample count, found {other}"))),
    }
}

/// One line of the catalog, keyed by the column names shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRow {
    #[serde(rename = "Project ID")]
    pub project_id: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Gene")]
    pub gene: String,
    #[serde(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "Environment")]
    pub environment: String,
    #[serde(rename = "Samples")]
    pub samples: u64,
    #[serde(rename = "Uploaded")]
    pub uploaded: String,
}

impl CatalogRow {
    pub fn from_descriptor(project_id: &str, descriptor: StoredDescriptor) -> Self {
        Self {
            project_id: project_id.to_string(),
            title: descriptor
                .title
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            gene: or_na(descriptor.gene),
            platform: or_na(descriptor.instrument),
            environment: or_na(descriptor.sample_type),
            samples: descriptor.samples.unwrap_or(0),
            uploaded: or_na(descriptor.timestamp),
        }
    }
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// `2025-03-01T08:15:42.123456Z`
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
