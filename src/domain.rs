use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AtlasError;

pub const PROJECT_ID_PREFIX: &str = "PRJ";
pub const MAX_PROJECT_SEQUENCE: u32 = 999;

/// `PRJ` followed by a zero-padded three digit sequence, `PRJ001..=PRJ999`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    pub fn from_sequence(sequence: u32) -> Result<Self, AtlasError> {
        if sequence > MAX_PROJECT_SEQUENCE {
            return Err(AtlasError::IdentifierSpaceExhausted);
        }
        if sequence == 0 {
            return Err(AtlasError::InvalidProjectId(format!(
                "{PROJECT_ID_PREFIX}{sequence:03}"
            )));
        }
        Ok(Self(format!("{PROJECT_ID_PREFIX}{sequence:03}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn sequence(&self) -> u32 {
        self.0[PROJECT_ID_PREFIX.len()..].parse().unwrap_or(0)
    }

    /// Storage folder holding the bundle, with trailing slash.
    pub fn folder(&self) -> String {
        format!("{}/", self.0)
    }

    pub fn file_name(&self, role: FileRole) -> String {
        file_name(self.as_str(), role)
    }

    pub fn object_key(&self, role: FileRole) -> String {
        object_key(self.as_str(), role)
    }

    pub fn bundle_file_names(&self) -> Vec<String> {
        bundle_file_names(self.as_str())
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectId {
    type Err = AtlasError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        let digits = normalized
            .strip_prefix(PROJECT_ID_PREFIX)
            .ok_or_else(|| AtlasError::InvalidProjectId(value.to_string()))?;
        let is_valid = digits.len() == 3 && digits.chars().all(|ch| ch.is_ascii_digit());
        if !is_valid || digits == "000" {
            return Err(AtlasError::InvalidProjectId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

impl TryFrom<String> for ProjectId {
    type Error = AtlasError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProjectId> for String {
    fn from(value: ProjectId) -> Self {
        value.0
    }
}

/// One file of a project bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    Count,
    Taxa,
    Meta,
    Asv,
    Info,
}

impl FileRole {
    pub const BUNDLE: [FileRole; 5] = [
        FileRole::Count,
        FileRole::Taxa,
        FileRole::Meta,
        FileRole::Asv,
        FileRole::Info,
    ];

    /// Roles a submitter uploads; `Info` is derived.
    pub const UPLOAD: [FileRole; 4] = [
        FileRole::Count,
        FileRole::Taxa,
        FileRole::Meta,
        FileRole::Asv,
    ];

    /// Filename suffix used to recognise an uploaded file.
    pub fn upload_suffix(self) -> &'static str {
        match self {
            FileRole::Count => "count.csv",
            FileRole::Taxa => "taxa.csv",
            FileRole::Meta => "meta.csv",
            FileRole::Asv => ".fasta",
            FileRole::Info => "info.json",
        }
    }

    pub fn stored_suffix(self) -> &'static str {
        match self {
            FileRole::Count => "count.csv",
            FileRole::Taxa => "taxa.csv",
            FileRole::Meta => "meta.csv",
            FileRole::Asv => "asv.fasta",
            FileRole::Info => "info.json",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            FileRole::Count | FileRole::Taxa | FileRole::Meta => "text/csv",
            FileRole::Asv => "text/x-fasta",
            FileRole::Info => "application/json",
        }
    }

    pub fn matches_upload(self, file_name: &str) -> bool {
        file_name.ends_with(self.upload_suffix())
    }
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stored_suffix())
    }
}

/// `{project}_{role}.{ext}`. Catalog folders are not required to be `PRJ###`,
/// so the naming works on any folder name.
pub fn file_name(project: &str, role: FileRole) -> String {
    format!("{project}_{}", role.stored_suffix())
}

pub fn object_key(project: &str, role: FileRole) -> String {
    format!("{project}/{}", file_name(project, role))
}

/// The five canonical bundle files in export order.
pub fn bundle_file_names(project: &str) -> Vec<String> {
    FileRole::BUNDLE
        .iter()
        .map(|role| file_name(project, *role))
        .collect()
}
