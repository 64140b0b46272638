use std::collections::BTreeSet;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::descriptor::{CatalogRow, StoredDescriptor};
use crate::domain::{FileRole, object_key};
use crate::error::AtlasError;
use crate::store::ObjectStore;

/// Outcome of reading one project folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEntry {
    Row(CatalogRow),
    Skipped { project: String, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    pub rows: Vec<CatalogRow>,
    /// Projects left out because their descriptor could not be read. Not
    /// shown to end users.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedProject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedProject {
    pub project: String,
    pub reason: String,
}

impl Catalog {
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        let mut catalog = Catalog::default();
        for entry in entries {
            match entry {
                CatalogEntry::Row(row) => catalog.rows.push(row),
                CatalogEntry::Skipped { project, reason } => {
                    catalog.skipped.push(SkippedProject { project, reason })
                }
            }
        }
        catalog
    }

    pub fn project_ids(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.project_id.as_str()).collect()
    }

    pub fn filter(&self, filter: &CatalogFilter) -> Vec<&CatalogRow> {
        self.rows.iter().filter(|row| filter.matches(row)).collect()
    }

    /// Sorted distinct values of a filterable column.
    pub fn distinct_values(&self, column: FilterColumn) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| column.value(row).to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Read every project folder's descriptor, in listing order.
///
/// Only a failure of the top-level listing is an error; a project whose
/// descriptor is missing, unreadable or malformed comes back as
/// [`CatalogEntry::Skipped`].
pub fn aggregate<S: ObjectStore + ?Sized>(
    store: &S,
    bucket: &str,
) -> Result<Vec<CatalogEntry>, AtlasError> {
    let folders = store.list_top_level_folders(bucket)?;
    tracing::debug!(bucket, folders = folders.len(), "listed project folders");

    let entries = folders
        .iter()
        .map(|project| read_entry(store, bucket, project))
        .collect::<Vec<_>>();
    Ok(entries)
}

fn read_entry<S: ObjectStore + ?Sized>(store: &S, bucket: &str, project: &str) -> CatalogEntry {
    let key = object_key(project, FileRole::Info);
    let parsed = store
        .get_object(bucket, &key)
        .map_err(|err| err.to_string())
        .and_then(|bytes| {
            StoredDescriptor::from_slice(&bytes)
                .map_err(|err| format!("malformed descriptor {key}: {err}"))
        });
    match parsed {
        Ok(descriptor) => CatalogEntry::Row(CatalogRow::from_descriptor(project, descriptor)),
        Err(reason) => {
            tracing::warn!(project, %reason, "skipping project");
            CatalogEntry::Skipped {
                project: project.to_string(),
                reason,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FilterColumn {
    Gene,
    Platform,
    Environment,
}

impl FilterColumn {
    pub fn value(self, row: &CatalogRow) -> &str {
        match self {
            FilterColumn::Gene => &row.gene,
            FilterColumn::Platform => &row.platform,
            FilterColumn::Environment => &row.environment,
        }
    }
}

impl fmt::Display for FilterColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterColumn::Gene => write!(f, "Gene"),
            FilterColumn::Platform => write!(f, "Platform"),
            FilterColumn::Environment => write!(f, "Environment"),
        }
    }
}

/// Exact-match filters; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFilter {
    pub gene: Option<String>,
    pub platform: Option<String>,
    pub environment: Option<String>,
}

impl CatalogFilter {
    pub fn is_empty(&self) -> bool {
        self.gene.is_none() && self.platform.is_none() && self.environment.is_none()
    }

    pub fn matches(&self, row: &CatalogRow) -> bool {
        [
            (FilterColumn::Gene, &self.gene),
            (FilterColumn::Platform, &self.platform),
            (FilterColumn::Environment, &self.environment),
        ]
        .into_iter()
        .all(|(column, wanted)| {
            wanted
                .as_deref()
                .is_none_or(|wanted| column.value(row) == wanted)
        })
    }
}
