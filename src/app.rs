use std::time::{Duration, Instant};

use serde::Serialize;

use crate::catalog::{self, Catalog, CatalogFilter, FilterColumn};
use crate::descriptor::CatalogRow;
use crate::domain::FileRole;
use crate::error::AtlasError;
use crate::export;
use crate::store::ObjectStore;
use crate::submission::{self, SubmissionReceipt, UploadedFile};

#[derive(Debug, Clone, Serialize)]
pub struct CatalogResult {
    pub bucket: String,
    pub total: usize,
    pub filter: CatalogFilter,
    pub rows: Vec<CatalogRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<catalog::SkippedProject>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValuesResult {
    pub column: FilterColumn,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub projects: Vec<String>,
    pub entries: usize,
    pub size_bytes: usize,
    pub content_type: String,
    pub output: Option<String>,
    #[serde(skip)]
    pub archive: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Entry point for the three portal flows over one bucket.
#[derive(Clone)]
pub struct App<S: ObjectStore> {
    store: S,
    bucket: String,
}

impl<S: ObjectStore> App<S> {
    pub fn new(store: S, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn catalog(&self, sink: &dyn ProgressSink) -> Result<Catalog, AtlasError> {
        let started = Instant::now();
        sink.event(ProgressEvent {
            message: format!("phase=List; listing projects in {}", self.bucket),
            elapsed: None,
        });
        let entries = catalog::aggregate(&self.store, &self.bucket)?;
        let catalog = Catalog::from_entries(entries);
        sink.event(ProgressEvent {
            message: format!(
                "phase=Fetch; {} projects, {} skipped",
                catalog.rows.len(),
                catalog.skipped.len()
            ),
            elapsed: Some(started.elapsed()),
        });
        tracing::info!(
            bucket = %self.bucket,
            projects = catalog.rows.len(),
            skipped = catalog.skipped.len(),
            "catalog aggregated"
        );
        Ok(catalog)
    }

    pub fn filtered_catalog(
        &self,
        filter: CatalogFilter,
        sink: &dyn ProgressSink,
    ) -> Result<CatalogResult, AtlasError> {
        let catalog = self.catalog(sink)?;
        let rows = catalog.filter(&filter).into_iter().cloned().collect();
        Ok(CatalogResult {
            bucket: self.bucket.clone(),
            total: catalog.rows.len(),
            filter,
            rows,
            skipped: catalog.skipped,
        })
    }

    pub fn values(
        &self,
        column: FilterColumn,
        sink: &dyn ProgressSink,
    ) -> Result<ValuesResult, AtlasError> {
        let catalog = self.catalog(sink)?;
        Ok(ValuesResult {
            column,
            values: catalog.distinct_values(column),
        })
    }

    pub fn export(
        &self,
        selection: &[String],
        sink: &dyn ProgressSink,
    ) -> Result<ExportResult, AtlasError> {
        let started = Instant::now();
        sink.event(ProgressEvent {
            message: format!("phase=Fetch; bundling {} projects", selection.len()),
            elapsed: None,
        });
        let archive = export::build_archive(&self.store, &self.bucket, selection)?;
        let projects = export::selected_projects(selection)
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let entries = projects.len() * FileRole::BUNDLE.len();
        sink.event(ProgressEvent {
            message: format!("phase=Archive; {entries} entries, {} bytes", archive.len()),
            elapsed: Some(started.elapsed()),
        });
        tracing::info!(projects = projects.len(), bytes = archive.len(), "archive built");
        Ok(ExportResult {
            projects,
            entries,
            size_bytes: archive.len(),
            content_type: export::ARCHIVE_CONTENT_TYPE.to_string(),
            output: None,
            archive,
        })
    }

    pub fn submit(
        &self,
        files: &[UploadedFile],
        title: &str,
        sink: &dyn ProgressSink,
    ) -> Result<SubmissionReceipt, AtlasError> {
        let result = submission::submit(&self.store, &self.bucket, files, title, sink);
        if let Err(AtlasError::Rejected(reason)) = &result {
            tracing::info!(%reason, "submission rejected");
        }
        result
    }
}
