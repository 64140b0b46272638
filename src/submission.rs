use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink};
use crate::descriptor::{ProjectDescriptor, iso_timestamp};
use crate::domain::{FileRole, MAX_PROJECT_SEQUENCE, ProjectId};
use crate::error::{AtlasError, Rejection};
use crate::metadata::MetadataTable;
use crate::store::ObjectStore;

pub const REQUIRED_FILE_COUNT: usize = 4;
pub const MAX_TITLE_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Steps a submission walks through; reported to the progress sink as it
/// advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    AwaitingInputs,
    FilesIdentified,
    MetadataParsed,
    SchemaValid,
    IdentifierAssigned,
    DescriptorBuilt,
    Committed,
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionState::AwaitingInputs => "AwaitingInputs",
            SubmissionState::FilesIdentified => "FilesIdentified",
            SubmissionState::MetadataParsed => "MetadataParsed",
            SubmissionState::SchemaValid => "SchemaValid",
            SubmissionState::IdentifierAssigned => "IdentifierAssigned",
            SubmissionState::DescriptorBuilt => "DescriptorBuilt",
            SubmissionState::Committed => "Committed",
        };
        write!(f, "{name}")
    }
}

/// The four uploads, one per role.
#[derive(Debug, Clone, Copy)]
pub struct IdentifiedFiles<'a> {
    pub count: &'a UploadedFile,
    pub taxa: &'a UploadedFile,
    pub meta: &'a UploadedFile,
    pub asv: &'a UploadedFile,
}

impl<'a> IdentifiedFiles<'a> {
    pub fn get(&self, role: FileRole) -> Option<&'a UploadedFile> {
        match role {
            FileRole::Count => Some(self.count),
            FileRole::Taxa => Some(self.taxa),
            FileRole::Meta => Some(self.meta),
            FileRole::Asv => Some(self.asv),
            FileRole::Info => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub project_id: ProjectId,
    pub descriptor: ProjectDescriptor,
    pub objects: Vec<String>,
}

/// Check count and title before looking at file contents.
pub fn check_inputs(files: &[UploadedFile], title: &str) -> Result<(), Rejection> {
    if files.len() != REQUIRED_FILE_COUNT {
        return Err(Rejection::WrongFileCount {
            expected: REQUIRED_FILE_COUNT,
            found: files.len(),
        });
    }
    let title = title.trim();
    if title.is_empty() {
        return Err(Rejection::MissingTitle);
    }
    let length = title.chars().count();
    if length > MAX_TITLE_CHARS {
        return Err(Rejection::TitleTooLong {
            limit: MAX_TITLE_CHARS,
            found: length,
        });
    }
    Ok(())
}

/// Give each upload role the first unclaimed file whose name ends with the
/// role's suffix.
pub fn identify_files(files: &[UploadedFile]) -> Result<IdentifiedFiles<'_>, Rejection> {
    let mut claimed = HashSet::new();
    let mut resolved = Vec::with_capacity(FileRole::UPLOAD.len());
    let mut missing = Vec::new();

    for role in FileRole::UPLOAD {
        let found = files
            .iter()
            .enumerate()
            .find(|(index, file)| !claimed.contains(index) && role.matches_upload(&file.name));
        match found {
            Some((index, file)) => {
                claimed.insert(index);
                resolved.push(file);
            }
            None => missing.push(role.stored_suffix().to_string()),
        }
    }

    match resolved.as_slice() {
        [count, taxa, meta, asv] if missing.is_empty() => Ok(IdentifiedFiles {
            count: *count,
            taxa: *taxa,
            meta: *meta,
            asv: *asv,
        }),
        _ => Err(Rejection::MissingRole(missing)),
    }
}

/// First `PRJ###` not already used by a top-level folder, scanning up from 1.
///
/// Folder names are compared case-insensitively. This is a read of the
/// current listing only: nothing is reserved, so two submissions that list
/// the bucket at the same time can pick the same id and the later upload
/// overwrites the earlier one.
pub fn next_project_id(existing: &[String]) -> Result<ProjectId, AtlasError> {
    let used = existing
        .iter()
        .map(|name| name.trim_matches('/').to_uppercase())
        .collect::<HashSet<_>>();
    for sequence in 1..=MAX_PROJECT_SEQUENCE {
        let candidate = ProjectId::from_sequence(sequence)?;
        if !used.contains(candidate.as_str()) {
            return Ok(candidate);
        }
    }
    Err(AtlasError::IdentifierSpaceExhausted)
}

pub fn build_descriptor(
    title: &str,
    metadata: &MetadataTable,
    created_at: DateTime<Utc>,
) -> ProjectDescriptor {
    ProjectDescriptor {
        title: title.trim().to_string(),
        instrument: metadata.first_value("Instrument"),
        gene: metadata.first_value("Gene"),
        region: metadata.first_value("Region"),
        country: metadata.first_value("Country"),
        sample_type: metadata.first_value("SampleType"),
        samples: metadata.row_count() as u64,
        timestamp: iso_timestamp(created_at),
    }
}

/// Validate a dataset, assign it a project id and write its bundle.
///
/// Single pass, no retries. Uploads go out in bundle order with the
/// descriptor last; if one fails the objects already written stay in place.
pub fn submit<S: ObjectStore + ?Sized>(
    store: &S,
    bucket: &str,
    files: &[UploadedFile],
    title: &str,
    sink: &dyn ProgressSink,
) -> Result<SubmissionReceipt, AtlasError> {
    advance(sink, SubmissionState::AwaitingInputs, "checking file count and title");
    check_inputs(files, title)?;

    let identified = identify_files(files)?;
    advance(
        sink,
        SubmissionState::FilesIdentified,
        &format!(
            "count={} taxa={} meta={} asv={}",
            identified.count.name, identified.taxa.name, identified.meta.name, identified.asv.name
        ),
    );

    let metadata = MetadataTable::parse(&identified.meta.content)?;
    advance(
        sink,
        SubmissionState::MetadataParsed,
        &format!("{} samples", metadata.row_count()),
    );
    metadata.validate_schema()?;
    advance(sink, SubmissionState::SchemaValid, "all required columns present");

    let existing = store.list_top_level_folders(bucket)?;
    let project_id = next_project_id(&existing)?;
    advance(
        sink,
        SubmissionState::IdentifierAssigned,
        &format!("{project_id} ({} existing folders)", existing.len()),
    );

    let descriptor = build_descriptor(title, &metadata, Utc::now());
    let descriptor_bytes = descriptor.to_json_pretty()?;
    advance(sink, SubmissionState::DescriptorBuilt, &descriptor.title);

    let mut objects = Vec::with_capacity(FileRole::BUNDLE.len());
    for role in FileRole::BUNDLE {
        let content = match identified.get(role) {
            Some(file) => file.content.as_slice(),
            None => descriptor_bytes.as_slice(),
        };
        let key = project_id.object_key(role);
        store.put_object(bucket, &key, content, role.content_type())?;
        tracing::debug!(%key, bytes = content.len(), "uploaded object");
        objects.push(key);
    }

    advance(
        sink,
        SubmissionState::Committed,
        &format!("{} objects under {}", objects.len(), project_id.folder()),
    );
    tracing::info!(%project_id, samples = descriptor.samples, "submission committed");

    Ok(SubmissionReceipt {
        project_id,
        descriptor,
        objects,
    })
}

fn advance(sink: &dyn ProgressSink, state: SubmissionState, detail: &str) {
    sink.event(ProgressEvent {
        message: format!("phase={state}; {detail}"),
        elapsed: None,
    });
}
