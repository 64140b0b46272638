use std::collections::HashSet;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::domain::{FileRole, file_name, object_key};
use crate::error::AtlasError;
use crate::store::ObjectStore;

pub const ARCHIVE_FILE_NAME: &str = "microbiome_datasets.zip";
pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// Zip the five bundle files of every selected project.
///
/// Entries are written as `{id}/{id}_{role}.{ext}` in selection order with a
/// fixed timestamp, so the same selection over the same storage state yields
/// the same bytes. Any fetch failure aborts the whole archive.
pub fn build_archive<S: ObjectStore + ?Sized>(
    store: &S,
    bucket: &str,
    selection: &[String],
) -> Result<Vec<u8>, AtlasError> {
    let projects = selected_projects(selection);
    if projects.is_empty() {
        return Err(AtlasError::EmptySelection);
    }

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for project in &projects {
        for role in FileRole::BUNDLE {
            let key = object_key(project, role);
            let content = store.get_object(bucket, &key)?;
            let entry = format!("{project}/{}", file_name(project, role));
            writer
                .start_file(entry, options)
                .map_err(|err| AtlasError::Archive(err.to_string()))?;
            writer
                .write_all(&content)
                .map_err(|err| AtlasError::Archive(err.to_string()))?;
        }
        tracing::debug!(project = %project, "added bundle to archive");
    }

    let cursor = writer
        .finish()
        .map_err(|err| AtlasError::Archive(err.to_string()))?;
    Ok(cursor.into_inner())
}

/// Trimmed, non-empty project names in first-occurrence order.
pub fn selected_projects(selection: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    selection
        .iter()
        .map(|project| project.trim())
        .filter(|project| !project.is_empty())
        .filter(|project| seen.insert(*project))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_keeps_first_occurrence() {
        let selection = vec![
            "PRJ002".to_string(),
            "PRJ001".to_string(),
            "PRJ002".to_string(),
            " ".to_string(),
        ];
        assert_eq!(selected_projects(&selection), vec!["PRJ002", "PRJ001"]);
    }
}
