use std::sync::Mutex;

use assert_matches::assert_matches;

use microbiome_atlas::app::{ProgressEvent, ProgressSink};
use microbiome_atlas::catalog::{Catalog, aggregate};
use microbiome_atlas::descriptor::ProjectDescriptor;
use microbiome_atlas::error::{AtlasError, Rejection};
use microbiome_atlas::metadata::REQUIRED_COLUMNS;
use microbiome_atlas::output::JsonOutput;
use microbiome_atlas::store::MemoryObjectStore;
use microbiome_atlas::submission::{UploadedFile, submit};

const BUCKET: &str = "atlas";

#[derive(Default)]
struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.lock().unwrap().push(event.message);
    }
}

fn metadata_csv(rows: usize, columns: &[&str]) -> String {
    let mut csv = columns.join(",");
    csv.push('\n');
    for index in 0..rows {
        let cells = columns
            .iter()
            .map(|column| match *column {
                "#SampleID" => format!("S{index}"),
                "Instrument" => "Illumina MiSeq".to_string(),
                "Gene" => "16S".to_string(),
                "Region" => "V4".to_string(),
                "SampleType" => "Mangrove sediment".to_string(),
                "Country" => "India".to_string(),
                _ => "x".to_string(),
            })
            .collect::<Vec<_>>();
        csv.push_str(&cells.join(","));
        csv.push('\n');
    }
    csv
}

fn upload(meta: String) -> Vec<UploadedFile> {
    vec![
        UploadedFile::new("mangrove_count.csv", "ASV,S0\nasv1,10\n"),
        UploadedFile::new("mangrove_taxa.csv", "ASV,Kingdom\nasv1,Bacteria\n"),
        UploadedFile::new("mangrove_meta.csv", meta),
        UploadedFile::new("mangrove_asv.fasta", ">asv1\nACGT\n"),
    ]
}

fn valid_upload(rows: usize) -> Vec<UploadedFile> {
    upload(metadata_csv(rows, &REQUIRED_COLUMNS))
}

#[test]
fn submission_round_trips_into_catalog() {
    let store = MemoryObjectStore::new();
    let receipt = submit(&store, BUCKET, &valid_upload(5), "Test", &JsonOutput).unwrap();
    assert_eq!(receipt.project_id.as_str(), "PRJ001");
    assert_eq!(receipt.descriptor.samples, 5);

    let catalog = Catalog::from_entries(aggregate(&store, BUCKET).unwrap());
    assert_eq!(catalog.rows.len(), 1);
    let row = &catalog.rows[0];
    assert_eq!(row.project_id, "PRJ001");
    assert_eq!(row.title, "Test");
    assert_eq!(row.samples, 5);
    assert_eq!(row.gene, "16S");
    assert_eq!(row.platform, "Illumina MiSeq");
    assert_eq!(row.environment, "Mangrove sediment");
}

#[test]
fn writes_all_five_objects_with_content_types() {
    let store = MemoryObjectStore::new();
    let receipt = submit(&store, BUCKET, &valid_upload(2), "Mangrove", &JsonOutput).unwrap();
    assert_eq!(
        store.keys(BUCKET),
        vec![
            "PRJ001/PRJ001_asv.fasta",
            "PRJ001/PRJ001_count.csv",
            "PRJ001/PRJ001_info.json",
            "PRJ001/PRJ001_meta.csv",
            "PRJ001/PRJ001_taxa.csv",
        ]
    );
    assert_eq!(receipt.objects.last().unwrap(), "PRJ001/PRJ001_info.json");

    let info = store.object(BUCKET, "PRJ001/PRJ001_info.json").unwrap();
    assert_eq!(info.content_type, "application/json");
    let stored: ProjectDescriptor = serde_json::from_slice(&info.content).unwrap();
    assert_eq!(stored, receipt.descriptor);
    assert_eq!(stored.region, "V4");
    assert_eq!(stored.country, "India");
    assert!(stored.timestamp.ends_with('Z'));

    let count = store.object(BUCKET, "PRJ001/PRJ001_count.csv").unwrap();
    assert_eq!(count.content, b"ASV,S0\nasv1,10\n");
    assert_eq!(count.content_type, "text/csv");
}

#[test]
fn assigns_first_unused_id_case_insensitively() {
    let store = MemoryObjectStore::new();
    store.insert(BUCKET, "PRJ001/PRJ001_info.json", "{}");
    store.insert(BUCKET, "prj002/prj002_info.json", "{}");
    store.insert(BUCKET, "PRJ004/PRJ004_info.json", "{}");
    store.insert(BUCKET, "scratch/readme.txt", "notes");

    let receipt = submit(&store, BUCKET, &valid_upload(1), "Gap", &JsonOutput).unwrap();
    let id = receipt.project_id.as_str();
    assert_eq!(id, "PRJ003");
    assert_eq!(id.len(), 6);
    assert!(id[3..].chars().all(|ch| ch.is_ascii_digit()));

    let next = submit(&store, BUCKET, &valid_upload(1), "Next", &JsonOutput).unwrap();
    assert_eq!(next.project_id.as_str(), "PRJ005");
}

#[test]
fn three_files_is_wrong_file_count() {
    let store = MemoryObjectStore::new();
    let mut files = valid_upload(1);
    files.pop();
    let err = submit(&store, BUCKET, &files, "Test", &JsonOutput).unwrap_err();
    assert_matches!(
        err,
        AtlasError::Rejected(Rejection::WrongFileCount { expected: 4, found: 3 })
    );
    assert!(err.to_string().starts_with("wrong file count"));
    assert!(store.keys(BUCKET).is_empty());
}

#[test]
fn four_files_without_title_is_missing_title() {
    let store = MemoryObjectStore::new();
    let err = submit(&store, BUCKET, &valid_upload(1), "", &JsonOutput).unwrap_err();
    assert_matches!(err, AtlasError::Rejected(Rejection::MissingTitle));
    assert!(err.to_string().starts_with("missing title"));
}

#[test]
fn unresolved_role_is_rejected() {
    let store = MemoryObjectStore::new();
    let mut files = valid_upload(1);
    files[3] = UploadedFile::new("asv.fa", ">asv1\nACGT\n");
    let err = submit(&store, BUCKET, &files, "Test", &JsonOutput).unwrap_err();
    assert_matches!(
        err,
        AtlasError::Rejected(Rejection::MissingRole(roles)) if roles == vec!["asv.fasta".to_string()]
    );
}

#[test]
fn missing_columns_are_listed_exactly() {
    let store = MemoryObjectStore::new();
    let columns = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| *column != "Library" && *column != "Country")
        .collect::<Vec<_>>();
    let err = submit(
        &store,
        BUCKET,
        &upload(metadata_csv(3, &columns)),
        "Test",
        &JsonOutput,
    )
    .unwrap_err();
    assert_matches!(
        &err,
        AtlasError::Rejected(Rejection::MissingColumns(missing))
            if missing == &vec!["Library".to_string(), "Country".to_string()]
    );
    assert_eq!(
        err.to_string(),
        "metadata file is missing required columns: Library, Country"
    );
    assert!(store.keys(BUCKET).is_empty());
}

#[test]
fn extra_columns_are_accepted() {
    let store = MemoryObjectStore::new();
    let mut columns = REQUIRED_COLUMNS.to_vec();
    columns.push("Depth");
    columns.push("pH");
    let receipt = submit(
        &store,
        BUCKET,
        &upload(metadata_csv(7, &columns)),
        "Extras",
        &JsonOutput,
    )
    .unwrap();
    assert_eq!(receipt.descriptor.samples, 7);
}

#[test]
fn first_non_missing_value_is_taken_without_constancy_check() {
    let store = MemoryObjectStore::new();
    let header = REQUIRED_COLUMNS.join(",");
    let meta = format!(
        "{header}\n\
         S1,,PE,16S,V4,F,R,1,2,2024-01-01,10:00,,NA\n\
         S2,NovaSeq,PE,16S,V4,F,R,1,2,2024-01-01,10:00,Soil,Kenya\n\
         S3,MiSeq,PE,ITS,V4,F,R,1,2,2024-01-01,10:00,Marine,Peru\n"
    );
    let receipt = submit(&store, BUCKET, &upload(meta), "Mixed", &JsonOutput).unwrap();
    assert_eq!(receipt.descriptor.instrument, "NovaSeq");
    assert_eq!(receipt.descriptor.gene, "16S");
    assert_eq!(receipt.descriptor.sample_type, "Soil");
    assert_eq!(receipt.descriptor.country, "Kenya");
    assert_eq!(receipt.descriptor.samples, 3);
}

#[test]
fn all_missing_column_defaults_to_na() {
    let store = MemoryObjectStore::new();
    let header = REQUIRED_COLUMNS.join(",");
    let meta = format!("{header}\nS1,MiSeq,PE,,V4,F,R,1,2,2024-01-01,10:00,Soil,BR\n");
    let receipt = submit(&store, BUCKET, &upload(meta), "Blank gene", &JsonOutput).unwrap();
    assert_eq!(receipt.descriptor.gene, "NA");
}

#[test]
fn upload_failure_aborts_and_leaves_partial_state() {
    let store = MemoryObjectStore::new();
    store.fail_on("PRJ001/PRJ001_meta.csv");
    let err = submit(&store, BUCKET, &valid_upload(2), "Partial", &JsonOutput).unwrap_err();
    assert_matches!(err, AtlasError::Storage(_));
    assert_eq!(
        store.keys(BUCKET),
        vec!["PRJ001/PRJ001_count.csv", "PRJ001/PRJ001_taxa.csv"]
    );
}

#[test]
fn reports_each_phase() {
    let store = MemoryObjectStore::new();
    let sink = RecordingSink::default();
    submit(&store, BUCKET, &valid_upload(1), "Phases", &sink).unwrap();
    let messages = sink.messages.lock().unwrap();
    let phases = messages
        .iter()
        .filter_map(|message| message.split(';').next())
        .collect::<Vec<_>>();
    assert_eq!(
        phases,
        vec![
            "phase=AwaitingInputs",
            "phase=FilesIdentified",
            "phase=MetadataParsed",
            "phase=SchemaValid",
            "phase=IdentifierAssigned",
            "phase=DescriptorBuilt",
            "phase=Committed",
        ]
    );
}
