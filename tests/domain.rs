use assert_matches::assert_matches;

use microbiome_atlas::domain::{FileRole, ProjectId, bundle_file_names, object_key};
use microbiome_atlas::error::AtlasError;

#[test]
fn parse_project_id_valid() {
    let id: ProjectId = " prj012 ".parse().unwrap();
    assert_eq!(id.as_str(), "PRJ012");
    assert_eq!(id.to_string(), "PRJ012");
}

#[test]
fn parse_project_id_invalid() {
    let err = "PRJ1234".parse::<ProjectId>().unwrap_err();
    assert_matches!(err, AtlasError::InvalidProjectId(_));
}

#[test]
fn upload_roles_match_by_suffix() {
    assert!(FileRole::Count.matches_upload("lake_count.csv"));
    assert!(FileRole::Asv.matches_upload("lake.fasta"));
    assert!(!FileRole::Asv.matches_upload("lake.fasta.gz"));
    assert!(!FileRole::Meta.matches_upload("lake_meta.tsv"));
}

#[test]
fn bundle_names_for_any_folder() {
    assert_eq!(
        bundle_file_names("legacy"),
        vec![
            "legacy_count.csv",
            "legacy_taxa.csv",
            "legacy_meta.csv",
            "legacy_asv.fasta",
            "legacy_info.json",
        ]
    );
    assert_eq!(object_key("legacy", FileRole::Asv), "legacy/legacy_asv.fasta");
}

#[test]
fn project_id_serializes_as_string() {
    let id = ProjectId::from_sequence(9).unwrap();
    assert_eq!(serde_json::to_string(&id).unwrap(), r#""PRJ009""#);
    let back: ProjectId = serde_json::from_str(r#""prj009""#).unwrap();
    assert_eq!(back, id);
    assert!(serde_json::from_str::<ProjectId>(r#""nope""#).is_err());
}
