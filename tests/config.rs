use assert_matches::assert_matches;

use microbiome_atlas::config::{Config, ConfigLoader, StorageConfig};
use microbiome_atlas::error::AtlasError;
use microbiome_atlas::store::ObjectStore;

#[test]
fn parse_s3_config() {
    let config: Config = serde_json::from_str(
        r#"{
            "bucket": "microbiome-atlas",
            "storage": { "backend": "s3", "region": "eu-west-1" }
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve_config(config, None).unwrap();
    assert_eq!(resolved.schema_version, 1);
    assert_eq!(resolved.bucket, "microbiome-atlas");
    assert_matches!(
        resolved.storage,
        StorageConfig::S3 { ref region, endpoint: None, path_style: false, .. } if region == "eu-west-1"
    );
}

#[test]
fn bucket_is_required() {
    let config: Config =
        serde_json::from_str(r#"{ "storage": { "backend": "memory" } }"#).unwrap();
    let err = ConfigLoader::resolve_config(config, Some("  ".to_string())).unwrap_err();
    assert_matches!(err, AtlasError::ConfigParse(_));
}

#[test]
fn load_fs_config_from_file() {
    let temp = tempfile::tempdir().unwrap();
    let data_root = temp.path().join("data");
    let path = temp.path().join("atlas.json");
    std::fs::write(
        &path,
        format!(
            r#"{{ "schema_version": 1, "bucket": "atlas", "storage": {{ "backend": "fs", "root": "{}" }} }}"#,
            data_root.display()
        ),
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_matches!(resolved.storage, StorageConfig::Fs { .. });
    let store = resolved.open_store().unwrap();
    store
        .put_object(&resolved.bucket, "PRJ001/PRJ001_info.json", b"{}", "application/json")
        .unwrap();
    assert!(data_root.join("atlas/PRJ001/PRJ001_info.json").exists());
}

#[test]
fn unreadable_and_invalid_files() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("nope.json");
    let err = ConfigLoader::resolve(missing.to_str()).unwrap_err();
    assert_matches!(err, AtlasError::ConfigRead(_));

    let invalid = temp.path().join("bad.json");
    std::fs::write(&invalid, r#"{ "storage": { "backend": "ftp" } }"#).unwrap();
    let err = ConfigLoader::resolve(invalid.to_str()).unwrap_err();
    assert_matches!(err, AtlasError::ConfigParse(_));
}
