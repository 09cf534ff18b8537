//! Validation reports against the in-memory platform.

use std::fs;

use htan2_synapse::catalog::Category;
use htan2_synapse::config::files::{BindingRecord, SchemaBindingConfig};
use htan2_synapse::platform::MemoryPlatform;
use htan2_synapse::report::{CSV_HEADER, csv_file_name, report_view, validate_all};
use htan2_synapse::types::InvalidFile;

fn platform_with_three_files() -> MemoryPlatform {
    let platform = MemoryPlatform::default();
    platform.add_view_file("syn_view", "syn1", "A.fastq");
    platform.add_view_file("syn_view", "syn2", "B.fastq");
    platform.add_view_file("syn_view", "syn3", "C.fastq");
    platform.add_invalid_file(
        "syn_folder",
        InvalidFile {
            object_id: "syn2".into(),
            validation_error_message: "missing required field X".into(),
            all_validation_messages: vec!["#: required key [X] not found".into()],
            validated_on: "2025-06-01T12:00:00.000Z".into(),
        },
    );
    platform
}

#[test]
fn test_one_invalid_file_among_three() {
    let platform = platform_with_three_files();
    let dir = tempfile::tempdir().unwrap();

    let (path, rows) = report_view(&platform, "syn_folder", "syn_view", dir.path()).unwrap();
    assert_eq!(path, dir.path().join("validation_status_syn_view.csv"));
    assert_eq!(rows.len(), 3);
    assert_eq!(rows.iter().filter(|r| r.is_valid).count(), 2);

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], CSV_HEADER.join(","));
    assert!(lines[1].starts_with("syn1,A.fastq,true,"));
    assert!(lines[2].starts_with("syn2,B.fastq,false,missing required field X,"));
    assert!(lines[3].starts_with("syn3,C.fastq,true,"));
}

#[test]
fn test_validate_all_skips_records_without_fileview() {
    let platform = platform_with_three_files();
    let dir = tempfile::tempdir().unwrap();
    let mut config = SchemaBindingConfig::default();
    config.push(
        Category::FileBased,
        "BulkWESLevel1",
        BindingRecord {
            name: "HTAN2_Ovarian".into(),
            subfolder: "v8_staging/WES/Level_1".into(),
            synapse_id: Some("syn_folder".into()),
            fileview_id: Some("syn_view".into()),
        },
    );
    config.push(
        Category::FileBased,
        "BulkWESLevel2",
        BindingRecord {
            name: "HTAN2_Ovarian".into(),
            subfolder: "v8_staging/WES/Level_2".into(),
            synapse_id: Some("syn_other".into()),
            fileview_id: None,
        },
    );
    config.push(
        Category::FileBased,
        "BulkWESLevel3",
        BindingRecord {
            name: "HTAN2_Ovarian".into(),
            subfolder: "v8_staging/WES/Level_3".into(),
            synapse_id: Some("syn_other".into()),
            fileview_id: Some("syn_gone".into()),
        },
    );

    let summary = validate_all(&platform, &config, dir.path());
    assert_eq!(summary.successful.len(), 1);
    assert_eq!(summary.successful[0].invalid, 1);
    assert_eq!(summary.successful[0].valid, 2);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.failed.len(), 1);
    assert!(dir.path().join(csv_file_name("syn_view")).exists());
    assert!(!dir.path().join(csv_file_name("syn_gone")).exists());
}
