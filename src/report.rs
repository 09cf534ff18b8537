//! Per-fileview validation reports.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::files::SchemaBindingConfig;
use crate::error::Result;
use crate::platform::Platform;

pub const CSV_HEADER: [&str; 6] = [
    "file_id",
    "file_name",
    "is_valid",
    "validation_error_message",
    "all_validation_messages",
    "validated_on",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationRow {
    pub file_id: String,
    pub file_name: String,
    pub is_valid: bool,
    pub validation_error_message: String,
    pub all_validation_messages: String,
    pub validated_on: String,
}

/// Entity ids come back as `syn123` or as a bare number depending on the
/// column type.
fn normalize_id(id: &str) -> String {
    if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
        format!("syn{id}")
    } else {
        id.to_string()
    }
}

/// Cross-references the files of `fileview_id` with the invalid-file
/// listing of `folder_id`. Rows follow the view's order.
pub fn validate_view(platform: &dyn Platform, folder_id: &str, fileview_id: &str) -> Result<Vec<ValidationRow>> {
    let invalid: HashMap<String, _> = platform
        .list_invalid_files(folder_id)?
        .into_iter()
        .map(|f| (normalize_id(&f.object_id), f))
        .collect();
    let files = platform.query_view_files(fileview_id)?;

    Ok(files
        .into_iter()
        .map(|file| {
            let file_id = normalize_id(&file.id);
            match invalid.get(&file_id) {
                Some(problem) => ValidationRow {
                    file_id,
                    file_name: file.name,
                    is_valid: false,
                    validation_error_message: problem.validation_error_message.clone(),
                    all_validation_messages: problem.all_validation_messages.join("; "),
                    validated_on: problem.validated_on.clone(),
                },
                None => ValidationRow {
                    file_id,
                    file_name: file.name,
                    is_valid: true,
                    validation_error_message: String::new(),
                    all_validation_messages: String::new(),
                    validated_on: String::new(),
                },
            }
        })
        .collect())
}

/// Writes `rows` as CSV. The header is written even when there are no rows.
pub fn write_csv(path: &Path, rows: &[ValidationRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[must_use]
pub fn csv_file_name(fileview_id: &str) -> String {
    format!("validation_status_{fileview_id}.csv")
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewResult {
    pub schema: String,
    pub project: String,
    pub subfolder: String,
    pub folder_id: Option<String>,
    pub fileview_id: Option<String>,
    pub output_file: Option<PathBuf>,
    pub valid: usize,
    pub invalid: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationSummary {
    pub successful: Vec<ViewResult>,
    pub failed: Vec<ViewResult>,
    pub skipped: Vec<ViewResult>,
}

/// Validates one fileview and writes its CSV into `out_dir`. Returns the
/// output path and the rows written.
pub fn report_view(
    platform: &dyn Platform,
    folder_id: &str,
    fileview_id: &str,
    out_dir: &Path,
) -> Result<(PathBuf, Vec<ValidationRow>)> {
    let rows = validate_view(platform, folder_id, fileview_id)?;
    let path = out_dir.join(csv_file_name(fileview_id));
    write_csv(&path, &rows)?;
    Ok((path, rows))
}

/// One report per binding that has both a folder and a fileview id.
pub fn validate_all(platform: &dyn Platform, config: &SchemaBindingConfig, out_dir: &Path) -> ValidationSummary {
    let mut summary = ValidationSummary::default();
    for (_, schema, record) in config.entries() {
        let mut result = ViewResult {
            schema: schema.to_string(),
            project: record.name.clone(),
            subfolder: record.subfolder.clone(),
            folder_id: record.synapse_id.clone(),
            fileview_id: record.fileview_id.clone(),
            output_file: None,
            valid: 0,
            invalid: 0,
            error: None,
        };
        let (Some(folder_id), Some(fileview_id)) = (&record.synapse_id, &record.fileview_id) else {
            info!("skipping {} ({}): missing folder or fileview id", record.name, record.subfolder);
            summary.skipped.push(result);
            continue;
        };

        match report_view(platform, folder_id, fileview_id, out_dir) {
            Ok((path, rows)) => {
                result.invalid = rows.iter().filter(|r| !r.is_valid).count();
                result.valid = rows.len() - result.invalid;
                info!(
                    "{schema} {}: {} files, {} valid, {} invalid",
                    record.name,
                    rows.len(),
                    result.valid,
                    result.invalid
                );
                result.output_file = Some(path);
                summary.successful.push(result);
            }
            Err(e) => {
                warn!("could not validate {fileview_id} ({folder_id}): {e}");
                result.error = Some(e.to_string());
                summary.failed.push(result);
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryPlatform;
    use crate::types::InvalidFile;

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id("123"), "syn123");
        assert_eq!(normalize_id("syn123"), "syn123");
        assert_eq!(normalize_id(""), "");
    }

    #[test]
    fn test_messages_joined() {
        let platform = MemoryPlatform::default();
        platform.add_view_file("syn_view", "syn1", "a.bam");
        platform.add_invalid_file(
            "syn_folder",
            InvalidFile {
                object_id: "syn1".into(),
                validation_error_message: "2 schema violations found".into(),
                all_validation_messages: vec!["#: a".into(), "#: b".into()],
                validated_on: "2025-01-01T00:00:00.000Z".into(),
            },
        );
        let rows = validate_view(&platform, "syn_folder", "syn_view").unwrap();
        assert_eq!(rows[0].all_validation_messages, "#: a; #: b");
    }

    #[test]
    fn test_empty_view_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&path, &[]).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap().trim_end(),
            CSV_HEADER.join(",")
        );
    }

    #[test]
    fn test_missing_view_is_an_error() {
        let platform = MemoryPlatform::default();
        assert!(validate_view(&platform, "syn_folder", "syn_nope").is_err());
    }
}
