//! Shapes and helpers for the files the tools read and write.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::catalog::Category;
use crate::error::{Error, Result};
use crate::types::Version;

pub const PROJECTS_FILE: &str = "projects.yml";
pub const BINDING_CONFIG_FILE: &str = "schema_binding_config.yml";
pub const BINDING_RESULTS_FILE: &str = "binding_results.json";
pub const RETRY_RESULTS_FILE: &str = "retry_binding_results.json";

#[must_use]
pub fn folder_structure_file(version: &Version) -> String {
    format!("folder_structure_{version}.yml")
}

#[must_use]
pub fn schema_binding_file(version: &Version) -> String {
    format!("schema_binding_{version}.yml")
}

/// Reads a YAML file. A missing file is a configuration error.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
    serde_yaml::from_str(&content)
        .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))
}

pub fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, serde_yaml::to_string(value)?)?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
    Ok(serde_json::from_str(&content)?)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

// Folder structure file

/// `{version: {projects: {name: ProjectFolders}}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderStructure(pub BTreeMap<String, VersionFolders>);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionFolders {
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectFolders>,
}

impl FolderStructure {
    pub fn insert(&mut self, version: &Version, project: String, folders: ProjectFolders) {
        self.0
            .entry(version.to_string())
            .or_default()
            .projects
            .insert(project, folders);
    }

    #[must_use]
    pub fn projects(&self, version: &Version) -> Option<&BTreeMap<String, ProjectFolders>> {
        self.0.get(version.as_str()).map(|v| &v.projects)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFolders {
    pub synapse_id: String,
    /// Keyed by tier folder name, e.g. `v8_staging`.
    #[serde(default)]
    pub folders: BTreeMap<String, TierFolder>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierFolder {
    pub synapse_id: String,
    #[serde(default)]
    pub modules: BTreeMap<String, FolderNode>,
}

/// A module folder, or a nested child of one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode {
    pub synapse_id: String,
    #[serde(default)]
    pub subfolders: BTreeMap<String, SubfolderEntry>,
}

impl FolderNode {
    #[must_use]
    pub fn new(synapse_id: String) -> Self {
        Self {
            synapse_id,
            subfolders: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubfolderEntry {
    Id(String),
    Nested(FolderNode),
}

impl SubfolderEntry {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            SubfolderEntry::Id(id) => id,
            SubfolderEntry::Nested(node) => &node.synapse_id,
        }
    }

    #[must_use]
    pub fn subfolders(&self) -> Option<&BTreeMap<String, SubfolderEntry>> {
        match self {
            SubfolderEntry::Id(_) => None,
            SubfolderEntry::Nested(node) => Some(&node.subfolders),
        }
    }
}

// Schema binding config

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaBindingConfig {
    #[serde(default)]
    pub schema_bindings: SchemaBindings,
    /// Top-level keys this crate does not manage, kept on rewrite.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaBindings {
    #[serde(default, deserialize_with = "lenient_section")]
    pub file_based: BTreeMap<String, SchemaEntry>,
    #[serde(default, deserialize_with = "lenient_section")]
    pub record_based: BTreeMap<String, SchemaEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaEntry {
    #[serde(default)]
    pub projects: Vec<BindingRecord>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingRecord {
    pub name: String,
    pub subfolder: String,
    #[serde(default)]
    pub synapse_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fileview_id: Option<String>,
}

/// Older configs wrote `record_based` as a list; such sections read as empty.
fn lenient_section<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, SchemaEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    match value {
        serde_yaml::Value::Mapping(_) => serde_yaml::from_value(value).map_err(D::Error::custom),
        serde_yaml::Value::Null => Ok(BTreeMap::new()),
        _ => {
            warn!("ignoring schema binding section that is not a mapping");
            Ok(BTreeMap::new())
        }
    }
}

impl SchemaBindings {
    #[must_use]
    pub fn section(&self, category: Category) -> &BTreeMap<String, SchemaEntry> {
        match category {
            Category::FileBased => &self.file_based,
            Category::RecordBased => &self.record_based,
        }
    }

    pub fn section_mut(&mut self, category: Category) -> &mut BTreeMap<String, SchemaEntry> {
        match category {
            Category::FileBased => &mut self.file_based,
            Category::RecordBased => &mut self.record_based,
        }
    }
}

impl SchemaBindingConfig {
    /// Appends a record without checking for duplicates.
    pub fn push(&mut self, category: Category, schema: &str, record: BindingRecord) {
        self.schema_bindings
            .section_mut(category)
            .entry(schema.to_string())
            .or_default()
            .projects
            .push(record);
    }

    /// Every record with its category and schema name, file-based first.
    pub fn entries(&self) -> impl Iterator<Item = (Category, &str, &BindingRecord)> {
        [Category::FileBased, Category::RecordBased]
            .into_iter()
            .flat_map(move |category| {
                self.schema_bindings
                    .section(category)
                    .iter()
                    .flat_map(move |(schema, entry)| {
                        entry
                            .projects
                            .iter()
                            .map(move |record| (category, schema.as_str(), record))
                    })
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }
}

// Binding results

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub successful: Vec<BindingOutcome>,
    #[serde(default)]
    pub failed: Vec<BindingOutcome>,
    #[serde(default)]
    pub skipped: Vec<BindingOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingOutcome {
    pub schema: String,
    #[serde(default)]
    pub category: Option<Category>,
    pub project: String,
    #[serde(default)]
    pub subfolder: String,
    pub synapse_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fileview_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BindingResults {
    #[must_use]
    pub fn total(&self) -> usize {
        self.successful.len() + self.failed.len() + self.skipped.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_and_flat_subfolders() {
        let yaml = r"
v8:
  projects:
    HTAN2_Ovarian:
      synapse_id: syn1
      folders:
        v8_ingest:
          synapse_id: syn2
          modules:
            Imaging:
              synapse_id: syn3
              subfolders:
                DigitalPathology:
                  synapse_id: syn4
                  subfolders: {}
            WES:
              synapse_id: syn5
              subfolders:
                Level_1: syn6
";
        let structure: FolderStructure = serde_yaml::from_str(yaml).unwrap();
        let version = Version::parse("v8").unwrap();
        let project = &structure.projects(&version).unwrap()["HTAN2_Ovarian"];
        let modules = &project.folders["v8_ingest"].modules;
        let pathology = &modules["Imaging"].subfolders["DigitalPathology"];
        assert_eq!(pathology.id(), "syn4");
        assert!(pathology.subfolders().is_some());
        let level = &modules["WES"].subfolders["Level_1"];
        assert_eq!(level, &SubfolderEntry::Id("syn6".into()));
    }

    #[test]
    fn test_legacy_record_based_list_reads_empty() {
        let yaml = r"
organization: HTAN2Organization
schema_bindings:
  file_based:
    BulkWESLevel1:
      projects:
        - name: P
          subfolder: v8_staging/WES/Level_1
          synapse_id: syn9
  record_based:
    - Demographics
";
        let config: SchemaBindingConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.schema_bindings.record_based.is_empty());
        assert_eq!(config.len(), 1);
        assert!(config.extra.contains_key("organization"));

        let rewritten = serde_yaml::to_string(&config).unwrap();
        assert!(rewritten.contains("organization: HTAN2Organization"));
    }

    #[test]
    fn test_missing_yaml_is_config_error() {
        let err = read_yaml::<FolderStructure>(Path::new("/nonexistent/f.yml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
