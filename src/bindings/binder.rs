//! Binds an already registered JSON schema to a folder.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::types::{Column, ColumnType, Wiki};

const ACCESS_REQUIREMENT: &str = "AccessRequirement";
const DEFAULT_SCHEMA_VERSION: &str = "1.0.0";
const STRING_COLUMN_SIZE: u32 = 100;
const REGISTRY_URL: &str = "https://repo-prod.prod.sagebase.org/repo/v1/schema/type/registered";
const PORTAL_URL: &str = "https://www.synapse.org/#!Synapse:";

/// Properties copied into a fileview. Wider views exceed the platform's
/// row size limit.
pub const FILEVIEW_FIELDS: [&str; 12] = [
    "COMPONENT",
    "FILENAME",
    "FILE_FORMAT",
    "HTAN_DATA_FILE_ID",
    "HTAN_PARENT_BIOSPECIMEN_ID",
    "SEQUENCING_PLATFORM",
    "LIBRARY_LAYOUT",
    "READ_LENGTH",
    "LIBRARY_SELECTION_METHOD",
    "SEQUENCING_BATCH_ID",
    "TARGET_CAPTURE_KIT",
    "LIBRARY_PREPARATION_KIT_NAME",
];

/// Name parts encoded in a schema file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaName {
    /// Registered component, e.g. `scRNALevel3_4` or `AccessRequirementCA000001`.
    pub component: String,
    /// `AccessRequirement` for access-requirement schemas, else the component.
    pub base_component: String,
    /// Semantic version without a leading `v`.
    pub version: String,
}

impl SchemaName {
    /// Parses names such as `HTAN.BulkWESLevel1-v1.0.0-schema.json` and
    /// `MC2.AccessRequirement-CA000001-v3.0.2-schema.json`. Names without a
    /// dash fall back to the stem with underscores removed at version 1.0.0.
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let invalid = || Error::InvalidSchemaFile(file_name.to_string());
        let dashed: Vec<&str> = file_name.split('-').collect();

        if dashed.len() < 2 {
            let stem = file_name.split('.').next().unwrap_or(file_name).replace('_', "");
            if stem.is_empty() {
                return Err(invalid());
            }
            return Ok(Self {
                component: stem.clone(),
                base_component: stem,
                version: DEFAULT_SCHEMA_VERSION.to_string(),
            });
        }

        let base_component = dashed[0].split_once('.').ok_or_else(invalid)?.1.to_string();
        let (component, version) = if base_component == ACCESS_REQUIREMENT {
            if dashed.len() < 3 {
                return Err(invalid());
            }
            let joined = dashed[..dashed.len() - 2].concat();
            let component = joined.split_once('.').ok_or_else(invalid)?.1.to_string();
            (component, dashed[dashed.len() - 2])
        } else {
            (base_component.clone(), dashed[1])
        };

        if component.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            component,
            base_component,
            version: version.strip_prefix('v').unwrap_or(version).to_string(),
        })
    }

    #[must_use]
    pub fn is_access_requirement(&self) -> bool {
        self.base_component == ACCESS_REQUIREMENT
    }
}

/// A schema file on disk with its parsed name and JSON body.
#[derive(Debug, Clone)]
pub struct SchemaFile {
    pub path: PathBuf,
    pub name: SchemaName,
    pub json: Value,
}

impl SchemaFile {
    pub fn load(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidSchemaFile(path.display().to_string()))?;
        let name = SchemaName::from_file_name(file_name)?;
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read schema {}: {e}", path.display())))?;
        Ok(Self {
            path: path.to_path_buf(),
            name,
            json: serde_json::from_str(&content)?,
        })
    }
}

/// `{organization without spaces}-{component}-{version}`
#[must_use]
pub fn schema_uri(organization: &str, component: &str, version: &str) -> String {
    let version = version.strip_prefix('v').unwrap_or(version);
    format!("{}-{component}-{version}", organization.replace(' ', ""))
}

/// View columns for the allow-listed properties of a schema. Properties come
/// from the first `$defs` entry that has any, else from the top level.
#[must_use]
pub fn fileview_columns(schema: &Value) -> Vec<Column> {
    let properties = match schema.get("$defs").and_then(Value::as_object) {
        Some(defs) => defs.values().find_map(|d| d.get("properties")),
        None => schema.get("properties"),
    };
    let Some(properties) = properties.and_then(Value::as_object) else {
        return Vec::new();
    };

    properties
        .iter()
        .filter(|(name, _)| FILEVIEW_FIELDS.contains(&name.as_str()))
        .map(|(name, definition)| {
            let column_type = match definition.get("type") {
                Some(Value::String(t)) => ColumnType::from_json_type(t),
                Some(Value::Array(types)) => types
                    .iter()
                    .filter_map(Value::as_str)
                    .find(|t| *t != "null")
                    .map_or(ColumnType::String, ColumnType::from_json_type),
                _ => ColumnType::String,
            };
            Column {
                name: name.clone(),
                column_type,
                maximum_size: (column_type == ColumnType::String).then_some(STRING_COLUMN_SIZE),
            }
        })
        .collect()
}

/// Documentation page pointing at a folder's fileview.
#[must_use]
pub fn wiki_markdown(schema: &str, fileview_id: &str, uri: &str) -> String {
    let view_url = format!("{PORTAL_URL}{fileview_id}");
    let columns: String = FILEVIEW_FIELDS.iter().map(|f| format!("- {f}\n")).collect();
    format!(
        "# {schema} Data View\n\n\
         This page displays the {schema} data files with schema-validated metadata.\n\n\
         ## Fileview\n\n\
         **Fileview ID**: `{fileview_id}`\n\n\
         **[View Fileview]({view_url})**\n\n\
         ## Schema Validation\n\n\
         All files in this folder are validated against the {schema} JSON schema. \
         Files with invalid or missing required annotations will show validation errors.\n\n\
         ## Columns\n\n\
         {columns}\n\
         ## Quick Links\n\n\
         - [Open Fileview]({view_url})\n\
         - [Schema Documentation]({REGISTRY_URL}/{uri})\n"
    )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BindOptions {
    /// Bind with derived annotations even if the file name does not mark an
    /// access-requirement schema.
    pub access_requirement: bool,
    pub create_fileview: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindReport {
    pub uri: String,
    pub derived_annotations: bool,
    pub fileview_id: Option<String>,
    pub wiki_written: bool,
}

pub struct SchemaBinder<'a> {
    platform: &'a dyn Platform,
    organization: String,
}

impl<'a> SchemaBinder<'a> {
    #[must_use]
    pub fn new(platform: &'a dyn Platform, organization: &str) -> Self {
        Self {
            platform,
            organization: organization.to_string(),
        }
    }

    /// Binds `file` to `target`. The schema must already be registered;
    /// this never registers one.
    pub fn bind(&self, file: &SchemaFile, target: &str, options: BindOptions) -> Result<BindReport> {
        let name = &file.name;
        let uri = schema_uri(&self.organization, &name.component, &name.version);
        if !self.platform.schema_registered(&uri)? {
            return Err(Error::SchemaNotRegistered(uri));
        }
        info!("found registered schema {uri}");

        let derived_annotations = name.is_access_requirement() || options.access_requirement;
        self.platform.bind_schema(target, &uri, derived_annotations)?;
        info!("bound {uri} to {target}");

        let mut report = BindReport {
            uri,
            derived_annotations,
            fileview_id: None,
            wiki_written: false,
        };
        if options.create_fileview {
            report.fileview_id = self.create_fileview(file, target);
            if let Some(view) = &report.fileview_id {
                report.wiki_written = self.write_wiki(target, &name.component, view, &report.uri);
            }
        }
        Ok(report)
    }

    fn create_fileview(&self, file: &SchemaFile, target: &str) -> Option<String> {
        let component = &file.name.component;
        let columns = fileview_columns(&file.json);
        if columns.is_empty() {
            warn!("no fileview properties in {}", file.path.display());
            return None;
        }
        let description = format!(
            "Fileview for {component} schema with columns extracted from JSON schema properties"
        );
        match self
            .platform
            .create_file_view(target, &format!("{component} Fileview"), &description, &columns)
        {
            Ok(id) => {
                info!("created fileview {id} with {} columns", columns.len());
                Some(id)
            }
            Err(e) => {
                warn!("could not create fileview for {target}: {e}");
                None
            }
        }
    }

    fn write_wiki(&self, target: &str, component: &str, fileview_id: &str, uri: &str) -> bool {
        let existing = match self.platform.get_wiki(target) {
            Ok(existing) => existing,
            Err(e) => {
                warn!("could not read wiki of {target}: {e}");
                return false;
            }
        };
        let wiki = Wiki {
            id: existing.as_ref().and_then(|w| w.id.clone()),
            etag: existing.and_then(|w| w.etag),
            title: format!("{component} Data View"),
            markdown: wiki_markdown(component, fileview_id, uri),
        };
        match self.platform.put_wiki(target, &wiki) {
            Ok(_) => true,
            Err(e) => {
                warn!("could not write wiki on {target}: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::bindings::config::fileview_id_from_markdown;
    use crate::platform::MemoryPlatform;

    #[test]
    fn test_standard_file_name() {
        let name = SchemaName::from_file_name("HTAN.scRNALevel3_4-v1.0.0-schema.json").unwrap();
        assert_eq!(name.component, "scRNALevel3_4");
        assert_eq!(name.version, "1.0.0");
        assert!(!name.is_access_requirement());
    }

    #[test]
    fn test_access_requirement_file_name() {
        let name =
            SchemaName::from_file_name("MC2.AccessRequirement-CA000001-v3.0.2-schema.json").unwrap();
        assert_eq!(name.component, "AccessRequirementCA000001");
        assert_eq!(name.base_component, "AccessRequirement");
        assert_eq!(name.version, "3.0.2");
        assert!(name.is_access_requirement());
    }

    #[test]
    fn test_fallback_file_name() {
        let name = SchemaName::from_file_name("level_1_schema.json").unwrap();
        assert_eq!(name.component, "level1schema");
        assert_eq!(name.version, "1.0.0");
        assert!(SchemaName::from_file_name("nodot-v1").is_err());
    }

    #[test]
    fn test_schema_uri() {
        assert_eq!(
            schema_uri("HTAN2 Organization", "BulkWESLevel1", "v1.0.0"),
            "HTAN2Organization-BulkWESLevel1-1.0.0"
        );
    }

    #[test]
    fn test_fileview_columns() {
        let schema = json!({
            "$defs": {
                "Empty": {},
                "BulkWESLevel1": {
                    "properties": {
                        "FILENAME": {"type": "string"},
                        "READ_LENGTH": {"type": ["null", "integer"]},
                        "LIBRARY_LAYOUT": {"enum": ["paired"]},
                        "NOT_LISTED": {"type": "string"}
                    }
                }
            }
        });
        let columns = fileview_columns(&schema);
        assert_eq!(columns.len(), 3);
        let read_length = columns.iter().find(|c| c.name == "READ_LENGTH").unwrap();
        assert_eq!(read_length.column_type, ColumnType::Integer);
        assert_eq!(read_length.maximum_size, None);
        let layout = columns.iter().find(|c| c.name == "LIBRARY_LAYOUT").unwrap();
        assert_eq!(layout.column_type, ColumnType::String);
        assert_eq!(layout.maximum_size, Some(100));
    }

    fn schema_file(json: Value) -> SchemaFile {
        SchemaFile {
            path: PathBuf::from("HTAN.BulkWESLevel1-v1.0.0-schema.json"),
            name: SchemaName::from_file_name("HTAN.BulkWESLevel1-v1.0.0-schema.json").unwrap(),
            json,
        }
    }

    #[test]
    fn test_unregistered_schema_fails_fast() {
        let platform = MemoryPlatform::default();
        let folder = platform.add_folder("syn1", "Level_1");
        let err = SchemaBinder::new(&platform, "HTAN2Organization")
            .bind(&schema_file(json!({})), &folder, BindOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::SchemaNotRegistered(uri) if uri == "HTAN2Organization-BulkWESLevel1-1.0.0"));
        assert!(platform.binding(&folder).is_none());
    }

    #[test]
    fn test_bind_with_fileview_and_wiki() {
        let platform = MemoryPlatform::default();
        platform.register_schema("HTAN2Organization-BulkWESLevel1-1.0.0");
        let folder = platform.add_folder("syn1", "Level_1");
        let file = schema_file(json!({"properties": {"FILENAME": {"type": "string"}}}));

        let report = SchemaBinder::new(&platform, "HTAN2Organization")
            .bind(
                &file,
                &folder,
                BindOptions {
                    create_fileview: true,
                    ..BindOptions::default()
                },
            )
            .unwrap();

        assert!(!report.derived_annotations);
        let view = report.fileview_id.clone().unwrap();
        assert_eq!(platform.view(&view).unwrap().name, "BulkWESLevel1 Fileview");
        let wiki = platform.wiki(&folder).unwrap();
        assert_eq!(wiki.title, "BulkWESLevel1 Data View");
        assert_eq!(fileview_id_from_markdown(&wiki.markdown), Some(view));
        assert!(report.wiki_written);
    }
}
