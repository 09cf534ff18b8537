//! Derives schema bindings from a provisioned folder tree.

use std::collections::BTreeMap;

use crate::catalog::{CATALOG, Category, FolderSpec, SchemaRule};
use crate::config::files::{
    BindingRecord, FolderStructure, ProjectFolders, SchemaBindingConfig, SubfolderEntry,
};
use crate::types::{Tier, Version};

/// Builds the binding set for every project of `version`, restricted to
/// the given tiers. Modules and subfolders are visited in catalog order, so
/// the output only depends on the tree.
#[must_use]
pub fn record_bindings(structure: &FolderStructure, version: &Version, tiers: &[Tier]) -> SchemaBindingConfig {
    let mut config = SchemaBindingConfig::default();
    if let Some(projects) = structure.projects(version) {
        for (name, project) in projects {
            record_project(&mut config, name, project, version, tiers);
        }
    }
    config
}

pub fn record_project(
    config: &mut SchemaBindingConfig,
    project_name: &str,
    project: &ProjectFolders,
    version: &Version,
    tiers: &[Tier],
) {
    for tier_name in version.tier_folders(tiers) {
        let Some(tier) = project.folders.get(&tier_name) else {
            continue;
        };
        for module in CATALOG {
            let Some(node) = tier.modules.get(module.name()) else {
                continue;
            };
            let mut recorder = Recorder {
                config: &mut *config,
                category: module.category,
                project: project_name,
            };
            recorder.visit(
                &module.root,
                &node.synapse_id,
                Some(&node.subfolders),
                &format!("{tier_name}/{}", module.name()),
            );
        }
    }
}

struct Recorder<'c, 'p> {
    config: &'c mut SchemaBindingConfig,
    category: Category,
    project: &'p str,
}

impl Recorder<'_, '_> {
    fn visit(
        &mut self,
        spec: &FolderSpec,
        id: &str,
        subfolders: Option<&BTreeMap<String, SubfolderEntry>>,
        path: &str,
    ) {
        let present = |name: &str| subfolders.and_then(|s| s.get(name));
        match spec.rule {
            SchemaRule::ByParent => {}
            SchemaRule::Alias(schema) => self.push(schema, path, id),
            SchemaRule::ChildName | SchemaRule::Prefixed { .. } => {
                for child in spec.children {
                    let (Some(entry), Some(schema)) = (present(child.name), spec.rule.child_schema(child.name))
                    else {
                        continue;
                    };
                    self.push(&schema, &format!("{path}/{}", child.name), entry.id());
                }
            }
            SchemaRule::Nested => {
                for child in spec.children {
                    if let Some(entry) = present(child.name) {
                        self.visit(
                            child,
                            entry.id(),
                            entry.subfolders(),
                            &format!("{path}/{}", child.name),
                        );
                    }
                }
            }
        }
    }

    fn push(&mut self, schema: &str, subfolder: &str, id: &str) {
        self.config.push(
            self.category,
            schema,
            BindingRecord {
                name: self.project.to_string(),
                subfolder: subfolder.to_string(),
                synapse_id: Some(id.to_string()),
                fileview_id: None,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryPlatform;
    use crate::provision::Provisioner;
    use crate::types::Project;

    fn provisioned(tiers: &[Tier]) -> (FolderStructure, Version) {
        let platform = MemoryPlatform::default();
        let project = Project {
            name: "HTAN2_Ovarian".into(),
            synapse_id: platform.add_project("HTAN2_Ovarian"),
        };
        let version = Version::parse("8").unwrap();
        let outcome = Provisioner::new(&platform).provision(&project, &version, tiers);
        let mut structure = FolderStructure::default();
        structure.insert(&version, project.name, outcome.folders);
        (structure, version)
    }

    fn subfolders(config: &SchemaBindingConfig, category: Category, schema: &str) -> Vec<String> {
        config.schema_bindings.section(category)[schema]
            .projects
            .iter()
            .map(|r| r.subfolder.clone())
            .collect()
    }

    #[test]
    fn test_irregular_names() {
        let (structure, version) = provisioned(&[Tier::Staging]);
        let config = record_bindings(&structure, &version, &[Tier::Staging]);

        assert_eq!(
            subfolders(&config, Category::FileBased, "scRNALevel3_4"),
            vec!["v8_staging/scRNA_seq/Level_3_4"]
        );
        assert_eq!(
            subfolders(&config, Category::RecordBased, "BiospecimenData"),
            vec!["v8_staging/Biospecimen"]
        );
        assert_eq!(
            subfolders(&config, Category::FileBased, "DigitalPathologyData"),
            vec!["v8_staging/Imaging/DigitalPathology"]
        );
        assert_eq!(
            subfolders(&config, Category::FileBased, "MultiplexMicroscopyLevel4"),
            vec!["v8_staging/Imaging/MultiplexMicroscopy/Level_4"]
        );
        assert_eq!(
            subfolders(&config, Category::FileBased, "SpatialPanel"),
            vec!["v8_staging/SpatialOmics/Panel"]
        );
        assert_eq!(
            subfolders(&config, Category::RecordBased, "Demographics"),
            vec!["v8_staging/Clinical/Demographics"]
        );
    }

    #[test]
    fn test_one_binding_per_leaf() {
        let (structure, version) = provisioned(&[Tier::Ingest, Tier::Staging]);
        let config = record_bindings(&structure, &version, &[Tier::Ingest, Tier::Staging]);
        // 8 clinical + biospecimen + 3 WES + 3 scRNA + pathology + 3 multiplex + 4 spatial
        assert_eq!(config.len(), 2 * 23);
        assert_eq!(config.schema_bindings.file_based.len(), 14);
        assert_eq!(config.schema_bindings.record_based.len(), 9);
    }

    #[test]
    fn test_tier_restriction() {
        let (structure, version) = provisioned(&[Tier::Ingest, Tier::Staging]);
        let config = record_bindings(&structure, &version, &[Tier::Staging]);
        assert!(config.entries().all(|(_, _, r)| r.subfolder.starts_with("v8_staging/")));
    }
}
