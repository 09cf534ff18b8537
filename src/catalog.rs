//! The fixed, version-independent module catalog.
//!
//! Every tier folder holds the same tree. Each node carries the rule that
//! turns it (or its children) into schema bindings, so irregular names live
//! in this table instead of in the recorder.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    FileBased,
    RecordBased,
}

impl Category {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Category::FileBased => "file_based",
            Category::RecordBased => "record_based",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaRule {
    /// Bound by the parent's rule.
    ByParent,
    /// Bind the folder itself under a fixed schema name.
    Alias(&'static str),
    /// Bind each child under the child's own name.
    ChildName,
    /// Bind each child under `prefix` + child name with underscores removed,
    /// unless the child appears in `overrides`.
    Prefixed {
        prefix: &'static str,
        overrides: &'static [(&'static str, &'static str)],
    },
    /// Each child applies its own rule.
    Nested,
}

impl SchemaRule {
    /// Schema name for `child` under a parent carrying this rule.
    #[must_use]
    pub fn child_schema(&self, child: &str) -> Option<String> {
        match self {
            SchemaRule::ChildName => Some(child.to_string()),
            SchemaRule::Prefixed { prefix, overrides } => Some(
                overrides
                    .iter()
                    .find(|(name, _)| *name == child)
                    .map(|(_, schema)| (*schema).to_string())
                    .unwrap_or_else(|| format!("{prefix}{}", child.replace('_', ""))),
            ),
            SchemaRule::ByParent | SchemaRule::Alias(_) | SchemaRule::Nested => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FolderSpec {
    pub name: &'static str,
    pub children: &'static [FolderSpec],
    pub rule: SchemaRule,
}

impl FolderSpec {
    const fn leaf(name: &'static str) -> Self {
        Self {
            name,
            children: &[],
            rule: SchemaRule::ByParent,
        }
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Option<&'static FolderSpec> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Children of a nested folder are persisted with their own ids and
    /// subfolders rather than as a bare id.
    #[must_use]
    pub fn nests_children(&self) -> bool {
        matches!(self.rule, SchemaRule::Nested)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModuleSpec {
    pub category: Category,
    pub root: FolderSpec,
}

impl ModuleSpec {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.root.name
    }
}

const CLINICAL: &[FolderSpec] = &[
    FolderSpec::leaf("Demographics"),
    FolderSpec::leaf("Diagnosis"),
    FolderSpec::leaf("Therapy"),
    FolderSpec::leaf("FollowUp"),
    FolderSpec::leaf("MolecularTest"),
    FolderSpec::leaf("Exposure"),
    FolderSpec::leaf("FamilyHistory"),
    FolderSpec::leaf("VitalStatus"),
];

const WES_LEVELS: &[FolderSpec] = &[
    FolderSpec::leaf("Level_1"),
    FolderSpec::leaf("Level_2"),
    FolderSpec::leaf("Level_3"),
];

const SCRNA_LEVELS: &[FolderSpec] = &[
    FolderSpec::leaf("Level_1"),
    FolderSpec::leaf("Level_2"),
    FolderSpec::leaf("Level_3_4"),
];

const MULTIPLEX_LEVELS: &[FolderSpec] = &[
    FolderSpec::leaf("Level_2"),
    FolderSpec::leaf("Level_3"),
    FolderSpec::leaf("Level_4"),
];

const IMAGING: &[FolderSpec] = &[
    FolderSpec {
        name: "DigitalPathology",
        children: &[],
        rule: SchemaRule::Alias("DigitalPathologyData"),
    },
    FolderSpec {
        name: "MultiplexMicroscopy",
        children: MULTIPLEX_LEVELS,
        rule: SchemaRule::Prefixed {
            prefix: "MultiplexMicroscopy",
            overrides: &[],
        },
    },
];

const SPATIAL: &[FolderSpec] = &[
    FolderSpec::leaf("Level_1"),
    FolderSpec::leaf("Level_3"),
    FolderSpec::leaf("Level_4"),
    FolderSpec::leaf("Panel"),
];

pub static CATALOG: &[ModuleSpec] = &[
    ModuleSpec {
        category: Category::RecordBased,
        root: FolderSpec {
            name: "Clinical",
            children: CLINICAL,
            rule: SchemaRule::ChildName,
        },
    },
    ModuleSpec {
        category: Category::RecordBased,
        root: FolderSpec {
            name: "Biospecimen",
            children: &[],
            rule: SchemaRule::Alias("BiospecimenData"),
        },
    },
    ModuleSpec {
        category: Category::FileBased,
        root: FolderSpec {
            name: "WES",
            children: WES_LEVELS,
            rule: SchemaRule::Prefixed {
                prefix: "BulkWES",
                overrides: &[],
            },
        },
    },
    ModuleSpec {
        category: Category::FileBased,
        root: FolderSpec {
            name: "scRNA_seq",
            children: SCRNA_LEVELS,
            rule: SchemaRule::Prefixed {
                prefix: "scRNA",
                overrides: &[("Level_3_4", "scRNALevel3_4")],
            },
        },
    },
    ModuleSpec {
        category: Category::FileBased,
        root: FolderSpec {
            name: "Imaging",
            children: IMAGING,
            rule: SchemaRule::Nested,
        },
    },
    ModuleSpec {
        category: Category::FileBased,
        root: FolderSpec {
            name: "SpatialOmics",
            children: SPATIAL,
            rule: SchemaRule::Prefixed {
                prefix: "Spatial",
                overrides: &[],
            },
        },
    },
];

#[must_use]
pub fn module(name: &str) -> Option<&'static ModuleSpec> {
    CATALOG.iter().find(|m| m.name() == name)
}

/// Number of folders the catalog places under one tier folder.
#[must_use]
pub fn folders_per_tier() -> usize {
    fn count(spec: &FolderSpec) -> usize {
        1 + spec.children.iter().map(count).sum::<usize>()
    }
    CATALOG.iter().map(|m| count(&m.root)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_names_are_unique() {
        let mut names: Vec<_> = CATALOG.iter().map(ModuleSpec::name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn test_prefixed_rule_strips_underscores() {
        let wes = module("WES").unwrap();
        assert_eq!(
            wes.root.rule.child_schema("Level_2").as_deref(),
            Some("BulkWESLevel2")
        );
    }

    #[test]
    fn test_combined_level_override() {
        let scrna = module("scRNA_seq").unwrap();
        assert_eq!(
            scrna.root.rule.child_schema("Level_3_4").as_deref(),
            Some("scRNALevel3_4")
        );
        assert_eq!(
            scrna.root.rule.child_schema("Level_1").as_deref(),
            Some("scRNALevel1")
        );
    }

    #[test]
    fn test_spatial_uses_short_prefix() {
        let spatial = module("SpatialOmics").unwrap();
        assert_eq!(
            spatial.root.rule.child_schema("Panel").as_deref(),
            Some("SpatialPanel")
        );
        assert_eq!(
            spatial.root.rule.child_schema("Level_4").as_deref(),
            Some("SpatialLevel4")
        );
    }

    #[test]
    fn test_folders_per_tier() {
        // Clinical 1+8, Biospecimen 1, WES 1+3, scRNA 1+3, Imaging 1+1+(1+3), Spatial 1+4
        assert_eq!(folders_per_tier(), 9 + 1 + 4 + 4 + 6 + 5);
    }

    #[test]
    fn test_only_imaging_nests() {
        let nested: Vec<_> = CATALOG
            .iter()
            .filter(|m| m.root.nests_children())
            .map(ModuleSpec::name)
            .collect();
        assert_eq!(nested, vec!["Imaging"]);
    }
}
