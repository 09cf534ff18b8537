//! Merging binding sets into the master config, and fileview id backfill.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::Category;
use crate::config::files::{BindingRecord, BindingResults, SchemaBindingConfig};
use crate::platform::Platform;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Incoming records left out by the tier filter.
    pub filtered: usize,
}

impl SchemaBindingConfig {
    /// Merges `incoming` into this config keyed by (schema, project,
    /// subfolder). Existing keys take the incoming `synapse_id`, and its
    /// `fileview_id` when one is present; new keys are appended. With a tier
    /// filter only records whose subfolder starts with it take part.
    pub fn merge(&mut self, incoming: &SchemaBindingConfig, tier_filter: Option<&str>) -> MergeSummary {
        let mut summary = MergeSummary::default();
        for (category, schema, record) in incoming.entries() {
            if let Some(prefix) = tier_filter {
                if !record.subfolder.starts_with(prefix) {
                    summary.filtered += 1;
                    continue;
                }
            }
            match self.merge_record(category, schema, record) {
                MergeAction::Added => summary.added += 1,
                MergeAction::Updated => summary.updated += 1,
                MergeAction::Unchanged => summary.unchanged += 1,
            }
        }
        info!(
            "merged bindings: {} added, {} updated, {} unchanged, {} filtered",
            summary.added, summary.updated, summary.unchanged, summary.filtered
        );
        summary
    }

    fn merge_record(&mut self, category: Category, schema: &str, record: &BindingRecord) -> MergeAction {
        let entry = self
            .schema_bindings
            .section_mut(category)
            .entry(schema.to_string())
            .or_default();
        let Some(index) = entry
            .projects
            .iter()
            .position(|r| r.name == record.name && r.subfolder == record.subfolder)
        else {
            debug!("adding {schema} binding for {} at {}", record.name, record.subfolder);
            entry.projects.push(record.clone());
            return MergeAction::Added;
        };
        let existing = &mut entry.projects[index];

        let mut changed = false;
        if existing.synapse_id != record.synapse_id {
            existing.synapse_id.clone_from(&record.synapse_id);
            changed = true;
        }
        if record.fileview_id.is_some() && existing.fileview_id != record.fileview_id {
            existing.fileview_id.clone_from(&record.fileview_id);
            changed = true;
        }
        if changed {
            MergeAction::Updated
        } else {
            MergeAction::Unchanged
        }
    }

    /// Sets `fileview_id` on every record whose folder id appears in `ids`.
    /// Returns the number of records changed.
    pub fn apply_fileview_ids(&mut self, ids: &HashMap<String, String>) -> usize {
        let mut changed = 0;
        for category in [Category::FileBased, Category::RecordBased] {
            for entry in self.schema_bindings.section_mut(category).values_mut() {
                for record in &mut entry.projects {
                    let Some(view) = record.synapse_id.as_ref().and_then(|id| ids.get(id)) else {
                        continue;
                    };
                    if record.fileview_id.as_ref() != Some(view) {
                        record.fileview_id = Some(view.clone());
                        changed += 1;
                    }
                }
            }
        }
        changed
    }
}

enum MergeAction {
    Added,
    Updated,
    Unchanged,
}

/// Folder id to fileview id, from the successful entries of a results file.
#[must_use]
pub fn fileview_ids_from_results(results: &BindingResults) -> HashMap<String, String> {
    results
        .successful
        .iter()
        .filter_map(|o| Some((o.synapse_id.clone(), o.fileview_id.clone()?)))
        .collect()
}

static LABELLED_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Fileview ID\W*(syn\d+)").expect("labelled id regex"));
static ANY_LONG_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(syn\d{8,})").expect("long id regex"));

/// Fileview id mentioned in a documentation page: the labelled id when
/// present, otherwise the first long entity id.
#[must_use]
pub fn fileview_id_from_markdown(markdown: &str) -> Option<String> {
    LABELLED_ID
        .captures(markdown)
        .or_else(|| ANY_LONG_ID.captures(markdown))
        .map(|c| c[1].to_string())
}

/// Reads the wiki of every bound folder still lacking a fileview id.
pub fn fileview_ids_from_wikis(platform: &dyn Platform, config: &SchemaBindingConfig) -> HashMap<String, String> {
    let mut ids = HashMap::new();
    for (_, schema, record) in config.entries() {
        if record.fileview_id.is_some() {
            continue;
        }
        let Some(folder) = record.synapse_id.as_deref() else {
            continue;
        };
        match platform.get_wiki(folder) {
            Ok(Some(wiki)) => match fileview_id_from_markdown(&wiki.markdown) {
                Some(view) => {
                    debug!("{schema} {}: fileview {view}", record.name);
                    ids.insert(folder.to_string(), view);
                }
                None => debug!("no fileview id in wiki of {folder}"),
            },
            Ok(None) => debug!("{folder} has no wiki"),
            Err(e) => warn!("could not read wiki of {folder}: {e}"),
        }
    }
    ids
}
