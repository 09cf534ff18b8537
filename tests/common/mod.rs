#![allow(dead_code)]

use htan2_synapse::config::TeamIds;
use htan2_synapse::platform::MemoryPlatform;
use htan2_synapse::types::{Project, Version};

pub const CONTRIBUTORS_ID: u64 = 4_200_001;

pub fn teams() -> TeamIds {
    TeamIds::default()
}

pub fn v8() -> Version {
    Version::parse("v8").expect("valid version")
}

/// A platform with one project and its contributors team.
pub fn seeded(name: &str) -> (MemoryPlatform, Project) {
    let platform = MemoryPlatform::default();
    let project = Project {
        name: name.to_string(),
        synapse_id: platform.add_project(name),
    };
    platform.add_team(&CONTRIBUTORS_ID.to_string(), &format!("{name}_contributors"));
    (platform, project)
}

/// Id of the folder at `path` below `root`, walking by name.
pub fn folder_id(platform: &MemoryPlatform, root: &str, path: &str) -> Option<String> {
    use htan2_synapse::platform::Platform;

    let mut current = root.to_string();
    for name in path.split('/') {
        current = platform
            .list_child_folders(&current)
            .ok()?
            .into_iter()
            .find(|c| c.name == name)?
            .id;
    }
    Some(current)
}
