use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use super::permissions::{GrantStatus, ProjectPrincipal, project_policy};
use super::teams::{contributors_team_name, ensure_team, users_team_name};
use crate::config::TeamIds;
use crate::config::files::{read_yaml, write_yaml};
use crate::error::Result;
use crate::platform::Platform;
use crate::types::Project;

/// Reads the `{name: synapse_id}` project directory. A missing file is a
/// configuration error; an empty file yields no projects.
pub fn load_projects(path: &Path) -> Result<Vec<Project>> {
    let map: Option<BTreeMap<String, String>> = read_yaml(path)?;
    Ok(map
        .unwrap_or_default()
        .into_iter()
        .map(|(name, synapse_id)| Project { name, synapse_id })
        .collect())
}

pub fn save_projects(path: &Path, projects: &[Project]) -> Result<()> {
    let map: BTreeMap<&str, &str> = projects
        .iter()
        .map(|p| (p.name.as_str(), p.synapse_id.as_str()))
        .collect();
    write_yaml(path, &map)
}

/// Keeps only the named projects, or all of them when `names` is empty.
#[must_use]
pub fn select(projects: Vec<Project>, names: &[String]) -> Vec<Project> {
    if names.is_empty() {
        return projects;
    }
    projects
        .into_iter()
        .filter(|p| names.contains(&p.name))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectGrant {
    pub team: String,
    pub principal_id: Option<u64>,
    pub status: GrantStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectOutcome {
    pub name: String,
    pub synapse_id: Option<String>,
    pub created: bool,
    pub grants: Vec<ProjectGrant>,
    pub error: Option<String>,
}

/// Finds or creates each project, makes sure its contributor and user teams
/// exist, and (re)applies the project-level ACL.
pub fn ensure_projects(platform: &dyn Platform, teams: TeamIds, names: &[String]) -> Vec<ProjectOutcome> {
    names
        .iter()
        .map(|name| match ensure_project(platform, name) {
            Ok((id, created)) => ProjectOutcome {
                name: name.clone(),
                grants: grant_project_acl(platform, teams, &id, name),
                synapse_id: Some(id),
                created,
                error: None,
            },
            Err(e) => {
                warn!("could not ensure project {name}: {e}");
                ProjectOutcome {
                    name: name.clone(),
                    synapse_id: None,
                    created: false,
                    grants: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        })
        .collect()
}

fn ensure_project(platform: &dyn Platform, name: &str) -> Result<(String, bool)> {
    if let Some(id) = platform.find_project(name)? {
        info!("project {name} already exists ({id})");
        return Ok((id, false));
    }
    let id = platform.create_project(name)?;
    info!("created project {name} ({id})");
    Ok((id, true))
}

fn grant_project_acl(platform: &dyn Platform, teams: TeamIds, project_id: &str, name: &str) -> Vec<ProjectGrant> {
    let optional_team = |team_name: String| match ensure_team(platform, &team_name) {
        Ok(id) => (team_name, Some(id)),
        Err(e) => {
            warn!("could not ensure team {team_name}: {e}");
            (team_name, None)
        }
    };
    let (contributors_name, contributors) = optional_team(contributors_team_name(name));
    let (users_name, users) = optional_team(users_team_name(name));

    let principals = [
        ("admins".to_string(), Some(teams.admins), ProjectPrincipal::Admins),
        ("operations".to_string(), Some(teams.operations), ProjectPrincipal::Operations),
        ("oversight".to_string(), Some(teams.oversight), ProjectPrincipal::Oversight),
        (contributors_name, contributors, ProjectPrincipal::Contributors),
        (users_name, users, ProjectPrincipal::Users),
    ];

    principals
        .into_iter()
        .map(|(team, principal_id, principal)| {
            let status = match principal_id {
                None => GrantStatus::Skipped(format!("team {team} unavailable")),
                Some(id) => match platform.grant_access(project_id, id, project_policy(principal)) {
                    Ok(()) => GrantStatus::Applied,
                    Err(e) => {
                        warn!("could not grant {team} on {project_id}: {e}");
                        GrantStatus::Failed(e.to_string())
                    }
                },
            };
            ProjectGrant {
                team,
                principal_id,
                status,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryPlatform;
    use crate::types::AccessSet;

    #[test]
    fn test_load_and_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.yml");
        std::fs::write(&path, "HTAN2_Ovarian: syn111\nHTAN2_Glioma: syn222\n").unwrap();
        let projects = load_projects(&path).unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].name, "HTAN2_Glioma");

        let picked = select(projects, &["HTAN2_Ovarian".to_string()]);
        assert_eq!(picked.len(), 1);
        save_projects(&path, &picked).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "HTAN2_Ovarian: syn111\n");
    }

    #[test]
    fn test_ensure_projects_creates_once() {
        let platform = MemoryPlatform::default();
        let teams = TeamIds::default();
        let names = vec!["HTAN2_Skin".to_string()];

        let first = ensure_projects(&platform, teams, &names);
        assert!(first[0].created);
        assert_eq!(first[0].grants.len(), 5);
        assert!(first[0].grants.iter().all(|g| g.status == GrantStatus::Applied));

        let second = ensure_projects(&platform, teams, &names);
        assert!(!second[0].created);
        assert_eq!(second[0].synapse_id, first[0].synapse_id);

        let project_id = first[0].synapse_id.clone().unwrap();
        let acl = platform.get_acl(&project_id).unwrap();
        let users_id = second[0].grants[4].principal_id.unwrap();
        assert_eq!(
            AccessSet::from_names(&acl.entry(users_id).unwrap().access_type).0,
            AccessSet::VIEW
        );
    }
}
