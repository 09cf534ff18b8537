use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::types::Team;

#[must_use]
pub fn contributors_team_name(project_name: &str) -> String {
    format!("{project_name}_contributors")
}

#[must_use]
pub fn users_team_name(project_name: &str) -> String {
    format!("{project_name}_users")
}

/// Looks up per-project teams by name. Hits are cached for the lifetime of
/// the resolver; misses are retried on the next call.
pub struct TeamResolver<'a> {
    platform: &'a dyn Platform,
    cache: Mutex<HashMap<String, u64>>,
}

impl<'a> TeamResolver<'a> {
    #[must_use]
    pub fn new(platform: &'a dyn Platform) -> Self {
        Self {
            platform,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Id of the `{project}_contributors` team, if it exists.
    pub fn contributors(&self, project_name: &str) -> Option<u64> {
        self.lookup(&contributors_team_name(project_name))
    }

    /// Exact-name lookup. Search failures are logged and read as absent.
    pub fn lookup(&self, team_name: &str) -> Option<u64> {
        if let Some(id) = self.cached(team_name) {
            return Some(id);
        }
        let teams = match self.platform.search_teams(team_name) {
            Ok(teams) => teams,
            Err(e) => {
                warn!("could not search for team {team_name}: {e}");
                return None;
            }
        };
        let id = find_exact(&teams, team_name)?;
        debug!("resolved team {team_name} -> {id}");
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(team_name.to_string(), id);
        }
        Some(id)
    }

    fn cached(&self, team_name: &str) -> Option<u64> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(team_name).copied())
    }
}

fn find_exact(teams: &[Team], team_name: &str) -> Option<u64> {
    let team = teams.iter().find(|t| t.name == team_name)?;
    match team.id.parse() {
        Ok(id) => Some(id),
        Err(_) => {
            warn!("team {team_name} has non-numeric id {}", team.id);
            None
        }
    }
}

/// Returns the id of the team called `team_name`, creating it when no team
/// of that exact name exists.
pub fn ensure_team(platform: &dyn Platform, team_name: &str) -> Result<u64> {
    if let Some(id) = find_exact(&platform.search_teams(team_name)?, team_name) {
        info!("team {team_name} already exists ({id})");
        return Ok(id);
    }
    let team = platform.create_team(team_name)?;
    info!("created team {team_name} ({})", team.id);
    team.id
        .parse()
        .map_err(|_| Error::Config(format!("team {team_name} has non-numeric id {}", team.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryPlatform;

    #[test]
    fn test_exact_match_only() {
        let platform = MemoryPlatform::default();
        platform.add_team("11", "HTAN2_Ovarian_contributors_old");
        platform.add_team("12", "HTAN2_Ovarian_contributors");
        let resolver = TeamResolver::new(&platform);
        assert_eq!(resolver.contributors("HTAN2_Ovarian"), Some(12));
        assert_eq!(resolver.contributors("HTAN2_Breast"), None);
    }

    #[test]
    fn test_search_failure_reads_as_absent() {
        let platform = MemoryPlatform::default();
        platform.add_team("12", "P_contributors");
        platform.fail_team_search();
        assert_eq!(TeamResolver::new(&platform).contributors("P"), None);
    }

    #[test]
    fn test_hits_are_cached() {
        let platform = MemoryPlatform::default();
        platform.add_team("12", "P_contributors");
        let resolver = TeamResolver::new(&platform);
        assert_eq!(resolver.contributors("P"), Some(12));
        platform.fail_team_search();
        assert_eq!(resolver.contributors("P"), Some(12));
    }

    #[test]
    fn test_ensure_team_is_idempotent() {
        let platform = MemoryPlatform::default();
        let first = ensure_team(&platform, "P_users").unwrap();
        let second = ensure_team(&platform, "P_users").unwrap();
        assert_eq!(first, second);
    }
}
