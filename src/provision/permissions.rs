//! Fixed per-tier access control.
//!
//! Ingest and staging folders keep inheriting from their project and get one
//! incremental grant per principal. Release folders get their whole ACL
//! replaced in a single write, which cuts the inherited entries off.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use super::teams::TeamResolver;
use crate::config::TeamIds;
use crate::error::Result;
use crate::platform::Platform;
use crate::types::{AccessSet, ResourceAccess, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Principal {
    Admins,
    Operations,
    Oversight,
    Contributors,
}

impl Principal {
    pub const ALL: [Principal; 4] = [
        Principal::Admins,
        Principal::Operations,
        Principal::Oversight,
        Principal::Contributors,
    ];
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Principal::Admins => "admins",
            Principal::Operations => "operations",
            Principal::Oversight => "oversight",
            Principal::Contributors => "contributors",
        })
    }
}

/// Capabilities `principal` holds on a folder of `tier`.
#[must_use]
pub const fn policy(tier: Tier, principal: Principal) -> AccessSet {
    match (tier, principal) {
        (_, Principal::Admins) => AccessSet::ADMIN,
        (Tier::Release, _) => AccessSet::VIEW,
        (Tier::Staging, Principal::Contributors) => AccessSet::MODIFY,
        (Tier::Ingest | Tier::Staging, _) => AccessSet::EDIT_DELETE,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum GrantStatus {
    Applied,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantOutcome {
    pub principal: Principal,
    pub principal_id: Option<u64>,
    pub status: GrantStatus,
}

impl GrantOutcome {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.status, GrantStatus::Failed(_))
    }
}

/// One principal's expected and observed capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalCheck {
    pub principal: Principal,
    pub principal_id: Option<u64>,
    pub expected: AccessSet,
    pub actual: Option<AccessSet>,
}

impl PrincipalCheck {
    #[must_use]
    pub fn matches(&self) -> bool {
        self.principal_id.is_none() || self.actual == Some(self.expected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclReport {
    pub folder_id: String,
    pub tier: Tier,
    /// True when the effective ACL belongs to an ancestor.
    pub inherited: bool,
    pub checks: Vec<PrincipalCheck>,
    /// Principals outside the four classes. Only meaningful for release.
    pub unexpected: Vec<u64>,
    pub unknown_access_types: Vec<String>,
}

impl AclReport {
    #[must_use]
    pub fn is_conformant(&self) -> bool {
        let principals_ok = self.checks.iter().all(PrincipalCheck::matches);
        match self.tier {
            Tier::Release => principals_ok && !self.inherited && self.unexpected.is_empty(),
            Tier::Ingest | Tier::Staging => principals_ok,
        }
    }
}

pub struct PolicyEngine<'a> {
    platform: &'a dyn Platform,
    teams: TeamIds,
    resolver: TeamResolver<'a>,
}

impl<'a> PolicyEngine<'a> {
    #[must_use]
    pub fn new(platform: &'a dyn Platform, teams: TeamIds) -> Self {
        Self {
            platform,
            teams,
            resolver: TeamResolver::new(platform),
        }
    }

    fn principal_id(&self, principal: Principal, project_name: &str) -> Option<u64> {
        match principal {
            Principal::Admins => Some(self.teams.admins),
            Principal::Operations => Some(self.teams.operations),
            Principal::Oversight => Some(self.teams.oversight),
            Principal::Contributors => self.resolver.contributors(project_name),
        }
    }

    fn resolve(&self, project_name: &str) -> Vec<(Principal, Option<u64>)> {
        Principal::ALL
            .iter()
            .map(|&p| (p, self.principal_id(p, project_name)))
            .collect()
    }

    /// Applies the tier policy to `folder_id`. Every principal gets an
    /// outcome; no failure stops the others.
    pub fn apply(&self, folder_id: &str, tier: Tier, project_name: &str) -> Vec<GrantOutcome> {
        let principals = self.resolve(project_name);
        match tier {
            Tier::Ingest | Tier::Staging => principals
                .into_iter()
                .map(|(principal, id)| self.grant(folder_id, tier, principal, id, project_name))
                .collect(),
            Tier::Release => self.replace(folder_id, principals, project_name),
        }
    }

    fn grant(
        &self,
        folder_id: &str,
        tier: Tier,
        principal: Principal,
        principal_id: Option<u64>,
        project_name: &str,
    ) -> GrantOutcome {
        let Some(id) = principal_id else {
            return skipped(principal, project_name);
        };
        let access = policy(tier, principal);
        let status = match self.platform.grant_access(folder_id, id, access) {
            Ok(()) => {
                info!("granted {principal} ({id}) {access} on {folder_id}");
                GrantStatus::Applied
            }
            Err(e) => {
                warn!("could not grant {principal} ({id}) on {folder_id}: {e}");
                GrantStatus::Failed(e.to_string())
            }
        };
        GrantOutcome {
            principal,
            principal_id: Some(id),
            status,
        }
    }

    fn replace(
        &self,
        folder_id: &str,
        principals: Vec<(Principal, Option<u64>)>,
        project_name: &str,
    ) -> Vec<GrantOutcome> {
        let entries: Vec<ResourceAccess> = principals
            .iter()
            .filter_map(|&(principal, id)| {
                id.map(|principal_id| ResourceAccess {
                    principal_id,
                    access_type: policy(Tier::Release, principal).to_owned_strings(),
                })
            })
            .collect();

        let result = self.platform.replace_acl(folder_id, &entries);
        match &result {
            Ok(()) => info!(
                "replaced ACL on release folder {folder_id} ({} principals)",
                entries.len()
            ),
            Err(e) => warn!("could not replace ACL on release folder {folder_id}: {e}"),
        }

        principals
            .into_iter()
            .map(|(principal, id)| match (id, &result) {
                (None, _) => skipped(principal, project_name),
                (Some(_), Ok(())) => GrantOutcome {
                    principal,
                    principal_id: id,
                    status: GrantStatus::Applied,
                },
                (Some(_), Err(e)) => GrantOutcome {
                    principal,
                    principal_id: id,
                    status: GrantStatus::Failed(e.to_string()),
                },
            })
            .collect()
    }

    /// Re-reads the effective ACL of `folder_id` and compares it with the
    /// tier policy.
    pub fn verify(&self, folder_id: &str, tier: Tier, project_name: &str) -> Result<AclReport> {
        let acl = self.platform.get_acl(folder_id)?;
        let principals = self.resolve(project_name);
        let mut unknown_access_types = Vec::new();

        let checks = principals
            .iter()
            .map(|&(principal, principal_id)| {
                let actual = principal_id.and_then(|id| acl.entry(id)).map(|entry| {
                    let (set, unknown) = AccessSet::from_names(&entry.access_type);
                    unknown_access_types.extend(unknown);
                    set
                });
                PrincipalCheck {
                    principal,
                    principal_id,
                    expected: policy(tier, principal),
                    actual,
                }
            })
            .collect();

        let known: Vec<u64> = principals.iter().filter_map(|(_, id)| *id).collect();
        let unexpected = acl
            .resource_access
            .iter()
            .map(|ra| ra.principal_id)
            .filter(|id| !known.contains(id))
            .collect();

        Ok(AclReport {
            folder_id: folder_id.to_string(),
            tier,
            inherited: acl.id != folder_id,
            checks,
            unexpected,
            unknown_access_types,
        })
    }
}

fn skipped(principal: Principal, project_name: &str) -> GrantOutcome {
    warn!("{principal} team not found for {project_name}; skipping");
    GrantOutcome {
        principal,
        principal_id: None,
        status: GrantStatus::Skipped(format!("no team found for {project_name}")),
    }
}

/// Capabilities granted on the project entity itself.
#[must_use]
pub fn project_policy(principal: ProjectPrincipal) -> AccessSet {
    match principal {
        ProjectPrincipal::Admins | ProjectPrincipal::Oversight => AccessSet::ADMIN,
        ProjectPrincipal::Operations => AccessSet::EDIT_DELETE,
        ProjectPrincipal::Contributors => AccessSet::CONTRIBUTE,
        ProjectPrincipal::Users => AccessSet::VIEW,
    }
}

/// Principals of a project-level ACL, which adds a read-only users team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectPrincipal {
    Admins,
    Operations,
    Oversight,
    Contributors,
    Users,
}
