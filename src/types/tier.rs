use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Data-maturity stage of a versioned folder tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Ingest,
    Staging,
    Release,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Ingest, Tier::Staging, Tier::Release];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Tier::Ingest => "ingest",
            Tier::Staging => "staging",
            Tier::Release => "release",
        }
    }

    /// Folder name of this tier under a version, e.g. `v8_staging`.
    #[must_use]
    pub fn folder_name(self, version: &Version) -> String {
        format!("{}_{}", version, self.as_str())
    }

    /// Recovers the tier from a folder name such as `v8_release`.
    #[must_use]
    pub fn from_folder_name(name: &str) -> Option<Tier> {
        let (_, suffix) = name.rsplit_once('_')?;
        suffix.parse().ok()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ingest" => Ok(Tier::Ingest),
            "staging" => Ok(Tier::Staging),
            "release" => Ok(Tier::Release),
            other => Err(Error::Config(format!(
                "unknown tier '{other}' (expected ingest, staging, or release)"
            ))),
        }
    }
}

/// Release label such as `v8`. A bare number is prefixed with `v`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::Config("version cannot be empty".to_string()));
        }
        if raw.chars().all(|c| c.is_ascii_digit()) {
            return Ok(Self(format!("v{raw}")));
        }
        Ok(Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Tier folder names for `tiers` under this version.
    #[must_use]
    pub fn tier_folders(&self, tiers: &[Tier]) -> Vec<String> {
        tiers.iter().map(|t| t.folder_name(self)).collect()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_normalizes_bare_numbers() {
        assert_eq!(Version::parse("8").unwrap().as_str(), "v8");
        assert_eq!(Version::parse("v8").unwrap().as_str(), "v8");
        assert_eq!(Version::parse("beta").unwrap().as_str(), "beta");
        assert!(Version::parse("  ").is_err());
    }

    #[test]
    fn test_tier_folder_names() {
        let v8 = Version::parse("v8").unwrap();
        assert_eq!(Tier::Staging.folder_name(&v8), "v8_staging");
        assert_eq!(
            v8.tier_folders(&[Tier::Ingest, Tier::Release]),
            vec!["v8_ingest", "v8_release"]
        );
    }

    #[test]
    fn test_tier_from_folder_name() {
        assert_eq!(Tier::from_folder_name("v8_release"), Some(Tier::Release));
        assert_eq!(Tier::from_folder_name("v10_ingest"), Some(Tier::Ingest));
        assert_eq!(Tier::from_folder_name("Clinical"), None);
    }

    #[test]
    fn test_tiers_order_by_maturity() {
        assert!(Tier::Ingest < Tier::Staging);
        assert!(Tier::Staging < Tier::Release);
    }
}
