use std::env;
use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const TOKEN_ENV: &str = "SYNAPSE_AUTH_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub token: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CredentialsFile {
    pub default: Option<Credentials>,
}

pub fn credentials_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "htan2").ok_or_else(|| {
        Error::Config("could not determine config directory; is $HOME set?".to_string())
    })?;
    Ok(dirs.config_dir().join("credentials.toml"))
}

/// Personal access token from `SYNAPSE_AUTH_TOKEN`, else from the
/// credentials file.
pub fn load_token() -> Result<String> {
    if let Ok(token) = env::var(TOKEN_ENV) {
        if !token.trim().is_empty() {
            return Ok(token.trim().to_string());
        }
    }
    let path = credentials_path()?;
    let content = fs::read_to_string(&path).map_err(|_| {
        Error::Config(format!(
            "no credential: set {TOKEN_ENV} or write a token to {}",
            path.display()
        ))
    })?;
    parse_credentials(&content).map(|c| c.token)
}

fn parse_credentials(content: &str) -> Result<Credentials> {
    let file: CredentialsFile = toml::from_str(content)
        .map_err(|e| Error::Config(format!("credentials file is corrupted: {e}")))?;
    file.default
        .filter(|c| !c.token.trim().is_empty())
        .ok_or_else(|| Error::Config("credentials file has no default token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_credentials() {
        let creds = parse_credentials("[default]\ntoken = \"abc\"\n").unwrap();
        assert_eq!(creds.token, "abc");
    }

    #[test]
    fn test_empty_credentials_rejected() {
        assert!(parse_credentials("").is_err());
        assert!(parse_credentials("[default]\ntoken = \"\"\n").is_err());
    }
}
