use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("schema {0} is not registered; register it before binding")]
    SchemaNotRegistered(String),

    #[error("invalid schema file name: {0}")]
    InvalidSchemaFile(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl Error {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Status code carried by an HTTP error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || self.status() == Some(404)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_matches_404_only() {
        assert!(Error::http(404, "missing").is_not_found());
        assert!(!Error::http(403, "forbidden").is_not_found());
        assert!(Error::NotFound("team".into()).is_not_found());
        assert!(!Error::Config("bad".into()).is_not_found());
    }
}
