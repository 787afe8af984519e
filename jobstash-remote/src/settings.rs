//! Backend configuration: server endpoint, repository, credential id,
//! job prefix.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use jobstash_core::{Error, Result};

/// `scheme://host[:port][/path]*`, case-insensitive.
static SERVER_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(http://|https://)[a-z0-9][a-z0-9.-]*(?::[0-9]{1,5})?(/[0-9a-zA-Z_]*)*$")
        .expect("server url pattern is valid")
});

/// Settings for the remote repository storage backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteStorageSettings {
    /// Base URL of the repository server.
    pub server_url: String,
    /// Target repository name.
    pub repository: String,
    /// Identifier resolved through the credentials provider.
    pub credentials_id: String,
    /// Prefix under which all job keys are namespaced. May be empty.
    #[serde(default)]
    pub prefix: String,
}

impl RemoteStorageSettings {
    pub fn new(
        server_url: impl Into<String>,
        repository: impl Into<String>,
        credentials_id: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            repository: repository.into(),
            credentials_id: credentials_id.into(),
            prefix: prefix.into(),
        }
    }

    /// Parses settings from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the document does not parse.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid settings: {}", e)))
    }

    /// Loads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Checks the settings are usable before any remote call is made.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(Error::Config("Server url cannot be blank".to_string()));
        }
        if !SERVER_URL_PATTERN.is_match(&self.server_url) {
            return Err(Error::Config(
                "Server url doesn't seem valid. Should start with http:// or https://".to_string(),
            ));
        }
        if self.repository.trim().is_empty() {
            return Err(Error::Config("Repository cannot be blank".to_string()));
        }
        if self.credentials_id.trim().is_empty() {
            return Err(Error::Config("Credentials id cannot be blank".to_string()));
        }
        Ok(())
    }

    /// Joins the configured prefix onto an item path.
    pub fn prefixed(&self, path: &str) -> String {
        if self.prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.prefix.trim_end_matches('/'), path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(server_url: &str) -> RemoteStorageSettings {
        RemoteStorageSettings::new(server_url, "generic-local", "repo-creds", "jenkins")
    }

    #[test]
    fn accepts_plain_and_ported_urls() {
        for url in [
            "http://repo.example.com",
            "https://repo.example.com:8081",
            "https://repo.example.com:8081/artifacts",
            "HTTPS://REPO.example.com",
        ] {
            settings(url).validate().unwrap_or_else(|e| panic!("{}: {}", url, e));
        }
    }

    #[test]
    fn rejects_malformed_urls() {
        for url in ["", "repo.example.com", "ftp://repo.example.com", "http://"] {
            assert!(settings(url).validate().is_err(), "accepted {}", url);
        }
    }

    #[test]
    fn rejects_blank_fields() {
        let mut s = settings("http://repo.example.com");
        s.repository = " ".to_string();
        assert!(s.validate().is_err());

        let mut s = settings("http://repo.example.com");
        s.credentials_id = String::new();
        assert!(s.validate().is_err());
    }

    #[test]
    fn prefixed_joins_without_doubling_slashes() {
        let s = settings("http://repo.example.com");
        assert_eq!(s.prefixed("my-job"), "jenkins/my-job");

        let mut bare = s.clone();
        bare.prefix = String::new();
        assert_eq!(bare.prefixed("my-job"), "my-job");

        let mut slashed = s;
        slashed.prefix = "jenkins/".to_string();
        assert_eq!(slashed.prefixed("my-job"), "jenkins/my-job");
    }

    #[test]
    fn parses_from_toml() {
        let s = RemoteStorageSettings::from_toml_str(
            r#"
            server_url = "https://repo.example.com"
            repository = "generic-local"
            credentials_id = "repo-creds"
            prefix = "jenkins"
            "#,
        )
        .unwrap();
        assert_eq!(s.repository, "generic-local");
        assert_eq!(s.prefix, "jenkins");

        let defaulted = RemoteStorageSettings::from_toml_str(
            r#"
            server_url = "https://repo.example.com"
            repository = "generic-local"
            credentials_id = "repo-creds"
            "#,
        )
        .unwrap();
        assert_eq!(defaulted.prefix, "");
    }
}
