//! Credential lookup for remote storage backends.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A resolved username/secret pair.
///
/// Carried inside backend configuration so transfers running on another
/// execution node never reach back into a central credential store.
#[derive(Clone, Serialize, Deserialize)]
pub struct UsernamePassword {
    pub username: String,
    pub password: String,
}

impl UsernamePassword {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep the secret out of debug output.
impl std::fmt::Debug for UsernamePassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsernamePassword")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Resolves a credential identifier to a username/secret pair.
///
/// Returning `None` means the backend proceeds unauthenticated and lets
/// the remote call fail on its own.
pub trait CredentialsProvider: Send + Sync {
    fn lookup(&self, id: &str) -> Option<UsernamePassword>;
}

/// Credential store backed by a map, for embedders and tests.
#[derive(Default)]
pub struct InMemoryCredentials {
    entries: HashMap<String, UsernamePassword>,
}

impl InMemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a credential under the given identifier.
    pub fn with(mut self, id: impl Into<String>, credentials: UsernamePassword) -> Self {
        self.entries.insert(id.into(), credentials);
        self
    }
}

impl CredentialsProvider for InMemoryCredentials {
    fn lookup(&self, id: &str) -> Option<UsernamePassword> {
        self.entries.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_registered_credentials() {
        let store = InMemoryCredentials::new()
            .with("deploy", UsernamePassword::new("deployer", "hunter2"));

        let found = store.lookup("deploy").unwrap();
        assert_eq!(found.username, "deployer");
        assert_eq!(found.password, "hunter2");

        assert!(store.lookup("missing").is_none());
    }

    #[test]
    fn debug_masks_the_secret() {
        let credentials = UsernamePassword::new("deployer", "hunter2");
        let rendered = format!("{:?}", credentials);
        assert!(rendered.contains("deployer"));
        assert!(!rendered.contains("hunter2"));
    }
}
