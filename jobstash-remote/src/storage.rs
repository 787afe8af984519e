//! Remote repository implementation of the item storage backend.

use std::sync::Arc;

use tracing::{debug, error};
use uuid::Uuid;

use jobstash_core::{
    CredentialsProvider, Error, ItemLifecycleListener, ItemStorage, Result,
};

use crate::client::{RepoClient, RepoEndpoint};
use crate::item_path::RemoteItemPath;
use crate::settings::RemoteStorageSettings;

/// Stores job caches in a remote binary repository.
///
/// Keys are rooted at `prefix/item-full-name`; a fresh client is built per
/// logical operation and dropped with it.
pub struct RemoteItemStorage {
    settings: RemoteStorageSettings,
    credentials: Arc<dyn CredentialsProvider>,
}

impl RemoteItemStorage {
    /// Builds the backend after validating its settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the settings are unusable.
    pub fn new(
        settings: RemoteStorageSettings,
        credentials: Arc<dyn CredentialsProvider>,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            credentials,
        })
    }

    pub fn settings(&self) -> &RemoteStorageSettings {
        &self.settings
    }

    /// Verifies the configuration by uploading and deleting a marker
    /// object under the prefix. Succeeds silently.
    ///
    /// # Errors
    ///
    /// Returns a configuration error whose message embeds the transport
    /// failure, suitable for showing to the operator.
    pub fn verify_connection(&self) -> Result<()> {
        let marker = tempfile::NamedTempFile::new()?;
        let key = self
            .settings
            .prefixed(&format!("connection-check-{}", Uuid::new_v4()));

        let check = || -> Result<()> {
            let client = self.create_client()?;
            client.upload(marker.path(), &key)?;
            client.delete(&key)?;
            Ok(())
        };
        check().map_err(|e| {
            Error::Config(format!(
                "Unable to connect to remote storage. Please check the server url and credentials: {}",
                e
            ))
        })?;

        debug!("remote storage configuration validated");
        Ok(())
    }

    /// Best-effort delete of everything stored for an item path.
    ///
    /// Runs from lifecycle events with no caller to report to; failures
    /// are logged and swallowed.
    pub fn delete_path(&self, path: &str) {
        let key = self.settings.prefixed(path);
        let cleanup = || -> Result<()> { self.create_client()?.delete(&key) };
        if let Err(e) = cleanup() {
            error!(path, error = %e, "failed to delete stored path");
        }
    }

    /// Best-effort server-side move of everything stored for an item
    /// path. Same reporting rules as [`RemoteItemStorage::delete_path`].
    pub fn move_path(&self, from: &str, to: &str) {
        let from_key = self.settings.prefixed(from);
        let to_key = self.settings.prefixed(to);
        let cleanup = || -> Result<()> { self.create_client()?.move_object(&from_key, &to_key) };
        if let Err(e) = cleanup() {
            error!(from, to, error = %e, "failed to move stored path");
        }
    }

    fn create_client(&self) -> Result<RepoClient> {
        let endpoint = RepoEndpoint::new(
            self.settings.server_url.clone(),
            self.settings.repository.clone(),
            self.credentials.lookup(&self.settings.credentials_id),
        );
        RepoClient::connect(endpoint)
    }

    /// Root for a branch sibling: the item's parent path plus the branch
    /// name. A top-level item roots at the branch name alone.
    fn branch_root(item_full_name: &str, branch: &str) -> String {
        match item_full_name.rsplit_once('/') {
            Some((parent, _)) => format!("{}/{}", parent, branch),
            None => branch.to_string(),
        }
    }
}

impl ItemStorage for RemoteItemStorage {
    type Path = RemoteItemPath;

    fn object_path(&self, item_full_name: &str, path: &str) -> Result<RemoteItemPath> {
        let client = Arc::new(self.create_client()?);
        Ok(RemoteItemPath::new(
            client,
            self.settings.prefixed(item_full_name),
            path,
        ))
    }

    fn object_path_for_branch(
        &self,
        item_full_name: &str,
        path: &str,
        branch: &str,
    ) -> Result<RemoteItemPath> {
        let client = Arc::new(self.create_client()?);
        let branch_path = Self::branch_root(item_full_name, branch);
        Ok(RemoteItemPath::new(
            client,
            self.settings.prefixed(&branch_path),
            path,
        ))
    }
}

impl ItemLifecycleListener for RemoteItemStorage {
    fn on_deleted(&self, item_full_name: &str) {
        self.delete_path(item_full_name);
    }

    fn on_moved(&self, old_full_name: &str, new_full_name: &str) {
        self.move_path(old_full_name, new_full_name);
    }
}
