//! Path adapter mapping object-path navigation onto repository calls.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use jobstash_core::{Error, FileCallable, ObjectPath, Result, WorkspaceFile};

use crate::client::{RepoClient, RepoEndpoint};

/// A node in the remote object tree for one stored item.
///
/// `root` is `prefix/item-full-name` (or the branch-derived variant) and
/// never changes; navigation only extends the relative path. The client is
/// shared between nodes, not owned per node.
pub struct RemoteItemPath {
    client: Arc<RepoClient>,
    root: String,
    path: String,
}

impl RemoteItemPath {
    pub fn new(
        client: Arc<RepoClient>,
        root: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            client,
            root: root.into(),
            path: path.into(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The canonical remote key for this node.
    pub fn full_key(&self) -> String {
        format!("{}/{}", self.root, self.path)
    }
}

impl ObjectPath for RemoteItemPath {
    fn child(&self, relative: &str) -> Self {
        Self {
            client: Arc::clone(&self.client),
            root: self.root.clone(),
            path: format!("{}/{}", self.path, relative),
        }
    }

    fn copy_to(&self, target: &WorkspaceFile) -> Result<()> {
        target.act(&DownloadIntoWorkspace {
            endpoint: self.client.endpoint().clone(),
            key: self.full_key(),
        })
    }

    fn copy_from(&self, source: &WorkspaceFile) -> Result<()> {
        source.act(&UploadFromWorkspace {
            endpoint: self.client.endpoint().clone(),
            key: self.full_key(),
        })
    }

    fn exists(&self) -> Result<bool> {
        Ok(self.client.is_file(&self.full_key()))
    }

    fn delete_recursive(&self) -> Result<()> {
        self.client.delete(&self.full_key())
    }
}

/// Downloads a cache object into a workspace file.
///
/// Runs on the node owning the file: only the endpoint configuration
/// crosses the boundary, and a fresh client is built for this one transfer
/// and torn down with it.
#[derive(Serialize, Deserialize)]
struct DownloadIntoWorkspace {
    endpoint: RepoEndpoint,
    key: String,
}

impl FileCallable for DownloadIntoWorkspace {
    fn invoke(&self, file: &Path) -> Result<()> {
        let transfer = || -> Result<()> {
            let client = RepoClient::connect(self.endpoint.clone())?;
            let mut stream = client.download(&self.key)?;
            let mut out = File::create(file)?;
            io::copy(&mut stream, &mut out)?;
            Ok(())
        };
        transfer().map_err(|e| {
            Error::abort(format!("Unable to download cache from remote storage: {}", e))
        })
    }
}

/// Uploads a workspace file as a cache object. Same scoping rules as the
/// download callable.
#[derive(Serialize, Deserialize)]
struct UploadFromWorkspace {
    endpoint: RepoEndpoint,
    key: String,
}

impl FileCallable for UploadFromWorkspace {
    fn invoke(&self, file: &Path) -> Result<()> {
        let transfer = || -> Result<()> {
            let client = RepoClient::connect(self.endpoint.clone())?;
            client.upload(file, &self.key)
        };
        transfer()
            .map_err(|e| Error::abort(format!("Unable to upload cache to remote storage: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> RemoteItemPath {
        let endpoint = RepoEndpoint::new("http://repo.example.com", "generic-local", None);
        let client = Arc::new(RepoClient::connect(endpoint).unwrap());
        RemoteItemPath::new(client, "jenkins/my-job", "branch-a")
    }

    #[test]
    fn child_extends_path_and_keeps_root() {
        let child = node().child("cache.tar");
        assert_eq!(child.root(), "jenkins/my-job");
        assert_eq!(child.path(), "branch-a/cache.tar");
        assert_eq!(child.full_key(), "jenkins/my-job/branch-a/cache.tar");
    }

    #[test]
    fn nested_children_compose() {
        let leaf = node().child("a").child("b");
        assert_eq!(leaf.path(), "branch-a/a/b");
        assert_eq!(leaf.root(), "jenkins/my-job");
    }
}
