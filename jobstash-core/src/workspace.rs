//! Workspace file handles and cross-agent dispatch.
//!
//! A build workspace may live on a different node than the process holding
//! the storage backend. File operations are therefore expressed as
//! callables dispatched through an executor that runs them wherever the
//! file actually is. Callables must hold only serializable state (endpoint
//! configuration, keys), never live connections.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::trace;

use crate::error::Result;

/// An operation against the resolved local path of a workspace file.
///
/// Runs on the node that owns the file.
pub trait FileCallable: Send {
    fn invoke(&self, file: &Path) -> Result<()>;
}

/// Dispatches callables to the execution context owning a file.
///
/// Remote-aware executors (shipping the callable's state to an agent and
/// rebuilding it there) plug in here; this crate only ships the in-process
/// one.
pub trait AgentExecutor: Send + Sync {
    fn act(&self, file: &Path, callable: &dyn FileCallable) -> Result<()>;
}

/// Runs callables in-process, for files on the local node.
pub struct LocalExecutor;

impl AgentExecutor for LocalExecutor {
    fn act(&self, file: &Path, callable: &dyn FileCallable) -> Result<()> {
        trace!(file = %file.display(), "running file callable locally");
        callable.invoke(file)
    }
}

/// A file in a build workspace, possibly on a remote agent.
#[derive(Clone)]
pub struct WorkspaceFile {
    path: PathBuf,
    executor: Arc<dyn AgentExecutor>,
}

impl WorkspaceFile {
    /// A file on the local node.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::with_executor(path, Arc::new(LocalExecutor))
    }

    /// A file reachable through the given executor.
    pub fn with_executor(path: impl Into<PathBuf>, executor: Arc<dyn AgentExecutor>) -> Self {
        Self {
            path: path.into(),
            executor,
        }
    }

    /// The file's path on its owning node.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs the callable on the node that owns this file.
    pub fn act(&self, callable: &dyn FileCallable) -> Result<()> {
        self.executor.act(&self.path, callable)
    }

    /// Writes the reader's full content to this file, creating parent
    /// directories as needed.
    pub fn copy_from(&self, reader: &mut dyn Read) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&self.path)?;
        io::copy(reader, &mut out)?;
        Ok(())
    }
}

impl std::fmt::Debug for WorkspaceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceFile")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copy_from_writes_full_stream() {
        let dir = TempDir::new().unwrap();
        let file = WorkspaceFile::local(dir.path().join("nested/cache.tar"));

        let mut content: &[u8] = b"cached bytes";
        file.copy_from(&mut content).unwrap();

        assert_eq!(fs::read(file.path()).unwrap(), b"cached bytes");
    }

    #[test]
    fn local_executor_runs_callable_in_process() {
        struct Touch;

        impl FileCallable for Touch {
            fn invoke(&self, file: &Path) -> Result<()> {
                File::create(file)?;
                Ok(())
            }
        }

        let dir = TempDir::new().unwrap();
        let file = WorkspaceFile::local(dir.path().join("marker"));

        file.act(&Touch).unwrap();
        assert!(file.path().exists());
    }
}
