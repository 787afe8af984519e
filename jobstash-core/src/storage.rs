//! Storage backend traits: object paths, item storage, lifecycle hooks.

use crate::error::Result;
use crate::workspace::WorkspaceFile;

/// A node in the remote object tree for one stored item.
///
/// Nodes are immutable; `child` derives a new node without touching the
/// network. Transfer operations run on the execution context that owns the
/// workspace file, so implementations must be able to rebuild their remote
/// client from configuration alone on the receiving side.
pub trait ObjectPath: Sized {
    /// Derives the node one level down. No remote call.
    fn child(&self, relative: &str) -> Self;

    /// Downloads this node's object into the given workspace file.
    ///
    /// # Errors
    ///
    /// Any underlying failure is wrapped into [`crate::Error::Abort`] with
    /// a message carrying the original cause.
    fn copy_to(&self, target: &WorkspaceFile) -> Result<()>;

    /// Uploads the workspace file's content to this node's key.
    ///
    /// # Errors
    ///
    /// Any underlying failure is wrapped into [`crate::Error::Abort`] with
    /// a message carrying the original cause.
    fn copy_from(&self, source: &WorkspaceFile) -> Result<()>;

    /// True iff the remote classifies this node's key as a file.
    ///
    /// Folders do not "exist" in this sense, and neither does a key whose
    /// metadata lookup failed.
    fn exists(&self) -> Result<bool>;

    /// Deletes the object or folder subtree at this node's key.
    fn delete_recursive(&self) -> Result<()>;
}

/// A storage backend that roots object paths for build items.
///
/// Backends are interchangeable; the build server selects one and programs
/// against this trait only.
pub trait ItemStorage: Send + Sync {
    type Path: ObjectPath;

    /// Resolves the node for an item's cache path.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be constructed.
    fn object_path(&self, item_full_name: &str, path: &str) -> Result<Self::Path>;

    /// Resolves the node for a branch sibling of an item.
    ///
    /// The root is derived from the item's parent path plus the branch
    /// name, so branch jobs under one folder share cache ancestry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be constructed.
    fn object_path_for_branch(
        &self,
        item_full_name: &str,
        path: &str,
        branch: &str,
    ) -> Result<Self::Path>;
}

/// Best-effort cleanup hooks driven by item lifecycle events.
///
/// These run in event-listener contexts with no caller to report to:
/// implementations log failures and swallow them, never propagate.
pub trait ItemLifecycleListener: Send + Sync {
    /// Called after an item was deleted; removes its stored data.
    fn on_deleted(&self, item_full_name: &str);

    /// Called after an item was renamed or moved; relocates its stored
    /// data.
    fn on_moved(&self, old_full_name: &str, new_full_name: &str);
}
