//! Remote binary-repository storage backend.
//!
//! Job cache data lives in a generic binary repository reached over REST:
//! `PUT`/`GET`/`DELETE` on repository keys, server-side move/copy, a stat
//! endpoint exposing folder/size/last-modified metadata, and a pattern
//! search for folder listings. Keys mirror job names under a configurable
//! prefix.

mod client;
mod item_path;
mod settings;
mod storage;

pub use client::{RepoClient, RepoEndpoint};
pub use item_path::RemoteItemPath;
pub use settings::RemoteStorageSettings;
pub use storage::RemoteItemStorage;
