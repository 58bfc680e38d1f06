use std::fmt;

use drivebak::Result;
use futures::Future;
use serde::{Deserialize, Serialize};
use tokio::io;

pub mod fs;
pub mod gdrive;

/// Opaque identifier assigned to an entry by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for FileId {
    fn from(value: String) -> Self {
        FileId(value)
    }
}

impl From<&str> for FileId {
    fn from(value: &str) -> Self {
        FileId(value.to_string())
    }
}

impl AsRef<str> for FileId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of a remote entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

pub trait FindEntry {
    /// Looks up an entry named `name` directly under `parent_id`
    /// (the remote root when `None`).
    ///
    /// Names are matched with exact, case-sensitive string equality. When
    /// several entries share the name, the first one in the listing order
    /// returned by the service wins. `kind` narrows the search to folders;
    /// a `File` search matches entries of any kind, as the service query
    /// has no negative type filter.
    fn find_entry(
        &self,
        name: &str,
        kind: EntryKind,
        parent_id: Option<&FileId>,
    ) -> impl Future<Output = Result<Option<FileId>>> + Send;
}

pub trait MkDir {
    /// Creates a folder entry unconditionally. Callers resolve first.
    fn mkdir(
        &self,
        parent_id: Option<&FileId>,
        name: &str,
    ) -> impl Future<Output = Result<FileId>> + Send;
}

pub trait CreateFile {
    /// Creates a file entry with `data` as content.
    ///
    /// `mime_type` is a best-effort guess; `None` leaves the content type
    /// to the service.
    fn create_file(
        &self,
        parent_id: Option<&FileId>,
        name: &str,
        mime_type: Option<&str>,
        size: u64,
        data: impl io::AsyncRead + Send,
    ) -> impl Future<Output = Result<FileId>> + Send;
}

pub trait DeleteEntry {
    fn delete(&self, id: &FileId) -> impl Future<Output = Result<()>> + Send;
}

/// An id-addressed remote storage.
pub trait Remote:
    Clone + FindEntry + MkDir + CreateFile + DeleteEntry + Send + Sync + 'static
{
}
