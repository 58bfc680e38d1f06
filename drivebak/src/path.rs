//! UTF-8 file system paths.
//! Backup sources and all on-disk locations are required to be valid UTF-8.

pub use camino::{Utf8Path as FsPath, Utf8PathBuf as FsPathBuf};
