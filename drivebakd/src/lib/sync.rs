//! Recursive mirroring of a local subtree onto the remote tree.
//!
//! The mirror only ever grows or overwrites: remote entries that no longer
//! correspond to a local path are never pruned.

use drivebak::{other_error, path::FsPath, Result};
use futures::{future::BoxFuture, StreamExt};

use crate::storage::{
    fs::{self, LocalKind},
    EntryKind, FileId, Remote,
};

/// Mirrors `local` into the remote tree, directly under `parent_id`.
///
/// A regular file is uploaded, replacing any remote file entry with the
/// same base name. A directory is mapped to a remote folder (reused when
/// one with the same name exists, created otherwise) and its children are
/// processed recursively, in file system enumeration order. Anything else
/// is silently skipped.
pub fn backup_path<'a, R>(
    remote: &'a R,
    local: &'a FsPath,
    parent_id: Option<&'a FileId>,
) -> BoxFuture<'a, Result<()>>
where
    R: Remote,
{
    Box::pin(async move {
        match fs::classify(local).await {
            LocalKind::Regular { size } => upload_file(remote, local, size, parent_id).await,
            LocalKind::Directory => backup_dir(remote, local, parent_id).await,
            LocalKind::Special => Ok(()),
        }
    })
}

async fn backup_dir<R>(remote: &R, local: &FsPath, parent_id: Option<&FileId>) -> Result<()>
where
    R: Remote,
{
    let name = base_name(local)?;
    let folder_id = match remote.find_entry(name, EntryKind::Folder, parent_id).await? {
        Some(id) => id,
        None => remote.mkdir(parent_id, name).await?,
    };

    let entries = fs::dir_entries(local);
    tokio::pin!(entries);
    while let Some(child) = entries.next().await {
        let child = child?;
        backup_path(remote, &child, Some(&folder_id)).await?;
    }
    Ok(())
}

/// Uploads one file, delete-then-create on name collision. There is no
/// in-place update: same name means one entry, latest content wins.
async fn upload_file<R>(
    remote: &R,
    local: &FsPath,
    size: u64,
    parent_id: Option<&FileId>,
) -> Result<()>
where
    R: Remote,
{
    let name = base_name(local)?;
    if let Some(existing) = remote.find_entry(name, EntryKind::File, parent_id).await? {
        remote.delete(&existing).await?;
    }

    let mime_type = mime_guess::from_path(local).first_raw();
    let data = tokio::fs::File::open(local).await?;
    remote
        .create_file(parent_id, name, mime_type, size, data)
        .await?;
    Ok(())
}

fn base_name(path: &FsPath) -> Result<&str> {
    path.file_name()
        .ok_or_else(|| other_error!("cannot determine the base name of {path}"))
}
