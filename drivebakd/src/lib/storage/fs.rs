use async_stream::try_stream;
use drivebak::{
    path::{FsPath, FsPathBuf},
    Result,
};
use futures::{future::BoxFuture, Stream};
use tokio::fs;

/// Classification of a local path, following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalKind {
    Regular { size: u64 },
    Directory,
    /// Neither a regular file nor a directory: broken symlink, device,
    /// fifo, or a path whose metadata can't be read.
    Special,
}

pub async fn classify(path: &FsPath) -> LocalKind {
    match fs::metadata(path).await {
        Ok(md) if md.is_file() => LocalKind::Regular { size: md.len() },
        Ok(md) if md.is_dir() => LocalKind::Directory,
        _ => LocalKind::Special,
    }
}

/// Streams the immediate children of `parent`, in file system
/// enumeration order.
pub fn dir_entries(parent: &FsPath) -> impl Stream<Item = Result<FsPathBuf>> + Send + '_ {
    try_stream! {
        let mut read_dir = fs::read_dir(parent).await?;
        loop {
            match read_dir.next_entry().await? {
                None => break,
                Some(entry) => {
                    yield FsPathBuf::try_from(entry.path())?;
                }
            }
        }
    }
}

/// Counts the regular files under `path`, recursively.
pub fn file_count(path: &FsPath) -> BoxFuture<'_, Result<u64>> {
    Box::pin(async move {
        let mut count = 0;
        let mut read_dir = fs::read_dir(path).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let md = entry.metadata().await?;
            if md.is_dir() {
                let child = FsPathBuf::try_from(entry.path())?;
                count += file_count(&child).await?;
            } else if md.is_file() {
                count += 1;
            }
        }
        Ok(count)
    })
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::{classify, dir_entries, file_count, LocalKind};
    use crate::testutil::{temp_path, Node};

    const TREE: &[Node] = &[
        Node::File {
            name: "a.txt",
            content: "hello",
        },
        Node::Dir {
            name: "sub",
            children: &[Node::File {
                name: "b.txt",
                content: "world",
            }],
        },
    ];

    #[tokio::test]
    async fn classifies_files_and_directories() {
        let root = temp_path("drivebak-fs");
        crate::testutil::create_tree(&root, TREE).await;

        assert_eq!(
            classify(&root.join("a.txt")).await,
            LocalKind::Regular { size: 5 }
        );
        assert_eq!(classify(&root.join("sub")).await, LocalKind::Directory);
        assert_eq!(classify(&root.join("missing")).await, LocalKind::Special);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn classifies_broken_symlink_as_special() {
        let root = temp_path("drivebak-fs");
        crate::testutil::create_tree(&root, &[]).await;
        let link = root.join("dangling");
        std::os::unix::fs::symlink("no-such-target", &link).unwrap();

        assert_eq!(classify(&link).await, LocalKind::Special);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn lists_immediate_children() {
        let root = temp_path("drivebak-fs");
        crate::testutil::create_tree(&root, TREE).await;

        let entries = dir_entries(&root);
        tokio::pin!(entries);
        let mut names = Vec::new();
        while let Some(entry) = entries.next().await {
            names.push(entry.unwrap().file_name().unwrap().to_string());
        }
        names.sort();
        assert_eq!(names, ["a.txt", "sub"]);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn counts_files_recursively() {
        let root = temp_path("drivebak-fs");
        crate::testutil::create_tree(&root, TREE).await;

        assert_eq!(file_count(&root).await.unwrap(), 2);

        let _ = std::fs::remove_dir_all(&root);
    }
}
