//! Test support: temp file trees and an in-memory remote.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use drivebak::{
    api_bail,
    path::{FsPath, FsPathBuf},
    Result,
};
use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::storage::{CreateFile, DeleteEntry, EntryKind, FileId, FindEntry, MkDir, Remote};

pub fn temp_path(prefix: &str) -> FsPathBuf {
    use rand::{distributions::Alphanumeric, Rng};

    let rnd: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(7)
        .map(char::from)
        .collect();
    let mut p = std::env::temp_dir();
    p.push(format!("{prefix}-{rnd}"));
    p.try_into().unwrap()
}

#[derive(Debug, Copy, Clone)]
pub enum Node {
    Dir {
        name: &'static str,
        children: &'static [Node],
    },
    File {
        name: &'static str,
        content: &'static str,
    },
}

impl Node {
    fn create_fs<'a>(&'a self, path: &'a FsPath) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            match self {
                Node::Dir { name, children } => {
                    let path = path.join(name);
                    tokio::fs::create_dir(&path).await.unwrap();
                    for child in children.iter() {
                        child.create_fs(&path).await;
                    }
                }
                Node::File { name, content } => {
                    tokio::fs::write(path.join(name), content).await.unwrap();
                }
            }
        })
    }
}

pub async fn create_tree(root: &FsPath, nodes: &[Node]) {
    tokio::fs::create_dir_all(root).await.unwrap();
    for node in nodes {
        node.create_fs(root).await;
    }
}

/// One entry held by [`StubRemote`].
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: FileId,
    pub name: String,
    pub kind: EntryKind,
    pub parent: Option<FileId>,
    pub mime_type: Option<String>,
    pub content: Vec<u8>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    entries: Vec<Entry>,
    fail_uploads: HashSet<String>,
}

impl Inner {
    fn next_id(&mut self) -> FileId {
        self.next_id += 1;
        FileId::from(format!("id-{}", self.next_id))
    }
}

/// In-memory stand-in for the Drive storage, with the same name lookup
/// semantics: listing order is insertion order, a file search has no type
/// filter, a folder search matches folders only.
#[derive(Debug, Clone, Default)]
pub struct StubRemote {
    inner: Arc<Mutex<Inner>>,
}

impl StubRemote {
    pub fn fail_upload(&self, name: &str) {
        self.inner
            .lock()
            .unwrap()
            .fail_uploads
            .insert(name.to_string());
    }

    pub fn child(&self, parent: &FileId, name: &str) -> Option<Entry> {
        let inner = self.inner.lock().unwrap();
        inner
            .entries
            .iter()
            .find(|e| e.parent.as_ref() == Some(parent) && e.name == name)
            .cloned()
    }

    pub fn children_of(&self, parent: &FileId) -> Vec<Entry> {
        let inner = self.inner.lock().unwrap();
        inner
            .entries
            .iter()
            .filter(|e| e.parent.as_ref() == Some(parent))
            .cloned()
            .collect()
    }

    pub fn entry_count(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    /// Snapshot of the subtree under `parent` as sorted (path, kind) pairs.
    pub fn tree_names(&self, parent: &FileId) -> Vec<(String, EntryKind)> {
        fn walk(
            entries: &[Entry],
            parent: &FileId,
            prefix: &str,
            out: &mut Vec<(String, EntryKind)>,
        ) {
            for e in entries.iter().filter(|e| e.parent.as_ref() == Some(parent)) {
                let path = format!("{prefix}/{}", e.name);
                out.push((path.clone(), e.kind));
                if e.kind == EntryKind::Folder {
                    walk(entries, &e.id, &path, out);
                }
            }
        }

        let inner = self.inner.lock().unwrap();
        let mut out = Vec::new();
        walk(&inner.entries, parent, "", &mut out);
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

impl FindEntry for StubRemote {
    async fn find_entry(
        &self,
        name: &str,
        kind: EntryKind,
        parent_id: Option<&FileId>,
    ) -> Result<Option<FileId>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .entries
            .iter()
            .find(|e| {
                e.name == name
                    && e.parent.as_ref() == parent_id
                    && match kind {
                        EntryKind::File => true,
                        EntryKind::Folder => e.kind == EntryKind::Folder,
                    }
            })
            .map(|e| e.id.clone()))
    }
}

impl MkDir for StubRemote {
    async fn mkdir(&self, parent_id: Option<&FileId>, name: &str) -> Result<FileId> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        inner.entries.push(Entry {
            id: id.clone(),
            name: name.to_string(),
            kind: EntryKind::Folder,
            parent: parent_id.cloned(),
            mime_type: None,
            content: Vec::new(),
        });
        Ok(id)
    }
}

impl CreateFile for StubRemote {
    async fn create_file(
        &self,
        parent_id: Option<&FileId>,
        name: &str,
        mime_type: Option<&str>,
        size: u64,
        data: impl AsyncRead + Send,
    ) -> Result<FileId> {
        let mut content = Vec::with_capacity(size as usize);
        tokio::pin!(data);
        data.read_to_end(&mut content).await?;

        let mut inner = self.inner.lock().unwrap();
        if inner.fail_uploads.contains(name) {
            api_bail!("injected failure uploading {name}");
        }
        let id = inner.next_id();
        inner.entries.push(Entry {
            id: id.clone(),
            name: name.to_string(),
            kind: EntryKind::File,
            parent: parent_id.cloned(),
            mime_type: mime_type.map(str::to_string),
            content,
        });
        Ok(id)
    }
}

impl DeleteEntry for StubRemote {
    async fn delete(&self, id: &FileId) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.entries.len();
        inner.entries.retain(|e| &e.id != id);
        if inner.entries.len() == before {
            api_bail!("no such entry: {id}");
        }
        Ok(())
    }
}

impl Remote for StubRemote {}
