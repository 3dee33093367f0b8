//! In-memory SimpleFS instance.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;
use sfs_dir::{Directory, FragmentAllocator};
use sfs_error::{Result, SfsError};
use sfs_node::{Inode, MemoryStorage};
use sfs_types::{BlockSize, DirEntry, FilesystemConfig, FragmentId, NodeKind};
use tracing::{debug, info};

type Node = Arc<Inode<MemoryStorage>>;

/// Filesystem owning every node and handing out fragment ids.
///
/// Nodes are shared through `Arc`, so a handle obtained from
/// [`SimpleFilesystem::open_node`] stays usable after its entry is unlinked.
#[derive(Debug)]
pub struct SimpleFilesystem {
    config: FilesystemConfig,
    nodes: RwLock<HashMap<FragmentId, Node>>,
    next_id: AtomicU32,
}

impl SimpleFilesystem {
    /// Build a filesystem with an empty root directory.
    pub fn format(config: FilesystemConfig) -> Result<Self> {
        let fs = Self {
            config,
            nodes: RwLock::new(HashMap::new()),
            next_id: AtomicU32::new(FragmentId::ROOT.get() + 1),
        };
        let root = Arc::new(Inode::new(
            FragmentId::ROOT,
            "/",
            NodeKind::Directory,
            MemoryStorage::new(),
        ));
        Directory::open(&root, config.block_size)?.create()?;
        fs.nodes.write().insert(FragmentId::ROOT, root);
        info!(
            block_size = config.block_size.get(),
            entries_per_block = config.entries_per_block(),
            "formatted filesystem"
        );
        Ok(fs)
    }

    #[must_use]
    pub fn config(&self) -> &FilesystemConfig {
        &self.config
    }

    pub fn root(&self) -> Result<Node> {
        self.open_node(FragmentId::ROOT)
    }

    /// Shared handle to node `id`.
    pub fn open_node(&self, id: FragmentId) -> Result<Node> {
        self.nodes
            .read()
            .get(&id)
            .cloned()
            .ok_or(SfsError::NodeNotFound { id: id.get() })
    }

    /// Number of nodes currently in the table, root included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.read().len()
    }

    /// Run `f` against directory `id`.
    pub fn with_directory<R>(
        &self,
        id: FragmentId,
        f: impl FnOnce(&Directory<'_, MemoryStorage>) -> Result<R>,
    ) -> Result<R> {
        let node = self.open_node(id)?;
        let dir = Directory::open(&node, self.block_size())?;
        f(&dir)
    }

    /// Remove `name` from `parent` and drop its node from the table.
    ///
    /// A subdirectory must be empty first. An absent name is a no-op and
    /// returns an entry carrying `INVALID_ID`. Like creation, the emptiness
    /// check and the removal are separate lock acquisitions; the removal only
    /// tombstones the entry if it still links the child that was checked; if
    /// the name was re-linked in between, nothing is unlinked and the result
    /// carries `INVALID_ID`.
    pub fn unlink(&self, parent: &Directory<'_, MemoryStorage>, name: &str) -> Result<DirEntry> {
        let found = parent.find(name)?;
        if !found.is_live() {
            return Ok(found);
        }
        let child = self.open_node(found.id())?;
        if child.kind() == NodeKind::Directory
            && !Directory::open(&child, self.block_size())?.is_empty()?
        {
            return Err(SfsError::NotEmpty {
                name: name.to_owned(),
            });
        }

        let removed = parent.remove_linked(name, found.id())?;
        if removed.is_live() {
            self.nodes.write().remove(&removed.id());
            debug!(
                parent = parent.node().id().get(),
                name,
                id = removed.id().get(),
                "unlinked node"
            );
        } else {
            debug!(
                parent = parent.node().id().get(),
                name,
                checked = found.id().get(),
                "entry changed before unlink, left in place"
            );
        }
        Ok(removed)
    }

    fn allocate_id(&self) -> Result<FragmentId> {
        let raw = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = FragmentId::new(raw);
        if !id.is_valid() {
            return Err(SfsError::internal("fragment ids exhausted"));
        }
        Ok(id)
    }

    /// Allocate a node of `kind`, let `init` shape its data, then link it into
    /// `parent`.
    fn create_child(
        &self,
        parent: &Directory<'_, MemoryStorage>,
        name: &str,
        kind: NodeKind,
        init: impl FnOnce(&Inode<MemoryStorage>) -> Result<()>,
    ) -> Result<FragmentId> {
        let id = self.allocate_id()?;
        let entry = DirEntry::new(name, id)?;
        let node = Arc::new(Inode::new(
            id,
            name,
            NodeKind::Unknown,
            MemoryStorage::new(),
        ));
        node.lock().set_kind(kind);
        init(&node)?;
        self.nodes.write().insert(id, node);

        if let Err(err) = parent.add_entry(&entry) {
            self.nodes.write().remove(&id);
            return Err(err);
        }
        debug!(
            parent = parent.node().id().get(),
            name,
            id = id.get(),
            %kind,
            "linked new node"
        );
        Ok(id)
    }
}

impl FragmentAllocator for SimpleFilesystem {
    type Storage = MemoryStorage;

    fn block_size(&self) -> BlockSize {
        self.config.block_size
    }

    fn make_directory(
        &self,
        parent: &Directory<'_, MemoryStorage>,
        name: &str,
    ) -> Result<FragmentId> {
        let block_size = self.block_size();
        self.create_child(parent, name, NodeKind::Directory, |node| {
            Directory::open(node, block_size)?.create()
        })
    }

    fn make_file(&self, parent: &Directory<'_, MemoryStorage>, name: &str) -> Result<FragmentId> {
        self.create_child(parent, name, NodeKind::File, |_| Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfs_types::INVALID_ID;

    #[test]
    fn format_creates_empty_root() {
        let fs = SimpleFilesystem::format(FilesystemConfig::default()).unwrap();
        assert_eq!(fs.node_count(), 1);
        let root = fs.root().unwrap();
        assert_eq!(root.kind(), NodeKind::Directory);
        assert_eq!(root.size(), 4096);
        assert!(fs.with_directory(FragmentId::ROOT, |d| d.is_empty()).unwrap());
    }

    #[test]
    fn ids_are_monotonic() {
        let fs = SimpleFilesystem::format(FilesystemConfig::default()).unwrap();
        let a = fs.allocate_id().unwrap();
        let b = fs.allocate_id().unwrap();
        assert!(b > a);
        assert_ne!(a, INVALID_ID);
    }

    #[test]
    fn missing_node_is_reported() {
        let fs = SimpleFilesystem::format(FilesystemConfig::default()).unwrap();
        let err = fs.open_node(FragmentId::new(77)).unwrap_err();
        assert!(matches!(err, SfsError::NodeNotFound { id: 77 }));
    }

    #[test]
    fn bad_name_allocates_no_node() {
        let fs = SimpleFilesystem::format(FilesystemConfig::default()).unwrap();
        let root = fs.root().unwrap();
        let dir = Directory::open(&root, fs.block_size()).unwrap();
        let long = "y".repeat(97);
        assert!(matches!(
            dir.make_file(&fs, &long),
            Err(SfsError::NameTooLong { .. })
        ));
        assert_eq!(fs.node_count(), 1, "case=no_orphan_node");
    }

    #[test]
    fn children_are_typed_before_linking() {
        let fs = SimpleFilesystem::format(FilesystemConfig::default()).unwrap();
        let root = fs.root().unwrap();
        let dir = Directory::open(&root, fs.block_size()).unwrap();
        let mut seen = None;
        let id = fs
            .create_child(&dir, "spool", NodeKind::Directory, |node| {
                seen = Some(node.kind());
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, Some(NodeKind::Directory), "case=kind_set_before_init");
        assert_eq!(fs.open_node(id).unwrap().kind(), NodeKind::Directory);
    }
}
