use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io;

use super::traits::{ObjectStore, RefStore, RemoteStore};
use super::RefTable;
use crate::error::{Error, Result};
use crate::git::LocalRepository;
use crate::object::{encode, hash, Kind, ObjectId};

/// In-memory store usable as either side of a session.
#[derive(Default)]
pub struct MemoryStore {
    objects: RefCell<HashMap<ObjectId, Vec<u8>>>,
    refs: RefCell<RefTable>,
    writes: Cell<usize>,
    reads: Cell<usize>,
    /// New objects `put` may still store before failing; `None` is unlimited.
    write_budget: Cell<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame, hash and store `content`, returning its id.
    pub fn insert(&self, kind: Kind, content: &[u8]) -> ObjectId {
        let raw = encode(kind, content);
        let id = hash(&raw);
        self.objects.borrow_mut().insert(id.clone(), raw);
        id
    }

    pub fn blob(&self, content: &str) -> ObjectId {
        self.insert(Kind::Blob, content.as_bytes())
    }

    /// Tree from `(mode, name, id)` entries.
    pub fn tree(&self, entries: &[(&str, &str, &ObjectId)]) -> ObjectId {
        let mut content = Vec::new();
        for (mode, name, id) in entries {
            content.extend_from_slice(format!("{mode} {name}\0").as_bytes());
            content.extend_from_slice(&hex::decode(id.as_str()).unwrap());
        }
        self.insert(Kind::Tree, &content)
    }

    pub fn commit(&self, tree: &ObjectId, parents: &[&ObjectId], message: &str) -> ObjectId {
        let mut text = format!("tree {tree}\n");
        for parent in parents {
            text.push_str(&format!("parent {parent}\n"));
        }
        text.push_str("author A U Thor <author@example.com> 1700000000 +0000\n");
        text.push_str("committer A U Thor <author@example.com> 1700000000 +0000\n");
        text.push_str(&format!("\n{message}\n"));
        self.insert(Kind::Commit, text.as_bytes())
    }

    /// Store bytes under an arbitrary id, bypassing hashing.
    pub fn insert_raw(&self, id: &ObjectId, raw: Vec<u8>) {
        self.objects.borrow_mut().insert(id.clone(), raw);
    }

    /// Number of `put` calls that actually stored new bytes.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    /// Number of `get` calls so far.
    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    /// Make `put` fail once `budget` more new objects were stored.
    pub fn limit_writes(&self, budget: Option<usize>) {
        self.write_budget.set(budget);
    }

    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }
}

impl ObjectStore for MemoryStore {
    fn get(&self, id: &ObjectId) -> Result<Vec<u8>> {
        self.reads.set(self.reads.get() + 1);
        self.objects
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::ObjectNotFound(id.to_string()))
    }

    fn put(&self, id: &ObjectId, data: &[u8]) -> Result<()> {
        let mut objects = self.objects.borrow_mut();
        if !objects.contains_key(id) {
            match self.write_budget.get() {
                Some(0) => {
                    return Err(Error::store_io(
                        format!("memory/{id}"),
                        io::Error::other("write budget exhausted"),
                    ));
                }
                Some(left) => self.write_budget.set(Some(left - 1)),
                None => {}
            }
            objects.insert(id.clone(), data.to_vec());
            self.writes.set(self.writes.get() + 1);
        }
        Ok(())
    }

    fn has(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.objects.borrow().contains_key(id))
    }
}

impl RefStore for MemoryStore {
    fn get_refs(&self) -> Result<RefTable> {
        Ok(self.refs.borrow().clone())
    }

    fn update_refs<F>(&self, update_fn: F) -> Result<()>
    where
        F: FnOnce(&mut RefTable) -> Result<()>,
    {
        let mut refs = self.refs.borrow().clone();
        update_fn(&mut refs)?;
        *self.refs.borrow_mut() = refs;
        Ok(())
    }
}

impl RemoteStore for MemoryStore {
    fn initialize(&self) -> Result<()> {
        Ok(())
    }
}

impl LocalRepository for MemoryStore {
    fn resolve(&self, refname: &str) -> Result<ObjectId> {
        self.refs
            .borrow()
            .get(refname)
            .cloned()
            .ok_or_else(|| Error::Git(format!("unknown revision {refname}")))
    }
}
