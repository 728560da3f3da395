use crate::error::Result;
#[cfg(test)]
use crate::object::{self, Object};
use crate::object::ObjectId;

use super::RefTable;

/// Content-addressed store of framed object bytes (`"<kind> <length>\0<content>"`).
pub trait ObjectStore {
    /// Read the framed bytes of an object.
    /// Fails with `ObjectNotFound` if the id is not present.
    fn get(&self, id: &ObjectId) -> Result<Vec<u8>>;

    /// Store framed bytes under `id`.
    /// Writing an id that is already present is a no-op success.
    fn put(&self, id: &ObjectId, data: &[u8]) -> Result<()>;

    fn has(&self, id: &ObjectId) -> Result<bool>;

    /// Read and decode an object.
    #[cfg(test)]
    fn load(&self, id: &ObjectId) -> Result<Object> {
        object::decode(id, &self.get(id)?)
    }
}

/// Persistent mapping of ref names to object ids.
pub trait RefStore {
    /// Snapshot of the whole table.
    fn get_refs(&self) -> Result<RefTable>;

    /// Read-modify-write of the table as one transaction.
    /// The table is persisted in full only if `update_fn` succeeds.
    fn update_refs<F>(&self, update_fn: F) -> Result<()>
    where
        F: FnOnce(&mut RefTable) -> Result<()>;

    /// Point `name` at `target`, or remove it when `target` is `None`.
    fn set_ref(&self, name: &str, target: Option<&ObjectId>) -> Result<()> {
        self.update_refs(|refs| {
            refs.set(name, target.cloned());
            Ok(())
        })
    }
}

/// The remote side of a session: objects plus refs sharing one lifetime.
pub trait RemoteStore: ObjectStore + RefStore {
    /// Create directories or otherwise prepare the backing medium.
    fn initialize(&self) -> Result<()>;
}
