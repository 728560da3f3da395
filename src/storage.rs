mod filesystem;
#[cfg(test)]
mod memory;
mod ref_table;
mod traits;

pub use filesystem::FilesystemStorage;
#[cfg(test)]
pub use memory::MemoryStore;
pub use ref_table::RefTable;
pub use traits::{ObjectStore, RefStore, RemoteStore};
