use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use fs4::FileExt;
use tempfile::NamedTempFile;

use super::traits::{ObjectStore, RefStore, RemoteStore};
use super::RefTable;
use crate::error::{Error, Result};
use crate::object::ObjectId;

/// First byte of a zlib stream at the default window size.
const ZLIB_MAGIC: u8 = 0x78;

/// Filesystem-backed remote store.
///
/// Layout under the root:
/// - `objects/<2 hex>/<38 hex>`: one framed object per file
/// - `refs.json`: the ref table, replaced atomically on every change
/// - `refs.lock`: advisory lock serializing ref table updates
pub struct FilesystemStorage {
    base_path: PathBuf,
    compress: bool,
}

impl FilesystemStorage {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        FilesystemStorage {
            base_path: base_path.as_ref().to_path_buf(),
            compress: false,
        }
    }

    /// Deflate objects on write. Reads accept both encodings regardless.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    fn objects_dir(&self) -> PathBuf {
        self.base_path.join("objects")
    }

    fn object_path(&self, id: &ObjectId) -> PathBuf {
        let (shard, rest) = id.split_path();
        self.objects_dir().join(shard).join(rest)
    }

    fn refs_path(&self) -> PathBuf {
        self.base_path.join("refs.json")
    }

    fn lock_path(&self) -> PathBuf {
        self.base_path.join("refs.lock")
    }

    /// Write `data` next to `path` and rename it into place.
    fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir).map_err(|e| Error::store_io(dir, e))?;
        temp.write_all(data).map_err(|e| Error::store_io(temp.path(), e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| Error::store_io(temp.path(), e))?;
        temp.persist(path)
            .map_err(|e| Error::store_io(path, e.error))?;
        Ok(())
    }

    fn read_refs(&self) -> Result<RefTable> {
        let path = self.refs_path();
        match fs::read(&path) {
            Ok(bytes) => RefTable::from_json(&bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(RefTable::default()),
            Err(e) => Err(Error::store_io(path, e)),
        }
    }
}

impl ObjectStore for FilesystemStorage {
    fn get(&self, id: &ObjectId) -> Result<Vec<u8>> {
        let path = self.object_path(id);
        let stored = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::ObjectNotFound(id.to_string()))
            }
            Err(e) => return Err(Error::store_io(path, e)),
        };

        if stored.first() != Some(&ZLIB_MAGIC) {
            return Ok(stored);
        }

        let mut data = Vec::new();
        ZlibDecoder::new(&stored[..])
            .read_to_end(&mut data)
            .map_err(|e| Error::store_io(&path, e))?;
        Ok(data)
    }

    fn put(&self, id: &ObjectId, data: &[u8]) -> Result<()> {
        let path = self.object_path(id);
        if path.exists() {
            tracing::trace!("object {} already stored", id);
            return Ok(());
        }

        if let Some(shard) = path.parent() {
            fs::create_dir_all(shard).map_err(|e| Error::store_io(shard, e))?;
        }

        if !self.compress {
            return Self::write_atomic(&path, data);
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(data)
            .map_err(|e| Error::store_io(&path, e))?;
        let deflated = encoder.finish().map_err(|e| Error::store_io(&path, e))?;
        Self::write_atomic(&path, &deflated)
    }

    fn has(&self, id: &ObjectId) -> Result<bool> {
        let path = self.object_path(id);
        path.try_exists().map_err(|e| Error::store_io(path, e))
    }
}

impl RefStore for FilesystemStorage {
    fn get_refs(&self) -> Result<RefTable> {
        self.read_refs()
    }

    fn update_refs<F>(&self, update_fn: F) -> Result<()>
    where
        F: FnOnce(&mut RefTable) -> Result<()>,
    {
        let lock_path = self.lock_path();
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| Error::store_io(&lock_path, e))?;
        // Released when `lock` is dropped.
        lock.lock_exclusive()
            .map_err(|e| Error::store_io(&lock_path, e))?;

        let mut refs = self.read_refs()?;
        update_fn(&mut refs)?;
        Self::write_atomic(&self.refs_path(), &refs.to_json()?)
    }
}

impl RemoteStore for FilesystemStorage {
    fn initialize(&self) -> Result<()> {
        let objects = self.objects_dir();
        fs::create_dir_all(&objects).map_err(|e| Error::store_io(objects, e))
    }
}
