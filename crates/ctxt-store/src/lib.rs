//! Named blob persistence for keys.
//!
//! The crypto layer only ever needs "bytes under a name", so storage sits
//! behind [`BlobStore`] with a filesystem and an in-memory implementation.

mod fs;
mod memory;

use thiserror::Error;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o on blob {id:?}: {source}")]
    Io {
        id: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid blob id {0:?}")]
    InvalidId(String),
    #[error("blob store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait BlobStore: Send + Sync {
    /// Bytes stored under `id`, or `None` if nothing is.
    fn get(&self, id: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Store `bytes` under `id`, replacing any previous value.
    fn put(&self, id: &str, bytes: &[u8]) -> StoreResult<()>;

    /// Store `bytes` under `id` only if nothing is stored there yet.
    ///
    /// Returns `false` and leaves the existing value alone if `id` is taken.
    /// The check and the write are one step, so two writers sharing the
    /// backing storage cannot both succeed.
    fn put_new(&self, id: &str, bytes: &[u8]) -> StoreResult<bool>;

    /// All ids currently stored, in no particular order.
    fn list(&self) -> StoreResult<Vec<String>>;
}

const TEMP_SUFFIX: &str = ".tmp";

/// Ids must name a single file: no separators, no dot entries, and nothing
/// that could be mistaken for an in-flight temp file.
pub(crate) fn validate_id(id: &str) -> StoreResult<()> {
    let ok = !id.is_empty()
        && id != "."
        && id != ".."
        && !id.ends_with(TEMP_SUFFIX)
        && !id.contains(['/', '\\', '\0']);
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}
