//! L0: random-access byte-addressable storage.
//!
//! A [`DataStorage`] is exclusively owned by the filesystem that mounts it
//! for the duration of the mount (see `fatvol_fat::FileSystem::mount`). It
//! has no cache, no read-ahead, and no write-back buffering — every call
//! reaches the underlying medium before returning.

use fatvol_err::Result;

pub trait DataStorage {
    /// Reads exactly `buffer.len()` bytes starting at `offset`.
    fn read(&self, offset: u64, buffer: &mut [u8]) -> Result<()>;

    /// Writes exactly `buffer.len()` bytes starting at `offset`.
    fn write(&self, offset: u64, buffer: &[u8]) -> Result<()>;

    /// Total size of the underlying medium in bytes, used to reject
    /// out-of-range reads/writes and to sanity-check the boot sector's
    /// reported geometry against the actual volume size.
    fn size(&self) -> Result<u64>;
}
