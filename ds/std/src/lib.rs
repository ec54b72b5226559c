// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A [`DataStorage`] backed by a plain [`std::fs::File`] — the block device
//! a caller hands to the engine's `mount` when the volume is a disk image
//! or a raw device node rather than embedded storage.

use std::{fs::File, io, os::unix::fs::FileExt, path::Path};

use fatvol_ds::DataStorage;
use fatvol_err::{Error, IoError, Result};
use log::error;

pub struct DataStorageServer {
    file: File,
    size: u64,
}

impl DataStorageServer {
    /// Opens `path` for read-write access. The returned handle exclusively
    /// owns the file for as long as it (and the filesystem mounted on it)
    /// is alive; dropping it closes the underlying OS handle.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|err| Error::Io(map_os_error(err)))?;
        let size = file
            .metadata()
            .map_err(|err| Error::Io(map_os_error(err)))?
            .len();
        Ok(Self { file, size })
    }

    /// Flushes any buffered OS-level state to the underlying medium. There
    /// is no write-back cache in this engine, so this only needs to reach
    /// down to `fsync`; it is what `close`/`unmount` calls before releasing
    /// the handle.
    pub fn flush(&self) -> Result<()> {
        self.file
            .sync_all()
            .map_err(|err| Error::Io(map_os_error(err)))
    }
}

impl DataStorage for DataStorageServer {
    fn read(&self, offset: u64, buffer: &mut [u8]) -> Result<()> {
        check_range(offset, buffer.len(), self.size)?;
        self.file.read_exact_at(buffer, offset).map_err(|err| {
            error!(
                "read at offset {offset} ({} bytes) failed: {err}",
                buffer.len()
            );
            if err.kind() == io::ErrorKind::UnexpectedEof {
                Error::Io(IoError::UnexpectedEof)
            } else {
                Error::Io(map_os_error(err))
            }
        })
    }

    fn write(&self, offset: u64, buffer: &[u8]) -> Result<()> {
        check_range(offset, buffer.len(), self.size)?;
        self.file.write_all_at(buffer, offset).map_err(|err| {
            error!(
                "write at offset {offset} ({} bytes) failed: {err}",
                buffer.len()
            );
            Error::Io(map_os_error(err))
        })
    }

    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }
}

fn check_range(offset: u64, len: usize, size: u64) -> Result<()> {
    let end = offset
        .checked_add(len as u64)
        .ok_or(Error::Io(IoError::BadOffset { offset, len, size }))?;
    if end > size {
        return Err(Error::Io(IoError::BadOffset { offset, len, size }));
    }
    Ok(())
}

fn map_os_error(err: io::Error) -> IoError {
    IoError::Os(err)
}
