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

//! Domain vocabulary shared by any filesystem engine built on top of
//! `fatvol_ds`: directory-entry attributes and the metadata record `list`
//! hands back to a caller. The wire-format specifics (boot sector, FAT
//! entry width, LFN layout) stay in `fatvol_fat` since they are not shared
//! with any other filesystem family.

pub use fatvol_err::*;

use bitflags::bitflags;
use chrono::NaiveDateTime;

bitflags! {
    /// DOS-style directory entry attribute bits. Enforcement (e.g. refusing
    /// to write a read-only file) is out of scope for this engine; it only
    /// reports and round-trips these bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Attributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN    = 0x02;
        const SYSTEM    = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE   = 0x20;
    }
}

/// Everything `list`/`get` reveal about a directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// The display name as reconstructed from LFN entries, or the 8.3 name
    /// if the entry has none.
    pub name: String,
    /// The persisted 8.3 name, always present, used for any disk I/O that
    /// must reference this entry's directory record.
    pub short_name: String,
    pub size: u64,
    pub is_dir: bool,
    pub attributes: Attributes,
    pub created: NaiveDateTime,
    pub modified: NaiveDateTime,
    pub accessed: NaiveDateTime,
}
