//! 32-byte on-disk directory records: the 8.3 short-name entry and its
//! optional preceding run of LFN entries.

use zerocopy::{
    little_endian::{U16, U32},
    FromBytes, IntoBytes, KnownLayout,
};

pub const DIRENT_SIZE: usize = 32;

pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;
/// The LFN attribute is exactly this byte, not a bitwise combination check.
pub const ATTR_LONG_NAME: u8 = 0x0F;

pub const ENTRY_FREE: u8 = 0x00;
pub const ENTRY_DELETED: u8 = 0xE5;
/// A leading byte of 0x05 in an 8.3 name aliases a real 0xE5 (used by some
/// Kanji encodings); it is preserved as-is rather than treated as deleted.
pub const KANJI_E5_ALIAS: u8 = 0x05;

pub const LAST_LONG_ENTRY: u8 = 0x40;
pub const LFN_ORDINAL_MASK: u8 = 0x1F;
pub const LFN_CHARS_PER_ENTRY: usize = 13;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout)]
pub struct DirEntryRaw {
    pub name: [u8; 11],
    pub attr: u8,
    pub nt_reserved: u8,
    pub create_time_tenth: u8,
    pub create_time: U16,
    pub create_date: U16,
    pub access_date: U16,
    pub first_cluster_hi: U16,
    pub write_time: U16,
    pub write_date: U16,
    pub first_cluster_lo: U16,
    pub file_size: U32,
}

const _: () = assert!(core::mem::size_of::<DirEntryRaw>() == DIRENT_SIZE);

impl DirEntryRaw {
    pub fn zeroed() -> Self {
        // SAFETY: every field is a plain integer type; the all-zero bit
        // pattern is a valid value for each of them.
        unsafe { core::mem::MaybeUninit::zeroed().assume_init() }
    }

    pub fn is_end(&self) -> bool {
        self.name[0] == ENTRY_FREE
    }

    pub fn is_deleted(&self) -> bool {
        self.name[0] == ENTRY_DELETED
    }

    pub fn is_long_name(&self) -> bool {
        self.attr == ATTR_LONG_NAME
    }

    pub fn is_volume_id(&self) -> bool {
        self.attr & ATTR_VOLUME_ID != 0 && self.attr != ATTR_LONG_NAME
    }

    pub fn is_directory(&self) -> bool {
        self.attr & ATTR_DIRECTORY != 0
    }

    pub fn first_cluster(&self) -> u32 {
        (self.first_cluster_hi.get() as u32) << 16 | self.first_cluster_lo.get() as u32
    }

    pub fn set_first_cluster(&mut self, cluster: u32, fat32: bool) {
        self.first_cluster_lo = U16::new((cluster & 0xFFFF) as u16);
        self.first_cluster_hi = U16::new(if fat32 { (cluster >> 16) as u16 } else { 0 });
    }

    pub fn checksum(&self) -> u8 {
        short_name_checksum(&self.name)
    }
}

/// Checksum of an 8.3 name, per spec: `c = ((c & 1) << 7) + (c >> 1) + b`
/// folded over the 11 name bytes, modulo 256 (captured by `u8` wrapping
/// arithmetic).
pub fn short_name_checksum(name11: &[u8; 11]) -> u8 {
    let mut sum: u8 = 0;
    for &byte in name11 {
        sum = ((sum & 1) << 7).wrapping_add(sum >> 1).wrapping_add(byte);
    }
    sum
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout)]
pub struct LongNameEntryRaw {
    pub ord: u8,
    pub name1: [U16; 5],
    pub attr: u8,
    pub entry_type: u8,
    pub checksum: u8,
    pub name2: [U16; 6],
    pub first_cluster_lo: U16,
    pub name3: [U16; 2],
}

const _: () = assert!(core::mem::size_of::<LongNameEntryRaw>() == DIRENT_SIZE);

impl LongNameEntryRaw {
    pub fn zeroed() -> Self {
        unsafe { core::mem::MaybeUninit::zeroed().assume_init() }
    }

    pub fn ordinal(&self) -> u8 {
        self.ord & LFN_ORDINAL_MASK
    }

    pub fn is_last(&self) -> bool {
        self.ord & LAST_LONG_ENTRY != 0
    }

    pub fn is_deleted(&self) -> bool {
        self.ord == ENTRY_DELETED
    }

    /// The up-to-13 UTF-16 code units this fragment holds, in logical
    /// (left-to-right) order, stopping at a `U+0000` terminator and
    /// skipping `0xFFFF` padding.
    pub fn chars(&self) -> Vec<u16> {
        self.name1
            .iter()
            .chain(self.name2.iter())
            .chain(self.name3.iter())
            .map(|c| c.get())
            .take_while(|&c| c != 0x0000)
            .filter(|&c| c != 0xFFFF)
            .collect()
    }

    /// Writes `chars` (already `U+0000`-terminated and `0xFFFF`-padded to
    /// exactly 13 entries by the caller) into the three name runs.
    pub fn set_chars(&mut self, chars: &[u16; LFN_CHARS_PER_ENTRY]) {
        for (dst, &src) in self.name1.iter_mut().zip(&chars[0..5]) {
            *dst = U16::new(src);
        }
        for (dst, &src) in self.name2.iter_mut().zip(&chars[5..11]) {
            *dst = U16::new(src);
        }
        for (dst, &src) in self.name3.iter_mut().zip(&chars[11..13]) {
            *dst = U16::new(src);
        }
    }
}
