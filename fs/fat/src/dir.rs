//! L3: directory parsing, lookup, and entry creation/deletion.

use std::collections::HashSet;

use fatvol_ds::DataStorage;
use fatvol_err::{Error, FsError, Result};
use fatvol_fs::{Attributes, Metadata};
use zerocopy::{
    little_endian::{U16, U32},
    IntoBytes,
};

use crate::boot::{FatVariant, Geometry};
use crate::datetime;
use crate::entry::{
    DirEntryRaw, LongNameEntryRaw, ATTR_ARCHIVE, ATTR_LONG_NAME, DIRENT_SIZE, ENTRY_DELETED,
    LAST_LONG_ENTRY,
};
use crate::shortname::{join_long_name_chunks, needs_long_name, split_long_name, synthesize_short_name};
use crate::table::FatTable;

/// Where a directory's 32-byte slots physically live.
#[derive(Debug, Clone, Copy)]
enum Region {
    /// The fixed-size FAT12/16 root directory: a run of sectors outside
    /// the cluster-addressed data region, which can never grow.
    Fixed { offset: u64, slot_count: usize },
    /// Any subdirectory, or the FAT32 root: an ordinary cluster chain.
    Chain { first_cluster: u32 },
}

/// A single logical entry as parsed off disk: its short-name record, the
/// reconstructed display name, and the slot range it occupies (used by
/// `delete` to tombstone every slot, including its LFN run).
#[derive(Debug, Clone)]
struct ParsedEntry {
    short: DirEntryRaw,
    name: String,
    short_name: String,
    start_slot: usize,
    slot_count: usize,
}

pub struct Directory<'d, DS: DataStorage> {
    device: &'d DS,
    table: &'d FatTable<'d, DS>,
    geometry: Geometry,
    region: Region,
    /// First cluster of this directory itself, for populating a new
    /// child's `..` entry. 0 for the FAT12/16 fixed root.
    self_cluster: u32,
    /// True for the volume's root directory (fixed FAT12/16 root or the
    /// FAT32 root cluster chain), false for any subdirectory.
    is_root: bool,
}

impl<'d, DS: DataStorage> Directory<'d, DS> {
    pub fn root(device: &'d DS, table: &'d FatTable<'d, DS>, geometry: Geometry) -> Self {
        if geometry.variant == FatVariant::Fat32 {
            Directory {
                device,
                table,
                geometry,
                region: Region::Chain { first_cluster: geometry.root_cluster },
                self_cluster: geometry.root_cluster,
                is_root: true,
            }
        } else {
            let slot_count =
                (geometry.root_dir_sectors as u64 * geometry.bytes_per_sector as u64 / DIRENT_SIZE as u64)
                    as usize;
            Directory {
                device,
                table,
                geometry,
                region: Region::Fixed { offset: geometry.root_dir_offset, slot_count },
                self_cluster: 0,
                is_root: true,
            }
        }
    }

    pub fn at_cluster(device: &'d DS, table: &'d FatTable<'d, DS>, geometry: Geometry, cluster: u32) -> Self {
        Directory {
            device,
            table,
            geometry,
            region: Region::Chain { first_cluster: cluster },
            self_cluster: cluster,
            is_root: false,
        }
    }

    pub fn self_cluster(&self) -> u32 {
        self.self_cluster
    }

    /// The cluster value a direct child's `..` entry should carry: 0 if
    /// this directory is the volume root (per spec, even the FAT32 root's
    /// own non-zero cluster number is never used as a `..` target), or
    /// this directory's own first cluster otherwise.
    pub fn dotdot_cluster(&self) -> u32 {
        if self.is_root {
            0
        } else {
            self.self_cluster
        }
    }

    fn slots_per_cluster(&self) -> usize {
        self.geometry.cluster_size as usize / DIRENT_SIZE
    }

    fn chain(&self) -> Result<Vec<u32>> {
        match self.region {
            Region::Fixed { .. } => Ok(Vec::new()),
            Region::Chain { first_cluster } => self.table.follow_chain(first_cluster),
        }
    }

    fn slot_count(&self) -> Result<usize> {
        match self.region {
            Region::Fixed { slot_count, .. } => Ok(slot_count),
            Region::Chain { .. } => Ok(self.chain()?.len() * self.slots_per_cluster()),
        }
    }

    fn slot_offset(&self, index: usize) -> Result<u64> {
        match self.region {
            Region::Fixed { offset, .. } => Ok(offset + (index * DIRENT_SIZE) as u64),
            Region::Chain { .. } => {
                let spc = self.slots_per_cluster();
                let chain = self.chain()?;
                let cluster = chain[index / spc];
                let within = (index % spc) * DIRENT_SIZE;
                Ok(self.geometry.cluster_to_offset(cluster) + within as u64)
            }
        }
    }

    fn read_short(&self, index: usize) -> Result<DirEntryRaw> {
        let offset = self.slot_offset(index)?;
        let mut raw = DirEntryRaw::zeroed();
        self.device.read(offset, raw.as_mut_bytes())?;
        Ok(raw)
    }

    fn read_long(&self, index: usize) -> Result<LongNameEntryRaw> {
        let offset = self.slot_offset(index)?;
        let mut raw = LongNameEntryRaw::zeroed();
        self.device.read(offset, raw.as_mut_bytes())?;
        Ok(raw)
    }

    fn write_short(&self, index: usize, entry: &DirEntryRaw) -> Result<()> {
        let offset = self.slot_offset(index)?;
        self.device.write(offset, entry.as_bytes())
    }

    fn write_long(&self, index: usize, entry: &LongNameEntryRaw) -> Result<()> {
        let offset = self.slot_offset(index)?;
        self.device.write(offset, entry.as_bytes())
    }

    /// Grows a cluster-chained directory by one cluster, zero-initialized.
    /// A no-op error for the fixed FAT12/16 root, which can never grow.
    fn expand(&self) -> Result<()> {
        match self.region {
            Region::Fixed { .. } => Err(Error::Fs(FsError::DirectoryFull)),
            Region::Chain { first_cluster } => {
                let chain = self.table.follow_chain(first_cluster)?;
                let last = *chain.last().expect("a directory chain always has at least one cluster");
                let new_cluster = self.table.allocate_one()?;
                let zeros = vec![0u8; self.geometry.cluster_size as usize];
                self.device.write(self.geometry.cluster_to_offset(new_cluster), &zeros)?;
                self.table.set(last, new_cluster)?;
                Ok(())
            }
        }
    }

    /// Parses every logical entry in the directory, stopping at the first
    /// never-used slot. Entries whose LFN run fails validation (checksum
    /// mismatch, broken ordinal sequence) fall back to their short name.
    fn parse_entries(&self) -> Result<Vec<ParsedEntry>> {
        let total = self.slot_count()?;
        let mut out = Vec::new();
        let mut lfn_buf: Vec<(u8, bool, u8, Vec<u16>)> = Vec::new(); // (ordinal, is_last, checksum, chars)
        let mut lfn_start = 0usize;
        let mut index = 0usize;
        while index < total {
            let short = self.read_short(index)?;
            if short.is_end() {
                break;
            }
            if short.is_deleted() {
                lfn_buf.clear();
                index += 1;
                continue;
            }
            if short.is_long_name() {
                let long = self.read_long(index)?;
                if long.is_deleted() {
                    lfn_buf.clear();
                    index += 1;
                    continue;
                }
                if lfn_buf.is_empty() {
                    lfn_start = index;
                }
                lfn_buf.push((long.ordinal(), long.is_last(), long.checksum, long.chars()));
                index += 1;
                continue;
            }
            if short.is_volume_id() {
                lfn_buf.clear();
                index += 1;
                continue;
            }

            let short_name = short_name_display(&short.name);
            let name = reconstruct_long_name(&lfn_buf, short.checksum())
                .unwrap_or_else(|| short_name.clone());
            let slot_count = if lfn_buf.is_empty() { 1 } else { index - lfn_start + 1 };
            let start_slot = if lfn_buf.is_empty() { index } else { lfn_start };
            out.push(ParsedEntry { short, name, short_name, start_slot, slot_count });
            lfn_buf.clear();
            index += 1;
        }
        Ok(out)
    }

    pub fn list(&self) -> Result<Vec<Metadata>> {
        Ok(self
            .parse_entries()?
            .into_iter()
            .filter(|e| e.short_name != "." && e.short_name != "..")
            .map(|e| to_metadata(&e))
            .collect())
    }

    /// Scans the root directory for a volume-label entry (ATTR_VOLUME_ID
    /// set, but not the LFN alias), if any.
    pub fn volume_label(&self) -> Result<Option<String>> {
        let total = self.slot_count()?;
        for index in 0..total {
            let short = self.read_short(index)?;
            if short.is_end() {
                break;
            }
            if short.is_volume_id() {
                return Ok(Some(short_name_display(&short.name)));
            }
        }
        Ok(None)
    }

    pub fn find(&self, name: &str) -> Result<Metadata> {
        self.parse_entries()?
            .into_iter()
            .find(|e| e.name.eq_ignore_ascii_case(name) || e.short_name.eq_ignore_ascii_case(name))
            .map(|e| to_metadata(&e))
            .ok_or_else(|| Error::Fs(FsError::NotFound(name.to_string())))
    }

    fn find_parsed(&self, name: &str) -> Result<ParsedEntry> {
        self.parse_entries()?
            .into_iter()
            .find(|e| e.name.eq_ignore_ascii_case(name) || e.short_name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::Fs(FsError::NotFound(name.to_string())))
    }

    pub fn first_cluster_of(&self, name: &str) -> Result<u32> {
        Ok(self.find_parsed(name)?.short.first_cluster())
    }

    fn find_consecutive_free(&self, needed: usize) -> Result<usize> {
        loop {
            let total = self.slot_count()?;
            let mut run_start = None;
            let mut run_len = 0usize;
            for index in 0..total {
                let short = self.read_short(index)?;
                if short.is_end() || short.is_deleted() {
                    if run_len == 0 {
                        run_start = Some(index);
                    }
                    run_len += 1;
                    if run_len >= needed {
                        return Ok(run_start.unwrap());
                    }
                    if short.is_end() {
                        // Everything after a never-used slot is unused too.
                        break;
                    }
                } else {
                    run_len = 0;
                }
            }
            self.expand()?;
        }
    }

    /// Creates a new entry named `name` with `attrs`, `first_cluster`, and
    /// `size`, returning its metadata. If an entry with that display or
    /// short name already exists, returns it as-is when its type (file vs
    /// directory) agrees with `attrs`, or fails with `NotAFile`/
    /// `NotADirectory` on a type mismatch (spec: "If `getEntry(N)` already
    /// resolves, return the existing entry (as file) or fail (type
    /// mismatch)").
    pub fn create_entry(
        &self,
        name: &str,
        attrs: Attributes,
        first_cluster: u32,
        size: u32,
    ) -> Result<Metadata> {
        if name.is_empty() || name.len() > 255 || name.bytes().any(|b| b < 0x20 || b == 0x7F) {
            return Err(Error::Fs(FsError::NameInvalid(name.to_string())));
        }
        if name.contains('/') {
            return Err(Error::Fs(FsError::NameInvalid(name.to_string())));
        }
        let existing = self.parse_entries()?;
        if let Some(found) = existing
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name) || e.short_name.eq_ignore_ascii_case(name))
        {
            let wants_dir = attrs.contains(Attributes::DIRECTORY);
            let meta = to_metadata(found);
            return if meta.is_dir == wants_dir {
                Ok(meta)
            } else if wants_dir {
                Err(Error::Fs(FsError::NotADirectory(name.to_string())))
            } else {
                Err(Error::Fs(FsError::NotAFile(name.to_string())))
            };
        }

        let use_lfn = needs_long_name(name);
        let existing_short_names: Vec<String> = existing.iter().map(|e| e.short_name.clone()).collect();
        let short11 = synthesize_short_name(name, use_lfn, &existing_short_names)?;
        let short_display = short_name_display(&short11);

        let chunks = if use_lfn { split_long_name(name) } else { Vec::new() };
        let slots_needed = chunks.len() + 1;
        let start = self.find_consecutive_free(slots_needed)?;

        let now = datetime::now();
        let (date, time) = datetime::from_naive(now);
        let tenth = datetime::pack_tenth(now.time());

        let mut short = DirEntryRaw::zeroed();
        short.name = short11;
        short.attr = attrs.bits();
        short.create_time_tenth = tenth;
        short.create_time = U16::new(time);
        short.create_date = U16::new(date);
        short.access_date = U16::new(date);
        short.write_time = U16::new(time);
        short.write_date = U16::new(date);
        short.file_size = U32::new(size);
        short.set_first_cluster(first_cluster, self.geometry.variant == FatVariant::Fat32);

        let checksum = short.checksum();
        let total_chunks = chunks.len();
        for (i, chunk) in chunks.iter().enumerate() {
            let ordinal = (total_chunks - i) as u8;
            let mut long = LongNameEntryRaw::zeroed();
            long.ord = if i == 0 { ordinal | LAST_LONG_ENTRY } else { ordinal };
            long.attr = ATTR_LONG_NAME;
            long.entry_type = 0;
            long.checksum = checksum;
            long.set_chars(chunk);
            self.write_long(start + i, &long)?;
        }
        self.write_short(start + total_chunks, &short)?;

        Ok(Metadata {
            name: name.to_string(),
            short_name: short_display,
            size: size as u64,
            is_dir: attrs.contains(Attributes::DIRECTORY),
            attributes: attrs,
            created: now,
            modified: now,
            accessed: now,
        })
    }

    /// Removes `name`'s directory record (short entry and any LFN run) and
    /// frees its cluster chain. Refuses a non-empty subdirectory.
    pub fn delete(&self, name: &str) -> Result<()> {
        let entry = self.find_parsed(name)?;
        if entry.short.is_directory() {
            let child = Directory::at_cluster(self.device, self.table, self.geometry, entry.short.first_cluster());
            if !child.list()?.is_empty() {
                return Err(Error::Fs(FsError::DirectoryNotEmpty));
            }
        }
        for slot in entry.start_slot..entry.start_slot + entry.slot_count {
            let offset = self.slot_offset(slot)?;
            let mut buf = [0u8; DIRENT_SIZE];
            self.device.read(offset, &mut buf)?;
            buf[0] = ENTRY_DELETED;
            self.device.write(offset, &buf)?;
        }
        self.table.free_chain(entry.short.first_cluster())?;
        Ok(())
    }

    /// Rewrites `name`'s first cluster, size, and write/access timestamps
    /// after a `write`/`append`/`truncate`, setting the ARCHIVE bit. Leaves
    /// any preceding LFN run untouched since the display name is unchanged.
    pub fn update_file(&self, name: &str, first_cluster: u32, size: u32) -> Result<()> {
        let entry = self.find_parsed(name)?;
        let mut short = entry.short;
        let now = datetime::now();
        let (date, time) = datetime::from_naive(now);
        short.set_first_cluster(first_cluster, self.geometry.variant == FatVariant::Fat32);
        short.file_size = U32::new(size);
        short.write_time = U16::new(time);
        short.write_date = U16::new(date);
        short.access_date = U16::new(date);
        short.attr |= ATTR_ARCHIVE;
        let slot = entry.start_slot + entry.slot_count - 1;
        self.write_short(slot, &short)
    }

    /// Updates only `name`'s access date, for a read that does not modify
    /// content.
    pub fn touch_access(&self, name: &str) -> Result<()> {
        let entry = self.find_parsed(name)?;
        let mut short = entry.short;
        let (date, _) = datetime::from_naive(datetime::now());
        short.access_date = U16::new(date);
        let slot = entry.start_slot + entry.slot_count - 1;
        self.write_short(slot, &short)
    }

    /// Populates a freshly allocated cluster with `.` and `..` entries for
    /// a new subdirectory rooted there.
    pub fn init_as_child(&self, parent_cluster: u32) -> Result<()> {
        let now = datetime::now();
        let (date, time) = datetime::from_naive(now);
        let fat32 = self.geometry.variant == FatVariant::Fat32;

        let mut dot = DirEntryRaw::zeroed();
        dot.name = *b".          ";
        dot.attr = Attributes::DIRECTORY.bits();
        dot.create_time = U16::new(time);
        dot.create_date = U16::new(date);
        dot.write_time = U16::new(time);
        dot.write_date = U16::new(date);
        dot.access_date = U16::new(date);
        dot.set_first_cluster(self.self_cluster, fat32);
        self.write_short(0, &dot)?;

        let mut dotdot = DirEntryRaw::zeroed();
        dotdot.name = *b"..         ";
        dotdot.attr = Attributes::DIRECTORY.bits();
        dotdot.create_time = U16::new(time);
        dotdot.create_date = U16::new(date);
        dotdot.write_time = U16::new(time);
        dotdot.write_date = U16::new(date);
        dotdot.access_date = U16::new(date);
        dotdot.set_first_cluster(parent_cluster, fat32);
        self.write_short(1, &dotdot)?;
        Ok(())
    }
}

fn short_name_display(name11: &[u8; 11]) -> String {
    let base_end = name11[..8].iter().rposition(|&b| b != b' ').map(|p| p + 1).unwrap_or(0);
    let ext_end = name11[8..].iter().rposition(|&b| b != b' ').map(|p| p + 1).unwrap_or(0);
    let mut display: Vec<u8> = Vec::new();
    if name11[0] == 0x05 {
        display.push(0xE5);
        display.extend_from_slice(&name11[1..base_end]);
    } else {
        display.extend_from_slice(&name11[..base_end]);
    }
    if ext_end > 0 {
        display.push(b'.');
        display.extend_from_slice(&name11[8..8 + ext_end]);
    }
    String::from_utf8_lossy(&display).into_owned()
}

fn reconstruct_long_name(buf: &[(u8, bool, u8, Vec<u16>)], short_checksum: u8) -> Option<String> {
    if buf.is_empty() {
        return None;
    }
    let max_ordinal = buf.iter().map(|(ord, ..)| *ord).max().unwrap();
    let (_, is_last, _, _) = buf[0];
    if !is_last {
        return None;
    }
    let mut seen = HashSet::new();
    for (ordinal, _, checksum, _) in buf {
        if *checksum != short_checksum || !seen.insert(*ordinal) {
            return None;
        }
    }
    if (1..=max_ordinal).any(|ord| !seen.contains(&ord)) {
        return None;
    }
    let mut sorted = buf.to_vec();
    sorted.sort_by_key(|(ord, ..)| std::cmp::Reverse(*ord));
    let chunks: Vec<Vec<u16>> = sorted.into_iter().map(|(_, _, _, chars)| chars).collect();
    Some(join_long_name_chunks(&chunks))
}

fn to_metadata(entry: &ParsedEntry) -> Metadata {
    let attributes = Attributes::from_bits_truncate(entry.short.attr);
    Metadata {
        name: entry.name.clone(),
        short_name: entry.short_name.clone(),
        size: entry.short.file_size.get() as u64,
        is_dir: attributes.contains(Attributes::DIRECTORY),
        attributes,
        created: datetime::to_naive(entry.short.create_date.get(), entry.short.create_time.get()),
        modified: datetime::to_naive(entry.short.write_date.get(), entry.short.write_time.get()),
        accessed: datetime::to_naive(entry.short.access_date.get(), 0),
    }
}
