//! Builds minimal, valid FAT12/FAT32 disk images backed by a temp file, for
//! tests that exercise the engine end to end through `Filesystem`.

use std::fs::File;
use std::os::unix::fs::FileExt;

use fatvol_ds_std::DataStorageServer;

pub const SECTOR: u64 = 512;

pub struct BootSectorParams {
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sector_count: u16,
    pub num_fats: u8,
    pub root_entry_count: u16,
    pub total_sectors_16: u16,
    pub total_sectors_32: u32,
    pub media: u8,
    pub fatsz16: u16,
    pub fatsz32: u32,
    pub root_cluster: u32,
    pub fs_type_label: &'static [u8; 8],
}

fn boot_sector_bytes(p: &BootSectorParams) -> [u8; 512] {
    let mut buf = [0u8; 512];
    buf[0..3].copy_from_slice(&[0xEB, 0x00, 0x90]);
    buf[3..11].copy_from_slice(b"MSWIN4.1");
    buf[11..13].copy_from_slice(&p.bytes_per_sector.to_le_bytes());
    buf[13] = p.sectors_per_cluster;
    buf[14..16].copy_from_slice(&p.reserved_sector_count.to_le_bytes());
    buf[16] = p.num_fats;
    buf[17..19].copy_from_slice(&p.root_entry_count.to_le_bytes());
    buf[19..21].copy_from_slice(&p.total_sectors_16.to_le_bytes());
    buf[21] = p.media;
    buf[22..24].copy_from_slice(&p.fatsz16.to_le_bytes());
    buf[24..26].copy_from_slice(&18u16.to_le_bytes());
    buf[26..28].copy_from_slice(&2u16.to_le_bytes());
    buf[28..32].copy_from_slice(&0u32.to_le_bytes());
    buf[32..36].copy_from_slice(&p.total_sectors_32.to_le_bytes());
    buf[36..40].copy_from_slice(&p.fatsz32.to_le_bytes());
    buf[40..42].copy_from_slice(&0u16.to_le_bytes());
    buf[42..44].copy_from_slice(&0u16.to_le_bytes());
    buf[44..48].copy_from_slice(&p.root_cluster.to_le_bytes());
    buf[48..50].copy_from_slice(&1u16.to_le_bytes());
    buf[50..52].copy_from_slice(&0u16.to_le_bytes());
    buf[64] = 0x80;
    buf[65] = 0;
    buf[66] = 0x29;
    buf[67..71].copy_from_slice(&0x1234_5678u32.to_le_bytes());
    buf[71..82].copy_from_slice(b"NO NAME    ");
    buf[82..90].copy_from_slice(p.fs_type_label);
    buf[510] = 0x55;
    buf[511] = 0xAA;
    buf
}

fn total_bytes(p: &BootSectorParams) -> u64 {
    let sectors = if p.total_sectors_16 != 0 { p.total_sectors_16 as u64 } else { p.total_sectors_32 as u64 };
    sectors * p.bytes_per_sector as u64
}

fn write_fat32_entry(file: &File, p: &BootSectorParams, cluster: u32, value: u32) {
    let fat_offset = p.reserved_sector_count as u64 * p.bytes_per_sector as u64;
    for copy in 0..p.num_fats as u64 {
        let copy_offset = fat_offset + copy * p.fatsz32 as u64 * p.bytes_per_sector as u64;
        let entry_offset = copy_offset + cluster as u64 * 4;
        file.write_all_at(&value.to_le_bytes(), entry_offset).expect("write FAT entry");
    }
}

/// A 2 MiB FAT12 volume shaped like a classic floppy (512 B/sector, 1
/// sector/cluster, 224-entry root), holding 4063 clusters.
pub fn build_fat12() -> (tempfile::NamedTempFile, DataStorageServer) {
    build_fat12_with_root_entries(224)
}

/// Same shape as [`build_fat12`] but with a caller-chosen (small) root
/// entry count, for tests that need to fill the fixed root directory.
pub fn build_fat12_with_root_entries(root_entry_count: u16) -> (tempfile::NamedTempFile, DataStorageServer) {
    let params = BootSectorParams {
        bytes_per_sector: 512,
        sectors_per_cluster: 1,
        reserved_sector_count: 1,
        num_fats: 2,
        root_entry_count,
        total_sectors_16: 4096,
        total_sectors_32: 0,
        media: 0xF8,
        fatsz16: 9,
        fatsz32: 0,
        root_cluster: 0,
        fs_type_label: b"FAT12   ",
    };
    let tmp = tempfile::NamedTempFile::new().expect("create temp image");
    let size = total_bytes(&params);
    tmp.as_file().set_len(size).expect("size temp image");
    tmp.as_file().write_all_at(&boot_sector_bytes(&params), 0).expect("write boot sector");
    let device = DataStorageServer::open(tmp.path()).expect("open device");
    (tmp, device)
}

/// A 128 MiB FAT32 volume (2 KiB clusters, root at cluster 2).
pub fn build_fat32() -> (tempfile::NamedTempFile, DataStorageServer) {
    let params = BootSectorParams {
        bytes_per_sector: 512,
        sectors_per_cluster: 2,
        reserved_sector_count: 32,
        num_fats: 2,
        root_entry_count: 0,
        total_sectors_16: 0,
        total_sectors_32: 262_144,
        media: 0xF8,
        fatsz16: 0,
        fatsz32: 1024,
        root_cluster: 2,
        fs_type_label: b"FAT32   ",
    };
    let tmp = tempfile::NamedTempFile::new().expect("create temp image");
    let size = total_bytes(&params);
    tmp.as_file().set_len(size).expect("size temp image");
    tmp.as_file().write_all_at(&boot_sector_bytes(&params), 0).expect("write boot sector");
    write_fat32_entry(tmp.as_file(), &params, 2, 0x0FFF_FFF8);
    let device = DataStorageServer::open(tmp.path()).expect("open device");
    (tmp, device)
}
