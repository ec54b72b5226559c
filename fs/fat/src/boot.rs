//! L1: boot sector interpretation and geometry derivation.

use std::mem::MaybeUninit;

use fatvol_ds::DataStorage;
use fatvol_err::{Error, FsError, Result};
use log::error;
use zerocopy::{
    little_endian::{U16, U32},
    FromBytes, IntoBytes, KnownLayout,
};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Which of the three on-disk FAT entry widths a volume uses. Classified
/// purely from the cluster count (spec's resolved Open Question): a
/// volume's `bs_filsystype` string or other on-disk hints are informational
/// only and never override this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatVariant {
    Fat12,
    Fat16,
    Fat32,
}

impl FatVariant {
    pub fn classify(total_clusters: u32) -> Self {
        if total_clusters < 4085 {
            FatVariant::Fat12
        } else if total_clusters < 65525 {
            FatVariant::Fat16
        } else {
            FatVariant::Fat32
        }
    }

    /// Smallest value that marks the cluster as the last in its chain.
    pub fn eoc_threshold(self) -> u32 {
        match self {
            FatVariant::Fat12 => 0xFF8,
            FatVariant::Fat16 => 0xFFF8,
            FatVariant::Fat32 => 0x0FFF_FFF8,
        }
    }

    pub fn bad_cluster(self) -> u32 {
        match self {
            FatVariant::Fat12 => 0xFF7,
            FatVariant::Fat16 => 0xFFF7,
            FatVariant::Fat32 => 0x0FFF_FFF7,
        }
    }
}

/// Derived geometry of a mounted volume. Parsed once at mount and treated
/// as immutable thereafter (spec: "Boot sector: loaded at mount, immutable
/// thereafter").
#[derive(Debug, Clone, Copy)]
pub struct Geometry {
    pub bytes_per_sector: u32,
    pub sectors_per_cluster: u32,
    pub cluster_size: u32,
    pub reserved_sector_count: u32,
    pub num_fats: u32,
    pub root_entry_count: u32,
    pub total_sectors: u32,
    pub sectors_per_fat: u32,
    pub root_cluster: u32,
    pub fat_offset: u64,
    pub root_dir_offset: u64,
    pub root_dir_sectors: u32,
    pub first_data_sector: u32,
    pub total_clusters: u32,
    pub variant: FatVariant,
    /// `bs_filsystype`, verbatim. Informational only: [`FatVariant::classify`]
    /// never consults it, per spec's resolved Open Question that the
    /// cluster-count rule always wins over this string.
    pub fs_type_label: [u8; 8],
}

impl Geometry {
    pub fn parse<DS: DataStorage>(device: &DS) -> Result<Geometry> {
        let mut raw: BootSectorRaw = unsafe { MaybeUninit::uninit().assume_init() };
        device.read(0, raw.as_mut_bytes())?;

        let bytes_per_sector = raw.bpb_bytspersec.get() as u32;
        if !matches!(bytes_per_sector, 512 | 1024 | 2048 | 4096) {
            error!("bytes per sector ({bytes_per_sector}) must be one of 512/1024/2048/4096");
            return invalid("bytes_per_sector");
        }

        let sectors_per_cluster = raw.bpb_secperclus as u32;
        if sectors_per_cluster == 0
            || sectors_per_cluster > 128
            || !is_power_of_two(sectors_per_cluster)
        {
            error!("sectors per cluster ({sectors_per_cluster}) must be a power of two in [1, 128]");
            return invalid("sectors_per_cluster");
        }

        let cluster_size = bytes_per_sector * sectors_per_cluster;
        if (cluster_size as u64) > 32 * MIB {
            error!("cluster size ({cluster_size} bytes) exceeds 32 MiB");
            return invalid("cluster_size");
        }

        let reserved_sector_count = raw.bpb_rsvdseccnt.get() as u32;
        if reserved_sector_count == 0 {
            error!("reserved sector count must not be 0");
            return invalid("reserved_sector_count");
        }

        let num_fats = raw.bpb_numfats as u32;
        if num_fats != 1 && num_fats != 2 {
            error!("number of FATs ({num_fats}) must be 1 or 2");
            return invalid("num_fats");
        }

        let root_entry_count = raw.bpb_rootentcnt.get() as u32;

        let total_sectors = if raw.bpb_totsec16.get() != 0 {
            raw.bpb_totsec16.get() as u32
        } else {
            raw.bpb_totsec32.get()
        };
        if total_sectors == 0 {
            error!("total sector count must not be 0");
            return invalid("total_sectors");
        }

        let sectors_per_fat = if raw.bpb_fatsz16.get() != 0 {
            raw.bpb_fatsz16.get() as u32
        } else {
            raw.bpb_fatsz32.get()
        };
        if sectors_per_fat == 0 {
            error!("sectors per FAT must not be 0");
            return invalid("sectors_per_fat");
        }

        // Microsoft's canonical formula (spec's resolved Open Question):
        // root-directory sectors are excluded from the data region before
        // dividing by sectors-per-cluster, independent of how a FAT32
        // volume (root_entry_count == 0) computes root_dir_sectors == 0.
        let root_dir_sectors = (root_entry_count as u64 * 32).div_ceil(bytes_per_sector as u64) as u32;
        let first_data_sector = reserved_sector_count + num_fats * sectors_per_fat + root_dir_sectors;
        let data_sectors = match total_sectors.checked_sub(first_data_sector) {
            Some(sectors) => sectors,
            None => {
                error!(
                    "total sectors ({total_sectors}) smaller than the reserved+FAT+root region ({first_data_sector})"
                );
                return invalid("total_sectors");
            }
        };
        let total_clusters = data_sectors / sectors_per_cluster;

        let variant = FatVariant::classify(total_clusters);

        let root_cluster = if variant == FatVariant::Fat32 {
            raw.bpb_rootclus.get()
        } else {
            0
        };

        let fat_offset = reserved_sector_count as u64 * bytes_per_sector as u64;
        let root_dir_offset = if variant == FatVariant::Fat32 {
            0
        } else {
            (reserved_sector_count + num_fats * sectors_per_fat) as u64 * bytes_per_sector as u64
        };

        Ok(Geometry {
            bytes_per_sector,
            sectors_per_cluster,
            cluster_size,
            reserved_sector_count,
            num_fats,
            root_entry_count,
            total_sectors,
            sectors_per_fat,
            root_cluster,
            fat_offset,
            root_dir_offset,
            root_dir_sectors,
            first_data_sector,
            total_clusters,
            variant,
            fs_type_label: raw.bs_filsystype,
        })
    }

    pub fn cluster_to_sector(&self, cluster: u32) -> u64 {
        self.first_data_sector as u64 + (cluster as u64 - 2) * self.sectors_per_cluster as u64
    }

    pub fn cluster_to_offset(&self, cluster: u32) -> u64 {
        self.cluster_to_sector(cluster) * self.bytes_per_sector as u64
    }

    /// Microsoft-canonical recommendation for `sectors_per_cluster` given a
    /// volume size, used only by the external formatter; the engine mounts
    /// any geometry that passes [`Geometry::parse`]'s validation.
    pub fn recommended_sectors_per_cluster(
        volume_bytes: u64,
        variant: FatVariant,
        bytes_per_sector: u32,
    ) -> u32 {
        let table: &[(u64, u64)] = match variant {
            FatVariant::Fat12 | FatVariant::Fat16 => &[
                (32 * MIB, 512),
                (64 * MIB, 1024),
                (128 * MIB, 2048),
                (256 * MIB, 4096),
                (512 * MIB, 8192),
                (1 * GIB, 16384),
                (2 * GIB, 32768),
            ],
            FatVariant::Fat32 => &[
                (64 * MIB, 512),
                (128 * MIB, 1024),
                (256 * MIB, 2048),
                (8 * GIB, 4096),
                (16 * GIB, 8192),
                (32 * GIB, 16384),
            ],
        };
        let bytes_per_cluster = table
            .iter()
            .find(|&&(limit, _)| volume_bytes <= limit)
            .map(|&(_, bpc)| bpc)
            .unwrap_or(32768);
        let spc = ((bytes_per_cluster / bytes_per_sector as u64).max(1)) as u32;
        spc.next_power_of_two().min(128)
    }
}

fn invalid(field: &'static str) -> Result<Geometry> {
    Err(Error::Fs(FsError::InvalidBootSector { field }))
}

fn is_power_of_two(value: u32) -> bool {
    value != 0 && value & (value - 1) == 0
}

/// BIOS Parameter Block, byte-exact with Microsoft's FAT layout. Only the
/// fields the engine actually consumes are broken out; the rest of the
/// first sector (boot code, signature) is opaque and preserved by never
/// being written back.
#[repr(C)]
#[derive(Debug, FromBytes, IntoBytes, KnownLayout)]
struct BootSectorRaw {
    bs_jmpboot: [u8; 3],
    bs_oemname: [u8; 8],

    /// 512, 1024, 2048, or 4096.
    bpb_bytspersec: U16,
    /// Power of two in [1, 128].
    bpb_secperclus: u8,
    bpb_rsvdseccnt: U16,
    /// 1 or 2.
    bpb_numfats: u8,
    /// 0 for FAT32.
    bpb_rootentcnt: U16,
    /// 0 if the volume needs the 32-bit total in `bpb_totsec32`.
    bpb_totsec16: U16,
    bpb_media: u8,
    /// 0 for FAT32, which uses `bpb_fatsz32` instead.
    bpb_fatsz16: U16,

    bpb_secpertrk: U16,
    bpb_numheads: U16,
    bpb_hiddsec: U32,
    bpb_totsec32: U32,

    bpb_fatsz32: U32,
    bpb_extflags: U16,
    bpb_fsver: U16,
    bpb_rootclus: U32,
    bpb_fsinfo: U16,
    bpb_bkbootsec: U16,
    bpb_reserved: [u8; 12],

    bs_drvnum: u8,
    bs_reserved1: u8,
    bs_bootsig: u8,
    bs_volid: U32,
    bs_vollab: [u8; 11],
    bs_filsystype: [u8; 8],

    bs_boot: [u8; 420],
    signature_word: [u8; 2],
}

const _: () = assert!(core::mem::size_of::<BootSectorRaw>() == 512);
