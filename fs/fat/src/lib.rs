//! FAT12/16/32 volume engine. Layers, bottom to top: [`boot`] (BPB parsing
//! and geometry), [`table`] (FAT entry read/write/chain), [`entry`] and
//! [`dir`] (directory records, LFN, short-name synthesis), [`file`] (whole
//! cluster-chain I/O), and [`fragmentation`] (read-only analysis). This
//! module ties them together behind a single [`Filesystem`] facade that
//! resolves `/`-separated paths.

pub mod boot;
pub mod datetime;
pub mod dir;
pub mod entry;
pub mod file;
pub mod fragmentation;
pub mod shortname;
pub mod table;

pub use boot::{FatVariant, Geometry};
pub use fragmentation::{FileFragmentation, FragmentationReport, FreeSpaceReport, Recommendation, RecommendationLevel, Severity};

use fatvol_ds::DataStorage;
use fatvol_err::{Error, FsError, Result};
use fatvol_fs::{Attributes, Metadata};
use log::warn;

use crate::dir::Directory;
use crate::table::FatTable;

/// Mount-time knobs. There is no on-disk configuration surface for a FAT
/// volume; this only governs how this process treats the mount.
#[derive(Debug, Clone, Default)]
pub struct MountOptions {
    /// Refuse every mutating operation (`create_*`, `write`, `append`,
    /// `truncate`, `delete`) with [`FsError::ReadOnly`].
    pub read_only: bool,
    /// Log a warning when `bs_filsystype` disagrees with the cluster-count
    /// classification. The count always wins regardless of this flag; it
    /// only controls whether the disagreement is surfaced.
    pub warn_on_classification_mismatch: bool,
}

fn expected_fs_type_label(variant: FatVariant) -> &'static [u8; 8] {
    match variant {
        FatVariant::Fat12 => b"FAT12   ",
        FatVariant::Fat16 => b"FAT16   ",
        FatVariant::Fat32 => b"FAT32   ",
    }
}

/// A mounted FAT volume. Holds the device and the boot sector's derived
/// geometry; the FAT table and directory handles used by each operation
/// are constructed fresh per call since neither caches anything (spec:
/// "no cache; every read/write passes to the device").
pub struct Filesystem<DS: DataStorage> {
    device: DS,
    geometry: Geometry,
    options: MountOptions,
}

impl<DS: DataStorage> Filesystem<DS> {
    pub fn mount(device: DS) -> Result<Self> {
        Self::mount_with_options(device, MountOptions::default())
    }

    pub fn mount_with_options(device: DS, options: MountOptions) -> Result<Self> {
        let geometry = Geometry::parse(&device)?;
        Ok(Self { device, geometry, options })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Releases the underlying device. A no-op beyond dropping the handle:
    /// every prior call already went through to the device, so there is no
    /// write-back buffer to flush.
    pub fn unmount(self) -> DS {
        self.device
    }

    pub fn volume_label(&self) -> Result<Option<String>> {
        let table = FatTable::new(&self.device, self.geometry);
        let root = Directory::root(&self.device, &table, self.geometry);
        root.volume_label()
    }

    pub fn list(&self, path: &str) -> Result<Vec<Metadata>> {
        let table = FatTable::new(&self.device, self.geometry);
        let dir = self.resolve_dir(&table, path)?;
        dir.list()
    }

    pub fn get(&self, path: &str) -> Result<Metadata> {
        let table = FatTable::new(&self.device, self.geometry);
        if self.is_root_path(path) {
            return Ok(root_metadata());
        }
        let (parent, name) = self.resolve_parent(&table, path)?;
        parent.find(&name)
    }

    pub fn create_file(&self, path: &str) -> Result<Metadata> {
        self.require_writable()?;
        let table = FatTable::new(&self.device, self.geometry);
        let (parent, name) = self.resolve_or_create_parent(&table, path)?;
        parent.create_entry(&name, Attributes::ARCHIVE, 0, 0)
    }

    pub fn create_directory(&self, path: &str) -> Result<Metadata> {
        self.require_writable()?;
        let table = FatTable::new(&self.device, self.geometry);
        let (parent, name) = self.resolve_or_create_parent(&table, path)?;
        let new_cluster = self.new_zeroed_cluster(&table)?;
        let child = Directory::at_cluster(&self.device, &table, self.geometry, new_cluster);
        child.init_as_child(parent.dotdot_cluster())?;
        parent.create_entry(&name, Attributes::DIRECTORY, new_cluster, 0)
    }

    pub fn read_all(&self, path: &str) -> Result<Vec<u8>> {
        let table = FatTable::new(&self.device, self.geometry);
        let (parent, name) = self.resolve_parent(&table, path)?;
        let meta = parent.find(&name)?;
        if meta.is_dir {
            return Err(Error::Fs(FsError::NotAFile(path.to_string())));
        }
        let first_cluster = parent.first_cluster_of(&name)?;
        let data = file::read_all(&self.device, &table, &self.geometry, first_cluster, meta.size)?;
        parent.touch_access(&name)?;
        Ok(data)
    }

    pub fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        self.require_writable()?;
        let table = FatTable::new(&self.device, self.geometry);
        let (parent, name) = self.resolve_parent(&table, path)?;
        let meta = parent.find(&name)?;
        if meta.is_dir {
            return Err(Error::Fs(FsError::NotAFile(path.to_string())));
        }
        let first_cluster = parent.first_cluster_of(&name)?;
        let (new_first, size) = file::write(&self.device, &table, &self.geometry, first_cluster, data)?;
        parent.update_file(&name, new_first, size)
    }

    pub fn append(&self, path: &str, data: &[u8]) -> Result<()> {
        self.require_writable()?;
        let table = FatTable::new(&self.device, self.geometry);
        let (parent, name) = self.resolve_parent(&table, path)?;
        let meta = parent.find(&name)?;
        if meta.is_dir {
            return Err(Error::Fs(FsError::NotAFile(path.to_string())));
        }
        let first_cluster = parent.first_cluster_of(&name)?;
        let (new_first, size) =
            file::append(&self.device, &table, &self.geometry, first_cluster, meta.size, data)?;
        parent.update_file(&name, new_first, size)
    }

    pub fn truncate(&self, path: &str, new_size: u64) -> Result<()> {
        self.require_writable()?;
        let table = FatTable::new(&self.device, self.geometry);
        let (parent, name) = self.resolve_parent(&table, path)?;
        let meta = parent.find(&name)?;
        if meta.is_dir {
            return Err(Error::Fs(FsError::NotAFile(path.to_string())));
        }
        let first_cluster = parent.first_cluster_of(&name)?;
        let (new_first, size) =
            file::truncate(&self.device, &table, &self.geometry, first_cluster, meta.size, new_size)?;
        parent.update_file(&name, new_first, size)
    }

    pub fn delete(&self, path: &str) -> Result<()> {
        self.require_writable()?;
        if self.is_root_path(path) {
            return Err(Error::Fs(FsError::CannotDeleteRoot));
        }
        let table = FatTable::new(&self.device, self.geometry);
        let (parent, name) = self.resolve_parent(&table, path)?;
        parent.delete(&name)
    }

    pub fn analyze_fragmentation(&self) -> Result<FragmentationReport> {
        let table = FatTable::new(&self.device, self.geometry);
        let root = Directory::root(&self.device, &table, self.geometry);
        fragmentation::analyze(&self.device, &table, &self.geometry, &root)
    }

    fn require_writable(&self) -> Result<()> {
        if self.options.read_only {
            Err(Error::Fs(FsError::ReadOnly))
        } else {
            Ok(())
        }
    }

    fn is_root_path(&self, path: &str) -> bool {
        path.split('/').all(|c| c.is_empty())
    }

    fn new_zeroed_cluster(&self, table: &FatTable<DS>) -> Result<u32> {
        let cluster = table.allocate_one()?;
        let zeros = vec![0u8; self.geometry.cluster_size as usize];
        self.device.write(self.geometry.cluster_to_offset(cluster), &zeros)?;
        Ok(cluster)
    }

    fn components(path: &str) -> Vec<&str> {
        path.split('/').filter(|c| !c.is_empty()).collect()
    }

    fn resolve_dir<'t>(&'t self, table: &'t FatTable<'t, DS>, path: &str) -> Result<Directory<'t, DS>> {
        let mut current = Directory::root(&self.device, table, self.geometry);
        for comp in Self::components(path) {
            let meta = current.find(comp)?;
            if !meta.is_dir {
                return Err(Error::Fs(FsError::NotADirectory(comp.to_string())));
            }
            let cluster = current.first_cluster_of(comp)?;
            current = Directory::at_cluster(&self.device, table, self.geometry, cluster);
        }
        Ok(current)
    }

    fn resolve_parent<'t>(
        &'t self,
        table: &'t FatTable<'t, DS>,
        path: &str,
    ) -> Result<(Directory<'t, DS>, String)> {
        let components = Self::components(path);
        let (last, dirs) = components
            .split_last()
            .ok_or_else(|| Error::Fs(FsError::NameInvalid(path.to_string())))?;
        let mut current = Directory::root(&self.device, table, self.geometry);
        for comp in dirs {
            let meta = current.find(comp)?;
            if !meta.is_dir {
                return Err(Error::Fs(FsError::NotADirectory(comp.to_string())));
            }
            let cluster = current.first_cluster_of(comp)?;
            current = Directory::at_cluster(&self.device, table, self.geometry, cluster);
        }
        Ok((current, last.to_string()))
    }

    /// Like [`Filesystem::resolve_parent`], but creates any missing
    /// intermediate directory along the way instead of failing with
    /// `NotFound`.
    fn resolve_or_create_parent<'t>(
        &'t self,
        table: &'t FatTable<'t, DS>,
        path: &str,
    ) -> Result<(Directory<'t, DS>, String)> {
        let components = Self::components(path);
        let (last, dirs) = components
            .split_last()
            .ok_or_else(|| Error::Fs(FsError::NameInvalid(path.to_string())))?;
        let mut current = Directory::root(&self.device, table, self.geometry);
        for comp in dirs {
            current = match current.find(comp) {
                Ok(meta) if meta.is_dir => {
                    let cluster = current.first_cluster_of(comp)?;
                    Directory::at_cluster(&self.device, table, self.geometry, cluster)
                }
                Ok(_) => return Err(Error::Fs(FsError::NotADirectory(comp.to_string()))),
                Err(Error::Fs(FsError::NotFound(_))) => {
                    let new_cluster = self.new_zeroed_cluster(table)?;
                    let child = Directory::at_cluster(&self.device, table, self.geometry, new_cluster);
                    child.init_as_child(current.dotdot_cluster())?;
                    current.create_entry(comp, Attributes::DIRECTORY, new_cluster, 0)?;
                    Directory::at_cluster(&self.device, table, self.geometry, new_cluster)
                }
                Err(e) => return Err(e),
            };
        }
        Ok((current, last.to_string()))
    }
}

fn root_metadata() -> Metadata {
    Metadata {
        name: "/".to_string(),
        short_name: "/".to_string(),
        size: 0,
        is_dir: true,
        attributes: Attributes::DIRECTORY,
        created: datetime::now(),
        modified: datetime::now(),
        accessed: datetime::now(),
    }
}
