//! Two edge cases around entry creation that are easy to get wrong: calling
//! `create_file`/`create_directory` a second time for a name that already
//! exists, and the `..` cluster recorded for a subdirectory created
//! directly under a FAT32 root.

mod common;

use fatvol_err::{Error, FsError};
use fatvol_fat::entry::DirEntryRaw;
use fatvol_fat::Filesystem;
use fatvol_ds::DataStorage;
use zerocopy::IntoBytes;

#[test]
fn recreating_an_existing_file_returns_its_metadata_instead_of_erroring() {
    let (_tmp, device) = common::build_fat12();
    let fs = Filesystem::mount(device).expect("mount");

    let first = fs.create_file("/HELLO.TXT").unwrap();
    let second = fs.create_file("/HELLO.TXT").unwrap();
    assert_eq!(first.name, second.name);
    assert_eq!(first.short_name, second.short_name);
    assert!(!second.is_dir);

    let listing = fs.list("/").unwrap();
    assert_eq!(listing.len(), 1, "re-creating the same name must not add a second entry");
}

#[test]
fn recreating_an_existing_directory_returns_its_metadata_instead_of_erroring() {
    let (_tmp, device) = common::build_fat12();
    let fs = Filesystem::mount(device).expect("mount");

    let first = fs.create_directory("/sub").unwrap();
    let second = fs.create_directory("/sub").unwrap();
    assert_eq!(first.name, second.name);
    assert!(second.is_dir);
}

#[test]
fn creating_a_file_where_a_directory_exists_fails_with_type_mismatch() {
    let (_tmp, device) = common::build_fat12();
    let fs = Filesystem::mount(device).expect("mount");

    fs.create_directory("/sub").unwrap();
    match fs.create_file("/sub") {
        Err(Error::Fs(FsError::NotAFile(_))) => {}
        other => panic!("expected NotAFile, got {other:?}"),
    }
}

#[test]
fn creating_a_directory_where_a_file_exists_fails_with_type_mismatch() {
    let (_tmp, device) = common::build_fat12();
    let fs = Filesystem::mount(device).expect("mount");

    fs.create_file("/HELLO.TXT").unwrap();
    match fs.create_directory("/HELLO.TXT") {
        Err(Error::Fs(FsError::NotADirectory(_))) => {}
        other => panic!("expected NotADirectory, got {other:?}"),
    }
}

#[test]
fn a_subdirectory_created_directly_under_a_fat32_root_gets_a_zero_dotdot_cluster() {
    let (_tmp, device) = common::build_fat32();
    let fs = Filesystem::mount(device).expect("mount");

    fs.create_directory("/SUB").unwrap();
    let meta = fs.get("/SUB").unwrap();
    assert!(meta.is_dir);

    // The child's own cluster is not zero (it's a real allocated cluster),
    // but its ".." entry must point at 0, not the FAT32 root's real cluster
    // number. Locate the child's first cluster by scanning the raw root
    // directory, since that's the only place it's recorded.
    let geometry = fs.geometry();
    let root_offset = geometry.cluster_to_offset(geometry.root_cluster);
    let mut found_cluster = None;
    for slot in 0.. {
        let offset = root_offset + (slot as u64) * 32;
        let mut raw = DirEntryRaw::zeroed();
        if device.read(offset, raw.as_mut_bytes()).is_err() {
            break;
        }
        if raw.is_end() {
            break;
        }
        if raw.is_deleted() || raw.is_long_name() || raw.is_volume_id() {
            continue;
        }
        if raw.is_directory() && raw.name[0] != b'.' {
            found_cluster = Some(raw.first_cluster());
            break;
        }
    }
    let sub_cluster = found_cluster.expect("SUB entry not found in FAT32 root");
    assert_ne!(sub_cluster, 0);

    let dotdot_offset = geometry.cluster_to_offset(sub_cluster) + 32;
    let mut dotdot = DirEntryRaw::zeroed();
    device.read(dotdot_offset, dotdot.as_mut_bytes()).unwrap();
    assert_eq!(&dotdot.name, b"..         ");
    assert_eq!(dotdot.first_cluster(), 0, "FAT32 root is not a valid `..` target cluster");
}
