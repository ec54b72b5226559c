//! The fixed FAT12/16 root directory cannot grow past its on-disk slot
//! count; an ordinary (cluster-chained) subdirectory can, by allocating
//! more clusters as needed.

mod common;

use fatvol_err::{Error, FsError};
use fatvol_fat::Filesystem;

#[test]
fn the_17th_entry_overflows_a_16_slot_root_directory() {
    let _ = env_logger::try_init();
    let (_tmp, device) = common::build_fat12_with_root_entries(16);
    let fs = Filesystem::mount(device).expect("mount");

    for i in 0..16 {
        fs.create_file(&format!("/F{i}.TXT")).unwrap_or_else(|e| panic!("entry {i}: {e}"));
    }

    match fs.create_file("/F16.TXT") {
        Err(Error::Fs(FsError::DirectoryFull)) => {}
        other => panic!("expected DirectoryFull, got {other:?}"),
    }
}

#[test]
fn a_subdirectory_expands_past_its_first_cluster_to_hold_500_files() {
    let (_tmp, device) = common::build_fat12_with_root_entries(16);
    let fs = Filesystem::mount(device).expect("mount");

    fs.create_directory("/sub").unwrap();
    for i in 0..500 {
        fs.create_file(&format!("/sub/F{i:03}.TXT")).unwrap_or_else(|e| panic!("entry {i}: {e}"));
    }

    let listing = fs.list("/sub").unwrap();
    assert_eq!(listing.len(), 500);
}
