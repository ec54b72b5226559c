//! A 128 MiB FAT32 volume: ten files of varying cluster counts, written and
//! read back in an order different from creation, to catch any chain
//! overlap a broken allocator would produce.

mod common;

use fatvol_fat::Filesystem;

#[test]
fn ten_files_of_varying_size_round_trip_without_corrupting_each_other() {
    let (_tmp, device) = common::build_fat32();
    let fs = Filesystem::mount(device).expect("mount");

    // Cluster size is 1024 bytes; sizes below span 1 to ~4 clusters each.
    let contents: Vec<(String, Vec<u8>)> = (0..10)
        .map(|i| {
            let name = format!("/F{i}.BIN");
            let len = 200 + i * 450;
            let byte = b'A' + i as u8;
            (name, vec![byte; len])
        })
        .collect();

    for (name, data) in &contents {
        fs.create_file(name).unwrap();
        fs.write(name, data).unwrap();
    }

    // Read back in reverse order: if two files' chains overlapped, an
    // earlier write would have clobbered a later file's clusters.
    for (name, data) in contents.iter().rev() {
        let read_back = fs.read_all(name).unwrap();
        assert_eq!(&read_back, data, "{name} corrupted");
    }

    let listing = fs.list("/").unwrap();
    assert_eq!(listing.len(), 10);

    let report = fs.analyze_fragmentation().unwrap();
    for file in &report.files {
        assert_eq!(file.fragment_count, 1, "{} unexpectedly fragmented", file.path);
    }
}
