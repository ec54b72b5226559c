//! A FAT12 floppy-shaped volume: create a file, write it, read it back.

mod common;

use fatvol_fat::Filesystem;

#[test]
fn hello_txt_round_trips_through_a_fat12_volume() {
    let (_tmp, device) = common::build_fat12();
    let fs = Filesystem::mount(device).expect("mount");

    fs.create_file("/hello.txt").expect("create");
    fs.write("/hello.txt", b"hello world").expect("write");

    let data = fs.read_all("/hello.txt").expect("read");
    assert_eq!(data, b"hello world");

    let meta = fs.get("/hello.txt").expect("get");
    assert_eq!(meta.size, 11);
    assert!(!meta.is_dir);
    // "hello.txt" has lower-case letters, so it needs an LFN run and gets a
    // synthesized ~1 short name even though it would otherwise fit 8.3.
    assert_eq!(meta.short_name, "HELLO~1.TXT");

    let listing = fs.list("/").expect("list");
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].name, "hello.txt");
}

#[test]
fn overwriting_a_file_replaces_its_contents() {
    let (_tmp, device) = common::build_fat12();
    let fs = Filesystem::mount(device).expect("mount");

    fs.create_file("/a.txt").unwrap();
    fs.write("/a.txt", b"first").unwrap();
    fs.write("/a.txt", b"second, and longer").unwrap();

    assert_eq!(fs.read_all("/a.txt").unwrap(), b"second, and longer");
}

#[test]
fn append_concatenates_onto_existing_content() {
    let (_tmp, device) = common::build_fat12();
    let fs = Filesystem::mount(device).expect("mount");

    fs.create_file("/a.txt").unwrap();
    fs.write("/a.txt", b"hello ").unwrap();
    fs.append("/a.txt", b"world").unwrap();

    assert_eq!(fs.read_all("/a.txt").unwrap(), b"hello world");
}

#[test]
fn truncate_grows_with_zero_fill_and_shrinks_by_dropping_the_tail() {
    let (_tmp, device) = common::build_fat12();
    let fs = Filesystem::mount(device).expect("mount");

    fs.create_file("/a.txt").unwrap();
    fs.write("/a.txt", b"hello world").unwrap();

    fs.truncate("/a.txt", 5).unwrap();
    assert_eq!(fs.read_all("/a.txt").unwrap(), b"hello");

    fs.truncate("/a.txt", 8).unwrap();
    let grown = fs.read_all("/a.txt").unwrap();
    assert_eq!(grown.len(), 8);
    assert_eq!(&grown[..5], b"hello");
    assert_eq!(&grown[5..], &[0, 0, 0]);
}

#[test]
fn deleting_a_file_removes_it_from_the_listing() {
    let (_tmp, device) = common::build_fat12();
    let fs = Filesystem::mount(device).expect("mount");

    fs.create_file("/a.txt").unwrap();
    fs.delete("/a.txt").unwrap();

    assert!(fs.list("/").unwrap().is_empty());
    assert!(fs.get("/a.txt").is_err());
}

#[test]
fn creating_a_subdirectory_and_nesting_a_file_resolves_the_full_path() {
    let (_tmp, device) = common::build_fat12();
    let fs = Filesystem::mount(device).expect("mount");

    fs.create_directory("/docs").unwrap();
    fs.create_file("/docs/readme.txt").unwrap();
    fs.write("/docs/readme.txt", b"nested").unwrap();

    assert_eq!(fs.read_all("/docs/readme.txt").unwrap(), b"nested");
    let listing = fs.list("/docs").unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].name, "readme.txt");
}
