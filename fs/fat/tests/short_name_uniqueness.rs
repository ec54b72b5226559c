//! Three long names that collapse to the same 8.3 prefix must each get a
//! distinct, monotonically increasing `~N` short name.

mod common;

use fatvol_fat::Filesystem;

#[test]
fn colliding_long_names_escalate_the_short_name_suffix() {
    let (_tmp, device) = common::build_fat12();
    let fs = Filesystem::mount(device).expect("mount");

    fs.create_file("/My Document.txt").unwrap();
    fs.create_file("/My Documents.txt").unwrap();
    fs.create_file("/My Document Two.txt").unwrap();

    let listing = fs.list("/").unwrap();
    let short_names: Vec<&str> = ["My Document.txt", "My Documents.txt", "My Document Two.txt"]
        .iter()
        .map(|long| {
            listing
                .iter()
                .find(|m| m.name == *long)
                .unwrap_or_else(|| panic!("{long} missing from listing"))
                .short_name
                .as_str()
        })
        .collect();

    assert_eq!(short_names, vec!["MYDOCU~1.TXT", "MYDOCU~2.TXT", "MYDOCU~3.TXT"]);
}

#[test]
fn the_next_suffix_is_always_one_past_the_current_maximum() {
    let (_tmp, device) = common::build_fat12();
    let fs = Filesystem::mount(device).expect("mount");

    fs.create_file("/My Document.txt").unwrap();
    fs.create_file("/My Documents.txt").unwrap();
    fs.delete("/My Documents.txt").unwrap();
    fs.create_file("/My Document Two.txt").unwrap();

    // Suffix assignment only ever looks at currently-present short names, so
    // deleting MYDOCU~2.TXT makes ~2 available again for the next collision
    // rather than skipping ahead to ~3.
    let meta = fs.get("/My Document Two.txt").unwrap();
    assert_eq!(meta.short_name, "MYDOCU~2.TXT");
}
