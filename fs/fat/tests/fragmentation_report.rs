//! Forces a specific two-run fragmented chain through ordinary file
//! operations (create, write, delete, recreate) and checks the analyzer's
//! fragment count and average gap against hand-computed values.

mod common;

use fatvol_fat::Filesystem;

#[test]
fn a_chain_with_one_gap_reports_two_fragments_and_the_right_average_gap() {
    let (_tmp, device) = common::build_fat12();
    let fs = Filesystem::mount(device).expect("mount");

    // Cluster size is 512 bytes.
    fs.create_file("/a.bin").unwrap();
    fs.write("/a.bin", &vec![1u8; 700]).unwrap(); // 2 clusters: [2, 3]

    fs.create_file("/b.bin").unwrap();
    fs.write("/b.bin", &vec![2u8; 100]).unwrap(); // 1 cluster: [4]

    fs.delete("/a.bin").unwrap(); // frees [2, 3]

    fs.create_file("/c.bin").unwrap();
    fs.write("/c.bin", &vec![3u8; 100]).unwrap(); // takes the first free cluster: [2]

    fs.create_file("/d.bin").unwrap();
    fs.write("/d.bin", &vec![4u8; 700]).unwrap(); // needs 2 clusters; only 3 and 5 are free: [3, 5]

    let report = fs.analyze_fragmentation().unwrap();
    let d = report.files.iter().find(|f| f.path == "/d.bin").expect("d.bin in report");
    assert_eq!(d.fragment_count, 2);
    assert_eq!(d.average_gap, 1.0);
    assert_eq!(d.severity, fatvol_fat::Severity::Light);
}
