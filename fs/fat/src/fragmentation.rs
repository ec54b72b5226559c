//! L5: read-only fragmentation analysis over the file tree and free space.
//!
//! Every pass here only calls `FatTable::get`/`follow_chain` and
//! `Directory::list`; nothing here ever mutates the device.

use fatvol_ds::DataStorage;
use fatvol_err::Result;

use crate::boot::Geometry;
use crate::dir::Directory;
use crate::table::FatTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    None,
    Light,
    Moderate,
    Heavy,
    Severe,
}

#[derive(Debug, Clone)]
pub struct FileFragmentation {
    pub path: String,
    pub size: u64,
    pub fragment_count: usize,
    pub average_gap: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default)]
pub struct FreeSpaceReport {
    pub block_count: usize,
    pub largest_block: u32,
    pub mean_block_size: f64,
    pub fragmentation_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone)]
pub struct Recommendation {
    pub level: RecommendationLevel,
    pub action: &'static str,
    pub affected: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FragmentationReport {
    pub files: Vec<FileFragmentation>,
    pub free_space: FreeSpaceReport,
    pub seek_distance_score: f64,
    pub fragmentation_impact_score: f64,
    pub read_efficiency_score: f64,
    pub recommendations: Vec<Recommendation>,
}

/// Maximal runs of consecutive cluster numbers within `chain`, e.g.
/// `[2,3,4,7,8]` yields fragments `[[2,3,4],[7,8]]`.
fn fragments(chain: &[u32]) -> Vec<Vec<u32>> {
    let mut out: Vec<Vec<u32>> = Vec::new();
    for &cluster in chain {
        match out.last_mut() {
            Some(run) if *run.last().unwrap() + 1 == cluster => run.push(cluster),
            _ => out.push(vec![cluster]),
        }
    }
    out
}

fn average_gap(runs: &[Vec<u32>]) -> f64 {
    if runs.len() < 2 {
        return 0.0;
    }
    let mut gaps = Vec::new();
    for pair in runs.windows(2) {
        let prev_end = *pair[0].last().unwrap();
        let next_start = *pair[1].first().unwrap();
        gaps.push((next_start - prev_end - 1) as f64);
    }
    gaps.iter().sum::<f64>() / gaps.len() as f64
}

fn classify_severity(fragment_count: usize, average_gap: f64) -> Severity {
    if fragment_count == 1 {
        Severity::None
    } else if fragment_count == 2 && average_gap < 10.0 {
        Severity::Light
    } else if fragment_count <= 5 && average_gap < 50.0 {
        Severity::Moderate
    } else if fragment_count <= 10 || average_gap < 100.0 {
        Severity::Heavy
    } else {
        Severity::Severe
    }
}

/// Recursively collects `(path, size, first_cluster)` for every regular
/// file under `dir`, skipping `.`/`..`, descending into subdirectories.
fn walk_files<DS: DataStorage>(
    device: &DS,
    table: &FatTable<DS>,
    geometry: &Geometry,
    dir: &Directory<DS>,
    prefix: &str,
) -> Result<Vec<(String, u64, u32)>> {
    let mut out = Vec::new();
    for entry in dir.list()? {
        let path = format!("{prefix}/{}", entry.name);
        if entry.is_dir {
            let child_cluster = dir.first_cluster_of(&entry.name)?;
            let child = Directory::at_cluster(device, table, *geometry, child_cluster);
            out.extend(walk_files(device, table, geometry, &child, &path)?);
        } else {
            let first_cluster = dir.first_cluster_of(&entry.name)?;
            out.push((path, entry.size, first_cluster));
        }
    }
    Ok(out)
}

pub fn analyze<DS: DataStorage>(
    device: &DS,
    table: &FatTable<DS>,
    geometry: &Geometry,
    root: &Directory<DS>,
) -> Result<FragmentationReport> {
    let file_list = walk_files(device, table, geometry, root, "")?;

    let mut files = Vec::with_capacity(file_list.len());
    for (path, size, first_cluster) in &file_list {
        let chain = if *first_cluster == 0 { Vec::new() } else { table.follow_chain(*first_cluster)? };
        let runs = fragments(&chain);
        let fragment_count = runs.len().max(1);
        let gap = average_gap(&runs);
        let severity = classify_severity(fragment_count, gap);
        files.push(FileFragmentation {
            path: path.clone(),
            size: *size,
            fragment_count,
            average_gap: gap,
            severity,
        });
    }

    let free_space = analyze_free_space(table, geometry)?;

    let total_size: u64 = files.iter().map(|f| f.size).sum();
    let seek_numerator: f64 = files
        .iter()
        .map(|f| f.average_gap * (((f.size as f64 / 1024.0).max(1.0)).ln()))
        .sum();
    let seek_distance_score = if total_size == 0 {
        0.0
    } else {
        (seek_numerator / (total_size as f64 / 1024.0) * 10.0).min(100.0)
    };

    let fragmented_count = files.iter().filter(|f| f.fragment_count > 1).count();
    let file_fragmentation_pct = if files.is_empty() {
        0.0
    } else {
        fragmented_count as f64 / files.len() as f64 * 100.0
    };

    let impact_score =
        0.4 * seek_distance_score + 0.4 * file_fragmentation_pct + 0.2 * free_space.fragmentation_ratio;
    let read_efficiency_score = (100.0 - impact_score).clamp(0.0, 100.0);

    let mut recommendations = Vec::new();
    let severe_or_heavy: Vec<String> = files
        .iter()
        .filter(|f| f.severity == Severity::Severe || f.fragment_count > 10)
        .map(|f| f.path.clone())
        .collect();
    if !severe_or_heavy.is_empty() {
        recommendations.push(Recommendation {
            level: RecommendationLevel::High,
            action: "DEFRAGMENT_FILES",
            affected: severe_or_heavy,
        });
    }
    if free_space.fragmentation_ratio > 50.0 {
        recommendations.push(Recommendation {
            level: RecommendationLevel::Medium,
            action: "CONSOLIDATE_FREE_SPACE",
            affected: Vec::new(),
        });
    }
    if impact_score > 30.0 {
        recommendations.push(Recommendation {
            level: RecommendationLevel::Low,
            action: "FULL_DEFRAGMENTATION",
            affected: Vec::new(),
        });
    }

    Ok(FragmentationReport {
        files,
        free_space,
        seek_distance_score,
        fragmentation_impact_score: impact_score,
        read_efficiency_score,
        recommendations,
    })
}

fn analyze_free_space<DS: DataStorage>(table: &FatTable<DS>, geometry: &Geometry) -> Result<FreeSpaceReport> {
    let mut blocks: Vec<u32> = Vec::new();
    let mut run_len = 0u32;
    for cluster in 2..2 + geometry.total_clusters {
        if table.get(cluster)? == 0 {
            run_len += 1;
        } else if run_len > 0 {
            blocks.push(run_len);
            run_len = 0;
        }
    }
    if run_len > 0 {
        blocks.push(run_len);
    }

    let block_count = blocks.len();
    let largest_block = blocks.iter().copied().max().unwrap_or(0);
    let mean_block_size = if block_count == 0 {
        0.0
    } else {
        blocks.iter().sum::<u32>() as f64 / block_count as f64
    };
    let fragmentation_ratio = if block_count <= 1 {
        0.0
    } else {
        (block_count - 1) as f64 / block_count as f64 * 100.0
    };

    Ok(FreeSpaceReport { block_count, largest_block, mean_block_size, fragmentation_ratio })
}
