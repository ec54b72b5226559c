//! L4: whole-file read/write/append/truncate in terms of the FAT table and
//! the owning directory's entry record.

use fatvol_ds::DataStorage;
use fatvol_err::{Error, FsError, Result};

use crate::boot::Geometry;
use crate::table::FatTable;

/// Reads the full contents of a file whose first cluster is `first_cluster`
/// and whose directory entry reports `size` bytes. `first_cluster == 0`
/// (possible for a brand new, still-empty file) yields an empty buffer
/// without consulting the table.
pub fn read_all<DS: DataStorage>(
    device: &DS,
    table: &FatTable<DS>,
    geometry: &Geometry,
    first_cluster: u32,
    size: u64,
) -> Result<Vec<u8>> {
    if first_cluster == 0 || size == 0 {
        return Ok(Vec::new());
    }
    let chain = table.follow_chain(first_cluster)?;
    let mut out = Vec::with_capacity(size as usize);
    let mut remaining = size;
    for cluster in chain {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(geometry.cluster_size as u64) as usize;
        let mut buf = vec![0u8; geometry.cluster_size as usize];
        device.read(geometry.cluster_to_offset(cluster), &mut buf)?;
        out.extend_from_slice(&buf[..take]);
        remaining -= take as u64;
    }
    Ok(out)
}

/// Replaces a file's entire contents with `data`, freeing its previous
/// chain first. Returns the new first cluster (0 if `data` is empty) and
/// the byte length written, for the caller to persist into the directory
/// entry.
pub fn write<DS: DataStorage>(
    device: &DS,
    table: &FatTable<DS>,
    geometry: &Geometry,
    previous_first_cluster: u32,
    data: &[u8],
) -> Result<(u32, u32)> {
    if data.len() > u32::MAX as usize {
        return Err(Error::Fs(FsError::InvalidSize));
    }
    table.free_chain(previous_first_cluster)?;
    if data.is_empty() {
        return Ok((0, 0));
    }
    let cluster_size = geometry.cluster_size as usize;
    let clusters_needed = data.len().div_ceil(cluster_size);
    let first_cluster = table.allocate_chain(clusters_needed)?;
    let chain = table.follow_chain(first_cluster)?;

    for (i, cluster) in chain.iter().enumerate() {
        let start = i * cluster_size;
        let end = (start + cluster_size).min(data.len());
        let offset = geometry.cluster_to_offset(*cluster);
        if end - start == cluster_size {
            device.write(offset, &data[start..end])?;
        } else {
            // Last, partial cluster: zero-pad the tail so stale bytes from
            // a previous occupant never leak through a shorter file.
            let mut buf = vec![0u8; cluster_size];
            buf[..end - start].copy_from_slice(&data[start..end]);
            device.write(offset, &buf)?;
        }
    }
    Ok((first_cluster, data.len() as u32))
}

/// Appends `extra` to a file's existing contents. Implemented directly in
/// terms of `read_all`/`write`: simple, at the cost of reading the whole
/// file back before rewriting it.
pub fn append<DS: DataStorage>(
    device: &DS,
    table: &FatTable<DS>,
    geometry: &Geometry,
    first_cluster: u32,
    size: u64,
    extra: &[u8],
) -> Result<(u32, u32)> {
    let mut data = read_all(device, table, geometry, first_cluster, size)?;
    data.extend_from_slice(extra);
    write(device, table, geometry, first_cluster, &data)
}

/// Grows or shrinks a file to exactly `new_size` bytes, zero-filling any
/// newly exposed region when growing.
pub fn truncate<DS: DataStorage>(
    device: &DS,
    table: &FatTable<DS>,
    geometry: &Geometry,
    first_cluster: u32,
    size: u64,
    new_size: u64,
) -> Result<(u32, u32)> {
    if new_size == size {
        return Ok((first_cluster, size as u32));
    }
    let mut data = read_all(device, table, geometry, first_cluster, size)?;
    data.resize(new_size as usize, 0);
    write(device, table, geometry, first_cluster, &data)
}
