//! 8.3 short-name synthesis and long-filename chunking (spec §4.4 item 3).

use fatvol_err::{Error, FsError, Result};

use crate::entry::LFN_CHARS_PER_ENTRY;

const DISALLOWED: &[u8] = b"\"*+,/:;<=>?[\\]|";

/// True if `name` needs an LFN run: too long for 8.3, contains characters
/// disallowed in a short name, has a space, mixed/lowercase letters, more
/// than one dot, or any non-ASCII byte.
pub fn needs_long_name(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    if !name.is_ascii() {
        return true;
    }
    let (base, ext) = split_base_ext(name);
    if base.len() > 8 || ext.len() > 3 {
        return true;
    }
    if name.matches('.').count() > 1 {
        return true;
    }
    let bytes = name.as_bytes();
    if bytes.contains(&b' ') {
        return true;
    }
    if bytes.iter().any(|b| DISALLOWED.contains(b)) {
        return true;
    }
    if bytes.iter().any(|b| b.is_ascii_lowercase()) {
        return true;
    }
    false
}

fn split_base_ext(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(0) => (name, ""),
        Some(pos) => (&name[..pos], &name[pos + 1..]),
        None => (name, ""),
    }
}

fn sanitize_component(component: &str) -> Vec<u8> {
    component
        .to_ascii_uppercase()
        .bytes()
        .filter(|b| b.is_ascii() && !DISALLOWED.contains(b) && *b != b' ' && *b != b'.')
        .collect()
}

/// Formats an 11-byte padded short name (`base` left-justified to 8,
/// `ext` left-justified to 3, both space-padded) from already-sanitized,
/// already-truncated components.
fn format_name11(base: &[u8], ext: &[u8]) -> [u8; 11] {
    let mut name11 = [b' '; 11];
    name11[..base.len().min(8)].copy_from_slice(&base[..base.len().min(8)]);
    name11[8..8 + ext.len().min(3)].copy_from_slice(&ext[..ext.len().min(3)]);
    name11
}

fn name11_to_display(name11: &[u8; 11]) -> String {
    let base = name11[..8].iter().rev().skip_while(|&&b| b == b' ').collect::<Vec<_>>();
    let base: Vec<u8> = base.into_iter().rev().copied().collect();
    let ext = name11[8..].iter().rev().skip_while(|&&b| b == b' ').collect::<Vec<_>>();
    let ext: Vec<u8> = ext.into_iter().rev().copied().collect();
    let mut s = String::from_utf8_lossy(&base).into_owned();
    if !ext.is_empty() {
        s.push('.');
        s.push_str(&String::from_utf8_lossy(&ext));
    }
    s
}

/// Synthesizes an 8.3 name for `long_name` given the short names already
/// present in the target directory. When `needs_lfn` is false, `long_name`
/// already fits an 8.3 slot and is used verbatim (space-padded). Otherwise
/// a `PREFIX~N.EXT` tail is always appended: `N` is one more than the
/// largest existing suffix sharing `PREFIX`, shortening the 6-character
/// prefix as `N` grows past what 8 characters hold.
pub fn synthesize_short_name(long_name: &str, needs_lfn: bool, existing: &[String]) -> Result<[u8; 11]> {
    let (base_str, ext_str) = split_base_ext(long_name);
    let base = sanitize_component(base_str);
    let ext: Vec<u8> = sanitize_component(ext_str).into_iter().take(3).collect();
    let base = if base.is_empty() { b"FILE".to_vec() } else { base };

    if !needs_lfn {
        return Ok(format_name11(&base, &ext));
    }

    let prefix: Vec<u8> = base.into_iter().take(6).collect();
    let existing_upper: Vec<String> = existing.iter().map(|s| s.to_ascii_uppercase()).collect();

    let prefix_str = String::from_utf8_lossy(&prefix).into_owned();
    let max_suffix = existing_upper
        .iter()
        .filter_map(|name| matching_suffix(name, &prefix_str))
        .max()
        .unwrap_or(0);

    for n in max_suffix.saturating_add(1)..=999_999u32 {
        let suffix = format!("~{n}");
        let prefix_len = (8 - suffix.len()).min(prefix.len());
        let mut candidate_base = prefix[..prefix_len].to_vec();
        candidate_base.extend_from_slice(suffix.as_bytes());
        let name11 = format_name11(&candidate_base, &ext);
        let display = name11_to_display(&name11).to_ascii_uppercase();
        if !existing_upper.contains(&display) {
            return Ok(name11);
        }
    }

    Err(Error::Fs(FsError::NameGenerationExhausted))
}

/// If `existing_name` (already uppercased) matches `PREFIX~<digits>(.ext)?`
/// for the given `prefix`, returns the parsed digit run.
fn matching_suffix(existing_name: &str, prefix: &str) -> Option<u32> {
    let base = split_base_ext(existing_name).0;
    let rest = base.strip_prefix(prefix)?;
    let rest = rest.strip_prefix('~')?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

/// Splits `name` (a long filename) into UTF-16 chunks of exactly
/// [`LFN_CHARS_PER_ENTRY`], the last chunk `U+0000`-terminated and
/// `0xFFFF`-padded, in on-disk (last-entry-first) order.
pub fn split_long_name(name: &str) -> Vec<[u16; LFN_CHARS_PER_ENTRY]> {
    let units: Vec<u16> = name.encode_utf16().collect();
    let mut chunks = Vec::new();
    let mut idx = 0;
    loop {
        let mut chunk = [0xFFFFu16; LFN_CHARS_PER_ENTRY];
        let remaining = units.len() - idx;
        if remaining <= LFN_CHARS_PER_ENTRY {
            for (i, &u) in units[idx..].iter().enumerate() {
                chunk[i] = u;
            }
            chunk[remaining] = 0x0000;
            chunks.push(chunk);
            break;
        }
        chunk.copy_from_slice(&units[idx..idx + LFN_CHARS_PER_ENTRY]);
        chunks.push(chunk);
        idx += LFN_CHARS_PER_ENTRY;
    }
    chunks.reverse();
    chunks
}

/// Reassembles UTF-16 chunks (given in on-disk, last-entry-first order)
/// back into a `String`, stopping each chunk at its `U+0000` terminator.
pub fn join_long_name_chunks(chunks_last_first: &[Vec<u16>]) -> String {
    let mut units = Vec::new();
    for chunk in chunks_last_first.iter().rev() {
        units.extend_from_slice(chunk);
    }
    String::from_utf16_lossy(&units)
}
