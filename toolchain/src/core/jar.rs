//! Class index extraction from jar archives.
//!
//! Only the central directory is read: entry names are stored uncompressed
//! there, so indexing a jar never inflates any entry.

use thiserror::Error;

const EOCD_SIGNATURE: u32 = 0x0605_4b50;
const EOCD_MIN_LEN: usize = 22;
const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4b50;
const ZIP64_LOCATOR_LEN: usize = 20;
const ZIP64_EOCD_SIGNATURE: u32 = 0x0606_4b50;
const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
const CENTRAL_HEADER_LEN: usize = 46;
const MAX_COMMENT_LEN: usize = u16::MAX as usize;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JarError {
    #[error("end of central directory record not found")]
    MissingDirectory,
    #[error("central directory is truncated at offset {0}")]
    Truncated(usize),
    #[error("bad central directory signature at offset {0}")]
    BadSignature(usize),
    #[error("entry name at offset {0} is not valid UTF-8")]
    InvalidName(usize),
}

/// Names of every entry in a jar, in central directory order.
///
/// Resource names that are not valid UTF-8 are decoded lossily; class entry
/// names must decode exactly.
pub fn entry_names(bytes: &[u8]) -> Result<Vec<String>, JarError> {
    let eocd = find_eocd(bytes).ok_or(JarError::MissingDirectory)?;
    let (count, offset) = directory_bounds(bytes, eocd)?;

    let mut names = Vec::with_capacity(count);
    let mut pos = offset;
    for _ in 0..count {
        if read_u32(bytes, pos)? != CENTRAL_HEADER_SIGNATURE {
            return Err(JarError::BadSignature(pos));
        }
        let name_len = usize::from(read_u16(bytes, add(pos, 28)?)?);
        let extra_len = usize::from(read_u16(bytes, add(pos, 30)?)?);
        let comment_len = usize::from(read_u16(bytes, add(pos, 32)?)?);
        let name_start = add(pos, CENTRAL_HEADER_LEN)?;
        let name_end = add(name_start, name_len)?;
        let raw = bytes
            .get(name_start..name_end)
            .ok_or(JarError::Truncated(name_start))?;
        names.push(decode_name(raw, name_start)?);
        pos = add(add(name_end, extra_len)?, comment_len)?;
    }
    Ok(names)
}

fn decode_name(raw: &[u8], pos: usize) -> Result<String, JarError> {
    match std::str::from_utf8(raw) {
        Ok(name) => Ok(name.to_string()),
        Err(_) if raw.ends_with(b".class") => Err(JarError::InvalidName(pos)),
        Err(_) => Ok(String::from_utf8_lossy(raw).into_owned()),
    }
}

/// Fully-qualified class names defined by a jar (`a/b/C.class` → `a.b.C`).
pub fn class_names(bytes: &[u8]) -> Result<Vec<String>, JarError> {
    Ok(entry_names(bytes)?
        .iter()
        .filter_map(|name| entry_to_class_name(name))
        .collect())
}

/// Map a jar entry name to the class it defines, if any.
///
/// Versioned entries under `META-INF/` are ignored; the base entry of the same
/// class is always present in a well-formed multi-release jar.
pub fn entry_to_class_name(entry: &str) -> Option<String> {
    if entry.starts_with("META-INF/") {
        return None;
    }
    let stem = entry.strip_suffix(".class")?;
    if stem.is_empty() || stem.ends_with('/') {
        return None;
    }
    Some(stem.replace('/', "."))
}

fn find_eocd(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < EOCD_MIN_LEN {
        return None;
    }
    let last = bytes.len() - EOCD_MIN_LEN;
    let first = last.saturating_sub(MAX_COMMENT_LEN);
    (first..=last)
        .rev()
        .find(|&pos| read_u32(bytes, pos).ok() == Some(EOCD_SIGNATURE))
}

/// Entry count and start offset of the central directory.
///
/// The count is checked against the bytes left after the offset, so a
/// corrupt end record can never drive a huge allocation.
fn directory_bounds(bytes: &[u8], eocd: usize) -> Result<(usize, usize), JarError> {
    let count = read_u16(bytes, eocd + 10)?;
    let offset = read_u32(bytes, eocd + 16)?;
    let (count, offset) = if count != u16::MAX && offset != u32::MAX {
        (usize::from(count), offset as usize)
    } else {
        zip64_bounds(bytes, eocd)?
    };

    let available = bytes
        .len()
        .checked_sub(offset)
        .ok_or(JarError::Truncated(offset))?;
    if count > available / CENTRAL_HEADER_LEN {
        return Err(JarError::Truncated(offset));
    }
    Ok((count, offset))
}

/// Zip64 keeps the real directory bounds in a record found through a locator.
fn zip64_bounds(bytes: &[u8], eocd: usize) -> Result<(usize, usize), JarError> {
    let locator = eocd
        .checked_sub(ZIP64_LOCATOR_LEN)
        .ok_or(JarError::Truncated(eocd))?;
    if read_u32(bytes, locator)? != ZIP64_LOCATOR_SIGNATURE {
        return Err(JarError::BadSignature(locator));
    }
    let record = to_usize(read_u64(bytes, add(locator, 8)?)?, locator)?;
    if read_u32(bytes, record)? != ZIP64_EOCD_SIGNATURE {
        return Err(JarError::BadSignature(record));
    }
    let count = to_usize(read_u64(bytes, add(record, 32)?)?, record)?;
    let offset = to_usize(read_u64(bytes, add(record, 48)?)?, record)?;
    Ok((count, offset))
}

fn add(pos: usize, len: usize) -> Result<usize, JarError> {
    pos.checked_add(len).ok_or(JarError::Truncated(pos))
}

fn to_usize(value: u64, pos: usize) -> Result<usize, JarError> {
    usize::try_from(value).map_err(|_| JarError::Truncated(pos))
}

fn field(bytes: &[u8], pos: usize, len: usize) -> Result<&[u8], JarError> {
    bytes
        .get(pos..add(pos, len)?)
        .ok_or(JarError::Truncated(pos))
}

fn read_u16(bytes: &[u8], pos: usize) -> Result<u16, JarError> {
    let raw = field(bytes, pos, 2)?;
    Ok(u16::from_le_bytes([raw[0], raw[1]]))
}

fn read_u32(bytes: &[u8], pos: usize) -> Result<u32, JarError> {
    let raw = field(bytes, pos, 4)?;
    Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn read_u64(bytes: &[u8], pos: usize) -> Result<u64, JarError> {
    let raw = field(bytes, pos, 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(raw);
    Ok(u64::from_le_bytes(buf))
}
