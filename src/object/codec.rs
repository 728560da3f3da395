use sha1::{Digest, Sha1};

use super::id::RAW_LEN;
use super::{kind_name, parse_kind, Kind, Object, ObjectId};
use crate::error::{Error, Result};

/// Decode framed object bytes (`"<kind> <length>\0<content>"`) stored under `id`.
///
/// The id is trusted as given; use [`verify`] to check it against the content.
pub fn decode(id: &ObjectId, raw: &[u8]) -> Result<Object> {
    let (kind, content) = split_header(raw)?;
    let dependencies = match kind {
        Kind::Blob => Vec::new(),
        Kind::Tree => tree_dependencies(content)?,
        Kind::Commit => header_dependencies(content, &[b"tree ".as_slice(), b"parent ".as_slice()])?,
        Kind::Tag => header_dependencies(content, &[b"object ".as_slice()])?,
    };

    Ok(Object {
        id: id.clone(),
        kind,
        payload: content.to_vec(),
        dependencies,
    })
}

/// Frame `content` with its object header.
pub fn encode(kind: Kind, content: &[u8]) -> Vec<u8> {
    let mut framed = format!("{} {}\0", kind_name(kind), content.len()).into_bytes();
    framed.extend_from_slice(content);
    framed
}

/// SHA-1 of framed object bytes, which is the object's id.
pub fn hash(raw: &[u8]) -> ObjectId {
    let digest = Sha1::digest(raw);
    ObjectId::from_raw(&digest).unwrap_or_else(|| unreachable!("SHA-1 digest is 20 bytes"))
}

/// Check that framed bytes hash to `id`.
pub fn verify(id: &ObjectId, raw: &[u8]) -> Result<()> {
    let actual = hash(raw);
    if actual != *id {
        return Err(Error::HashMismatch {
            expected: id.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// Split framed bytes into their kind and content, validating the header.
pub fn split_header(raw: &[u8]) -> Result<(Kind, &[u8])> {
    let nul = raw
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::MalformedHeader("no NUL separator".to_string()))?;

    let header = std::str::from_utf8(&raw[..nul])
        .map_err(|_| Error::MalformedHeader("header is not UTF-8".to_string()))?;
    let (kind, length) = header
        .split_once(' ')
        .ok_or_else(|| Error::MalformedHeader(format!("no length in header {header:?}")))?;

    let kind = parse_kind(kind).ok_or_else(|| Error::UnknownKind(kind.to_string()))?;
    let length: usize = length
        .parse()
        .map_err(|_| Error::MalformedHeader(format!("bad length in header {header:?}")))?;

    let content = &raw[nul + 1..];
    if content.len() != length {
        return Err(Error::MalformedHeader(format!(
            "header declares {} bytes, found {}",
            length,
            content.len()
        )));
    }

    Ok((kind, content))
}

/// Each entry is `"<mode> <name>\0"` followed by a 20-byte binary id.
fn tree_dependencies(mut content: &[u8]) -> Result<Vec<ObjectId>> {
    let mut deps = Vec::new();

    while !content.is_empty() {
        let nul = content
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::MalformedTree("entry without NUL terminator".to_string()))?;
        if !content[..nul].contains(&b' ') {
            return Err(Error::MalformedTree("entry without mode".to_string()));
        }

        let rest = &content[nul + 1..];
        if rest.len() < RAW_LEN {
            return Err(Error::MalformedTree(format!(
                "entry {} has a truncated id",
                deps.len()
            )));
        }

        let (raw_id, tail) = rest.split_at(RAW_LEN);
        deps.extend(ObjectId::from_raw(raw_id));
        content = tail;
    }

    Ok(deps)
}

/// Scan header lines up to the first blank line, taking the id after each
/// matching prefix.
fn header_dependencies(content: &[u8], prefixes: &[&[u8]]) -> Result<Vec<ObjectId>> {
    let mut deps = Vec::new();

    for line in content.split(|&b| b == b'\n') {
        if line.is_empty() {
            break;
        }
        let Some(value) = prefixes.iter().find_map(|p| line.strip_prefix(*p)) else {
            continue;
        };
        let id = std::str::from_utf8(value)
            .ok()
            .and_then(ObjectId::from_hex)
            .ok_or_else(|| {
                Error::MalformedHeader(format!(
                    "bad id in header line {:?}",
                    String::from_utf8_lossy(line)
                ))
            })?;
        deps.push(id);
    }

    Ok(deps)
}
