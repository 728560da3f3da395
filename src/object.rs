//! Version-control objects and the codec that extracts their dependencies.

mod codec;
mod id;

pub use codec::{decode, encode, hash, split_header, verify};
pub use gix_object::Kind;
pub use id::ObjectId;

/// A decoded object. `dependencies` is always recomputed from `payload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    pub id: ObjectId,
    pub kind: Kind,
    pub payload: Vec<u8>,
    pub dependencies: Vec<ObjectId>,
}

/// Header token for a kind, as written in `"<kind> <length>\0"`.
pub fn kind_name(kind: Kind) -> &'static str {
    match kind {
        Kind::Commit => "commit",
        Kind::Tree => "tree",
        Kind::Blob => "blob",
        Kind::Tag => "tag",
    }
}

pub fn parse_kind(name: &str) -> Option<Kind> {
    match name {
        "commit" => Some(Kind::Commit),
        "tree" => Some(Kind::Tree),
        "blob" => Some(Kind::Blob),
        "tag" => Some(Kind::Tag),
        _ => None,
    }
}
