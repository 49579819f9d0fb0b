use std::fmt;
use std::str::FromStr;

use crate::error::GitMetaError;

/// Length in bytes of an object id (SHA-1).
pub const OBJECT_ID_LEN: usize = 20;

/// Content hash identifying a commit, tag, tree or blob.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    pub const fn new(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        &self.0
    }

    /// Build an id from a raw byte slice, which must be exactly 20 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    /// Full 40-digit lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({self})")
    }
}

impl FromStr for ObjectId {
    type Err = GitMetaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GitMetaError::InvalidObjectId(s.to_string());
        if s.len() != OBJECT_ID_LEN * 2 || !s.is_ascii() {
            return Err(invalid());
        }
        let mut bytes = [0u8; OBJECT_ID_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }
}

/// Kind of object stored in a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Commit,
    Tag,
    Tree,
    Blob,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObjectKind::Commit => "commit",
            ObjectKind::Tag => "tag",
            ObjectKind::Tree => "tree",
            ObjectKind::Blob => "blob",
        })
    }
}

/// A tag reference: short name (without `refs/tags/`) and the object it points at.
///
/// The target is either a commit (lightweight tag) or an annotation object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    pub name: String,
    pub target: ObjectId,
}

/// Outcome of following annotation objects to their final target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peeled {
    Commit(ObjectId),
    NotACommit(ObjectKind),
}
