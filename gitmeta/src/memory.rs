//! In-memory object store implementing [`RepositoryAccess`].
//!
//! Ids are synthesised deterministically from an insertion counter, so two
//! repositories built by the same sequence of calls contain identical ids.

use std::collections::{BTreeMap, HashMap};

use crate::error::{GitMetaError, Result};
use crate::object::{OBJECT_ID_LEN, ObjectId, ObjectKind, Peeled, TagRef};
use crate::repository::{MIN_ABBREV_LEN, RepositoryAccess};

#[derive(Debug, Clone)]
enum Object {
    Commit { parents: Vec<ObjectId> },
    Tag { target: ObjectId },
    Tree,
    Blob,
}

impl Object {
    fn kind(&self) -> ObjectKind {
        match self {
            Object::Commit { .. } => ObjectKind::Commit,
            Object::Tag { .. } => ObjectKind::Tag,
            Object::Tree => ObjectKind::Tree,
            Object::Blob => ObjectKind::Blob,
        }
    }
}

#[derive(Debug, Clone)]
enum Head {
    /// Symbolic HEAD pointing at `refs/heads/<name>` (which may not exist yet).
    Branch(String),
    Detached(ObjectId),
}

#[derive(Debug, Clone)]
pub struct MemoryRepository {
    objects: HashMap<ObjectId, Object>,
    refs: BTreeMap<String, ObjectId>,
    head: Head,
    seq: u64,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self {
            objects: HashMap::new(),
            refs: BTreeMap::new(),
            head: Head::Branch("main".to_string()),
            seq: 0,
        }
    }
}

impl MemoryRepository {
    /// An empty repository whose HEAD points at the unborn branch `main`.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, object: Object) -> ObjectId {
        loop {
            self.seq += 1;
            let id = synthetic_id(self.seq);
            if !self.objects.contains_key(&id) {
                self.objects.insert(id, object);
                return id;
            }
        }
    }

    /// Add a commit with the given parents (first parent first).
    pub fn commit(&mut self, parents: &[ObjectId]) -> ObjectId {
        self.insert(Object::Commit {
            parents: parents.to_vec(),
        })
    }

    /// Add a commit under a caller-chosen id, replacing any object already there.
    pub fn commit_with_id(&mut self, id: ObjectId, parents: &[ObjectId]) -> ObjectId {
        self.objects.insert(
            id,
            Object::Commit {
                parents: parents.to_vec(),
            },
        );
        id
    }

    pub fn tree(&mut self) -> ObjectId {
        self.insert(Object::Tree)
    }

    pub fn blob(&mut self) -> ObjectId {
        self.insert(Object::Blob)
    }

    /// Add an annotation object pointing at `target`, without a reference to it.
    pub fn annotation(&mut self, target: ObjectId) -> ObjectId {
        self.insert(Object::Tag { target })
    }

    /// Point `refs/tags/<name>` straight at `target` (a lightweight tag).
    pub fn tag(&mut self, name: &str, target: ObjectId) {
        self.refs.insert(format!("refs/tags/{name}"), target);
    }

    /// Create an annotation object for `target` and point `refs/tags/<name>` at it.
    pub fn annotated_tag(&mut self, name: &str, target: ObjectId) -> ObjectId {
        let annotation = self.annotation(target);
        self.tag(name, annotation);
        annotation
    }

    /// Point `refs/heads/<name>` at `commit`.
    pub fn branch(&mut self, name: &str, commit: ObjectId) {
        self.refs.insert(format!("refs/heads/{name}"), commit);
    }

    /// Make HEAD a symbolic reference to `refs/heads/<name>`.
    pub fn checkout(&mut self, name: &str) {
        self.head = Head::Branch(name.to_string());
    }

    /// Detach HEAD at `commit`.
    pub fn detach(&mut self, commit: ObjectId) {
        self.head = Head::Detached(commit);
    }

    fn lookup_name(&self, name: &str) -> Option<ObjectId> {
        if name == "HEAD" {
            return match &self.head {
                Head::Branch(branch) => self.refs.get(&format!("refs/heads/{branch}")).copied(),
                Head::Detached(id) => Some(*id),
            };
        }

        // Same precedence as git's ref lookup rules.
        let candidates = [
            name.to_string(),
            format!("refs/{name}"),
            format!("refs/tags/{name}"),
            format!("refs/heads/{name}"),
        ];
        if let Some(id) = candidates.iter().find_map(|c| self.refs.get(c)) {
            return Some(*id);
        }

        name.parse::<ObjectId>()
            .ok()
            .filter(|id| self.objects.contains_key(id))
    }
}

impl RepositoryAccess for MemoryRepository {
    fn current_branch(&self) -> Result<String> {
        Ok(match &self.head {
            Head::Branch(name) => name.clone(),
            Head::Detached(id) => id.to_hex(),
        })
    }

    fn resolve_base(&self, name: &str) -> Result<Option<ObjectId>> {
        let Some(id) = self.lookup_name(name) else {
            return Ok(None);
        };
        match self.peel(&id)? {
            Peeled::Commit(commit) => Ok(Some(commit)),
            Peeled::NotACommit(_) => Ok(None),
        }
    }

    fn parents(&self, commit: &ObjectId) -> Result<Vec<ObjectId>> {
        match self.objects.get(commit) {
            Some(Object::Commit { parents }) => Ok(parents.clone()),
            Some(other) => Err(GitMetaError::UnexpectedKind {
                id: *commit,
                expected: ObjectKind::Commit,
                got: other.kind(),
            }),
            None => Err(GitMetaError::MissingObject(*commit)),
        }
    }

    fn tag_refs(&self) -> Result<Vec<TagRef>> {
        Ok(self
            .refs
            .iter()
            .filter_map(|(name, target)| {
                name.strip_prefix("refs/tags/").map(|short| TagRef {
                    name: short.to_string(),
                    target: *target,
                })
            })
            .collect())
    }

    fn peel(&self, id: &ObjectId) -> Result<Peeled> {
        let mut current = *id;
        loop {
            match self.objects.get(&current) {
                Some(Object::Tag { target }) => current = *target,
                Some(Object::Commit { .. }) => return Ok(Peeled::Commit(current)),
                Some(other) => return Ok(Peeled::NotACommit(other.kind())),
                None => {
                    return Err(GitMetaError::TagPeel {
                        id: *id,
                        reason: format!("object {current} is missing"),
                    });
                }
            }
        }
    }

    fn abbreviate(&self, commit: &ObjectId) -> Result<String> {
        if !self.objects.contains_key(commit) {
            return Err(GitMetaError::MissingObject(*commit));
        }
        let hex = commit.to_hex();
        let others: Vec<String> = self
            .objects
            .keys()
            .filter(|id| *id != commit)
            .map(ObjectId::to_hex)
            .collect();

        let len = (MIN_ABBREV_LEN..OBJECT_ID_LEN * 2)
            .find(|&len| !others.iter().any(|o| o.starts_with(&hex[..len])))
            .unwrap_or(OBJECT_ID_LEN * 2);
        Ok(hex[..len].to_string())
    }
}

/// SplitMix64-derived id for the `seq`-th inserted object.
fn synthetic_id(seq: u64) -> ObjectId {
    let mut state = seq;
    let mut bytes = [0u8; OBJECT_ID_LEN];
    for chunk in bytes.chunks_mut(8) {
        state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        chunk.copy_from_slice(&z.to_be_bytes()[..chunk.len()]);
    }
    ObjectId::new(bytes)
}
