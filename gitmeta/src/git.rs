//! [`RepositoryAccess`] backed by libgit2.

use std::path::Path;

use git2::{ErrorCode, ObjectType, Oid, Repository};

use crate::error::{GitMetaError, Result, git};
use crate::object::{ObjectId, ObjectKind, Peeled, TagRef};
use crate::repository::RepositoryAccess;

pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Open the repository containing `dir`, searching parent directories.
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            return Err(GitMetaError::NotFound(dir.to_path_buf()));
        }
        let repo = Repository::discover(dir).map_err(|e| match e.code() {
            ErrorCode::NotFound => GitMetaError::NotARepository(dir.to_path_buf()),
            _ => GitMetaError::Git {
                context: "opening repository",
                source: e,
            },
        })?;
        log::debug!("Opened repository at {}", repo.path().display());
        Ok(Self { repo })
    }

    /// Path of the `.git` directory.
    pub fn path(&self) -> &Path {
        self.repo.path()
    }
}

fn to_id(oid: Oid) -> Result<ObjectId> {
    ObjectId::from_slice(oid.as_bytes()).ok_or_else(|| GitMetaError::InvalidObjectId(oid.to_string()))
}

fn to_oid(id: &ObjectId) -> Result<Oid> {
    Oid::from_bytes(id.as_bytes()).map_err(git("converting object id"))
}

impl RepositoryAccess for GitRepository {
    fn current_branch(&self) -> Result<String> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                // No commits yet; HEAD still names the branch it will create.
                let head = self
                    .repo
                    .find_reference("HEAD")
                    .map_err(git("reading HEAD"))?;
                let target = String::from_utf8_lossy(head.symbolic_target_bytes().unwrap_or_default());
                return Ok(target.strip_prefix("refs/heads/").unwrap_or(&target).to_string());
            }
            Err(e) => return Err(git("reading HEAD")(e)),
        };

        if self.repo.head_detached().map_err(git("reading HEAD"))? {
            let oid = head
                .target()
                .ok_or_else(|| GitMetaError::InvalidObjectId("HEAD".to_string()))?;
            return Ok(oid.to_string());
        }
        Ok(String::from_utf8_lossy(head.shorthand_bytes()).into_owned())
    }

    fn resolve_base(&self, name: &str) -> Result<Option<ObjectId>> {
        let object = match self.repo.revparse_single(name) {
            Ok(object) => object,
            Err(e)
                if matches!(
                    e.code(),
                    ErrorCode::NotFound | ErrorCode::InvalidSpec | ErrorCode::UnbornBranch
                ) =>
            {
                return Ok(None);
            }
            Err(e) => return Err(git("resolving revision")(e)),
        };
        match self.peel(&to_id(object.id())?)? {
            Peeled::Commit(commit) => Ok(Some(commit)),
            Peeled::NotACommit(_) => Ok(None),
        }
    }

    fn parents(&self, commit: &ObjectId) -> Result<Vec<ObjectId>> {
        let commit = self
            .repo
            .find_commit(to_oid(commit)?)
            .map_err(git("reading commit"))?;
        commit.parent_ids().map(to_id).collect()
    }

    fn tag_refs(&self) -> Result<Vec<TagRef>> {
        let mut tags = Vec::new();
        for reference in self
            .repo
            .references_glob("refs/tags/*")
            .map_err(git("listing tags"))?
        {
            let reference = reference.map_err(git("reading tag reference"))?;
            let full_name = String::from_utf8_lossy(reference.name_bytes()).into_owned();
            let name = full_name
                .strip_prefix("refs/tags/")
                .unwrap_or(&full_name)
                .to_string();

            let target = match reference.resolve() {
                Ok(resolved) => resolved.target(),
                Err(e) => {
                    log::debug!("Skipping tag {}: {}", name, e.message());
                    continue;
                }
            };
            if let Some(target) = target {
                tags.push(TagRef {
                    name,
                    target: to_id(target)?,
                });
            }
        }
        Ok(tags)
    }

    fn peel(&self, id: &ObjectId) -> Result<Peeled> {
        let mut oid = to_oid(id)?;
        loop {
            let object = match self.repo.find_object(oid, None) {
                Ok(object) => object,
                Err(e) if e.code() == ErrorCode::NotFound => {
                    return Err(GitMetaError::TagPeel {
                        id: *id,
                        reason: format!("object {oid} is missing"),
                    });
                }
                Err(e) => return Err(git("reading object")(e)),
            };

            match object.kind() {
                Some(ObjectType::Commit) => return Ok(Peeled::Commit(to_id(oid)?)),
                Some(ObjectType::Tree) => return Ok(Peeled::NotACommit(ObjectKind::Tree)),
                Some(ObjectType::Blob) => return Ok(Peeled::NotACommit(ObjectKind::Blob)),
                Some(ObjectType::Tag) => match object.as_tag() {
                    Some(tag) => oid = tag.target_id(),
                    None => {
                        return Err(GitMetaError::TagPeel {
                            id: *id,
                            reason: format!("object {oid} is not a readable tag"),
                        });
                    }
                },
                _ => {
                    return Err(GitMetaError::TagPeel {
                        id: *id,
                        reason: format!("object {oid} has an unknown type"),
                    });
                }
            }
        }
    }

    fn abbreviate(&self, commit: &ObjectId) -> Result<String> {
        let object = self
            .repo
            .find_object(to_oid(commit)?, None)
            .map_err(git("reading commit"))?;
        let short = object.short_id().map_err(git("abbreviating commit"))?;
        short
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| GitMetaError::InvalidObjectId(commit.to_hex()))
    }
}
