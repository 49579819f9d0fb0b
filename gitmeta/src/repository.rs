use crate::error::Result;
use crate::object::{ObjectId, Peeled, TagRef};

/// Minimum number of hex digits produced by [`RepositoryAccess::abbreviate`].
pub const MIN_ABBREV_LEN: usize = 7;

/// Read-only view of a repository: everything the describe pipeline needs.
pub trait RepositoryAccess {
    /// Short name of the checked-out branch.
    ///
    /// With a detached HEAD this is the full hex id of the HEAD commit.
    fn current_branch(&self) -> Result<String>;

    /// Resolve a bare name (`HEAD`, a branch, a tag, a full id) to a commit.
    ///
    /// Returns `None` if the name is unknown or does not lead to a commit.
    fn resolve_base(&self, name: &str) -> Result<Option<ObjectId>>;

    /// Parents of a commit, in recorded order. Empty for a root commit.
    fn parents(&self, commit: &ObjectId) -> Result<Vec<ObjectId>>;

    /// Every tag reference in the repository, in no particular order.
    fn tag_refs(&self) -> Result<Vec<TagRef>>;

    /// Follow annotation objects starting at `id` until something else is reached.
    ///
    /// A broken chain yields [`GitMetaError::TagPeel`](crate::error::GitMetaError::TagPeel).
    fn peel(&self, id: &ObjectId) -> Result<Peeled>;

    /// Shortest hex prefix of `commit` that is unique in the repository,
    /// never shorter than [`MIN_ABBREV_LEN`].
    fn abbreviate(&self, commit: &ObjectId) -> Result<String>;
}
