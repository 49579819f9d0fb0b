//! Nearest-tag search and `git describe`-style formatting.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::{GitMetaError, Result, Stage};
use crate::object::{ObjectId, Peeled};
use crate::repository::RepositoryAccess;
use crate::revision::RefExpr;

/// Commit id -> tag name, for every tag that peels to a commit.
#[derive(Debug, Clone, Default)]
pub struct TagMap {
    tags: HashMap<ObjectId, String>,
}

impl TagMap {
    /// Peel every tag reference in `repo` to the commit it annotates.
    ///
    /// Tags on trees or blobs and tags whose annotation chain is broken are
    /// skipped. When several tags land on the same commit the
    /// lexicographically smallest name is kept.
    pub fn build<R: RepositoryAccess + ?Sized>(repo: &R) -> Result<Self> {
        let mut map = TagMap::default();
        for tag in repo.tag_refs()? {
            match repo.peel(&tag.target) {
                Ok(Peeled::Commit(commit)) => map.insert(commit, tag.name),
                Ok(Peeled::NotACommit(kind)) => {
                    log::debug!("Skipping tag {}: points at a {}", tag.name, kind);
                }
                Err(GitMetaError::TagPeel { reason, .. }) => {
                    log::debug!("Skipping tag {}: {}", tag.name, reason);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(map)
    }

    /// Record `name` for `commit`, keeping the smaller name on collision.
    pub fn insert(&mut self, commit: ObjectId, name: String) {
        match self.tags.get_mut(&commit) {
            Some(existing) => {
                let (kept, dropped) = if name < *existing {
                    (name, std::mem::take(existing))
                } else {
                    (existing.clone(), name)
                };
                log::warn!(
                    "Tags {} and {} both point at commit {}, using {}",
                    kept,
                    dropped,
                    commit,
                    kept
                );
                *existing = kept;
            }
            None => {
                self.tags.insert(commit, name);
            }
        }
    }

    pub fn get(&self, commit: &ObjectId) -> Option<&str> {
        self.tags.get(commit).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// The tag found by [`find_nearest_tag`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NearestTag {
    pub name: String,
    /// Commits dequeued before the tagged one; 0 when the start commit is tagged.
    pub distance: u32,
}

/// Breadth-first frontier, scoped to one search.
struct Frontier {
    current: Vec<ObjectId>,
    next: Vec<ObjectId>,
    visited: HashSet<ObjectId>,
    dequeued: u32,
}

/// Walk parent edges from `start`, level by level, until a tagged commit is found.
///
/// All parents of a merge are followed. The reported distance is a running
/// count of commits taken off the frontier (duplicates from converging
/// merge paths included), not the true shortest-path length.
///
/// Once a tagged commit is seen no further parents are queued, but the rest
/// of the level is still processed: a later tagged commit in the same level
/// replaces the earlier match, with the counter at its own position.
pub fn find_nearest_tag<R: RepositoryAccess + ?Sized>(
    repo: &R,
    start: &ObjectId,
    tags: &TagMap,
) -> Result<Option<NearestTag>> {
    let mut frontier = Frontier {
        current: vec![*start],
        next: Vec::new(),
        visited: HashSet::new(),
        dequeued: 0,
    };
    let mut found: Option<NearestTag> = None;

    while !frontier.current.is_empty() {
        for commit in std::mem::take(&mut frontier.current) {
            let distance = frontier.dequeued;
            frontier.dequeued += 1;

            if !frontier.visited.insert(commit) {
                continue;
            }

            if let Some(name) = tags.get(&commit) {
                if let Some(previous) = &found {
                    log::debug!("Tag {} replaces {} in the same level", name, previous.name);
                }
                found = Some(NearestTag {
                    name: name.to_string(),
                    distance,
                });
            }

            if found.is_none() {
                frontier.next.extend(repo.parents(&commit)?);
            }
        }

        if let Some(tag) = &found {
            log::debug!("Found tag {} at distance {}", tag.name, tag.distance);
            return Ok(found);
        }
        std::mem::swap(&mut frontier.current, &mut frontier.next);
    }

    log::debug!(
        "No tag reachable from {} ({} commits visited)",
        start,
        frontier.visited.len()
    );
    Ok(None)
}

/// A describe result: nearest tag (if any) plus the abbreviated start commit.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Description {
    pub nearest: Option<NearestTag>,
    pub abbrev: String,
}

impl Description {
    /// Name of the nearest tag, or `""` when none is reachable.
    pub fn tag_name(&self) -> &str {
        self.nearest.as_ref().map_or("", |t| t.name.as_str())
    }
}

/// `<tag>`, `<tag>-<distance>-g<abbrev>`, or the bare `<abbrev>`.
impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.nearest {
            None => f.write_str(&self.abbrev),
            Some(tag) if tag.distance == 0 => f.write_str(&tag.name),
            Some(tag) => write!(f, "{}-{}-g{}", tag.name, tag.distance, self.abbrev),
        }
    }
}

/// Resolve `expr` and describe the commit it denotes.
///
/// Errors are attributed to the stage that produced them.
pub fn describe<R: RepositoryAccess + ?Sized>(repo: &R, expr: &str) -> Result<Description> {
    let start = RefExpr::parse(expr)
        .map_err(GitMetaError::from)
        .and_then(|e| e.resolve(repo))
        .map_err(|e| e.at(Stage::RefResolution))?;

    let tags = TagMap::build(repo).map_err(|e| e.at(Stage::TagMap))?;

    let nearest = if tags.is_empty() {
        None
    } else {
        find_nearest_tag(repo, &start, &tags).map_err(|e| e.at(Stage::Search))?
    };

    let abbrev = repo
        .abbreviate(&start)
        .map_err(|e| e.at(Stage::Abbreviation))?;

    Ok(Description { nearest, abbrev })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRepository;
    use crate::object::OBJECT_ID_LEN;

    /// A <- B <- C <- D, main (HEAD) on D.
    fn abcd() -> (MemoryRepository, [ObjectId; 4]) {
        let mut repo = MemoryRepository::new();
        let a = repo.commit(&[]);
        let b = repo.commit(&[a]);
        let c = repo.commit(&[b]);
        let d = repo.commit(&[c]);
        repo.branch("main", d);
        (repo, [a, b, c, d])
    }

    #[test]
    fn test_tag_two_commits_back() {
        let (mut repo, [_, b, _, d]) = abcd();
        repo.annotated_tag("v1.0", b);

        let desc = describe(&repo, "HEAD").unwrap();
        let abbrev = repo.abbreviate(&d).unwrap();
        assert_eq!(desc.tag_name(), "v1.0");
        assert_eq!(desc.nearest.as_ref().unwrap().distance, 2);
        assert_eq!(desc.to_string(), format!("v1.0-2-g{abbrev}"));
    }

    #[test]
    fn test_tag_on_head() {
        let (mut repo, [_, _, _, d]) = abcd();
        repo.tag("v1.0", d);

        let desc = describe(&repo, "HEAD").unwrap();
        assert_eq!(desc.tag_name(), "v1.0");
        assert_eq!(desc.nearest.as_ref().unwrap().distance, 0);
        assert_eq!(desc.to_string(), "v1.0");
    }

    #[test]
    fn test_no_tags() {
        let (repo, [_, _, _, d]) = abcd();
        let desc = describe(&repo, "HEAD").unwrap();
        assert_eq!(desc.tag_name(), "");
        assert_eq!(desc.nearest, None);
        assert_eq!(desc.to_string(), repo.abbreviate(&d).unwrap());
    }

    #[test]
    fn test_tag_not_reachable() {
        let (mut repo, _) = abcd();
        let orphan = repo.commit(&[]);
        repo.tag("orphan", orphan);

        let desc = describe(&repo, "HEAD").unwrap();
        assert_eq!(desc.nearest, None);
        assert_eq!(desc.tag_name(), "");
    }

    #[test]
    fn test_describe_relative_start() {
        let (mut repo, [a, _, c, _]) = abcd();
        repo.tag("v0.1", a);

        let desc = describe(&repo, "HEAD^").unwrap();
        let abbrev = repo.abbreviate(&c).unwrap();
        assert_eq!(desc.to_string(), format!("v0.1-2-g{abbrev}"));
    }

    #[test]
    fn test_search_is_deterministic() {
        let (mut repo, [a, b, _, d]) = abcd();
        repo.tag("v0.1", a);
        repo.tag("v0.2", b);
        let tags = TagMap::build(&repo).unwrap();

        let first = find_nearest_tag(&repo, &d, &tags).unwrap();
        for _ in 0..10 {
            assert_eq!(find_nearest_tag(&repo, &d, &tags).unwrap(), first);
        }
        assert_eq!(first.unwrap().name, "v0.2");
    }

    #[test]
    fn test_tags_on_non_commits_are_skipped() {
        let (mut repo, [a, _, _, d]) = abcd();
        let tree = repo.tree();
        let blob = repo.blob();
        repo.tag("tree-tag", tree);
        repo.annotated_tag("blob-tag", blob);
        let dangling = repo.annotation(ObjectId::new([0x42; OBJECT_ID_LEN]));
        repo.tag("broken", dangling);

        let tags = TagMap::build(&repo).unwrap();
        assert!(tags.is_empty());
        assert_eq!(find_nearest_tag(&repo, &d, &tags).unwrap(), None);

        repo.tag("v0.1", a);
        let tags = TagMap::build(&repo).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(
            find_nearest_tag(&repo, &d, &tags).unwrap(),
            Some(NearestTag {
                name: "v0.1".to_string(),
                distance: 3
            })
        );
    }

    #[test]
    fn test_colliding_tags_keep_smallest_name() {
        let (mut repo, [_, b, _, _]) = abcd();
        repo.tag("v1.0-rc1", b);
        repo.annotated_tag("v1.0", b);
        repo.tag("v1.0-final", b);

        let tags = TagMap::build(&repo).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get(&b), Some("v1.0"));
    }

    #[test]
    fn test_diamond_counts_dequeues() {
        //        D
        //       / \
        //      B   C
        //       \ /
        //        A
        //        |
        //        R  (tagged)
        let mut repo = MemoryRepository::new();
        let r = repo.commit(&[]);
        let a = repo.commit(&[r]);
        let b = repo.commit(&[a]);
        let c = repo.commit(&[a]);
        let d = repo.commit(&[b, c]);
        repo.tag("root", r);

        let tags = TagMap::build(&repo).unwrap();
        let found = find_nearest_tag(&repo, &d, &tags).unwrap().unwrap();
        // D=0, B=1, C=2, A=3, A again=4 (skipped), R=5
        assert_eq!(found.distance, 5);
        assert_eq!(found.name, "root");
    }

    #[test]
    fn test_last_match_in_level_wins() {
        //      M
        //     / \
        //    L   R    both tagged
        let mut repo = MemoryRepository::new();
        let base = repo.commit(&[]);
        let l = repo.commit(&[base]);
        let r = repo.commit(&[base]);
        let m = repo.commit(&[l, r]);
        repo.tag("z-left", l);
        repo.tag("a-right", r);
        repo.tag("base", base);

        let tags = TagMap::build(&repo).unwrap();
        let found = find_nearest_tag(&repo, &m, &tags).unwrap().unwrap();
        // M=0, L=1 (match), R=2 (match, replaces L); base is never queued.
        assert_eq!(found.name, "a-right");
        assert_eq!(found.distance, 2);
    }

    #[test]
    fn test_level_finishes_after_match() {
        //      M
        //     / \
        //    T   G    T tagged, G missing from the object store
        // Commits after the match are dequeued but not expanded, so the
        // missing commit is never looked up.
        let mut repo = MemoryRepository::new();
        let ghost = ObjectId::new([0x09; OBJECT_ID_LEN]);
        let base = repo.commit(&[]);
        let t = repo.commit(&[base]);
        let m = repo.commit(&[t, ghost]);
        repo.tag("v2", t);

        let tags = TagMap::build(&repo).unwrap();
        let found = find_nearest_tag(&repo, &m, &tags).unwrap().unwrap();
        assert_eq!(found.name, "v2");
        assert_eq!(found.distance, 1);
    }

    #[test]
    fn test_all_parents_are_followed() {
        // The tag is only reachable through the second parent of the merge.
        let mut repo = MemoryRepository::new();
        let root = repo.commit(&[]);
        let main1 = repo.commit(&[root]);
        let main2 = repo.commit(&[main1]);
        let side = repo.commit(&[root]);
        let merge = repo.commit(&[main2, side]);
        repo.tag("side-tag", side);

        let tags = TagMap::build(&repo).unwrap();
        let found = find_nearest_tag(&repo, &merge, &tags).unwrap().unwrap();
        assert_eq!(found.name, "side-tag");
        assert_eq!(found.distance, 2);
    }

    #[test]
    fn test_deep_merge_history_terminates() {
        // A ladder of 200 merges, each joining two branches off the same parent.
        let mut repo = MemoryRepository::new();
        let mut tip = repo.commit(&[]);
        for _ in 0..200 {
            let left = repo.commit(&[tip]);
            let right = repo.commit(&[tip]);
            tip = repo.commit(&[left, right]);
        }
        let tags = TagMap::build(&repo).unwrap();
        assert_eq!(find_nearest_tag(&repo, &tip, &tags).unwrap(), None);

        let other = repo.commit(&[]);
        repo.tag("unrelated", other);
        let tags = TagMap::build(&repo).unwrap();
        assert_eq!(find_nearest_tag(&repo, &tip, &tags).unwrap(), None);
    }

    #[test]
    fn test_failures_name_their_stage() {
        let (repo, _) = abcd();
        let err = describe(&repo, "HEAD~9").unwrap_err();
        assert_eq!(err.stage(), Some(Stage::RefResolution));
        assert!(matches!(err.root(), GitMetaError::RefResolution(_)));
        assert!(err.to_string().starts_with("ref resolution failed"));

        let err = describe(&repo, "HEAD^{commit}").unwrap_err();
        assert_eq!(err.stage(), Some(Stage::RefResolution));
    }

    #[test]
    fn test_search_missing_parent_is_fatal() {
        let mut repo = MemoryRepository::new();
        let ghost = ObjectId::new([0x07; OBJECT_ID_LEN]);
        let head = repo.commit(&[ghost]);
        repo.branch("main", head);
        let other = repo.commit(&[]);
        repo.tag("v1", other);

        let err = describe(&repo, "HEAD").unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Search));
        assert!(matches!(err.root(), GitMetaError::MissingObject(id) if *id == ghost));
    }
}
