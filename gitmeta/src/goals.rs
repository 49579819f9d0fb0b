//! The two lifecycle operations: publish the branch, publish the describe string.
//!
//! Each computes every value before touching the sink, so a failure
//! publishes nothing.

use crate::config::Config;
use crate::describe::{self, Description};
use crate::error::{Result, Stage};
use crate::git::GitRepository;
use crate::properties::PropertySink;
use crate::repository::RepositoryAccess;

pub const KEY_BRANCH: &str = "branch";
pub const KEY_TAG_NAME: &str = "tag.name";
pub const KEY_TAG_DESCRIBE: &str = "tag.describe";

pub fn resolve_branch<R: RepositoryAccess + ?Sized>(repo: &R) -> Result<String> {
    repo.current_branch().map_err(|e| e.at(Stage::Branch))
}

pub fn publish_branch<R, S>(repo: &R, props: &mut S) -> Result<()>
where
    R: RepositoryAccess + ?Sized,
    S: PropertySink + ?Sized,
{
    let branch = resolve_branch(repo)?;
    props.set_property(KEY_BRANCH, &branch)
}

pub fn resolve_describe<R: RepositoryAccess + ?Sized>(repo: &R, head: &str) -> Result<Description> {
    describe::describe(repo, head)
}

pub fn publish_describe<R, S>(repo: &R, head: &str, props: &mut S) -> Result<()>
where
    R: RepositoryAccess + ?Sized,
    S: PropertySink + ?Sized,
{
    let description = resolve_describe(repo, head)?;
    props.set_property(KEY_TAG_NAME, description.tag_name())?;
    props.set_property(KEY_TAG_DESCRIBE, &description.to_string())
}

/// Everything both operations produce, for callers that want it in one value.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct GitMetadata {
    /// Current branch, or the HEAD commit id when detached.
    pub branch: String,
    /// Nearest reachable tag, empty if none.
    pub tag_name: String,
    /// `<tag>`, `<tag>-<distance>-g<abbrev>` or `<abbrev>`.
    pub describe: String,
}

impl GitMetadata {
    pub fn collect<R: RepositoryAccess + ?Sized>(repo: &R, head: &str) -> Result<Self> {
        let branch = resolve_branch(repo)?;
        let description = resolve_describe(repo, head)?;
        Ok(GitMetadata {
            branch,
            tag_name: description.tag_name().to_string(),
            describe: description.to_string(),
        })
    }

    /// Open the repository named by `config` and collect from it.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let repo = GitRepository::open(&config.git_dir)?;
        Self::collect(&repo, &config.head)
    }

    pub fn publish<S: PropertySink + ?Sized>(&self, props: &mut S) -> Result<()> {
        props.set_property(KEY_BRANCH, &self.branch)?;
        props.set_property(KEY_TAG_NAME, &self.tag_name)?;
        props.set_property(KEY_TAG_DESCRIBE, &self.describe)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::memory::MemoryRepository;
    use crate::properties::Prefixed;

    #[test]
    fn test_publish_branch_and_describe() {
        let mut repo = MemoryRepository::new();
        let a = repo.commit(&[]);
        let b = repo.commit(&[a]);
        repo.branch("develop", b);
        repo.checkout("develop");
        repo.tag("v2.0.0", a);

        let prefixes = vec!["gitmeta".to_string(), "git".to_string()];
        let mut map = BTreeMap::new();
        let mut props = Prefixed::new(&mut map, &prefixes);
        publish_branch(&repo, &mut props).unwrap();
        publish_describe(&repo, "HEAD", &mut props).unwrap();

        let abbrev = repo.abbreviate(&b).unwrap();
        assert_eq!(map["gitmeta.branch"], "develop");
        assert_eq!(map["git.branch"], "develop");
        assert_eq!(map["gitmeta.tag.name"], "v2.0.0");
        assert_eq!(map["git.tag.describe"], format!("v2.0.0-1-g{abbrev}"));
        assert_eq!(map.len(), 6);
    }

    #[test]
    fn test_failed_describe_publishes_nothing() {
        let mut repo = MemoryRepository::new();
        let a = repo.commit(&[]);
        repo.branch("main", a);

        let mut map = BTreeMap::new();
        let err = publish_describe(&repo, "HEAD~1", &mut map).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::RefResolution));
        assert!(map.is_empty());

        assert!(GitMetadata::collect(&repo, "HEAD~1").is_err());
    }

    #[test]
    fn test_collect_untagged_detached() {
        let mut repo = MemoryRepository::new();
        let a = repo.commit(&[]);
        repo.detach(a);

        let meta = GitMetadata::collect(&repo, "HEAD").unwrap();
        assert_eq!(meta.branch, a.to_hex());
        assert_eq!(meta.tag_name, "");
        assert_eq!(meta.describe, repo.abbreviate(&a).unwrap());

        let mut map = BTreeMap::new();
        meta.publish(&mut map).unwrap();
        assert_eq!(map[KEY_TAG_NAME], "");
        assert_eq!(map[KEY_TAG_DESCRIBE], meta.describe);
    }

    #[test]
    fn test_metadata_serialises_to_json() {
        let meta = GitMetadata {
            branch: "main".to_string(),
            tag_name: "v1.0".to_string(),
            describe: "v1.0-2-gabcdef0".to_string(),
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["tag_name"], "v1.0");
        assert_eq!(json["describe"], "v1.0-2-gabcdef0");
    }
}
