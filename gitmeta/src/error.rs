use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::object::{ObjectId, ObjectKind};

#[derive(Error, Debug)]
pub enum GitMetaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git error ({context}): {source}")]
    Git {
        context: &'static str,
        source: git2::Error,
    },

    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("{} is not inside a Git repository", .0.display())]
    NotARepository(PathBuf),

    #[error("object {0} not found")]
    MissingObject(ObjectId),

    #[error("object {id} is a {got}, expected a {expected}")]
    UnexpectedKind {
        id: ObjectId,
        expected: ObjectKind,
        got: ObjectKind,
    },

    #[error(transparent)]
    RefResolution(#[from] RefError),

    #[error("unable to peel tag object {id}: {reason}")]
    TagPeel { id: ObjectId, reason: String },

    #[error("invalid object id {0:?}")]
    InvalidObjectId(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        source: Box<GitMetaError>,
    },
}

impl GitMetaError {
    /// Attribute this error to a pipeline stage. Already-attributed errors
    /// keep their original stage.
    pub fn at(self, stage: Stage) -> Self {
        match self {
            GitMetaError::Stage { .. } => self,
            other => GitMetaError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error was attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            GitMetaError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying error with any stage attribution removed.
    pub fn root(&self) -> &GitMetaError {
        match self {
            GitMetaError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Wrap a libgit2 failure with a short description of what was being read.
pub(crate) fn git(context: &'static str) -> impl FnOnce(git2::Error) -> GitMetaError {
    move |source| GitMetaError::Git { context, source }
}

/// Failure to turn a ref expression such as `HEAD~2` into a commit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefError {
    #[error("unknown revision {base:?} in {expr:?}")]
    UnknownBase { expr: String, base: String },

    #[error("invalid revision syntax in {expr:?} at byte {position}")]
    Syntax { expr: String, position: usize },

    #[error("{expr:?}: commit {commit} has no parent")]
    NoParent { expr: String, commit: ObjectId },

    #[error("{expr:?}: commit {commit} is a merge of {count} parents, select one with ^N")]
    Ambiguous {
        expr: String,
        commit: ObjectId,
        count: usize,
    },

    #[error("{expr:?}: commit {commit} has {count} parent(s), cannot select parent {index}")]
    ParentOutOfRange {
        expr: String,
        commit: ObjectId,
        index: usize,
        count: usize,
    },
}

/// Pipeline stage used to attribute a terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Branch,
    RefResolution,
    TagMap,
    Search,
    Abbreviation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Branch => "branch lookup",
            Stage::RefResolution => "ref resolution",
            Stage::TagMap => "tag lookup",
            Stage::Search => "nearest tag search",
            Stage::Abbreviation => "commit abbreviation",
        };
        f.write_str(name)
    }
}

pub type Result<T> = std::result::Result<T, GitMetaError>;
