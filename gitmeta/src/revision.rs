//! Ref expressions: a base name followed by parent-walking modifiers.
//!
//! ```text
//! HEAD^~2^   parent, two more parents back, one more parent
//! HEAD^2     second parent of a merge
//! v1.0~3     three parents back from the commit tagged v1.0
//! ```
//!
//! `^` and `~` only step through commits with a single parent. On a merge
//! the parent has to be chosen with `^N`.

use std::fmt;

use crate::error::{RefError, Result};
use crate::object::ObjectId;
use crate::repository::RepositoryAccess;

/// One parent-walking step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// `^`: the parent of a single-parent commit.
    OnlyParent,
    /// `^N`: select the N-th parent (1-based). `^0` is the commit itself.
    Parent(usize),
    /// `~N`: `N` repetitions of `^`. `~` is `~1`.
    Ancestor(usize),
}

/// A parsed ref expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefExpr {
    pub base: String,
    pub modifiers: Vec<Modifier>,
}

impl RefExpr {
    pub fn parse(expr: &str) -> std::result::Result<Self, RefError> {
        let syntax = |position| RefError::Syntax {
            expr: expr.to_string(),
            position,
        };

        let split = expr.find(['^', '~']).unwrap_or(expr.len());
        if split == 0 {
            return Err(syntax(0));
        }
        let base = expr[..split].to_string();

        let bytes = expr.as_bytes();
        let mut modifiers = Vec::new();
        let mut pos = split;
        while pos < bytes.len() {
            let op = bytes[pos];
            let digits_start = pos + 1;
            let digits_end = bytes[digits_start..]
                .iter()
                .position(|b| !b.is_ascii_digit())
                .map_or(bytes.len(), |n| digits_start + n);

            let count = if digits_end == digits_start {
                None
            } else {
                let n = expr[digits_start..digits_end]
                    .parse::<usize>()
                    .map_err(|_| syntax(digits_start))?;
                Some(n)
            };

            modifiers.push(match (op, count) {
                (b'^', None) => Modifier::OnlyParent,
                (b'^', Some(n)) => Modifier::Parent(n),
                (b'~', n) => Modifier::Ancestor(n.unwrap_or(1)),
                _ => return Err(syntax(pos)),
            });
            pos = digits_end;
        }

        Ok(RefExpr { base, modifiers })
    }

    /// Total number of parent hops this expression walks.
    pub fn hops(&self) -> usize {
        self.modifiers
            .iter()
            .map(|m| match m {
                Modifier::Parent(0) => 0,
                Modifier::OnlyParent | Modifier::Parent(_) => 1,
                Modifier::Ancestor(n) => *n,
            })
            .sum()
    }

    /// Resolve the base, then apply the modifiers left to right.
    pub fn resolve<R: RepositoryAccess + ?Sized>(&self, repo: &R) -> Result<ObjectId> {
        let expr = self.to_string();
        let mut commit = repo
            .resolve_base(&self.base)?
            .ok_or_else(|| RefError::UnknownBase {
                expr: expr.clone(),
                base: self.base.clone(),
            })?;

        for modifier in &self.modifiers {
            commit = match *modifier {
                Modifier::OnlyParent => only_parent(repo, &expr, commit)?,
                Modifier::Parent(0) => commit,
                Modifier::Parent(index) => nth_parent(repo, &expr, commit, index)?,
                Modifier::Ancestor(n) => {
                    for _ in 0..n {
                        commit = only_parent(repo, &expr, commit)?;
                    }
                    commit
                }
            };
        }

        Ok(commit)
    }
}

fn only_parent<R: RepositoryAccess + ?Sized>(
    repo: &R,
    expr: &str,
    commit: ObjectId,
) -> Result<ObjectId> {
    let parents = repo.parents(&commit)?;
    match parents.as_slice() {
        [parent] => Ok(*parent),
        [] => Err(RefError::NoParent {
            expr: expr.to_string(),
            commit,
        }
        .into()),
        _ => Err(RefError::Ambiguous {
            expr: expr.to_string(),
            commit,
            count: parents.len(),
        }
        .into()),
    }
}

fn nth_parent<R: RepositoryAccess + ?Sized>(
    repo: &R,
    expr: &str,
    commit: ObjectId,
    index: usize,
) -> Result<ObjectId> {
    let parents = repo.parents(&commit)?;
    if parents.is_empty() {
        return Err(RefError::NoParent {
            expr: expr.to_string(),
            commit,
        }
        .into());
    }
    parents.get(index - 1).copied().ok_or_else(|| {
        RefError::ParentOutOfRange {
            expr: expr.to_string(),
            commit,
            index,
            count: parents.len(),
        }
        .into()
    })
}

impl fmt::Display for RefExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)?;
        for m in &self.modifiers {
            match m {
                Modifier::OnlyParent => f.write_str("^")?,
                Modifier::Parent(n) => write!(f, "^{n}")?,
                Modifier::Ancestor(n) => write!(f, "~{n}")?,
            }
        }
        Ok(())
    }
}

/// Parse and resolve `expr` in one step.
pub fn resolve<R: RepositoryAccess + ?Sized>(repo: &R, expr: &str) -> Result<ObjectId> {
    RefExpr::parse(expr)?.resolve(repo)
}
