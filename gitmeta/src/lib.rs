//! Branch and nearest-tag metadata for build lifecycles.
//!
//! The core is [`describe::describe`]: resolve a ref expression such as
//! `HEAD~2`, find the closest tag reachable through parent edges and format
//! a `git describe`-style string. [`goals`] wraps it into the two operations
//! a build runs before anything else, publishing `branch`, `tag.name` and
//! `tag.describe` to a [`properties::PropertySink`].

pub mod config;
pub mod describe;
pub mod error;
pub mod git;
pub mod goals;
pub mod memory;
pub mod object;
pub mod properties;
pub mod repository;
pub mod revision;
pub mod version;

pub use error::{GitMetaError, Result};
pub use goals::GitMetadata;
