use std::path::PathBuf;

use crate::error::{GitMetaError, Result};
use crate::properties::DEFAULT_PREFIXES;

/// Settings for one metadata extraction run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory inside the repository (the working tree or the `.git` directory).
    pub git_dir: PathBuf,
    /// Ref expression for the commit to describe, e.g. `HEAD` or `HEAD~2`.
    pub head: String,
    /// Property name prefixes. Replaces [`DEFAULT_PREFIXES`] when set.
    pub prefixes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            git_dir: PathBuf::from("."),
            head: "HEAD".to_string(),
            prefixes: DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.head.trim().is_empty() {
            return Err(GitMetaError::InvalidConfig("head must not be empty".into()));
        }
        if self.prefixes.is_empty() {
            return Err(GitMetaError::InvalidConfig(
                "at least one property prefix is required".into(),
            ));
        }
        for prefix in &self.prefixes {
            if prefix.is_empty() || prefix.starts_with('.') || prefix.ends_with('.') {
                return Err(GitMetaError::InvalidConfig(format!(
                    "invalid property prefix {prefix:?}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.head, "HEAD");
        assert_eq!(config.prefixes, vec!["gitmeta", "git"]);
    }

    #[test]
    fn test_rejects_bad_prefixes() {
        for prefixes in [vec![], vec!["".to_string()], vec!["app.".to_string()]] {
            let config = Config {
                prefixes,
                ..Config::default()
            };
            assert!(matches!(
                config.validate(),
                Err(GitMetaError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_rejects_empty_head() {
        let config = Config {
            head: " ".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
