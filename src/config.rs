//! Documentation group configuration.
//!
//! Each group is built independently from the same source document. A group selects the
//! operations it documents by path pattern, by API key accessibility and by tag.

use crate::error::{Error, Result};
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// One named documentation group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    /// Path patterns to document. `*` matches within one path segment, a trailing `/**`
    /// matches the prefix and anything below it.
    /// An empty list selects every path.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Only document operations whose handler allows API key access.
    #[serde(default)]
    pub api_key_only: bool,
    /// Operations carrying any of these tags are left out.
    #[serde(default)]
    pub exclude_tags: BTreeSet<String>,
}

impl GroupConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            paths: Vec::new(),
            api_key_only: false,
            exclude_tags: BTreeSet::new(),
        }
    }

    pub fn with_paths(mut self, paths: &[&str]) -> Self {
        self.paths = paths.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn api_key_only(mut self) -> Self {
        self.api_key_only = true;
        self
    }

    pub fn excluding_tag(mut self, tag: impl Into<String>) -> Self {
        self.exclude_tags.insert(tag.into());
        self
    }

    /// Compiles the path patterns of this group.
    pub fn path_patterns(&self) -> Result<Vec<PathPattern>> {
        self.paths.iter().map(|p| PathPattern::new(p)).collect()
    }
}

/// A compiled path glob.
#[derive(Debug, Clone)]
pub struct PathPattern {
    glob: String,
    regex: Regex,
}

impl PathPattern {
    pub fn new(glob: &str) -> Result<Self> {
        if !glob.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "path pattern `{}` must start with `/`",
                glob
            )));
        }

        let segments: Vec<&str> = glob[1..].split('/').collect();
        let mut expr = String::from("^");
        for (i, segment) in segments.iter().enumerate() {
            if *segment == "**" && i == segments.len() - 1 {
                expr.push_str("(?:/.*)?");
            } else {
                let parts: Vec<String> = segment.split('*').map(regex::escape).collect();
                expr.push('/');
                expr.push_str(&parts.join("[^/]*"));
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr)
            .map_err(|e| Error::InvalidConfig(format!("path pattern `{}`: {}", glob, e)))?;
        Ok(Self {
            glob: glob.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }
}

/// All configured documentation groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub groups: Vec<GroupConfig>,
}

impl Default for Config {
    /// `all` documents every operation, `api-key` only what an API key can call.
    fn default() -> Self {
        Self {
            groups: vec![
                GroupConfig::new("all"),
                GroupConfig::new("api-key").api_key_only(),
            ],
        }
    }
}

impl Config {
    /// Loads and validates a YAML group configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading group configuration from {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks group names are present and unique and every path pattern compiles.
    pub fn validate(&self) -> Result<()> {
        if self.groups.is_empty() {
            return Err(Error::InvalidConfig("no groups configured".to_string()));
        }

        let mut seen = BTreeSet::new();
        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(Error::InvalidConfig("group name must not be empty".to_string()));
            }
            if !seen.insert(group.name.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate group name `{}`",
                    group.name
                )));
            }
            group.path_patterns()?;
        }
        Ok(())
    }

    pub fn group(&self, name: &str) -> Result<&GroupConfig> {
        self.groups
            .iter()
            .find(|g| g.name == name)
            .ok_or_else(|| Error::UnknownGroup(name.to_string()))
    }

    /// Keeps only the named groups, in the order given.
    pub fn select(&self, names: &[String]) -> Result<Vec<GroupConfig>> {
        if names.is_empty() {
            return Ok(self.groups.clone());
        }
        names.iter().map(|n| self.group(n).cloned()).collect()
    }
}
