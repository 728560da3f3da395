use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(s) = path.to_str() {
        if let Some(stripped) = s.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if s == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

/// Parse a boolean environment value such as `1`, `true`, `no`.
fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("Failed to parse {} as a boolean: {:?}", name, other),
    }
}

/// Configuration for git-remote-example
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// Ref advertised as the remote's HEAD in `list`, if it exists.
    /// Empty disables the advertisement.
    #[serde(default = "defaults::default_branch")]
    pub default_branch: Option<String>,
    /// Longest dependency path the graph walker follows before giving up
    #[serde(default = "defaults::max_walk_depth")]
    pub max_walk_depth: usize,
    /// Check every transferred object against its id
    #[serde(default = "defaults::verify_object_ids")]
    pub verify_object_ids: bool,
    /// Deflate objects written to the remote store
    #[serde(default)]
    pub compress_objects: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            default_branch: defaults::default_branch(),
            max_walk_depth: defaults::max_walk_depth(),
            verify_object_ids: defaults::verify_object_ids(),
            compress_objects: false,
        }
    }
}

impl RemoteConfig {
    /// Load configuration from the config file (if any), then apply
    /// environment overrides
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;
        tracing::debug!("loading git-remote-example config from {:?}", config_path);
        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env(|name| env::var(name).ok())?;
        Ok(config)
    }

    /// Apply `GIT_EXAMPLE_*` overrides read through `lookup`
    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(branch) = lookup("GIT_EXAMPLE_DEFAULT_BRANCH") {
            self.default_branch = Some(branch);
        }

        if let Some(depth) = lookup("GIT_EXAMPLE_MAX_WALK_DEPTH") {
            self.max_walk_depth = depth
                .parse()
                .context("Failed to parse GIT_EXAMPLE_MAX_WALK_DEPTH as usize")?;
        }

        if let Some(verify) = lookup("GIT_EXAMPLE_VERIFY_OBJECTS") {
            self.verify_object_ids = parse_bool("GIT_EXAMPLE_VERIFY_OBJECTS", &verify)?;
        }

        if let Some(compress) = lookup("GIT_EXAMPLE_COMPRESS") {
            self.compress_objects = parse_bool("GIT_EXAMPLE_COMPRESS", &compress)?;
        }

        if self.default_branch.as_deref().is_some_and(str::is_empty) {
            self.default_branch = None;
        }
        if self.max_walk_depth == 0 {
            anyhow::bail!("max_walk_depth must be at least 1");
        }
        Ok(())
    }

    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: RemoteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Config file path: `GIT_EXAMPLE_CONFIG` if set, else under the home directory
    pub fn config_file_path() -> Result<PathBuf> {
        if let Ok(path) = env::var("GIT_EXAMPLE_CONFIG") {
            return Ok(expand_tilde(&PathBuf::from(path)));
        }
        dirs::home_dir()
            .map(|home| home.join(".config/git-remote-example/config.yaml"))
            .context("Could not determine home directory for config file")
    }
}

mod defaults {
    pub(crate) fn default_branch() -> Option<String> {
        Some("refs/heads/master".to_string())
    }

    pub(crate) fn max_walk_depth() -> usize {
        1_000_000
    }

    pub(crate) fn verify_object_ids() -> bool {
        true
    }
}
