use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub const DEFAULT_OWNER: &str = "mateusantos24";
pub const DEFAULT_REPOSITORY: &str = "Animado";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_CACHE_DIR: &str = "Cache/Gartic";
pub const DEFAULT_COMMIT_MESSAGE: &str = "Fix: encode raw GitHub URLs with accented filenames";
pub const CONFIG_FILENAME: &str = "rawfix.toml";

/// On-disk shape of `rawfix.toml`. Every key is optional.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct FileConfig {
    #[serde(default)]
    pub repository: RepositorySection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub publish: PublishSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct RepositorySection {
    pub owner: Option<String>,
    pub name: Option<String>,
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct CacheSection {
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct PublishSection {
    pub enabled: Option<bool>,
    pub remote: Option<String>,
    pub branch: Option<String>,
    pub commit_message: Option<String>,
}

/// Load and parse a FileConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<FileConfig> {
    if !config_path.exists() {
        return Ok(FileConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: FileConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

/// Values given on the command line. They win over env and file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub owner: Option<String>,
    pub repository: Option<String>,
    pub branch: Option<String>,
    pub remote: Option<String>,
    pub commit_message: Option<String>,
    pub publish: Option<bool>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    pub owner: String,
    pub repository: String,
    pub branch: String,
    pub cache_dir: PathBuf,
    pub repo_root: PathBuf,
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishConfig {
    pub enabled: bool,
    pub remote: String,
    pub branch: String,
    pub commit_message: String,
}

impl RunConfig {
    /// Defaults rooted at `repo_root`, with the cache at `Cache/Gartic` beneath it.
    pub fn with_defaults(repo_root: &Path) -> Self {
        Self {
            owner: DEFAULT_OWNER.to_string(),
            repository: DEFAULT_REPOSITORY.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            cache_dir: repo_root.join(DEFAULT_CACHE_DIR),
            repo_root: repo_root.to_path_buf(),
            publish: PublishConfig {
                enabled: true,
                remote: DEFAULT_REMOTE.to_string(),
                branch: DEFAULT_BRANCH.to_string(),
                commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            },
        }
    }

    /// Layer flag > env > file > default. `cache_dir` must already be resolved.
    pub fn resolve(
        repo_root: &Path,
        cache_dir: PathBuf,
        file: &FileConfig,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        Self::resolve_with_lookup(repo_root, cache_dir, file, overrides, |key| {
            std::env::var(key).ok()
        })
    }

    pub(crate) fn resolve_with_lookup<F>(
        repo_root: &Path,
        cache_dir: PathBuf,
        file: &FileConfig,
        overrides: &ConfigOverrides,
        lookup_env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |flag: &Option<String>, env_key: &str, from_file: &Option<String>, default: &str| {
            flag.as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .or_else(|| non_empty(lookup_env(env_key)))
                .or_else(|| non_empty(from_file.clone()))
                .unwrap_or_else(|| default.to_string())
        };

        let owner = pick(
            &overrides.owner,
            "RAWFIX_OWNER",
            &file.repository.owner,
            DEFAULT_OWNER,
        );
        let repository = pick(
            &overrides.repository,
            "RAWFIX_REPO",
            &file.repository.name,
            DEFAULT_REPOSITORY,
        );
        let branch = pick(
            &overrides.branch,
            "RAWFIX_BRANCH",
            &file.repository.branch,
            DEFAULT_BRANCH,
        );
        let remote = pick(
            &overrides.remote,
            "RAWFIX_REMOTE",
            &file.publish.remote,
            DEFAULT_REMOTE,
        );
        let push_branch = non_empty(file.publish.branch.clone()).unwrap_or_else(|| branch.clone());
        let commit_message = overrides
            .commit_message
            .clone()
            .or_else(|| file.publish.commit_message.clone())
            .map(|message| message.trim().to_string())
            .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string());
        let enabled = overrides
            .publish
            .or(file.publish.enabled)
            .unwrap_or(true);

        validate_segment("repository owner", &owner)?;
        validate_segment("repository name", &repository)?;
        if branch.contains(char::is_whitespace) {
            bail!("branch must not contain whitespace: {branch:?}");
        }
        if commit_message.is_empty() {
            bail!("commit message cannot be empty");
        }

        Ok(Self {
            owner,
            repository,
            branch,
            cache_dir,
            repo_root: repo_root.to_path_buf(),
            publish: PublishConfig {
                enabled,
                remote,
                branch: push_branch,
                commit_message,
            },
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
}

fn validate_segment(label: &str, value: &str) -> Result<()> {
    if value.contains('/') || value.contains(char::is_whitespace) {
        bail!("{label} must be a single path segment: {value:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn resolve_with(
        file: &FileConfig,
        overrides: &ConfigOverrides,
        env: &HashMap<String, String>,
    ) -> Result<RunConfig> {
        let root = Path::new("/repo");
        RunConfig::resolve_with_lookup(
            root,
            root.join(DEFAULT_CACHE_DIR),
            file,
            overrides,
            |key| env.get(key).cloned(),
        )
    }

    #[test]
    fn load_config_returns_default_for_missing_file() {
        let config = load_config(Path::new("/nonexistent/rawfix.toml")).expect("load config");
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn load_config_parses_all_sections() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join(CONFIG_FILENAME);
        fs::write(
            &config_path,
            r#"
[repository]
owner = "someone"
name = "Assets"
branch = "trunk"

[cache]
dir = "data/cache"

[publish]
enabled = false
remote = "upstream"
commit_message = "Encode asset URLs"
"#,
        )
        .expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert_eq!(config.repository.owner.as_deref(), Some("someone"));
        assert_eq!(config.repository.name.as_deref(), Some("Assets"));
        assert_eq!(config.repository.branch.as_deref(), Some("trunk"));
        assert_eq!(config.cache.dir, Some(PathBuf::from("data/cache")));
        assert_eq!(config.publish.enabled, Some(false));
        assert_eq!(config.publish.remote.as_deref(), Some("upstream"));
    }

    #[test]
    fn load_config_returns_error_for_invalid_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join(CONFIG_FILENAME);
        fs::write(&config_path, "[repository\nowner = \"oops\"").expect("write config");
        let error = load_config(&config_path).expect_err("must fail");
        assert!(error.to_string().contains("failed to parse"));
    }

    #[test]
    fn defaults_match_the_gartic_cache() {
        let config = resolve_with(
            &FileConfig::default(),
            &ConfigOverrides::default(),
            &HashMap::new(),
        )
        .expect("resolve");
        assert_eq!(config, RunConfig::with_defaults(Path::new("/repo")));
        assert_eq!(config.cache_dir, Path::new("/repo/Cache/Gartic"));
        assert_eq!(config.publish.remote, "origin");
        assert_eq!(config.publish.branch, "main");
        assert!(config.publish.enabled);
    }

    #[test]
    fn flag_beats_env_beats_file() {
        let file = FileConfig {
            repository: RepositorySection {
                owner: Some("file-owner".to_string()),
                name: Some("file-repo".to_string()),
                branch: Some("file-branch".to_string()),
            },
            ..FileConfig::default()
        };
        let env = HashMap::from([
            ("RAWFIX_OWNER".to_string(), "env-owner".to_string()),
            ("RAWFIX_REPO".to_string(), "env-repo".to_string()),
        ]);
        let overrides = ConfigOverrides {
            owner: Some("flag-owner".to_string()),
            ..ConfigOverrides::default()
        };

        let config = resolve_with(&file, &overrides, &env).expect("resolve");
        assert_eq!(config.owner, "flag-owner");
        assert_eq!(config.repository, "env-repo");
        assert_eq!(config.branch, "file-branch");
        assert_eq!(config.publish.branch, "file-branch");
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let env = HashMap::from([("RAWFIX_BRANCH".to_string(), "   ".to_string())]);
        let config = resolve_with(&FileConfig::default(), &ConfigOverrides::default(), &env)
            .expect("resolve");
        assert_eq!(config.branch, DEFAULT_BRANCH);
    }

    #[test]
    fn publish_flag_overrides_file() {
        let file = FileConfig {
            publish: PublishSection {
                enabled: Some(true),
                ..PublishSection::default()
            },
            ..FileConfig::default()
        };
        let overrides = ConfigOverrides {
            publish: Some(false),
            ..ConfigOverrides::default()
        };
        let config = resolve_with(&file, &overrides, &HashMap::new()).expect("resolve");
        assert!(!config.publish.enabled);
    }

    #[test]
    fn rejects_owner_with_slash() {
        let overrides = ConfigOverrides {
            owner: Some("a/b".to_string()),
            ..ConfigOverrides::default()
        };
        let err = resolve_with(&FileConfig::default(), &overrides, &HashMap::new())
            .expect_err("must fail");
        assert!(err.to_string().contains("single path segment"));
    }

    #[test]
    fn rejects_blank_commit_message() {
        let overrides = ConfigOverrides {
            commit_message: Some("  ".to_string()),
            ..ConfigOverrides::default()
        };
        let err = resolve_with(&FileConfig::default(), &overrides, &HashMap::new())
            .expect_err("must fail");
        assert!(err.to_string().contains("commit message"));
    }
}
