use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::errors::{CallScopeError, Result};

/// Name of the configuration file stored inside the `.callscope` directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// Name of the hidden directory used to store callscope settings.
pub const CALLSCOPE_DIR: &str = ".callscope";

/// Configuration for an analysis run.
///
/// Controls which files are analyzed, size limits, and how much each
/// declaration carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Schema version of the configuration.
    pub version: u32,
    /// Glob patterns for files to include.
    pub include: Vec<String>,
    /// Glob patterns for files to exclude. Excludes win over includes.
    pub exclude: Vec<String>,
    /// Maximum file size in bytes; larger files are skipped.
    pub max_file_size: u64,
    /// Whether declarations keep a copy of their source text.
    pub capture_source: bool,
    /// Whether `_test.go` files take part in the analysis.
    pub include_tests: bool,
    /// Capacity of the channel that carries per-unit results to the merger.
    pub channel_capacity: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            include: vec!["**/*.go".to_string()],
            exclude: vec![
                "vendor/**".to_string(),
                ".git/**".to_string(),
                "testdata/**".to_string(),
                ".callscope/**".to_string(),
            ],
            max_file_size: 1_048_576,
            capture_source: true,
            include_tests: true,
            channel_capacity: 16,
        }
    }
}

/// Returns the path to the `.callscope` directory within the given project root.
pub fn get_callscope_dir(project_root: &Path) -> PathBuf {
    project_root.join(CALLSCOPE_DIR)
}

/// Returns the path to `config.json` within the `.callscope` directory.
pub fn get_config_path(project_root: &Path) -> PathBuf {
    get_callscope_dir(project_root).join(CONFIG_FILENAME)
}

/// Loads the configuration from disk.
///
/// A missing file yields the default configuration.
pub fn load_config(project_root: &Path) -> Result<AnalyzerConfig> {
    let config_path = get_config_path(project_root);

    if !config_path.exists() {
        return Ok(AnalyzerConfig::default());
    }

    let contents = fs::read_to_string(&config_path).map_err(|e| CallScopeError::Config {
        message: format!(
            "failed to read config file '{}': {}",
            config_path.display(),
            e
        ),
    })?;

    serde_json::from_str(&contents).map_err(|e| CallScopeError::Config {
        message: format!(
            "failed to parse config file '{}': {}",
            config_path.display(),
            e
        ),
    })
}

/// Saves the configuration to disk.
///
/// Writes to a temporary file first and then renames it into place.
pub fn save_config(project_root: &Path, config: &AnalyzerConfig) -> Result<()> {
    let dir = get_callscope_dir(project_root);
    fs::create_dir_all(&dir).map_err(|e| CallScopeError::Config {
        message: format!(
            "failed to create callscope directory '{}': {}",
            dir.display(),
            e
        ),
    })?;

    let config_path = get_config_path(project_root);
    let tmp_path = config_path.with_extension("tmp");

    let json = serde_json::to_string_pretty(config).map_err(|e| CallScopeError::Config {
        message: format!("failed to serialize config: {}", e),
    })?;

    fs::write(&tmp_path, &json).map_err(|e| CallScopeError::Config {
        message: format!(
            "failed to write temporary config file '{}': {}",
            tmp_path.display(),
            e
        ),
    })?;

    fs::rename(&tmp_path, &config_path).map_err(|e| CallScopeError::Config {
        message: format!(
            "failed to rename temporary config file '{}' to '{}': {}",
            tmp_path.display(),
            config_path.display(),
            e
        ),
    })?;

    Ok(())
}

/// Writes the default configuration for a project and returns it.
///
/// An existing configuration is loaded and kept as is.
pub fn init_config(project_root: &Path) -> Result<AnalyzerConfig> {
    if !project_root.is_dir() {
        return Err(CallScopeError::File {
            message: "not a directory".to_string(),
            path: project_root.display().to_string(),
        });
    }
    if get_config_path(project_root).exists() {
        return load_config(project_root);
    }
    let config = AnalyzerConfig::default();
    save_config(project_root, &config)?;
    Ok(config)
}

/// Determines whether a file takes part in the analysis.
///
/// A file is included only if it matches at least one include pattern and no
/// exclude pattern. Test files are dropped when `include_tests` is off.
pub fn should_include_file(file_path: &str, config: &AnalyzerConfig) -> bool {
    let match_opts = glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    if !config.include_tests && file_path.ends_with("_test.go") {
        return false;
    }

    for pattern_str in &config.exclude {
        if let Ok(pattern) = Pattern::new(pattern_str) {
            if pattern.matches_with(file_path, match_opts) {
                return false;
            }
        }
    }

    config.include.iter().any(|pattern_str| {
        Pattern::new(pattern_str)
            .map(|pattern| pattern.matches_with(file_path, match_opts))
            .unwrap_or(false)
    })
}
