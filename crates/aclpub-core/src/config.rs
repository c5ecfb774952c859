use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::program::{
    DEFAULT_HANDBOOK_MAX_LINES, DEFAULT_HEADER_LINES, DEFAULT_PAPER_MEDIAN_LINES,
    DEFAULT_PROCEEDINGS_MAX_LINES, PageBudget,
};

const CONFIG_DIR_NAME: &str = "aclpub";
const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_ENV: &str = "ACLPUB_CONFIG_DIR";
const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Result returned by [`load_config`], capturing the source and any non-fatal issues.
#[derive(Debug, Clone)]
pub struct ConfigLoadResult {
    pub config: FileConfig,
    pub warnings: Vec<String>,
    pub source: ConfigSource,
}

/// Indicates where the configuration was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// No persisted configuration was found or usable; defaults were synthesized.
    Default,
    /// Configuration was read from `config.toml`.
    File,
}

/// Errors that can occur when persisting configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Ser(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "IO error: {err}"),
            ConfigError::Ser(err) => write!(f, "TOML serialization error: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Ser(value)
    }
}

/// Disk-backed configuration schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default = "FileConfig::schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub layout: LayoutPreferences,
    #[serde(default)]
    pub build: BuildPreferences,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            layout: LayoutPreferences::default(),
            build: BuildPreferences::default(),
        }
    }
}

impl FileConfig {
    const fn schema_version() -> u32 {
        CURRENT_SCHEMA_VERSION
    }
}

/// Line budgets used when paginating programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutPreferences {
    #[serde(default = "LayoutPreferences::default_proceedings_max_lines")]
    pub proceedings_max_lines: u32,
    #[serde(default = "LayoutPreferences::default_handbook_max_lines")]
    pub handbook_max_lines: u32,
    #[serde(default = "LayoutPreferences::default_handbook_max_lines")]
    pub workshop_max_lines: u32,
    #[serde(default = "LayoutPreferences::default_paper_median_lines")]
    pub paper_median_lines: u32,
    #[serde(default = "LayoutPreferences::default_header_lines")]
    pub header_lines: u32,
}

impl Default for LayoutPreferences {
    fn default() -> Self {
        Self {
            proceedings_max_lines: DEFAULT_PROCEEDINGS_MAX_LINES,
            handbook_max_lines: DEFAULT_HANDBOOK_MAX_LINES,
            workshop_max_lines: DEFAULT_HANDBOOK_MAX_LINES,
            paper_median_lines: DEFAULT_PAPER_MEDIAN_LINES,
            header_lines: DEFAULT_HEADER_LINES,
        }
    }
}

impl LayoutPreferences {
    const fn default_proceedings_max_lines() -> u32 {
        DEFAULT_PROCEEDINGS_MAX_LINES
    }

    const fn default_handbook_max_lines() -> u32 {
        DEFAULT_HANDBOOK_MAX_LINES
    }

    const fn default_paper_median_lines() -> u32 {
        DEFAULT_PAPER_MEDIAN_LINES
    }

    const fn default_header_lines() -> u32 {
        DEFAULT_HEADER_LINES
    }

    fn budget(&self, max_lines: u32) -> PageBudget {
        PageBudget {
            max_lines,
            paper_median_lines: self.paper_median_lines,
            header_lines: self.header_lines,
        }
    }

    pub fn proceedings_budget(&self) -> PageBudget {
        self.budget(self.proceedings_max_lines)
    }

    pub fn handbook_budget(&self) -> PageBudget {
        self.budget(self.handbook_max_lines)
    }

    pub fn workshop_budget(&self) -> PageBudget {
        self.budget(self.workshop_max_lines)
    }
}

/// Where intermediate and final artifacts are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildPreferences {
    #[serde(default = "BuildPreferences::default_build_dir")]
    pub build_dir: String,
    #[serde(default = "BuildPreferences::default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub overwrite: bool,
}

impl Default for BuildPreferences {
    fn default() -> Self {
        Self {
            build_dir: Self::default_build_dir(),
            output_dir: Self::default_output_dir(),
            overwrite: false,
        }
    }
}

impl BuildPreferences {
    fn default_build_dir() -> String {
        "build".to_string()
    }

    fn default_output_dir() -> String {
        "output".to_string()
    }
}

/// Represents overrides sourced from CLI flags.
#[derive(Debug, Default, Clone)]
pub struct RuntimeOverrides {
    pub max_lines: Option<u32>,
    pub paper_median_lines: Option<u32>,
    pub header_lines: Option<u32>,
    pub build_dir: Option<String>,
    pub output_dir: Option<String>,
    pub overwrite: Option<bool>,
}

impl RuntimeOverrides {
    pub fn is_empty(&self) -> bool {
        self.max_lines.is_none()
            && self.paper_median_lines.is_none()
            && self.header_lines.is_none()
            && self.build_dir.is_none()
            && self.output_dir.is_none()
            && self.overwrite.is_none()
    }
}

/// Which layout budget a `--max-lines` override replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutTarget {
    Proceedings,
    Handbook,
}

/// Path to the configuration directory.
///
/// `ACLPUB_CONFIG_DIR` takes precedence over the platform configuration directory.
pub fn config_directory() -> PathBuf {
    if let Ok(dir) = env::var(CONFIG_DIR_ENV) {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Path to `config.toml`.
pub fn config_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

/// Load the configuration, falling back to defaults.
pub fn load_config() -> ConfigLoadResult {
    load_config_from(&config_path())
}

/// Load the configuration stored at `path`.
pub fn load_config_from(path: &Path) -> ConfigLoadResult {
    let mut warnings = Vec::new();

    if path.exists() {
        match fs::read_to_string(path) {
            Ok(raw) => match toml::from_str::<FileConfig>(&raw) {
                Ok(cfg) => {
                    let (cfg, mut sanitize_warnings) = sanitize_config(cfg);
                    warnings.append(&mut sanitize_warnings);
                    return ConfigLoadResult {
                        config: cfg,
                        warnings,
                        source: ConfigSource::File,
                    };
                }
                Err(err) => {
                    warnings.push(format!(
                        "Failed to parse {} as TOML: {}. Falling back to defaults.",
                        CONFIG_FILE_NAME, err
                    ));
                }
            },
            Err(err) => {
                warnings.push(format!(
                    "Failed to read {}: {}. Falling back to defaults.",
                    CONFIG_FILE_NAME, err
                ));
            }
        }
    }

    // Default fallback
    ConfigLoadResult {
        config: FileConfig::default(),
        warnings,
        source: ConfigSource::Default,
    }
}

/// Persist the configuration to disk.
pub fn save_config(config: &FileConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_path())
}

pub fn save_config_to(config: &FileConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let serialized = toml::to_string_pretty(config)?;
    fs::write(path, serialized)?;
    Ok(())
}

fn sanitize_config(mut config: FileConfig) -> (FileConfig, Vec<String>) {
    let mut warnings = Vec::new();

    if config.schema_version != CURRENT_SCHEMA_VERSION {
        warnings.push(format!(
            "Unknown config schema version {}. Resetting to {}.",
            config.schema_version, CURRENT_SCHEMA_VERSION
        ));
        config = FileConfig::default();
        return (config, warnings);
    }

    let defaults = LayoutPreferences::default();
    let layout = &mut config.layout;
    for (name, value, fallback) in [
        (
            "proceedings_max_lines",
            &mut layout.proceedings_max_lines,
            defaults.proceedings_max_lines,
        ),
        (
            "handbook_max_lines",
            &mut layout.handbook_max_lines,
            defaults.handbook_max_lines,
        ),
        (
            "workshop_max_lines",
            &mut layout.workshop_max_lines,
            defaults.workshop_max_lines,
        ),
        (
            "paper_median_lines",
            &mut layout.paper_median_lines,
            defaults.paper_median_lines,
        ),
        ("header_lines", &mut layout.header_lines, defaults.header_lines),
    ] {
        if *value == 0 {
            warnings.push(format!(
                "Layout setting {name} must be greater than zero. Resetting to {fallback}."
            ));
            *value = fallback;
        }
    }

    if config.build.build_dir.trim().is_empty() {
        warnings.push("Build directory is empty. Resetting to 'build'.".to_string());
        config.build.build_dir = BuildPreferences::default_build_dir();
    }
    if config.build.output_dir.trim().is_empty() {
        warnings.push("Output directory is empty. Resetting to 'output'.".to_string());
        config.build.output_dir = BuildPreferences::default_output_dir();
    }

    (config, warnings)
}

/// Merge runtime overrides into an existing configuration.
pub fn apply_runtime_overrides(
    config: &mut FileConfig,
    overrides: &RuntimeOverrides,
    target: LayoutTarget,
    warnings: &mut Vec<String>,
) {
    if let Some(value) = overrides.max_lines {
        if value == 0 {
            warnings.push("--max-lines must be greater than zero. Ignoring override.".to_string());
        } else {
            match target {
                LayoutTarget::Proceedings => config.layout.proceedings_max_lines = value,
                LayoutTarget::Handbook => {
                    config.layout.handbook_max_lines = value;
                    config.layout.workshop_max_lines = value;
                }
            }
        }
    }
    if let Some(value) = overrides.paper_median_lines {
        if value == 0 {
            warnings
                .push("--paper-lines must be greater than zero. Ignoring override.".to_string());
        } else {
            config.layout.paper_median_lines = value;
        }
    }
    if let Some(value) = overrides.header_lines {
        if value == 0 {
            warnings
                .push("--header-lines must be greater than zero. Ignoring override.".to_string());
        } else {
            config.layout.header_lines = value;
        }
    }
    if let Some(ref value) = overrides.build_dir {
        config.build.build_dir = value.clone();
    }
    if let Some(ref value) = overrides.output_dir {
        config.build.output_dir = value.clone();
    }
    if let Some(value) = overrides.overwrite {
        config.build.overwrite = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_zero_layout_values() {
        let mut config = FileConfig::default();
        config.layout.proceedings_max_lines = 0;
        config.layout.header_lines = 0;

        let (sanitized, warnings) = sanitize_config(config);

        assert_eq!(
            sanitized.layout.proceedings_max_lines,
            DEFAULT_PROCEEDINGS_MAX_LINES
        );
        assert_eq!(sanitized.layout.header_lines, DEFAULT_HEADER_LINES);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.contains("header_lines")));
    }

    #[test]
    fn test_sanitize_wrong_schema_version() {
        let mut config = FileConfig::default();
        config.schema_version = 99;
        config.layout.proceedings_max_lines = 12;

        let (sanitized, warnings) = sanitize_config(config);

        assert_eq!(sanitized, FileConfig::default());
        assert!(
            warnings.iter().any(|w| w.contains("schema version")),
            "Should warn about unknown schema version"
        );
    }

    #[test]
    fn test_sanitize_blank_directories() {
        let mut config = FileConfig::default();
        config.build.build_dir = "  ".to_string();

        let (sanitized, warnings) = sanitize_config(config);

        assert_eq!(sanitized.build.build_dir, "build");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let temp = tempdir().expect("tempdir");
        let result = load_config_from(&temp.path().join(CONFIG_FILE_NAME));

        assert_eq!(result.source, ConfigSource::Default);
        assert!(result.warnings.is_empty());
        assert_eq!(result.config, FileConfig::default());
    }

    #[test]
    fn test_load_config_bad_toml() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "layout = [not valid").unwrap();

        let result = load_config_from(&path);

        assert_eq!(result.source, ConfigSource::Default);
        assert!(result.warnings[0].contains("Failed to parse"));
    }

    #[test]
    fn test_load_config_partial_file_fills_defaults() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[layout]\nproceedings_max_lines = 32\n").unwrap();

        let result = load_config_from(&path);

        assert_eq!(result.source, ConfigSource::File);
        assert_eq!(result.config.layout.proceedings_max_lines, 32);
        assert_eq!(
            result.config.layout.handbook_max_lines,
            DEFAULT_HANDBOOK_MAX_LINES
        );
        assert_eq!(result.config.build.build_dir, "build");
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join(CONFIG_FILE_NAME);
        let mut config = FileConfig::default();
        config.layout.paper_median_lines = 4;
        config.build.overwrite = true;

        save_config_to(&config, &path).unwrap();
        let result = load_config_from(&path);

        assert_eq!(result.config, config);
    }

    #[test]
    fn test_apply_runtime_overrides_targets_layout() {
        let mut config = FileConfig::default();
        let overrides = RuntimeOverrides {
            max_lines: Some(32),
            header_lines: Some(0),
            overwrite: Some(true),
            ..RuntimeOverrides::default()
        };
        let mut warnings = Vec::new();

        apply_runtime_overrides(
            &mut config,
            &overrides,
            LayoutTarget::Proceedings,
            &mut warnings,
        );

        assert_eq!(config.layout.proceedings_max_lines, 32);
        assert_eq!(config.layout.handbook_max_lines, DEFAULT_HANDBOOK_MAX_LINES);
        assert_eq!(config.layout.header_lines, DEFAULT_HEADER_LINES);
        assert!(config.build.overwrite);
        assert_eq!(warnings.len(), 1);

        apply_runtime_overrides(
            &mut config,
            &overrides,
            LayoutTarget::Handbook,
            &mut Vec::new(),
        );
        assert_eq!(config.layout.handbook_max_lines, 32);
        assert_eq!(config.layout.workshop_max_lines, 32);
    }

    #[test]
    fn test_budgets_share_line_costs() {
        let mut layout = LayoutPreferences::default();
        layout.paper_median_lines = 5;

        assert_eq!(layout.proceedings_budget().max_lines, 35);
        assert_eq!(layout.handbook_budget().max_lines, 350);
        assert_eq!(layout.workshop_budget().paper_median_lines, 5);
    }
}
