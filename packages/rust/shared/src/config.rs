//! Application configuration for Letterpress.
//!
//! User config lives at `~/.letterpress/letterpress.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LetterpressError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "letterpress.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".letterpress";

// ---------------------------------------------------------------------------
// Config structs (matching letterpress.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Heuristic thresholds for classification and editing.
    #[serde(default)]
    pub thresholds: Thresholds,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Parse with locking disabled unless overridden on the command line.
    #[serde(default)]
    pub skip_locking: bool,
}

/// `[thresholds]` section.
///
/// These encode editorial judgment about what a news section or a banner looks
/// like. False positives at the margins are expected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Longest trimmed text a section header candidate may have.
    #[serde(default = "default_header_max_chars")]
    pub header_max_chars: usize,

    /// Smallest serialized size of a locked section container.
    #[serde(default = "default_section_min_chars")]
    pub section_min_chars: usize,

    /// Largest serialized size of a locked section container.
    #[serde(default = "default_section_max_chars")]
    pub section_max_chars: usize,

    /// Minimum `width` for an image to count as a banner.
    #[serde(default = "default_banner_min_width")]
    pub banner_min_width: u32,

    /// Substrings in an image source that mark it as a banner.
    #[serde(default = "default_banner_keywords")]
    pub banner_keywords: Vec<String>,

    /// Minimum trimmed text length of a plain text element.
    #[serde(default = "default_text_min_chars")]
    pub text_min_chars: usize,

    /// Maximum direct element children of a text element.
    #[serde(default = "default_text_max_child_elements")]
    pub text_max_child_elements: usize,

    /// Text values longer than this are edited as a textarea.
    #[serde(default = "default_textarea_min_chars")]
    pub textarea_min_chars: usize,

    /// Maximum number of ancestors pruned after a deletion.
    #[serde(default = "default_cleanup_max_depth")]
    pub cleanup_max_depth: usize,

    /// Inputs larger than this are rejected outright.
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            header_max_chars: default_header_max_chars(),
            section_min_chars: default_section_min_chars(),
            section_max_chars: default_section_max_chars(),
            banner_min_width: default_banner_min_width(),
            banner_keywords: default_banner_keywords(),
            text_min_chars: default_text_min_chars(),
            text_max_child_elements: default_text_max_child_elements(),
            textarea_min_chars: default_textarea_min_chars(),
            cleanup_max_depth: default_cleanup_max_depth(),
            max_input_bytes: default_max_input_bytes(),
        }
    }
}

fn default_header_max_chars() -> usize {
    100
}
fn default_section_min_chars() -> usize {
    500
}
fn default_section_max_chars() -> usize {
    50_000
}
fn default_banner_min_width() -> u32 {
    400
}
fn default_banner_keywords() -> Vec<String> {
    vec!["banner".into(), "hero".into(), "header".into()]
}
fn default_text_min_chars() -> usize {
    5
}
fn default_text_max_child_elements() -> usize {
    3
}
fn default_textarea_min_chars() -> usize {
    80
}
fn default_cleanup_max_depth() -> usize {
    4
}
fn default_max_input_bytes() -> usize {
    5 * 1024 * 1024
}

// ---------------------------------------------------------------------------
// Runtime options (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Options for one `parse_template` call.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Disable the structural classifier and use the broad tag allowlist.
    pub skip_locking: bool,
    /// Classification thresholds.
    pub thresholds: Thresholds,
}

impl ParseOptions {
    /// Default thresholds with the given lock mode.
    pub fn with_skip_locking(skip_locking: bool) -> Self {
        Self {
            skip_locking,
            ..Self::default()
        }
    }
}

impl From<&AppConfig> for ParseOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            skip_locking: config.defaults.skip_locking,
            thresholds: config.thresholds.clone(),
        }
    }
}

/// Options for the update/delete/insert entry points.
#[derive(Debug, Clone)]
pub struct EditOptions {
    /// Maximum number of ancestors pruned after a deletion.
    pub cleanup_max_depth: usize,
    /// Inputs larger than this are rejected outright.
    pub max_input_bytes: usize,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self::from(&Thresholds::default())
    }
}

impl From<&Thresholds> for EditOptions {
    fn from(thresholds: &Thresholds) -> Self {
        Self {
            cleanup_max_depth: thresholds.cleanup_max_depth,
            max_input_bytes: thresholds.max_input_bytes,
        }
    }
}

impl From<&AppConfig> for EditOptions {
    fn from(config: &AppConfig) -> Self {
        Self::from(&config.thresholds)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.letterpress/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LetterpressError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.letterpress/letterpress.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LetterpressError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        LetterpressError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    validate_thresholds(&config.thresholds)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LetterpressError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LetterpressError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LetterpressError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject threshold combinations that can never lock anything.
fn validate_thresholds(thresholds: &Thresholds) -> Result<()> {
    if thresholds.section_min_chars > thresholds.section_max_chars {
        return Err(LetterpressError::config(format!(
            "section_min_chars ({}) exceeds section_max_chars ({})",
            thresholds.section_min_chars, thresholds.section_max_chars
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("skip_locking"));
        assert!(toml_str.contains("section_min_chars"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.thresholds.section_max_chars, 50_000);
        assert_eq!(parsed.thresholds.banner_keywords, vec!["banner", "hero", "header"]);
    }

    #[test]
    fn partial_thresholds_fill_defaults() {
        let toml_str = r#"
[defaults]
skip_locking = true

[thresholds]
banner_min_width = 320
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert!(config.defaults.skip_locking);
        assert_eq!(config.thresholds.banner_min_width, 320);
        assert_eq!(config.thresholds.header_max_chars, 100);
    }

    #[test]
    fn options_from_app_config() {
        let mut app = AppConfig::default();
        app.defaults.skip_locking = true;
        app.thresholds.cleanup_max_depth = 2;

        let parse = ParseOptions::from(&app);
        assert!(parse.skip_locking);
        assert_eq!(parse.thresholds.text_min_chars, 5);

        let edit = EditOptions::from(&app);
        assert_eq!(edit.cleanup_max_depth, 2);
    }

    #[test]
    fn inverted_section_bounds_rejected() {
        let dir = std::env::temp_dir().join("letterpress-config-test");
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("inverted.toml");
        std::fs::write(
            &path,
            "[thresholds]\nsection_min_chars = 900\nsection_max_chars = 100\n",
        )
        .expect("write config");

        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("section_min_chars"));
    }
}
