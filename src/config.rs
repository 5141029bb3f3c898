use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, XrefError};
use crate::resolution::ResolverOptions;
use crate::types::{USED_BY_TAG, USES_TAG};

/// Name of the configuration file stored inside the `.docxref` directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// Name of the hidden directory used to store docxref settings.
pub const DOCXREF_DIR: &str = ".docxref";

/// Configuration for a docxref project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XrefConfig {
    /// Schema version of the configuration.
    pub version: u32,
    /// Name of the tags to resolve.
    pub uses_tag: String,
    /// Name given to the synthesized reciprocal tags.
    pub used_by_tag: String,
    /// Report references that match nothing, instead of skipping them quietly.
    pub report_unresolved: bool,
    /// Default `tracing` filter used by the command-line tool.
    pub log_level: String,
}

impl Default for XrefConfig {
    fn default() -> Self {
        Self {
            version: 1,
            uses_tag: USES_TAG.to_string(),
            used_by_tag: USED_BY_TAG.to_string(),
            report_unresolved: false,
            log_level: "warn".to_string(),
        }
    }
}

impl XrefConfig {
    /// Resolver settings derived from this configuration.
    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            uses_tag: self.uses_tag.clone(),
            used_by_tag: self.used_by_tag.clone(),
            report_unresolved: self.report_unresolved,
        }
    }
}

/// Returns the path to the `.docxref` directory within the given project root.
pub fn get_docxref_dir(project_root: &Path) -> PathBuf {
    project_root.join(DOCXREF_DIR)
}

/// Returns the path to the configuration file within the `.docxref` directory.
pub fn get_config_path(project_root: &Path) -> PathBuf {
    get_docxref_dir(project_root).join(CONFIG_FILENAME)
}

/// Loads the configuration from disk.
///
/// If the configuration file does not exist, returns the default configuration.
pub fn load_config(project_root: &Path) -> Result<XrefConfig> {
    let config_path = get_config_path(project_root);

    if !config_path.exists() {
        return Ok(XrefConfig::default());
    }

    let contents = fs::read_to_string(&config_path).map_err(|e| XrefError::Config {
        message: format!(
            "failed to read config file '{}': {}",
            config_path.display(),
            e
        ),
    })?;

    let config: XrefConfig = serde_json::from_str(&contents).map_err(|e| XrefError::Config {
        message: format!(
            "failed to parse config file '{}': {}",
            config_path.display(),
            e
        ),
    })?;

    if config.uses_tag.is_empty() || config.used_by_tag.is_empty() {
        return Err(XrefError::Config {
            message: format!(
                "tag names in '{}' must not be empty",
                config_path.display()
            ),
        });
    }

    // A shared name would make every synthesized tag look like a new `@uses`
    // to the next pass.
    if config.uses_tag == config.used_by_tag {
        return Err(XrefError::Config {
            message: format!(
                "uses_tag and used_by_tag in '{}' must differ (both are '{}')",
                config_path.display(),
                config.uses_tag
            ),
        });
    }

    Ok(config)
}

/// Saves the configuration to disk using an atomic write.
///
/// Writes to a temporary file first and then renames it to the final location.
pub fn save_config(project_root: &Path, config: &XrefConfig) -> Result<()> {
    let docxref_dir = get_docxref_dir(project_root);
    fs::create_dir_all(&docxref_dir).map_err(|e| XrefError::Config {
        message: format!(
            "failed to create docxref directory '{}': {}",
            docxref_dir.display(),
            e
        ),
    })?;

    let config_path = get_config_path(project_root);
    let tmp_path = config_path.with_extension("tmp");

    let json = serde_json::to_string_pretty(config).map_err(|e| XrefError::Config {
        message: format!("failed to serialize config: {}", e),
    })?;

    fs::write(&tmp_path, &json).map_err(|e| XrefError::Config {
        message: format!(
            "failed to write temporary config file '{}': {}",
            tmp_path.display(),
            e
        ),
    })?;

    fs::rename(&tmp_path, &config_path).map_err(|e| XrefError::Config {
        message: format!(
            "failed to rename temporary config file '{}' to '{}': {}",
            tmp_path.display(),
            config_path.display(),
            e
        ),
    })?;

    Ok(())
}
