//! # Config Loader
//!
//! Turns a `monza.toml` (or `.json`) file into a validated `MonzaBlueprint`.
//! The dispatcher never reads files itself; the CLI hands it what this crate
//! produces.
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("monza.toml")).unwrap();
//! println!("Destinations: {}", blueprint.destinations.len());
//! ```

mod parser;
mod validator;

pub use contracts::MonzaBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Blueprint loading entry points
pub struct ConfigLoader;

impl ConfigLoader {
    /// Read, parse and validate a blueprint file
    ///
    /// The format comes from the extension (`.toml` or `.json`).
    ///
    /// # Errors
    /// Unknown extension, unreadable file, parse or validation failure.
    pub fn load_from_path(path: &Path) -> Result<MonzaBlueprint, ContractError> {
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                ContractError::config_parse("cannot determine file format from extension")
            })
            .and_then(|ext| {
                ConfigFormat::from_extension(ext).ok_or_else(|| {
                    ContractError::config_parse(format!("unsupported config format: .{ext}"))
                })
            })?;

        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Parse and validate a blueprint held in memory
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<MonzaBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    pub fn to_toml(blueprint: &MonzaBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(blueprint: &MonzaBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}
