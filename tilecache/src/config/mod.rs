//! Provider configuration files.
//!
//! A provider is described by a small INI file:
//!
//! ```ini
//! [provider]
//! name = my-imagery
//! preset = streetside
//!
//! [tiler]
//! min_zoom = 16
//! max_zoom = 17
//! margin = 1
//! skip_null_island = true
//!
//! [paging]
//! page_size = 500
//!
//! [cache]
//! avoid_collisions = false
//! collision_epsilon = 0.00001
//!
//! [imagery]
//! enabled = true
//! search_distance = 35
//! heading_tolerance = 20
//! mismatch_penalty = 5
//!
//! [events]
//! capacity = 256
//!
//! [records]
//! id = key
//! lon = lng
//! prev = previous_key
//! ```
//!
//! Parsing starts from the preset (or the default profile) and overlays
//! every value present.

mod parser;

use std::path::Path;

use ini::Ini;
use thiserror::Error;

use crate::provider::{ProviderProfile, RecordSchema};

/// Errors while loading a provider configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the file.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid INI.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] ini::ParseError),

    /// A value is present but unusable.
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl From<ini::Error> for ConfigError {
    fn from(err: ini::Error) -> Self {
        match err {
            ini::Error::Io(e) => ConfigError::Io(e),
            ini::Error::Parse(e) => ConfigError::Parse(e),
        }
    }
}

/// A fully resolved provider configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderConfig {
    pub profile: ProviderProfile,
    /// Field names for record-set input.
    pub schema: RecordSchema,
}

/// Parse a configuration from INI text.
pub fn parse_config(text: &str) -> Result<ProviderConfig, ConfigError> {
    let ini = Ini::load_from_str(text)?;
    parser::parse_ini(&ini)
}

/// Load a configuration file.
pub fn load_config(path: &Path) -> Result<ProviderConfig, ConfigError> {
    let ini = Ini::load_from_file(path)?;
    parser::parse_ini(&ini)
}

/// Parse just the provider profile from INI text.
pub fn parse_profile(text: &str) -> Result<ProviderProfile, ConfigError> {
    parse_config(text).map(|config| config.profile)
}

/// Load just the provider profile from a file.
pub fn load_profile(path: &Path) -> Result<ProviderProfile, ConfigError> {
    load_config(path).map(|config| config.profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_profile_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[provider]\npreset = osmose\n\n[tiler]\nmargin = 1").unwrap();

        let profile = load_profile(file.path()).unwrap();
        assert_eq!(profile.name, "osmose");
        assert_eq!(profile.margin, 1);
        assert!(profile.avoid_collisions);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_profile(&dir.path().join("absent.ini"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_invalid_value_display() {
        let err = ConfigError::InvalidValue {
            section: "tiler".into(),
            key: "margin".into(),
            value: "-1".into(),
            reason: "must be a non-negative integer".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration: tiler.margin = '-1' - must be a non-negative integer"
        );
    }
}
