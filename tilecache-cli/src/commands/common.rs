//! Common types and utilities shared across CLI commands.

use std::path::Path;

use tilecache::config::{load_config, ProviderConfig};
use tilecache::coord::Extent;
use tilecache::provider::{ProviderProfile, PRESET_NAMES};

use crate::error::CliError;

/// Parse a `west,south,east,north` bounding box.
pub fn parse_bbox(s: &str) -> Result<Extent, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid number in bbox '{}': {}", s, e))?;
    match parts.as_slice() {
        [west, south, east, north] => {
            if !(-180.0..=180.0).contains(west) || !(-180.0..=180.0).contains(east) {
                return Err("longitudes must be between -180 and 180".to_string());
            }
            if !(-90.0..=90.0).contains(south) || !(-90.0..=90.0).contains(north) {
                return Err("latitudes must be between -90 and 90".to_string());
            }
            Ok(Extent::new(*west, *south, *east, *north))
        }
        _ => Err(format!(
            "bbox '{}' must have four comma-separated values: west,south,east,north",
            s
        )),
    }
}

/// Resolve provider settings from CLI args and config.
///
/// A config file takes precedence; `--preset` picks a built-in profile
/// otherwise; the default profile is the fallback.
pub fn resolve_config(
    config_path: Option<&Path>,
    preset: Option<&str>,
) -> Result<ProviderConfig, CliError> {
    if let Some(path) = config_path {
        return Ok(load_config(path)?);
    }
    let mut config = ProviderConfig::default();
    if let Some(name) = preset {
        config.profile = ProviderProfile::preset(name).ok_or_else(|| {
            CliError::InvalidArgument(format!(
                "unknown preset '{}' (expected one of: {})",
                name,
                PRESET_NAMES.join(", ")
            ))
        })?;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_bbox() {
        let extent = parse_bbox("13.38, 52.50,13.42,52.53").unwrap();
        assert_eq!(extent, Extent::new(13.38, 52.50, 13.42, 52.53));
        assert!(parse_bbox("1,2,3").is_err());
        assert!(parse_bbox("a,b,c,d").is_err());
        assert!(parse_bbox("0,95,1,96").is_err());
    }

    #[test]
    fn test_resolve_preset() {
        let config = resolve_config(None, Some("streetside")).unwrap();
        assert_eq!(config.profile.name, "streetside");
        assert!(resolve_config(None, Some("nope")).is_err());
        assert_eq!(resolve_config(None, None).unwrap(), ProviderConfig::default());
    }

    #[test]
    fn test_config_file_wins_over_preset() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[provider]\npreset = kartaview").unwrap();
        let config = resolve_config(Some(file.path()), Some("streetside")).unwrap();
        assert_eq!(config.profile.name, "kartaview");
    }
}
