//! INI parsing: the single place where INI key names map to profile fields.

use std::str::FromStr;

use ini::{Ini, Properties};

use super::{ConfigError, ProviderConfig};
use crate::coord::MAX_ZOOM;
use crate::provider::{PagingConfig, ProviderProfile, PRESET_NAMES};

/// Parse an `Ini` object into a `ProviderConfig`.
///
/// Starts from the named preset (or the default profile) and overlays any
/// values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ProviderConfig, ConfigError> {
    let mut config = ProviderConfig::default();

    // [provider] section
    if let Some(section) = ini.section(Some("provider")) {
        if let Some(v) = section.get("preset") {
            let v = v.trim().to_lowercase();
            config.profile = ProviderProfile::preset(&v).ok_or_else(|| {
                invalid(
                    "provider",
                    "preset",
                    &v,
                    &format!("must be one of: {}", PRESET_NAMES.join(", ")),
                )
            })?;
        }
        if let Some(v) = section.get("name") {
            let v = v.trim();
            if !v.is_empty() {
                config.profile.name = v.to_string();
            }
        }
    }

    // [tiler] section
    if let Some(section) = ini.section(Some("tiler")) {
        let zoom_reason = format!("must be a number between 0 and {}", MAX_ZOOM);
        let min_zoom: Option<f64> = parse_key(section, "tiler", "min_zoom", &zoom_reason)?;
        let max_zoom: Option<f64> = parse_key(section, "tiler", "max_zoom", &zoom_reason)?;
        for (key, zoom) in [("min_zoom", min_zoom), ("max_zoom", max_zoom)] {
            if let Some(z) = zoom {
                if !(0.0..=MAX_ZOOM as f64).contains(&z) {
                    return Err(invalid("tiler", key, &z.to_string(), &zoom_reason));
                }
            }
        }
        let min = min_zoom.unwrap_or(config.profile.min_zoom);
        let max = max_zoom.unwrap_or(config.profile.max_zoom);
        if min > max {
            return Err(invalid(
                "tiler",
                "min_zoom",
                &min.to_string(),
                "must not exceed max_zoom",
            ));
        }
        config.profile = config.profile.with_zoom_range(min, max);

        let margin_reason = "must be a non-negative integer";
        if let Some(v) = parse_key(section, "tiler", "margin", margin_reason)? {
            config.profile.margin = v;
        }
        if let Some(v) = parse_bool(section, "tiler", "skip_null_island")? {
            config.profile.skip_null_island = v;
        }
    }

    // [paging] section
    if let Some(section) = ini.section(Some("paging")) {
        if let Some(v) = section.get("page_size") {
            let v = v.trim();
            config.profile.paging = match v.to_lowercase().as_str() {
                "" | "none" | "off" => None,
                _ => {
                    let size: usize = v.parse().ok().filter(|n| *n > 0).ok_or_else(|| {
                        invalid(
                            "paging",
                            "page_size",
                            v,
                            "must be a positive integer, or 'none'",
                        )
                    })?;
                    Some(PagingConfig::new(size))
                }
            };
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = parse_bool(section, "cache", "avoid_collisions")? {
            config.profile.avoid_collisions = v;
        }
        if let Some(v) = parse_positive(section, "cache", "collision_epsilon")? {
            config.profile.collision_epsilon = v;
        }
    }

    // [imagery] section
    if let Some(section) = ini.section(Some("imagery")) {
        let enabled = parse_bool(section, "imagery", "enabled")?;
        let mut stepper = config.profile.imagery.unwrap_or_default();
        if let Some(v) = parse_positive(section, "imagery", "search_distance")? {
            stepper.search_distance = v;
        }
        if let Some(v) = parse_key::<f64>(
            section,
            "imagery",
            "heading_tolerance",
            "must be a number between 0 and 180",
        )? {
            if !(0.0..=180.0).contains(&v) {
                return Err(invalid(
                    "imagery",
                    "heading_tolerance",
                    &v.to_string(),
                    "must be a number between 0 and 180",
                ));
            }
            stepper.heading_tolerance = v;
        }
        if let Some(v) = parse_key::<f64>(
            section,
            "imagery",
            "mismatch_penalty",
            "must be a non-negative number",
        )? {
            if v < 0.0 {
                return Err(invalid(
                    "imagery",
                    "mismatch_penalty",
                    &v.to_string(),
                    "must be a non-negative number",
                ));
            }
            stepper.mismatch_penalty = v;
        }

        let enabled =
            enabled.unwrap_or(config.profile.imagery.is_some() || has_stepper_keys(section));
        config.profile.imagery = enabled.then_some(stepper);
    }

    // [events] section
    if let Some(section) = ini.section(Some("events")) {
        let reason = "must be a positive integer";
        if let Some(v) = parse_key::<usize>(section, "events", "capacity", reason)? {
            if v == 0 {
                return Err(invalid("events", "capacity", "0", reason));
            }
            config.profile.event_capacity = v;
        }
    }

    // [records] section
    if let Some(section) = ini.section(Some("records")) {
        let schema = &mut config.schema;
        let fields: [(&str, &mut String); 8] = [
            ("id", &mut schema.id),
            ("lon", &mut schema.lon),
            ("lat", &mut schema.lat),
            ("heading", &mut schema.heading),
            ("captured_at", &mut schema.captured_at),
            ("captured_by", &mut schema.captured_by),
            ("prev", &mut schema.prev),
            ("next", &mut schema.next),
        ];
        for (key, field) in fields {
            if let Some(v) = section.get(key) {
                let v = v.trim();
                if v.is_empty() {
                    return Err(invalid("records", key, v, "field name must not be empty"));
                }
                *field = v.to_string();
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_key<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
    reason: &str,
) -> Result<Option<T>, ConfigError> {
    match section.get(key) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(section_name, key, v, reason)),
    }
}

fn parse_positive(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<f64>, ConfigError> {
    let reason = "must be a positive number";
    match parse_key::<f64>(section, section_name, key, reason)? {
        Some(v) if v <= 0.0 || !v.is_finite() => {
            Err(invalid(section_name, key, &v.to_string(), reason))
        }
        other => Ok(other),
    }
}

fn parse_bool(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<bool>, ConfigError> {
    let Some(v) = section.get(key) else {
        return Ok(None);
    };
    match v.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(Some(true)),
        "false" | "no" | "off" | "0" => Ok(Some(false)),
        _ => Err(invalid(section_name, key, v, "must be true or false")),
    }
}

fn has_stepper_keys(section: &Properties) -> bool {
    ["search_distance", "heading_tolerance", "mismatch_penalty"]
        .iter()
        .any(|key| section.contains_key(key))
}
