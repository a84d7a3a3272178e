use serde::{Deserialize, Serialize};
use thiserror::Error;

/// True in non-optimized builds. Diagnostics and performance marks exist only here.
pub const DEV_BUILD: bool = cfg!(debug_assertions);

/// Global switches for the mount gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MountConfig {
    /// Bracket template compilation with performance marks.
    pub performance: bool,
    /// Suppress all diagnostics, including in debug builds.
    pub silent: bool,
    /// The platform leaves `&#10;`/`&#9;` encoded in serialized attribute values.
    pub should_decode_newlines: bool,
    /// Same as `should_decode_newlines`, for `href` values.
    pub should_decode_newlines_for_href: bool,
}

impl MountConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::Json)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid component options: {0}")]
    InvalidField(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_fields_missing() {
        let config = MountConfig::from_json("{}").unwrap();
        assert_eq!(config, MountConfig::default());
        assert!(!config.performance);
    }

    #[test]
    fn test_camel_case_fields() {
        let config = MountConfig::from_json(r#"{"performance": true, "silent": true}"#).unwrap();
        assert!(config.performance);
        assert!(config.silent);

        let config = MountConfig::from_json(r#"{"shouldDecodeNewlinesForHref": true}"#).unwrap();
        assert!(config.should_decode_newlines_for_href);
        assert!(!config.should_decode_newlines);
    }

    #[test]
    fn test_malformed_json_is_error() {
        let err = MountConfig::from_json("{performance").unwrap_err();
        assert!(err.to_string().starts_with("invalid configuration JSON"));
    }
}
