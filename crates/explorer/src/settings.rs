use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;
use tracing::info;
use url::Url;
use viewstate::{DecodeError, LOCAL_SOURCE, SourceDescriptor, ViewConfig, codec};

use crate::tools::viewer_tools;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const LOCAL_WMS_URL: &str = "/geoserver/wms";

#[derive(Debug)]
pub enum SettingsError {
    InvalidBaseUrl {
        value: String,
        source: url::ParseError,
    },
    InvalidTimeout(String),
    ReadDefaults {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseDefaults {
        path: PathBuf,
        source: DecodeError,
    },
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::InvalidBaseUrl { value, source } => {
                write!(f, "invalid base url {value:?}: {source}")
            }
            SettingsError::InvalidTimeout(v) => write!(f, "invalid timeout {v:?}"),
            SettingsError::ReadDefaults { path, source } => {
                write!(f, "read {}: {source}", path.display())
            }
            SettingsError::ParseDefaults { path, source } => {
                write!(f, "parse {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::InvalidBaseUrl { source, .. } => Some(source),
            SettingsError::InvalidTimeout(_) => None,
            SettingsError::ReadDefaults { source, .. } => Some(source),
            SettingsError::ParseDefaults { source, .. } => Some(source),
        }
    }
}

/// Runtime settings of the viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplorerSettings {
    /// Root under which persisted maps live at `maps/<id>`.
    pub base_url: Url,
    /// JSON view configuration used instead of the built-in defaults.
    pub defaults_path: Option<PathBuf>,
    pub timeout: Duration,
}

impl ExplorerSettings {
    /// Reads `ATLAS_BASE_URL`, `ATLAS_DEFAULTS` and `ATLAS_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let raw_url = lookup("ATLAS_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&raw_url).map_err(|source| SettingsError::InvalidBaseUrl {
            value: raw_url.clone(),
            source,
        })?;
        let timeout = match lookup("ATLAS_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .map_err(|_| SettingsError::InvalidTimeout(v.clone()))?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        Ok(Self {
            base_url,
            defaults_path: lookup("ATLAS_DEFAULTS")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            timeout: Duration::from_secs(timeout),
        })
    }

    /// The merge base for resolution, with the viewer tool set attached.
    pub fn load_defaults(&self) -> Result<ViewConfig, SettingsError> {
        let mut config = match &self.defaults_path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| {
                    SettingsError::ReadDefaults {
                        path: path.clone(),
                        source,
                    }
                })?;
                let object =
                    codec::parse_object(&text).map_err(|source| SettingsError::ParseDefaults {
                        path: path.clone(),
                        source,
                    })?;
                let config = ViewConfig::from_object(object).map_err(|source| {
                    SettingsError::ParseDefaults {
                        path: path.clone(),
                        source,
                    }
                })?;
                info!(path = %path.display(), "loaded default view configuration");
                config
            }
            None => default_view_config(),
        };
        config.tools = viewer_tools();
        Ok(config)
    }
}

/// Built-in merge base: spherical mercator, no layers, a same-origin WMS.
pub fn default_view_config() -> ViewConfig {
    let mut config = ViewConfig::default();
    config.map.projection = Some("EPSG:900913".into());
    config.map.units = Some("m".into());
    config.map.max_resolution = Some(156543.0339);
    config.map.controls = Some(json!([
        {"ptype": "Navigation"},
        {"ptype": "PanPanel"},
        {"ptype": "ZoomPanel"},
        {"ptype": "Attribution"}
    ]));
    config.sources.insert(
        LOCAL_SOURCE.to_string(),
        SourceDescriptor {
            ptype: Some("gxp_wmscsource".into()),
            url: Some(LOCAL_WMS_URL.into()),
            ..Default::default()
        },
    );
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_environment() {
        let settings = ExplorerSettings::from_lookup(lookup(&[])).expect("settings");
        assert_eq!(settings.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.defaults_path, None);

        let base = settings.load_defaults().expect("defaults");
        assert_eq!(base.map.projection.as_deref(), Some("EPSG:900913"));
        assert_eq!(base.map.max_resolution, Some(156543.0339));
        assert!(base.map.layers.is_empty());
        assert_eq!(
            base.sources[LOCAL_SOURCE].url.as_deref(),
            Some(LOCAL_WMS_URL)
        );
        assert_eq!(base.tools.len(), 7);
    }

    #[test]
    fn environment_overrides_and_rejects_garbage() {
        let settings = ExplorerSettings::from_lookup(lookup(&[
            ("ATLAS_BASE_URL", "https://maps.example.org/composer/"),
            ("ATLAS_TIMEOUT_SECS", " 5 "),
        ]))
        .expect("settings");
        assert_eq!(settings.base_url.host_str(), Some("maps.example.org"));
        assert_eq!(settings.timeout, Duration::from_secs(5));

        assert!(matches!(
            ExplorerSettings::from_lookup(lookup(&[("ATLAS_TIMEOUT_SECS", "soon")])),
            Err(SettingsError::InvalidTimeout(_))
        ));
        assert!(matches!(
            ExplorerSettings::from_lookup(lookup(&[("ATLAS_BASE_URL", "not a url")])),
            Err(SettingsError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn missing_defaults_file_is_reported() {
        let settings = ExplorerSettings::from_lookup(lookup(&[(
            "ATLAS_DEFAULTS",
            "/nonexistent/atlas-defaults.json",
        )]))
        .expect("settings");
        assert!(matches!(
            settings.load_defaults(),
            Err(SettingsError::ReadDefaults { .. })
        ));
    }
}
