use std::collections::BTreeMap;

use foundation::Extent;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::codec::DecodeError;

/// Reserved source key for same-origin resources.
pub const LOCAL_SOURCE: &str = "local";

/// Canonical in-memory representation of a map view.
///
/// Field names follow the JSON shape shared with the persistence server and
/// bookmark URLs (`map.maxResolution`, `layers[].cqlFilter`, ...). Unknown
/// fields are carried through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub sources: BTreeMap<String, SourceDescriptor>,
    /// Viewer tool set. Transient: never persisted, never shared.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDescriptor>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_resolution: Option<f64>,
    #[serde(default)]
    pub layers: Vec<LayerRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent: Option<Extent>,
    /// Environment-level map controls; opaque to this crate. An explicit
    /// `null` is kept as `Some(Value::Null)`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub controls: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reference to a layer published by one of the configured sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerRef {
    pub source: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default = "default_visibility")]
    pub visibility: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub selected: bool,
    #[serde(default, alias = "cql_filter", skip_serializing_if = "Option::is_none")]
    pub cql_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Extent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Endpoint descriptor for a layer source (e.g. a WMS service).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ptype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Properties that must be known before the source counts as usable.
    /// An empty list defers capability probing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_properties: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub ptype: String,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

/// Center and zoom level of the live map.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub center: [f64; 2],
    pub zoom: u32,
}

fn default_visibility() -> bool {
    true
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl LayerRef {
    pub fn new(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
            title: None,
            visibility: true,
            selected: false,
            cql_filter: None,
            bbox: None,
            extra: Map::new(),
        }
    }
}

impl ToolDescriptor {
    pub fn new(ptype: impl Into<String>) -> Self {
        Self {
            ptype: ptype.into(),
            options: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }
}

impl MapConfig {
    /// Sets center and zoom. Any explicit extent is cleared when either is
    /// present, since the two ways of framing the view are exclusive.
    pub fn set_viewport(&mut self, center: Option<[f64; 2]>, zoom: Option<u32>) {
        self.center = center;
        self.zoom = zoom;
        if center.is_some() || zoom.is_some() {
            self.extent = None;
        }
    }

    /// Frames the view by extent, clearing center and zoom.
    pub fn set_extent(&mut self, extent: Extent) {
        self.extent = Some(extent);
        self.center = None;
        self.zoom = None;
    }

    pub fn viewport(&self) -> Option<Viewport> {
        Some(Viewport {
            center: self.center?,
            zoom: self.zoom?,
        })
    }

    pub fn layer(&self, name: &str) -> Option<&LayerRef> {
        self.layers.iter().find(|l| l.name == name)
    }
}

impl ViewConfig {
    pub fn to_object(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(obj)) => obj,
            // A struct always serializes to an object.
            _ => Map::new(),
        }
    }

    pub fn from_object(obj: Map<String, Value>) -> Result<Self, DecodeError> {
        serde_json::from_value(Value::Object(obj)).map_err(DecodeError::Json)
    }

    /// Shallow merge where `overlay` wins: every top-level key it names
    /// replaces the corresponding key of `self` wholesale.
    pub fn overlaid_with(&self, overlay: Map<String, Value>) -> Result<Self, DecodeError> {
        let mut merged = self.to_object();
        for (key, value) in overlay {
            merged.insert(key, value);
        }
        Self::from_object(merged)
    }

    /// Shallow merge where `primary` wins and `self` only fills the
    /// top-level keys `primary` does not name.
    pub fn filled_into(&self, mut primary: Map<String, Value>) -> Result<Self, DecodeError> {
        for (key, value) in self.to_object() {
            primary.entry(key).or_insert(value);
        }
        Self::from_object(primary)
    }

    pub fn without_tools(mut self) -> Self {
        self.tools.clear();
        self
    }
}
