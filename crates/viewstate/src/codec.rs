use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::model::ViewConfig;

/// Malformed textual view state.
#[derive(Debug)]
pub enum DecodeError {
    /// The percent-escaped payload did not unescape to UTF-8.
    Escape(String),
    Json(serde_json::Error),
    /// Well-formed JSON, but not an object.
    NotAnObject,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Escape(msg) => write!(f, "invalid escape sequence: {msg}"),
            DecodeError::Json(e) => write!(f, "invalid view state JSON: {e}"),
            DecodeError::NotAnObject => write!(f, "view state must be a JSON object"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Json(e) => Some(e),
            _ => None,
        }
    }
}

/// Encodes `state` as percent-escaped JSON, safe to embed in a URL.
pub fn encode(state: &ViewConfig) -> String {
    urlencoding::encode(&to_json(state)).into_owned()
}

/// Inverse of [`encode`].
pub fn decode(blob: &str) -> Result<ViewConfig, DecodeError> {
    decode_as(blob)
}

/// Unescapes `blob` and parses it as any JSON-shaped payload.
pub fn decode_as<T: DeserializeOwned>(blob: &str) -> Result<T, DecodeError> {
    let text = unescape(blob)?;
    serde_json::from_str(&text).map_err(DecodeError::Json)
}

pub fn to_json(state: &ViewConfig) -> String {
    // Every map in the model is string-keyed, so serialization cannot fail.
    serde_json::to_string(state).unwrap_or_default()
}

/// Parses already-unescaped JSON into a top-level object, for shallow merges.
pub fn parse_object(text: &str) -> Result<Map<String, Value>, DecodeError> {
    match serde_json::from_str::<Value>(text).map_err(DecodeError::Json)? {
        Value::Object(obj) => Ok(obj),
        _ => Err(DecodeError::NotAnObject),
    }
}

pub fn unescape(blob: &str) -> Result<String, DecodeError> {
    urlencoding::decode(blob)
        .map(|s| s.into_owned())
        .map_err(|e| DecodeError::Escape(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LayerRef, SourceDescriptor, ToolDescriptor};
    use foundation::Extent;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn encoded_blob_is_url_safe() {
        let mut state = ViewConfig::default();
        let mut layer = LayerRef::new("local", "topp:states");
        layer.cql_filter = Some("STATE_NAME = 'New York' AND PERSONS > 100".into());
        state.map.layers.push(layer);
        state.map.set_viewport(Some([-73.9, 40.7]), Some(8));

        let blob = encode(&state);
        assert!(
            blob.chars()
                .all(|c| c.is_ascii_alphanumeric() || "-_.~%".contains(c)),
            "unexpected character in {blob}"
        );
        assert_eq!(decode(&blob).expect("decode"), state);
    }

    #[test]
    fn malformed_input_is_a_recoverable_error() {
        assert!(matches!(decode("%7Bnot json"), Err(DecodeError::Json(_))));
        assert!(matches!(decode("%FF%FE"), Err(DecodeError::Escape(_))));
        assert!(matches!(parse_object("[1,2]"), Err(DecodeError::NotAnObject)));
    }

    #[test]
    fn null_controls_survive_a_round_trip() {
        let mut state = ViewConfig::default();
        state.map.controls = Some(Value::Null);
        let blob = encode(&state);
        assert!(unescape(&blob).expect("unescape").contains("\"controls\":null"));
        assert_eq!(decode(&blob).expect("decode"), state);

        let absent = decode("%7B%22map%22%3A%7B%7D%7D").expect("decode");
        assert_eq!(absent.map.controls, None);
    }

    #[test]
    fn tools_are_not_carried_when_empty() {
        let mut state = ViewConfig::default();
        state.tools.push(ToolDescriptor::new("gxp_navigation"));
        let stripped = state.without_tools();
        assert!(!to_json(&stripped).contains("tools"));
    }

    fn json_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            (-1.0e6..1.0e6_f64).prop_map(Value::from),
            any::<i32>().prop_map(Value::from),
            "[A-Za-z0-9 %&=']{0,12}".prop_map(Value::from),
            proptest::collection::vec(any::<i16>(), 0..3).prop_map(Value::from),
        ]
    }

    /// Unknown keys; the `x_` prefix keeps them clear of named fields.
    fn extra_strategy() -> impl Strategy<Value = Map<String, Value>> {
        proptest::collection::btree_map("x_[a-z]{1,6}", json_value(), 0..3)
            .prop_map(|entries| entries.into_iter().collect())
    }

    fn layer_strategy() -> impl Strategy<Value = LayerRef> {
        (
            "[a-z]{1,8}",
            "[a-z]{1,6}:[a-z_]{1,12}",
            proptest::option::of("[A-Za-z ]{0,16}"),
            any::<bool>(),
            any::<bool>(),
            proptest::option::of("[A-Za-z_]{1,8} = '[^']{0,8}'"),
            proptest::option::of(proptest::array::uniform4(-1.0e7..1.0e7_f64)),
            extra_strategy(),
        )
            .prop_map(
                |(source, name, title, visibility, selected, cql_filter, bbox, extra)| LayerRef {
                    source,
                    name,
                    title,
                    visibility,
                    selected,
                    cql_filter,
                    bbox: bbox.map(Extent::from_bounds),
                    extra,
                },
            )
    }

    fn source_strategy() -> impl Strategy<Value = SourceDescriptor> {
        (
            proptest::option::of("gxp_[a-z]{3,12}"),
            proptest::option::of("[a-z/.:]{1,24}"),
            proptest::option::of("[A-Za-z ]{0,16}"),
            proptest::option::of(proptest::collection::vec("[a-z]{1,8}", 0..3)),
            extra_strategy(),
        )
            .prop_map(
                |(ptype, url, title, required_properties, extra)| SourceDescriptor {
                    ptype,
                    url,
                    title,
                    required_properties,
                    extra,
                },
            )
    }

    fn config_strategy() -> impl Strategy<Value = ViewConfig> {
        (
            proptest::collection::vec(layer_strategy(), 0..4),
            proptest::option::of((-2.0e7..2.0e7_f64, -2.0e7..2.0e7_f64, 0u32..22)),
            proptest::option::of(proptest::array::uniform4(-1.0e3..1.0e3_f64)),
            proptest::option::of("EPSG:[0-9]{4,6}"),
            proptest::option::of(prop_oneof![Just("m"), Just("degrees"), Just("ft")]),
            proptest::option::of(1.0e-3..2.0e5_f64),
            proptest::option::of(prop_oneof![
                Just(Value::Null),
                Just(json!([{"ptype": "scale"}])),
                Just(json!([])),
            ]),
            proptest::collection::btree_map("[a-z]{1,8}", source_strategy(), 0..3),
            extra_strategy(),
            extra_strategy(),
        )
            .prop_map(
                |(
                    layers,
                    view,
                    extent,
                    projection,
                    units,
                    max_resolution,
                    controls,
                    sources,
                    map_extra,
                    extra,
                )| {
                    let mut state = ViewConfig::default();
                    state.map.projection = projection;
                    state.map.units = units.map(str::to_string);
                    state.map.max_resolution = max_resolution;
                    state.map.layers = layers;
                    if let Some((x, y, zoom)) = view {
                        state.map.set_viewport(Some([x, y]), Some(zoom));
                    } else if let Some(bounds) = extent {
                        state.map.set_extent(Extent::from_bounds(bounds));
                    }
                    state.map.controls = controls;
                    state.map.extra = map_extra;
                    state.sources = sources;
                    state.extra = extra;
                    state
                },
            )
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(state in config_strategy()) {
            let decoded = decode(&encode(&state));
            prop_assert!(decoded.is_ok(), "decode failed: {:?}", decoded.as_ref().err());
            prop_assert_eq!(decoded.unwrap(), state);
        }
    }
}
