use std::collections::HashMap;
use std::sync::Arc;

use foundation::Extent;
use tracing::{debug, error, info};

use crate::cql::{self, CqlError};
use crate::feature::data_extent;
use crate::layer::LayerRecord;
use crate::map::{MapSurface, TransientLayer};
use crate::protocol::FeatureSource;

#[derive(Debug, Clone, PartialEq)]
pub enum ZoomOutcome {
    /// The layer carries no filter; the view was left alone.
    NoFilter,
    Zoomed(Extent),
    /// The filter matched no features with geometry.
    EmptyResult,
}

#[derive(Debug)]
pub enum FilterZoomError {
    InvalidFilter(CqlError),
    /// The layer's source could not describe how to query its features.
    ProtocolUnavailable { layer: String, source: String },
}

impl std::fmt::Display for FilterZoomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterZoomError::InvalidFilter(e) => write!(f, "{e}"),
            FilterZoomError::ProtocolUnavailable { layer, source } => write!(
                f,
                "no feature protocol for layer {layer} from source {source}"
            ),
        }
    }
}

impl std::error::Error for FilterZoomError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FilterZoomError::InvalidFilter(e) => Some(e),
            FilterZoomError::ProtocolUnavailable { .. } => None,
        }
    }
}

/// Zooms the map to the features matched by a layer's CQL filter.
///
/// The matching geometries are fetched through a temporary vector layer
/// that never shows up in the layer switcher and is removed again after
/// its first load, whatever the result.
#[derive(Default, Clone)]
pub struct FilterZoomController {
    sources: HashMap<String, Arc<dyn FeatureSource>>,
}

impl std::fmt::Debug for FilterZoomController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.sources.keys().collect();
        keys.sort();
        f.debug_struct("FilterZoomController")
            .field("sources", &keys)
            .finish()
    }
}

impl FilterZoomController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, key: impl Into<String>, source: Arc<dyn FeatureSource>) -> Self {
        self.sources.insert(key.into(), source);
        self
    }

    pub async fn zoom_to_filter<M: MapSurface>(
        &self,
        map: &mut M,
        record: &LayerRecord,
    ) -> Result<ZoomOutcome, FilterZoomError> {
        let Some(text) = record.cql_filter() else {
            debug!(layer = %record.name, "layer has no filter, nothing to zoom to");
            return Ok(ZoomOutcome::NoFilter);
        };
        let filter = cql::parse(text).map_err(FilterZoomError::InvalidFilter)?;

        let descriptor = match self.sources.get(&record.source) {
            Some(source) => source.protocol_descriptor(record).await,
            None => None,
        };
        let Some(protocol) = descriptor else {
            error!(
                layer = %record.name,
                source = %record.source,
                "feature protocol unavailable, cannot zoom to filter"
            );
            return Err(FilterZoomError::ProtocolUnavailable {
                layer: record.name.clone(),
                source: record.source.clone(),
            });
        };

        let id = map.add_layer(TransientLayer::for_filter(protocol, filter));
        let loaded = map.load_end(id).await;

        let outcome = match data_extent(&loaded.features) {
            Some(extent) => {
                map.zoom_to_extent(extent);
                info!(
                    layer = %record.name,
                    features = loaded.features.len(),
                    "zoomed to filter result"
                );
                ZoomOutcome::Zoomed(extent)
            }
            None => {
                info!(layer = %record.name, "filter matched no geometries");
                ZoomOutcome::EmptyResult
            }
        };
        map.remove_layer(id);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Feature, FeatureGeometry};
    use crate::layer::{CQL_FILTER_PARAM, LayerId};
    use crate::map::{LoadEnd, TRANSIENT_LAYER_NAME};
    use crate::protocol::{DescriptorTable, ProtocolDescriptor};
    use pretty_assertions::assert_eq;
    use runtime::BoxFuture;
    use serde_json::Map;
    use viewstate::Viewport;

    #[derive(Default)]
    struct RecordingMap {
        next_id: u64,
        added: Vec<TransientLayer>,
        removed: Vec<LayerId>,
        zooms: Vec<Extent>,
        loads: Vec<LayerId>,
        features: Vec<Feature>,
    }

    impl MapSurface for RecordingMap {
        fn add_layer(&mut self, layer: TransientLayer) -> LayerId {
            self.next_id += 1;
            self.added.push(layer);
            LayerId(self.next_id)
        }

        fn remove_layer(&mut self, id: LayerId) -> bool {
            self.removed.push(id);
            true
        }

        fn zoom_to_extent(&mut self, extent: Extent) {
            self.zooms.push(extent);
        }

        fn load_end(&mut self, id: LayerId) -> BoxFuture<'static, LoadEnd> {
            self.loads.push(id);
            let features = std::mem::take(&mut self.features);
            Box::pin(async move { LoadEnd { features } })
        }

        fn viewport(&self) -> Option<Viewport> {
            None
        }
    }

    fn descriptor() -> ProtocolDescriptor {
        ProtocolDescriptor {
            url: "http://gis.example.org/geoserver/wfs".into(),
            version: "1.1.0".into(),
            feature_type: "lki_perceel".into(),
            geometry_name: "the_geom".into(),
            srs_name: None,
        }
    }

    fn controller() -> FilterZoomController {
        let mut table = DescriptorTable::new();
        table.insert("geo:lki_perceel", descriptor());
        FilterZoomController::new().with_source("intranet", Arc::new(table))
    }

    fn filtered(filter: &str) -> LayerRecord {
        let mut record = LayerRecord::new("intranet", "geo:lki_perceel");
        record
            .params
            .insert(CQL_FILTER_PARAM.into(), filter.to_string());
        record
    }

    fn polygon(points: &[[f64; 2]]) -> Feature {
        Feature {
            id: None,
            properties: Map::new(),
            geometry: Some(FeatureGeometry::Polygon(vec![points.to_vec()])),
        }
    }

    #[tokio::test]
    async fn zooms_once_to_matching_features_and_cleans_up() {
        let mut map = RecordingMap {
            features: vec![
                polygon(&[[0.0, 0.0], [2.0, 0.0], [2.0, 1.0]]),
                polygon(&[[1.0, 1.0], [3.0, 4.0], [1.5, 2.0]]),
            ],
            ..Default::default()
        };

        let outcome = controller()
            .zoom_to_filter(&mut map, &filtered("aanduiding = 'ZDM01E01354'"))
            .await
            .expect("zoom");

        let expected = Extent::from_bounds([0.0, 0.0, 3.0, 4.0]);
        assert_eq!(outcome, ZoomOutcome::Zoomed(expected));
        assert_eq!(map.zooms, vec![expected]);
        assert_eq!(map.added.len(), 1);
        assert_eq!(map.loads, vec![LayerId(1)]);
        assert_eq!(map.removed, vec![LayerId(1)]);

        let transient = &map.added[0];
        assert_eq!(transient.name, TRANSIENT_LAYER_NAME);
        assert!(!transient.display_in_layer_switcher);
        assert_eq!(transient.query.max_features, 100);
        assert_eq!(transient.query.property_names, vec!["the_geom".to_string()]);
    }

    #[tokio::test]
    async fn empty_result_leaves_view_but_removes_layer() {
        let mut map = RecordingMap::default();
        let outcome = controller()
            .zoom_to_filter(&mut map, &filtered("aanduiding = 'nothing'"))
            .await
            .expect("zoom");
        assert_eq!(outcome, ZoomOutcome::EmptyResult);
        assert!(map.zooms.is_empty());
        assert_eq!(map.removed, vec![LayerId(1)]);
    }

    #[tokio::test]
    async fn missing_protocol_adds_no_layer() {
        let mut map = RecordingMap::default();
        let mut record = filtered("aanduiding = 'x'");
        record.name = "geo:unknown".into();
        let err = controller()
            .zoom_to_filter(&mut map, &record)
            .await
            .expect_err("no protocol");
        assert!(matches!(err, FilterZoomError::ProtocolUnavailable { .. }));
        assert!(map.added.is_empty());
        assert!(map.removed.is_empty());

        let mut other_source = filtered("aanduiding = 'x'");
        other_source.source = "elsewhere".into();
        assert!(
            controller()
                .zoom_to_filter(&mut map, &other_source)
                .await
                .is_err()
        );
        assert!(map.added.is_empty());
    }

    #[tokio::test]
    async fn unfiltered_or_unparsable_layers_do_nothing() {
        let mut map = RecordingMap::default();
        let plain = LayerRecord::new("intranet", "geo:lki_perceel");
        assert_eq!(
            controller().zoom_to_filter(&mut map, &plain).await.expect("ok"),
            ZoomOutcome::NoFilter
        );

        let err = controller()
            .zoom_to_filter(&mut map, &filtered("aanduiding = "))
            .await
            .expect_err("invalid");
        assert!(matches!(err, FilterZoomError::InvalidFilter(_)));
        assert!(map.added.is_empty());
    }
}
