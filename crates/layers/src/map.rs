use foundation::Extent;
use runtime::BoxFuture;
use viewstate::Viewport;

use crate::cql::Filter;
use crate::feature::Feature;
use crate::layer::LayerId;
use crate::protocol::{FeatureQuery, ProtocolDescriptor};

pub const TRANSIENT_LAYER_NAME: &str = "CQLRESULT";

/// Short-lived vector layer, created only to learn the extent of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct TransientLayer {
    pub name: String,
    pub display_in_layer_switcher: bool,
    pub query: FeatureQuery,
}

impl TransientLayer {
    pub fn for_filter(protocol: ProtocolDescriptor, filter: Filter) -> Self {
        Self {
            name: TRANSIENT_LAYER_NAME.to_string(),
            display_in_layer_switcher: false,
            query: FeatureQuery::geometry_only(protocol, filter),
        }
    }
}

/// First load completion of a vector layer. `features` is empty when the
/// query matched nothing or the load failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadEnd {
    pub features: Vec<Feature>,
}

/// The live map as seen by code that adds and removes layers.
pub trait MapSurface {
    fn add_layer(&mut self, layer: TransientLayer) -> LayerId;

    /// Returns `false` if the layer was not on the map.
    fn remove_layer(&mut self, id: LayerId) -> bool;

    fn zoom_to_extent(&mut self, extent: Extent);

    /// Resolves on the layer's first load completion.
    fn load_end(&mut self, id: LayerId) -> BoxFuture<'static, LoadEnd>;

    fn viewport(&self) -> Option<Viewport>;
}
