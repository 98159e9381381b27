use catalog::{MapStore, PersistedConfigLoader, ResolutionOutcome};
use foundation::Extent;
use layers::LayerRecord;
use runtime::OnceSubscription;
use serde::Deserialize;
use tracing::{debug, info, warn};
use viewstate::{LOCAL_SOURCE, LayerRef, LocationProvider, ViewConfig, codec};

use crate::strategy::{QueryParams, Strategy};

/// One-shot reaction to the first layer selection change. Fires with the
/// selected layer and hands it back for zooming.
pub type FilterZoomSubscription = OnceSubscription<LayerRecord, LayerRecord>;

/// Startup configuration together with how it was arrived at.
#[derive(Debug)]
pub struct Resolution {
    pub strategy: Strategy,
    pub outcome: ResolutionOutcome,
    /// Registered only by the ad-hoc filter strategy.
    pub filter_zoom: Option<FilterZoomSubscription>,
}

/// Picks exactly one resolution strategy for the page location and applies
/// it to the caller's base configuration.
#[derive(Debug, Clone)]
pub struct ConfigResolver<S> {
    loader: PersistedConfigLoader<S>,
}

impl<S: MapStore + 'static> ConfigResolver<S> {
    pub fn new(loader: PersistedConfigLoader<S>) -> Self {
        Self { loader }
    }

    pub fn resolve(&self, location: &impl LocationProvider, base: ViewConfig) -> Resolution {
        let strategy = Strategy::from_location(&location.location());
        info!(strategy = strategy.name(), "resolving startup configuration");

        let mut filter_zoom = None;
        let outcome = match &strategy {
            Strategy::PersistedById(id) => self.loader.load_by_id(*id, base),
            Strategy::Bookmark(payload) => {
                ResolutionOutcome::Immediate(apply_bookmark(base, payload))
            }
            Strategy::AdHocFilter(payload) => {
                let (config, subscription) = apply_filter(base, payload);
                filter_zoom = subscription;
                ResolutionOutcome::Immediate(config)
            }
            Strategy::PlainQuery(params) => ResolutionOutcome::Immediate(apply_query(base, params)),
            Strategy::Default => ResolutionOutcome::Immediate(base),
        };

        Resolution {
            strategy,
            outcome,
            filter_zoom,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BookmarkedView {
    map: BookmarkedMap,
}

#[derive(Debug, Deserialize)]
struct BookmarkedMap {
    #[serde(default)]
    layers: Vec<LayerRef>,
    #[serde(default)]
    zoom: Option<u32>,
    #[serde(default)]
    center: Option<[f64; 2]>,
}

/// Copies only layers, zoom and center from the bookmarked state.
pub fn apply_bookmark(mut base: ViewConfig, payload: &str) -> ViewConfig {
    let bookmark: BookmarkedView = match codec::decode_as(payload) {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "ignoring malformed bookmark");
            return base;
        }
    };
    let map = bookmark.map;
    debug!(layers = map.layers.len(), "applying bookmark");
    base.map.layers = map.layers;
    base.map.set_viewport(map.center, map.zoom);
    base
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterRequest {
    source: String,
    name: String,
    #[serde(default, alias = "cql_filter")]
    cql_filter: Option<String>,
}

/// Appends the filtered layer as selected and registers the one-shot zoom.
pub fn apply_filter(
    mut base: ViewConfig,
    payload: &str,
) -> (ViewConfig, Option<FilterZoomSubscription>) {
    let request: FilterRequest = match codec::decode_as(payload) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "ignoring malformed layer filter");
            return (base, None);
        }
    };
    info!(layer = %request.name, source = %request.source, "adding filtered layer");

    let mut layer = LayerRef::new(request.source, request.name);
    layer.cql_filter = request.cql_filter;
    layer.selected = true;
    base.map.layers.push(layer);

    let subscription = OnceSubscription::new(|record: LayerRecord| {
        debug!(layer = %record.name, "first layer selection, zooming to filter");
        record
    });
    (base, Some(subscription))
}

/// Applies the `q`, `layers`, `bbox` and `lazy` query parameters.
pub fn apply_query(mut base: ViewConfig, params: &QueryParams) -> ViewConfig {
    if let Some(q) = &params.q {
        match codec::parse_object(q).and_then(|overlay| base.overlaid_with(overlay)) {
            Ok(merged) => base = merged,
            Err(e) => warn!(error = %e, "ignoring malformed q parameter"),
        }
    }

    let bbox = params.bbox.as_deref().and_then(|raw| {
        Extent::parse_list(raw)
            .inspect_err(|e| warn!(bbox = raw, error = %e, "ignoring malformed bbox"))
            .ok()
    });
    let lazy = params.is_lazy();

    if let Some(names) = &params.layers {
        for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let mut layer = LayerRef::new(LOCAL_SOURCE, name);
            if lazy {
                layer.bbox = bbox;
            }
            base.map.layers.push(layer);
        }
    }
    if let Some(extent) = bbox {
        base.map.set_extent(extent);
    }
    if lazy {
        if let Some(local) = base.sources.get_mut(LOCAL_SOURCE) {
            local.required_properties = Some(Vec::new());
        }
    }
    base
}
