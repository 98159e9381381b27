use catalog::{MapStore, Notice, ResolutionOutcome};
use foundation::MapId;
use layers::{FilterZoomController, FilterZoomError, LayerRecord, MapSurface, ZoomOutcome};
use runtime::EventBus;
use tracing::{error, info, warn};
use viewstate::{
    LiveView, Location, LocationProvider, StateSerializer, ViewConfig, Viewport, bookmark_url,
};

use crate::resolver::{ConfigResolver, FilterZoomSubscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initialized,
    Ready,
}

/// Running viewer: the resolved configuration, the live map and the
/// lifecycle around them.
pub struct Explorer<M> {
    map: M,
    location: Location,
    config: ViewConfig,
    map_id: Option<MapId>,
    phase: Phase,
    deferred_notices: Vec<Notice>,
    filter_zoom: Option<FilterZoomSubscription>,
    zoomer: FilterZoomController,
    events: EventBus,
}

impl<M: MapSurface> Explorer<M> {
    /// Resolves the startup configuration and initializes once it settles.
    ///
    /// A persisted map load holds initialization until it completes. A
    /// failed load starts from `base` and queues a notice for [`ready`].
    ///
    /// [`ready`]: Explorer::ready
    pub async fn start<S: MapStore + 'static>(
        resolver: &ConfigResolver<S>,
        location: &impl LocationProvider,
        base: ViewConfig,
        map: M,
        zoomer: FilterZoomController,
    ) -> Self {
        let location = location.location();
        let mut events = EventBus::new();
        let resolution = resolver.resolve(&location, base);
        events.emit("resolve", resolution.strategy.name());

        let mut map_id = None;
        let mut deferred_notices = Vec::new();
        let mut outcome = resolution.outcome;
        let config = loop {
            match outcome {
                ResolutionOutcome::Immediate(config) => break config,
                ResolutionOutcome::Pending(pending) => {
                    map_id = Some(pending.id());
                    events.emit("pending", format!("maps/{}", pending.id()));
                    outcome = pending.wait().await;
                }
                ResolutionOutcome::Failed { error, fallback } => {
                    // The id is forgotten so the viewer behaves as an unsaved map.
                    map_id = None;
                    events.emit("load_failed", error.to_string());
                    deferred_notices.push(error.notice());
                    break fallback;
                }
            }
        };

        info!(
            layers = config.map.layers.len(),
            map_id = ?map_id,
            "viewer initialized"
        );
        events.emit("initialized", format!("{} layers", config.map.layers.len()));

        Self {
            map,
            location,
            config,
            map_id,
            phase: Phase::Initialized,
            deferred_notices,
            filter_zoom: resolution.filter_zoom,
            zoomer,
            events,
        }
    }

    /// Marks the viewer ready and returns the notices held back until now.
    /// Later calls return nothing.
    pub fn ready(&mut self) -> Vec<Notice> {
        if self.phase == Phase::Ready {
            return Vec::new();
        }
        self.phase = Phase::Ready;
        self.events.emit("ready", "");
        let notices = std::mem::take(&mut self.deferred_notices);
        for notice in &notices {
            warn!(title = %notice.title, message = %notice.message, "showing notice");
            self.events.emit("notice", notice.message.clone());
        }
        notices
    }

    /// Reacts to a change of the selected layer.
    ///
    /// Only the first change after an ad-hoc filter startup zooms to the
    /// filter; afterwards this returns `None`.
    pub async fn layer_selection_changed(
        &mut self,
        record: LayerRecord,
    ) -> Option<Result<ZoomOutcome, FilterZoomError>> {
        let record = self.filter_zoom.as_mut()?.fire(record)?;
        self.filter_zoom = None;

        let result = self.zoomer.zoom_to_filter(&mut self.map, &record).await;
        match &result {
            Ok(outcome) => self.events.emit("filter_zoom", format!("{outcome:?}")),
            Err(e) => {
                error!(error = %e, "zoom to filter failed");
                self.events.emit("filter_zoom_failed", e.to_string());
            }
        }
        Some(result)
    }

    /// Shareable URL reproducing the current view.
    pub fn bookmark(&self) -> String {
        bookmark_url(&self.location, &StateSerializer::snapshot(self))
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ViewConfig {
        &mut self.config
    }

    pub fn map_id(&self) -> Option<MapId> {
        self.map_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn awaits_filter_zoom(&self) -> bool {
        self.filter_zoom.as_ref().is_some_and(|s| s.is_active())
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn map(&self) -> &M {
        &self.map
    }
}

impl<M: MapSurface> LiveView for Explorer<M> {
    fn live_config(&self) -> &ViewConfig {
        &self.config
    }

    fn live_viewport(&self) -> Option<Viewport> {
        self.map.viewport()
    }
}
