use crate::model::{ViewConfig, Viewport};

/// Read access to the state of a running viewer.
pub trait LiveView {
    /// Configuration the viewer is running with, including layer changes
    /// made since startup.
    fn live_config(&self) -> &ViewConfig;

    /// Where the map currently looks, when it has been rendered.
    fn live_viewport(&self) -> Option<Viewport>;
}

/// Projects live viewer state into the shareable form.
pub struct StateSerializer;

impl StateSerializer {
    /// Detached copy of the live state, without tools. The current viewport,
    /// when known, replaces whatever framing the configuration started with.
    pub fn snapshot(live: &impl LiveView) -> ViewConfig {
        let mut state = live.live_config().clone().without_tools();
        if let Some(viewport) = live.live_viewport() {
            state
                .map
                .set_viewport(Some(viewport.center), Some(viewport.zoom));
        }
        state
    }
}
