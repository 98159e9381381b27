use std::sync::Arc;

use foundation::MapId;
use runtime::BoxFuture;
use serde_json::Value;
use tracing::{info, warn};
use viewstate::{DecodeError, ViewConfig, codec};

use crate::error::{LoadError, TransportError};
use crate::store::{MapResponse, MapStore};

/// Result of resolving the startup configuration.
pub enum ResolutionOutcome {
    Immediate(ViewConfig),
    /// A persisted configuration is on its way; initialization waits for it.
    Pending(PendingLoad),
    /// Loading failed. The viewer starts from `fallback` and reports
    /// `error` once ready.
    Failed {
        error: LoadError,
        fallback: ViewConfig,
    },
}

/// In-flight load of a persisted configuration. Not cancellable.
pub struct PendingLoad {
    id: MapId,
    future: BoxFuture<'static, ResolutionOutcome>,
}

impl PendingLoad {
    pub fn id(&self) -> MapId {
        self.id
    }

    /// Waits for the fetch to finish.
    pub async fn wait(self) -> ResolutionOutcome {
        self.future.await
    }
}

impl std::fmt::Debug for PendingLoad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingLoad").field("id", &self.id).finish()
    }
}

impl std::fmt::Debug for ResolutionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionOutcome::Immediate(config) => {
                f.debug_tuple("Immediate").field(config).finish()
            }
            ResolutionOutcome::Pending(pending) => f.debug_tuple("Pending").field(pending).finish(),
            ResolutionOutcome::Failed { error, .. } => {
                f.debug_struct("Failed").field("error", error).finish()
            }
        }
    }
}

impl ResolutionOutcome {
    /// Waits until the outcome is no longer pending.
    pub async fn settle(self) -> ResolutionOutcome {
        let mut outcome = self;
        while let ResolutionOutcome::Pending(pending) = outcome {
            outcome = pending.wait().await;
        }
        outcome
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ResolutionOutcome::Pending(_))
    }
}

/// Loads configurations saved under an integer id.
#[derive(Debug)]
pub struct PersistedConfigLoader<S> {
    store: Arc<S>,
}

impl<S> Clone for PersistedConfigLoader<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: MapStore + 'static> PersistedConfigLoader<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Starts loading map `id`, merged over `base`.
    ///
    /// The persisted document wins for every top-level field it names,
    /// except that its `tools` are dropped and `map.controls` always come from
    /// `base`. Failures degrade to `base` itself.
    pub fn load_by_id(&self, id: MapId, base: ViewConfig) -> ResolutionOutcome {
        let store = Arc::clone(&self.store);
        info!(%id, "loading persisted map configuration");
        let future = async move {
            let response = store.fetch(id).await;
            settle_response(id, response, base)
        };
        ResolutionOutcome::Pending(PendingLoad {
            id,
            future: Box::pin(future),
        })
    }
}

fn settle_response(
    id: MapId,
    response: Result<MapResponse, TransportError>,
    base: ViewConfig,
) -> ResolutionOutcome {
    let error = match response {
        Ok(resp) if resp.is_success() => match merge_persisted(&resp.body, &base) {
            Ok(config) => {
                info!(%id, layers = config.map.layers.len(), "persisted map loaded");
                return ResolutionOutcome::Immediate(config);
            }
            Err(source) => LoadError::Decode {
                status: resp.status,
                source,
            },
        },
        Ok(resp) => LoadError::Server {
            status: resp.status,
            message: server_error_message(&resp.body),
        },
        Err(e) => LoadError::Transport(e),
    };
    warn!(%id, error = %error, "persisted map unavailable, using defaults");
    ResolutionOutcome::Failed {
        error,
        fallback: base,
    }
}

fn merge_persisted(body: &str, base: &ViewConfig) -> Result<ViewConfig, DecodeError> {
    let mut persisted = codec::parse_object(body)?;
    // Tool configuration from old saved maps never overrides the current set.
    persisted.remove("tools");
    let mut config = base.filled_into(persisted)?;
    config.map.controls = base.map.controls.clone();
    Ok(config)
}

/// The `error` field of a JSON error body, if there is one.
fn server_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryMapStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use viewstate::{LayerRef, ToolDescriptor};

    struct FixedStore(Result<MapResponse, String>);

    impl MapStore for FixedStore {
        fn fetch(&self, _id: MapId) -> BoxFuture<'_, Result<MapResponse, TransportError>> {
            let result = self.0.clone().map_err(TransportError::new);
            Box::pin(async move { result })
        }
    }

    fn base() -> ViewConfig {
        let mut base = ViewConfig::default();
        base.map.projection = Some("EPSG:900913".into());
        base.map.controls = Some(json!([{"ptype": "zoom"}]));
        base.map.layers.push(LayerRef::new("local", "base:osm"));
        base
    }

    #[tokio::test]
    async fn persisted_fields_overlay_base_without_tools_or_controls() {
        let mut store = InMemoryMapStore::new();
        store.insert(
            MapId::new(42),
            json!({
                "map": {
                    "layers": [{"source": "local", "name": "parks"}],
                    "controls": [{"ptype": "evil"}],
                    "zoom": 7,
                    "center": [10.0, 20.0]
                },
                "tools": [{"ptype": "gxp_legacy"}],
                "about": {"title": "Parks"}
            }),
        );
        let loader = PersistedConfigLoader::new(store);

        let outcome = loader.load_by_id(MapId::new(42), base());
        assert!(outcome.is_pending());

        let ResolutionOutcome::Immediate(config) = outcome.settle().await else {
            panic!("expected a loaded configuration");
        };
        assert!(config.tools.is_empty());
        assert_eq!(config.map.controls, base().map.controls);
        assert_eq!(config.map.layers, vec![LayerRef::new("local", "parks")]);
        assert_eq!(config.map.zoom, Some(7));
        // The persisted map replaces the base map wholesale.
        assert_eq!(config.map.projection, None);
        assert_eq!(config.extra["about"]["title"], json!("Parks"));
    }

    #[tokio::test]
    async fn current_tool_set_survives_a_persisted_load() {
        let mut with_tools = base();
        with_tools.tools.push(ToolDescriptor::new("gxp_navigation"));
        let loader = PersistedConfigLoader::new(FixedStore(Ok(MapResponse {
            status: 200,
            body: json!({"map": {"layers": []}, "tools": [{"ptype": "gxp_legacy"}]})
                .to_string(),
        })));

        let ResolutionOutcome::Immediate(config) =
            loader.load_by_id(MapId::new(1), with_tools).settle().await
        else {
            panic!("expected a loaded configuration");
        };
        assert_eq!(config.tools, vec![ToolDescriptor::new("gxp_navigation")]);
    }

    #[tokio::test]
    async fn server_error_message_is_surfaced() {
        let loader = PersistedConfigLoader::new(InMemoryMapStore::new());
        let outcome = loader.load_by_id(MapId::new(42), base()).settle().await;

        let ResolutionOutcome::Failed { error, fallback } = outcome else {
            panic!("expected failure");
        };
        assert_eq!(error.status(), 404);
        assert!(error.notice().message.contains("no such map"));
        assert_eq!(fallback, base());
    }

    #[tokio::test]
    async fn non_json_error_body_gets_generic_message() {
        let loader = PersistedConfigLoader::new(FixedStore(Ok(MapResponse {
            status: 500,
            body: "<html>Internal Server Error</html>".into(),
        })));
        let ResolutionOutcome::Failed { error, .. } =
            loader.load_by_id(MapId::new(3), base()).settle().await
        else {
            panic!("expected failure");
        };
        assert_eq!(
            error.notice().message,
            "Trouble reading saved configuration: Server Error."
        );
    }

    #[tokio::test]
    async fn transport_and_decode_failures_fall_back() {
        let loader = PersistedConfigLoader::new(FixedStore(Err("connection refused".into())));
        let outcome = loader.load_by_id(MapId::new(3), base()).settle().await;
        assert!(matches!(
            outcome,
            ResolutionOutcome::Failed {
                error: LoadError::Transport(_),
                ..
            }
        ));

        let loader = PersistedConfigLoader::new(FixedStore(Ok(MapResponse {
            status: 200,
            body: "{\"map\": ".into(),
        })));
        let outcome = loader.load_by_id(MapId::new(3), base()).settle().await;
        assert!(matches!(
            outcome,
            ResolutionOutcome::Failed {
                error: LoadError::Decode { status: 200, .. },
                ..
            }
        ));
    }
}
