use std::collections::BTreeMap;

use foundation::MapId;
use runtime::BoxFuture;
use serde_json::{Value, json};

use crate::error::TransportError;

/// Raw answer to `GET maps/<id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapResponse {
    pub status: u16,
    pub body: String,
}

impl MapResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Read side of the configuration store.
///
/// Implementations issue exactly one request per call and never retry;
/// timeouts belong to the transport.
pub trait MapStore: Send + Sync {
    fn fetch(&self, id: MapId) -> BoxFuture<'_, Result<MapResponse, TransportError>>;
}

/// Store backed by a map of JSON documents. Unknown ids answer 404 with an
/// `error` body, like the persistence server does.
#[derive(Debug, Default)]
pub struct InMemoryMapStore {
    maps: BTreeMap<MapId, Value>,
}

impl InMemoryMapStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: MapId, config: Value) {
        self.maps.insert(id, config);
    }
}

impl MapStore for InMemoryMapStore {
    fn fetch(&self, id: MapId) -> BoxFuture<'_, Result<MapResponse, TransportError>> {
        let response = match self.maps.get(&id) {
            Some(config) => MapResponse {
                status: 200,
                body: config.to_string(),
            },
            None => MapResponse {
                status: 404,
                body: json!({ "error": "no such map" }).to_string(),
            },
        };
        Box::pin(async move { Ok(response) })
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryMapStore, MapStore};
    use foundation::MapId;
    use serde_json::json;

    #[tokio::test]
    async fn answers_known_and_unknown_ids() {
        let mut store = InMemoryMapStore::new();
        store.insert(MapId::new(1), json!({"map": {"layers": []}}));

        let hit = store.fetch(MapId::new(1)).await.expect("fetch");
        assert!(hit.is_success());

        let miss = store.fetch(MapId::new(2)).await.expect("fetch");
        assert_eq!(miss.status, 404);
        assert!(miss.body.contains("no such map"));
    }
}
