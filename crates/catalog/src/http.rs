use std::time::Duration;

use foundation::MapId;
use reqwest::header::ACCEPT;
use runtime::BoxFuture;
use tracing::debug;
use url::Url;

use crate::error::TransportError;
use crate::store::{MapResponse, MapStore};

/// Map store reached over HTTP at `<base_url>/maps/<id>`.
#[derive(Debug, Clone)]
pub struct HttpMapStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpMapStore {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::with_source("failed to build HTTP client", e))?;
        Ok(Self {
            client,
            base_url: with_trailing_slash(base_url),
        })
    }

    pub fn map_url(&self, id: MapId) -> Result<Url, TransportError> {
        self.base_url
            .join(&format!("maps/{id}"))
            .map_err(|e| TransportError::with_source(format!("invalid map url for {id}"), e))
    }
}

// `Url::join` replaces the last path segment unless the base ends in '/'.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

impl MapStore for HttpMapStore {
    fn fetch(&self, id: MapId) -> BoxFuture<'_, Result<MapResponse, TransportError>> {
        Box::pin(async move {
            let url = self.map_url(id)?;
            debug!(%url, "fetching persisted map");
            let resp = self
                .client
                .get(url.clone())
                .header(ACCEPT, "application/json")
                .send()
                .await
                .map_err(|e| TransportError::with_source(format!("GET {url} failed"), e))?;
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .map_err(|e| TransportError::with_source(format!("reading {url} failed"), e))?;
            Ok(MapResponse { status, body })
        })
    }
}
