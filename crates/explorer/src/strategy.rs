use std::sync::OnceLock;

use foundation::MapId;
use regex::Regex;
use viewstate::Location;

const BOOKMARK_MARKER: &str = "q=";
const FILTER_MARKER: &str = "filter=";

/// Standard query parameters that configure the initial view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    /// JSON partial view configuration.
    pub q: Option<String>,
    /// Comma-separated names of local layers to add.
    pub layers: Option<String>,
    pub bbox: Option<String>,
    pub lazy: Option<String>,
}

impl QueryParams {
    pub fn from_location(location: &Location) -> Self {
        let param = |key: &str| location.query_param(key).map(str::to_string);
        Self {
            q: param("q"),
            layers: param("layers"),
            bbox: param("bbox"),
            lazy: param("lazy"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_none() && self.layers.is_none() && self.bbox.is_none() && self.lazy.is_none()
    }

    /// `lazy` counts as set when it has any non-empty value.
    pub fn is_lazy(&self) -> bool {
        self.lazy.as_deref().is_some_and(|v| !v.is_empty())
    }
}

/// How the startup configuration is resolved, in order of precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Fragment is exactly `maps/<id>`.
    PersistedById(MapId),
    /// Fragment carries `q=<escaped view state>`.
    Bookmark(String),
    /// Fragment carries `filter=<escaped layer filter>`.
    AdHocFilter(String),
    PlainQuery(QueryParams),
    Default,
}

fn persisted_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^maps/(\d+)$").ok())
        .as_ref()
}

/// Text between the first occurrence of `marker` and the next one.
fn marker_payload<'a>(fragment: &'a str, marker: &str) -> Option<&'a str> {
    fragment.split(marker).nth(1)
}

impl Strategy {
    pub fn from_location(location: &Location) -> Self {
        let fragment = location.fragment.as_str();

        let persisted = persisted_pattern()
            .and_then(|re| re.captures(fragment))
            .and_then(|caps| caps.get(1)?.as_str().parse::<u64>().ok());
        if let Some(id) = persisted {
            return Strategy::PersistedById(MapId::new(id));
        }
        if let Some(payload) = marker_payload(fragment, BOOKMARK_MARKER) {
            return Strategy::Bookmark(payload.to_string());
        }
        if let Some(payload) = marker_payload(fragment, FILTER_MARKER) {
            return Strategy::AdHocFilter(payload.to_string());
        }

        let query = QueryParams::from_location(location);
        if query.is_empty() {
            Strategy::Default
        } else {
            Strategy::PlainQuery(query)
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::PersistedById(_) => "persisted",
            Strategy::Bookmark(_) => "bookmark",
            Strategy::AdHocFilter(_) => "filter",
            Strategy::PlainQuery(_) => "query",
            Strategy::Default => "default",
        }
    }
}
