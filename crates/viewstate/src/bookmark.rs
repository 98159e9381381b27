use tracing::debug;
use url::form_urlencoded;

use crate::codec;
use crate::location::Location;
use crate::model::ViewConfig;

/// Shareable absolute URL for `state`.
///
/// The fragment is dropped, existing query parameters are kept (any `q` is
/// replaced) and the encoded state is appended as `q`.
pub fn bookmark_url(location: &Location, state: &ViewConfig) -> String {
    let mut params = form_urlencoded::Serializer::new(String::new());
    for (key, value) in location.query.iter().filter(|(k, _)| k != "q") {
        params.append_pair(key, value);
    }
    let mut query = params.finish();
    if !query.is_empty() {
        query.push('&');
    }
    query.push_str("q=");
    query.push_str(&codec::encode(state));
    debug!(layers = state.map.layers.len(), len = query.len(), "built bookmark url");
    format!("{}?{}", location.base, query)
}

#[cfg(test)]
mod tests {
    use super::bookmark_url;
    use crate::codec;
    use crate::location::Location;
    use crate::model::{LayerRef, ViewConfig};

    #[test]
    fn keeps_query_drops_hash_and_replaces_q() {
        let loc = Location::parse("http://example.org/viewer/?lang=nl&q=%7B%7D#maps/7")
            .expect("location");
        let mut state = ViewConfig::default();
        state.map.layers.push(LayerRef::new("local", "parks"));
        state.map.set_viewport(Some([1.0, 2.0]), Some(4));

        let url = bookmark_url(&loc, &state);
        assert!(url.starts_with("http://example.org/viewer/?lang=nl&q="));
        assert!(!url.contains('#'));
        assert_eq!(url.matches("q=").count(), 1);

        let back = Location::parse(&url).expect("bookmark parses");
        let q = back.query_param("q").expect("q present");
        let decoded: ViewConfig = serde_json::from_str(q).expect("q is JSON");
        assert_eq!(decoded, state);
        assert_eq!(codec::encode(&decoded), codec::encode(&state));
    }
}
