use std::collections::BTreeMap;

use viewstate::LayerRef;

/// WMS request parameter carrying a layer's CQL filter.
pub const CQL_FILTER_PARAM: &str = "CQL_FILTER";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LayerId(pub u64);

/// A layer as the live map knows it: where it comes from and the request
/// parameters it is drawn with.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRecord {
    pub source: String,
    pub name: String,
    pub title: Option<String>,
    pub params: BTreeMap<String, String>,
}

impl LayerRecord {
    pub fn new(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
            title: None,
            params: BTreeMap::new(),
        }
    }

    pub fn from_layer_ref(layer: &LayerRef) -> Self {
        let mut record = Self::new(layer.source.clone(), layer.name.clone());
        record.title = layer.title.clone();
        if let Some(filter) = &layer.cql_filter {
            record
                .params
                .insert(CQL_FILTER_PARAM.to_string(), filter.clone());
        }
        record
    }

    /// The layer's CQL filter, ignoring blank values.
    pub fn cql_filter(&self) -> Option<&str> {
        self.params
            .get(CQL_FILTER_PARAM)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::LayerRecord;
    use viewstate::LayerRef;

    #[test]
    fn carries_filter_as_request_param() {
        let mut layer = LayerRef::new("intranet", "geo:lki_perceel");
        layer.cql_filter = Some("aanduiding = 'ZDM01E01354'".into());
        let record = LayerRecord::from_layer_ref(&layer);
        assert_eq!(record.cql_filter(), Some("aanduiding = 'ZDM01E01354'"));

        let plain = LayerRecord::from_layer_ref(&LayerRef::new("local", "roads"));
        assert_eq!(plain.cql_filter(), None);
    }

    #[test]
    fn blank_filter_counts_as_absent() {
        let mut record = LayerRecord::new("local", "roads");
        record
            .params
            .insert(super::CQL_FILTER_PARAM.into(), "   ".into());
        assert_eq!(record.cql_filter(), None);
    }
}
