use std::collections::HashMap;

use runtime::BoxFuture;
use url::Url;

use crate::cql::Filter;
use crate::layer::LayerRecord;

pub const DEFAULT_MAX_FEATURES: u32 = 100;
pub const DEFAULT_OUTPUT_FORMAT: &str = "JSON";

/// How to query the features behind a layer (a WFS endpoint and type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolDescriptor {
    pub url: String,
    pub version: String,
    pub feature_type: String,
    pub geometry_name: String,
    pub srs_name: Option<String>,
}

/// Feature-access collaborator: produces a protocol descriptor for a layer,
/// or `None` when the source cannot serve its features.
pub trait FeatureSource: Send + Sync {
    fn protocol_descriptor<'a>(
        &'a self,
        record: &'a LayerRecord,
    ) -> BoxFuture<'a, Option<ProtocolDescriptor>>;
}

/// Feature source answering from a fixed table keyed by layer name.
#[derive(Debug, Default)]
pub struct DescriptorTable {
    descriptors: HashMap<String, ProtocolDescriptor>,
}

impl DescriptorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, layer_name: impl Into<String>, descriptor: ProtocolDescriptor) {
        self.descriptors.insert(layer_name.into(), descriptor);
    }
}

impl FeatureSource for DescriptorTable {
    fn protocol_descriptor<'a>(
        &'a self,
        record: &'a LayerRecord,
    ) -> BoxFuture<'a, Option<ProtocolDescriptor>> {
        let found = self.descriptors.get(&record.name).cloned();
        Box::pin(async move { found })
    }
}

/// A filtered feature query that only asks for geometries.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureQuery {
    pub protocol: ProtocolDescriptor,
    pub filter: Filter,
    pub feature_prefix: String,
    pub output_format: String,
    pub max_features: u32,
    pub property_names: Vec<String>,
}

impl FeatureQuery {
    pub fn geometry_only(protocol: ProtocolDescriptor, filter: Filter) -> Self {
        let property_names = vec![protocol.geometry_name.clone()];
        Self {
            protocol,
            filter,
            feature_prefix: String::new(),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            max_features: DEFAULT_MAX_FEATURES,
            property_names,
        }
    }

    fn type_name(&self) -> String {
        if self.feature_prefix.is_empty() {
            self.protocol.feature_type.clone()
        } else {
            format!("{}:{}", self.feature_prefix, self.protocol.feature_type)
        }
    }

    /// Key-value parameters of the WFS `GetFeature` request.
    pub fn get_feature_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("SERVICE".to_string(), "WFS".to_string()),
            ("VERSION".to_string(), self.protocol.version.clone()),
            ("REQUEST".to_string(), "GetFeature".to_string()),
            ("TYPENAME".to_string(), self.type_name()),
            ("OUTPUTFORMAT".to_string(), self.output_format.clone()),
            ("MAXFEATURES".to_string(), self.max_features.to_string()),
            ("PROPERTYNAME".to_string(), self.property_names.join(",")),
            ("CQL_FILTER".to_string(), self.filter.to_string()),
        ];
        if let Some(srs) = &self.protocol.srs_name {
            params.push(("SRSNAME".to_string(), srs.clone()));
        }
        params
    }

    pub fn request_url(&self) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.protocol.url)?;
        url.query_pairs_mut().extend_pairs(self.get_feature_params());
        Ok(url)
    }
}
