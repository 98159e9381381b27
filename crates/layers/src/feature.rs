use foundation::Extent;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureGeometry {
    Point([f64; 2]),
    MultiPoint(Vec<[f64; 2]>),
    LineString(Vec<[f64; 2]>),
    MultiLineString(Vec<Vec<[f64; 2]>>),
    Polygon(Vec<Vec<[f64; 2]>>),
    MultiPolygon(Vec<Vec<Vec<[f64; 2]>>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    /// `None` for features served without geometry.
    pub geometry: Option<FeatureGeometry>,
}

impl FeatureGeometry {
    pub fn vertices(&self) -> Vec<[f64; 2]> {
        match self {
            FeatureGeometry::Point(p) => vec![*p],
            FeatureGeometry::MultiPoint(ps) | FeatureGeometry::LineString(ps) => ps.clone(),
            FeatureGeometry::MultiLineString(parts) | FeatureGeometry::Polygon(parts) => {
                parts.iter().flatten().copied().collect()
            }
            FeatureGeometry::MultiPolygon(polys) => {
                polys.iter().flatten().flatten().copied().collect()
            }
        }
    }

    pub fn bounds(&self) -> Option<Extent> {
        Extent::covering(self.vertices())
    }
}

/// Extent covering every feature geometry; `None` when nothing has one.
pub fn data_extent(features: &[Feature]) -> Option<Extent> {
    features
        .iter()
        .filter_map(|f| f.geometry.as_ref()?.bounds())
        .reduce(|a, b| a.union(&b))
}
