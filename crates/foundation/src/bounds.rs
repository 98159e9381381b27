use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Axis-aligned 2D extent in map units.
///
/// Serialized as the `[minx, miny, maxx, maxy]` tuple used by map
/// configurations and bbox query parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Extent {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtentParseError {
    WrongArity(usize),
    InvalidNumber(String),
}

impl std::fmt::Display for ExtentParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtentParseError::WrongArity(n) => write!(f, "expected 4 coordinates, got {n}"),
            ExtentParseError::InvalidNumber(s) => write!(f, "invalid coordinate: {s:?}"),
        }
    }
}

impl std::error::Error for ExtentParseError {}

impl Extent {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Extent { min, max }
    }

    pub fn from_bounds(bounds: [f64; 4]) -> Self {
        Extent {
            min: [bounds[0], bounds[1]],
            max: [bounds[2], bounds[3]],
        }
    }

    /// Degenerate extent covering a single point.
    pub fn from_point(p: [f64; 2]) -> Self {
        Extent { min: p, max: p }
    }

    pub fn to_bounds(self) -> [f64; 4] {
        [self.min[0], self.min[1], self.max[0], self.max[1]]
    }

    /// Parses `"minx,miny,maxx,maxy"`; whitespace around commas is ignored.
    pub fn parse_list(s: &str) -> Result<Self, ExtentParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(ExtentParseError::WrongArity(parts.len()));
        }
        let mut bounds = [0.0; 4];
        for (slot, part) in bounds.iter_mut().zip(&parts) {
            *slot = part
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| ExtentParseError::InvalidNumber(part.to_string()))?;
        }
        Ok(Extent::from_bounds(bounds))
    }

    pub fn expand_to_include(&mut self, p: [f64; 2]) {
        self.min[0] = self.min[0].min(p[0]);
        self.min[1] = self.min[1].min(p[1]);
        self.max[0] = self.max[0].max(p[0]);
        self.max[1] = self.max[1].max(p[1]);
    }

    pub fn union(&self, other: &Extent) -> Extent {
        let mut out = *self;
        out.expand_to_include(other.min);
        out.expand_to_include(other.max);
        out
    }

    /// Smallest extent covering every point, `None` when there are none.
    pub fn covering<I>(points: I) -> Option<Extent>
    where
        I: IntoIterator<Item = [f64; 2]>,
    {
        let mut iter = points.into_iter();
        let mut out = Extent::from_point(iter.next()?);
        for p in iter {
            out.expand_to_include(p);
        }
        Some(out)
    }
}

impl Serialize for Extent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_bounds().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Extent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <[f64; 4]>::deserialize(deserializer).map(Extent::from_bounds)
    }
}
