//! Live map layers: layer records, feature access, CQL filters and
//! zoom-to-filter.

pub mod cql;
pub mod feature;
pub mod filter_zoom;
pub mod layer;
pub mod map;
pub mod protocol;

pub use feature::*;
pub use filter_zoom::*;
pub use layer::*;
pub use map::*;
pub use protocol::*;
