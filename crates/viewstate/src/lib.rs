//! Canonical map view state: the configuration model, its URL-safe codec,
//! live-state snapshots and shareable bookmark URLs.

pub mod bookmark;
pub mod codec;
pub mod location;
pub mod model;
pub mod serializer;

pub use bookmark::*;
pub use codec::*;
pub use location::*;
pub use model::*;
pub use serializer::*;
