//! Read-by-id access to map configurations persisted server-side.

pub mod error;
pub mod http;
pub mod loader;
pub mod store;

pub use error::*;
pub use http::*;
pub use loader::*;
pub use store::*;
