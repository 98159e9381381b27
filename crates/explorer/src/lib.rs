//! Viewer startup: picks how the initial map configuration is resolved from
//! the page location and runs the application shell around it.

pub mod app;
pub mod resolver;
pub mod settings;
pub mod strategy;
pub mod tools;

pub use app::*;
pub use resolver::*;
pub use settings::*;
pub use strategy::*;
pub use tools::*;
