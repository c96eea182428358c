//! Core application primitives (runner, wiring, HTTP surface)

pub mod bootstrap;
pub mod http;
pub mod presentation;
pub mod runner;

pub use bootstrap::*;
pub use http::*;
pub use presentation::*;
pub use runner::*;
