//! Shared types and scheduling engine for the Paddy Season Planner
//!
//! This crate holds the season-plan data model together with the pure
//! computations that operate on it: baseline schedule generation, leaf color
//! chart adjustments, implementation tracking and the daily remark log.
//! Nothing in here performs I/O, so the same code runs in the backend and,
//! through the WASM bindings, in the browser.

pub mod error;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod lcc;
pub mod models;
pub mod remarks;
pub mod schedule;
pub mod tracker;
pub mod types;
pub mod validation;

pub use error::*;
pub use lcc::*;
pub use models::*;
pub use schedule::*;
pub use tracker::*;
pub use types::*;
pub use validation::*;
