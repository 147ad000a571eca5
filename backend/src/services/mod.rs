//! Business logic services for the Paddy Season Planner

pub mod blob_store;
pub mod calendar;
pub mod plan_store;
pub mod season_plan;

pub use blob_store::{BlobStore, LocalBlobStore};
