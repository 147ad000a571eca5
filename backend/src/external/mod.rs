//! External API integrations

pub mod farm_registry;
pub mod variety_catalog;

pub use farm_registry::{FarmProfile, FarmRegistry, FarmRegistryClient};
pub use variety_catalog::{VarietyCatalog, VarietyCatalogClient, VarietyInfo};
