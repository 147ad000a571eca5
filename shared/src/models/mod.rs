//! Domain models for the Paddy Season Planner

mod fertilizer;
mod growing_stage;
mod remark;
mod season_plan;

pub use fertilizer::*;
pub use growing_stage::*;
pub use remark::*;
pub use season_plan::*;
