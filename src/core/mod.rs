pub mod comparator;
pub mod filter;
pub mod matcher;
pub mod planner;

pub use comparator::{ComparisonEngine, Decision, Outcome, SideState, Verdict};
pub use filter::FilterEngine;
pub use matcher::{validate_pattern, TraversalPlan};
pub use planner::{PlanStatus, PlanSummary, SyncPlan, SyncPlanner};
