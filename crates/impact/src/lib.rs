//! Impact reporting: how much of the storefront's proceeds reached each route.

pub mod summary;

pub use summary::{ImpactSummary, RouteBreakdown, percentage_of, summarize};
