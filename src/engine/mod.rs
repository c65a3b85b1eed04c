//! Routing engine.
//!
//! Orchestrates matching, consent evaluation, sampling and group
//! resolution into a `RoutingResult`, and exposes the explainability
//! reporter built on top of the same evaluation path.

pub mod explain;
pub mod router;

pub use explain::{ExplainReport, RuleExplanation};
pub use router::{AppliedRule, RoutingEngine, RoutingResult, SkippedRule, NO_RULES_MATCHED_WARNING};
