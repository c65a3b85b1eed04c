//! SignalRoute Core - consent-aware analytics event routing engine
//!
//! This crate decides *which* analytics trackers should receive an
//! application event and *why*, based on a declarative, priority-ordered
//! rule set. It prioritizes:
//!
//! 1. **Safety** - all configuration problems fail fast at build time;
//!    routing itself can never crash the host application
//! 2. **Explainability** - every decision carries a reason and is logged
//! 3. **Privacy** - consent requirements and PII flags are first-class
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `model` - events, rules, tracker groups and the validated configuration
//! - `matching` - pure predicate evaluation with non-match reasons
//! - `sampling` - uniform / deterministic / bucketed / adaptive strategies
//! - `consent` - consent state and rule requirement checks
//! - `engine` - routing orchestration and the explainability reporter
//! - `logging` - structured logging with engine/event context
//!
//! Dispatching events to the resolved tracker ids (networking, retries,
//! batching) is deliberately out of scope: the engine returns a
//! [`RoutingResult`] and the dispatch layer takes it from there.
//!
//! ## Example
//!
//! ```
//! use std::collections::BTreeSet;
//! use signalroute_core::{
//!     ConsentState, EventDescriptor, RoutingConfiguration, RoutingEngine, RoutingRule,
//! };
//!
//! let config = RoutingConfiguration::builder()
//!     .rule(
//!         RoutingRule::builder()
//!             .id("pii-to-secure")
//!             .contains_pii(true)
//!             .require_pii_consent()
//!             .priority(10)
//!             .to(["secure-warehouse"])
//!             .build()?,
//!     )
//!     .group("general", ["ga", "mixpanel"])
//!     .default_group("general")
//!     .build()?;
//!
//! let engine = RoutingEngine::new(config);
//! let event = EventDescriptor::new("profile_saved").with_pii(true);
//! let available: BTreeSet<String> =
//!     ["secure-warehouse", "ga"].iter().map(|s| s.to_string()).collect();
//!
//! let result = engine.route_event(&event, &ConsentState::full(), &available);
//! assert!(result.target_trackers.contains("secure-warehouse"));
//! # Ok::<(), signalroute_core::ConfigurationError>(())
//! ```

pub mod consent;
pub mod engine;
pub mod logging;
pub mod matching;
pub mod model;
pub mod sampling;

pub use consent::{ConsentDecision, ConsentState};
pub use engine::{
    AppliedRule, ExplainReport, RoutingEngine, RoutingResult, RuleExplanation, SkippedRule,
    NO_RULES_MATCHED_WARNING,
};
pub use logging::{init_logging, LogContext};
pub use matching::{match_rule, MatchOutcome};
pub use model::{
    ConfigurationError, Environment, EventDescriptor, EventKind, NameRegex, PropertyValue,
    RoutingConfiguration, RoutingConfigurationBuilder, RoutingRule, RuleBuilder, RulePredicate,
    SamplingMode, TrackerGroup,
};
pub use sampling::{AdaptiveSampler, SamplingEngine};
