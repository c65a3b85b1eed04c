//! Routing data model.
//!
//! Immutable value types shared by the whole engine:
//! - `event` - events as submitted by the application
//! - `rule` - routing rules, predicates and tracker groups
//! - `config` - the validated rule collection plus global toggles

pub mod config;
pub mod event;
pub mod rule;

pub use config::{ConfigurationError, RoutingConfiguration, RoutingConfigurationBuilder};
pub use event::{EventDescriptor, EventKind, PropertyValue};
pub use rule::{Environment, NameRegex, RoutingRule, RuleBuilder, RulePredicate, SamplingMode, TrackerGroup};
