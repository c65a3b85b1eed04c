//! Routing rules, predicates and tracker groups.
//!
//! A `RoutingRule` is a set of predicates plus a target group and
//! modifiers (priority, sample rate, consent requirements, environment
//! restriction). Rules are built once through `RuleBuilder` and never
//! mutated afterwards; everything that can fail (regex compilation) fails
//! at build time, never during routing.

use std::fmt;

use regex::Regex;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::model::config::ConfigurationError;
use crate::model::event::{EventKind, PropertyValue};

/// A regex predicate that keeps its source pattern alongside the compiled
/// matcher so rules stay serializable. Compilation happens exactly once,
/// at rule build or deserialization time.
#[derive(Debug, Clone)]
pub struct NameRegex {
    pattern: String,
    regex: Regex,
}

impl NameRegex {
    pub fn new(pattern: &str) -> Result<Self, ConfigurationError> {
        let regex = Regex::new(pattern).map_err(|source| ConfigurationError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Unanchored find: true if the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for NameRegex {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Serialize for NameRegex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.pattern)
    }
}

impl<'de> Deserialize<'de> for NameRegex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pattern = String::deserialize(deserializer)?;
        NameRegex::new(&pattern).map_err(D::Error::custom)
    }
}

/// One predicate of a routing rule. A rule matches an event iff every
/// predicate it carries holds; a rule with no predicates matches every
/// event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulePredicate {
    /// Exact event-kind tag equality.
    Kind(EventKind),
    /// Case-sensitive substring containment in the event name.
    NameContains(String),
    /// Unanchored regex find against the event name.
    NameMatches(NameRegex),
    /// Exact category equality. Hierarchical category names
    /// ("parent.child") are informational and never decomposed here.
    Category(String),
    /// Property key must exist; when `value` is set it must also be equal.
    Property {
        key: String,
        #[serde(default)]
        value: Option<PropertyValue>,
    },
    ContainsPii(bool),
    HighVolume(bool),
    Essential(bool),
}

/// Which set of trackers a rule sends events to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerGroup {
    /// Wildcard: every tracker available at routing time.
    All,
    /// Inline tracker id list (ordered, de-duplicated at build).
    Trackers(Vec<String>),
    /// Reference to a named group in the configuration.
    Group(String),
}

/// Environment restriction on a rule. The enum itself enforces the
/// debug-only / production-only mutual exclusion; the builder's last
/// setter wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    DebugOnly,
    ProductionOnly,
}

/// Sampling strategy selection for a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    /// Non-reproducible uniform draw.
    Uniform,
    /// Reproducible: the named event property's value (event name when the
    /// property is absent) is hashed so a given key is consistently in or
    /// out of the sample.
    Deterministic { key_property: String },
}

impl Default for SamplingMode {
    fn default() -> Self {
        SamplingMode::Uniform
    }
}

fn default_sample_rate() -> f64 {
    1.0
}

/// An immutable routing rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub predicates: Vec<RulePredicate>,
    /// Default rules match unconditionally but are fallback-only: they are
    /// dropped whenever a non-default rule matches.
    #[serde(default)]
    pub is_default: bool,
    pub target: TrackerGroup,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
    #[serde(default)]
    pub sampling: SamplingMode,
    #[serde(default)]
    pub require_consent: bool,
    #[serde(default)]
    pub require_pii_consent: bool,
    #[serde(default)]
    pub environment: Option<Environment>,
    #[serde(default)]
    pub priority: i32,
}

impl RoutingRule {
    pub fn builder() -> RuleBuilder {
        RuleBuilder::new()
    }

    /// Human-readable label for log lines and skip/apply records.
    pub fn label(&self) -> String {
        if let Some(id) = &self.id {
            return id.clone();
        }
        if let Some(desc) = &self.description {
            return desc.clone();
        }
        let kind = if self.is_default { "default" } else { "rule" };
        format!("{} (priority {})", kind, self.priority)
    }

    /// True if the rule is active in the given environment.
    pub fn active_in(&self, debug_mode: bool) -> bool {
        match self.environment {
            Some(Environment::DebugOnly) => debug_mode,
            Some(Environment::ProductionOnly) => !debug_mode,
            None => true,
        }
    }
}

impl fmt::Display for RoutingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Fluent builder for `RoutingRule`.
///
/// The builder is a thin authoring convenience: `build()` produces the
/// immutable rule value the engine consumes, and the engine never sees
/// builder state. Regex predicates are the only fallible part.
#[derive(Debug, Default, Clone)]
pub struct RuleBuilder {
    id: Option<String>,
    description: Option<String>,
    predicates: Vec<RulePredicate>,
    regex_patterns: Vec<String>,
    is_default: bool,
    target: Option<TrackerGroup>,
    sample_rate: f64,
    sampling: SamplingMode,
    require_consent: bool,
    require_pii_consent: bool,
    environment: Option<Environment>,
    priority: i32,
}

impl RuleBuilder {
    pub fn new() -> Self {
        Self {
            sample_rate: 1.0,
            ..Self::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn kind(mut self, kind: EventKind) -> Self {
        self.predicates.push(RulePredicate::Kind(kind));
        self
    }

    pub fn name_contains(mut self, fragment: impl Into<String>) -> Self {
        self.predicates
            .push(RulePredicate::NameContains(fragment.into()));
        self
    }

    /// Adds a regex predicate; the pattern is compiled by `build()`.
    pub fn name_matches(mut self, pattern: impl Into<String>) -> Self {
        self.regex_patterns.push(pattern.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.predicates
            .push(RulePredicate::Category(category.into()));
        self
    }

    pub fn has_property(mut self, key: impl Into<String>) -> Self {
        self.predicates.push(RulePredicate::Property {
            key: key.into(),
            value: None,
        });
        self
    }

    pub fn property_equals(
        mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.predicates.push(RulePredicate::Property {
            key: key.into(),
            value: Some(value.into()),
        });
        self
    }

    pub fn contains_pii(mut self, flag: bool) -> Self {
        self.predicates.push(RulePredicate::ContainsPii(flag));
        self
    }

    pub fn high_volume(mut self, flag: bool) -> Self {
        self.predicates.push(RulePredicate::HighVolume(flag));
        self
    }

    pub fn essential(mut self, flag: bool) -> Self {
        self.predicates.push(RulePredicate::Essential(flag));
        self
    }

    /// Marks the rule as the fallback used when no other rule matches.
    pub fn default_rule(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn target(mut self, target: TrackerGroup) -> Self {
        self.target = Some(target);
        self
    }

    /// Route to every available tracker.
    pub fn to_all(self) -> Self {
        self.target(TrackerGroup::All)
    }

    /// Route to an inline list of tracker ids.
    pub fn to<I, S>(self, tracker_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids = tracker_ids.into_iter().map(Into::into).collect();
        self.target(TrackerGroup::Trackers(ids))
    }

    /// Route to a named custom group.
    pub fn to_group(self, name: impl Into<String>) -> Self {
        self.target(TrackerGroup::Group(name.into()))
    }

    /// Sample rate in [0,1]; range checked at configuration build.
    pub fn sample_rate(mut self, rate: f64) -> Self {
        self.sample_rate = rate;
        self
    }

    /// Switch the rule to deterministic sampling keyed on a property.
    pub fn deterministic_by(mut self, key_property: impl Into<String>) -> Self {
        self.sampling = SamplingMode::Deterministic {
            key_property: key_property.into(),
        };
        self
    }

    pub fn require_consent(mut self) -> Self {
        self.require_consent = true;
        self
    }

    pub fn require_pii_consent(mut self) -> Self {
        self.require_pii_consent = true;
        self
    }

    /// Restrict the rule to debug mode. Overrides a previous
    /// `production_only()` call: last setter wins.
    pub fn debug_only(mut self) -> Self {
        self.environment = Some(Environment::DebugOnly);
        self
    }

    /// Restrict the rule to production. Overrides a previous
    /// `debug_only()` call: last setter wins.
    pub fn production_only(mut self) -> Self {
        self.environment = Some(Environment::ProductionOnly);
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Assemble the immutable rule. Fails only on invalid regex patterns;
    /// all other validation happens when the configuration is built.
    pub fn build(self) -> Result<RoutingRule, ConfigurationError> {
        let mut predicates = self.predicates;
        for pattern in &self.regex_patterns {
            predicates.push(RulePredicate::NameMatches(NameRegex::new(pattern)?));
        }

        Ok(RoutingRule {
            id: self.id,
            description: self.description,
            predicates,
            is_default: self.is_default,
            target: self.target.unwrap_or(TrackerGroup::All),
            sample_rate: self.sample_rate,
            sampling: self.sampling,
            require_consent: self.require_consent,
            require_pii_consent: self.require_pii_consent,
            environment: self.environment,
            priority: self.priority,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_builder_fluent() {
        let rule = RoutingRule::builder()
            .id("pii-to-secure")
            .contains_pii(true)
            .to(["secure"])
            .require_pii_consent()
            .priority(10)
            .build()
            .unwrap();

        assert_eq!(rule.id.as_deref(), Some("pii-to-secure"));
        assert_eq!(rule.predicates, vec![RulePredicate::ContainsPii(true)]);
        assert_eq!(
            rule.target,
            TrackerGroup::Trackers(vec!["secure".to_string()])
        );
        assert!(rule.require_pii_consent);
        assert_eq!(rule.priority, 10);
        assert_eq!(rule.sample_rate, 1.0);
    }

    #[test]
    fn test_environment_last_setter_wins() {
        let rule = RoutingRule::builder()
            .debug_only()
            .production_only()
            .to_all()
            .build()
            .unwrap();
        assert_eq!(rule.environment, Some(Environment::ProductionOnly));

        let rule = RoutingRule::builder()
            .production_only()
            .debug_only()
            .to_all()
            .build()
            .unwrap();
        assert_eq!(rule.environment, Some(Environment::DebugOnly));
    }

    #[test]
    fn test_active_in_environment() {
        let debug_rule = RoutingRule::builder().debug_only().to_all().build().unwrap();
        assert!(debug_rule.active_in(true));
        assert!(!debug_rule.active_in(false));

        let prod_rule = RoutingRule::builder()
            .production_only()
            .to_all()
            .build()
            .unwrap();
        assert!(!prod_rule.active_in(true));
        assert!(prod_rule.active_in(false));

        let anywhere = RoutingRule::builder().to_all().build().unwrap();
        assert!(anywhere.active_in(true));
        assert!(anywhere.active_in(false));
    }

    #[test]
    fn test_invalid_regex_fails_at_build() {
        let result = RoutingRule::builder().name_matches("([unclosed").to_all().build();
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_name_regex_serde_round_trip() {
        let regex = NameRegex::new("^checkout_").unwrap();
        let json = serde_json::to_string(&regex).unwrap();
        assert_eq!(json, "\"^checkout_\"");

        let back: NameRegex = serde_json::from_str(&json).unwrap();
        assert_eq!(back, regex);
        assert!(back.is_match("checkout_completed"));
    }

    #[test]
    fn test_rule_label_fallbacks() {
        let with_id = RoutingRule::builder().id("r1").to_all().build().unwrap();
        assert_eq!(with_id.label(), "r1");

        let with_desc = RoutingRule::builder()
            .description("errors to sentry")
            .to_all()
            .build()
            .unwrap();
        assert_eq!(with_desc.label(), "errors to sentry");

        let bare = RoutingRule::builder().priority(7).to_all().build().unwrap();
        assert_eq!(bare.label(), "rule (priority 7)");
    }
}
