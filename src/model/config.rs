//! Routing configuration.
//!
//! A `RoutingConfiguration` is the immutable, validated collection of rules
//! plus the global toggles. Everything that can be rejected is rejected
//! here, synchronously, at build time - routing itself never fails.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::rule::{RoutingRule, RulePredicate, TrackerGroup};

lazy_static! {
    /// Identifiers (tracker ids, group names, rule ids) must be non-empty
    /// and whitespace-free.
    static ref IDENT_PATTERN: Regex = Regex::new(r"^\S+$").unwrap();
}

/// Build-time configuration failure. Never raised during routing.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("rule '{rule}' has invalid sample rate {rate} (must be within [0,1])")]
    InvalidSampleRate { rule: String, rate: f64 },

    #[error("rule '{rule}' targets an empty tracker id list")]
    EmptyTrackerList { rule: String },

    #[error("group '{name}' has an empty tracker id list")]
    EmptyGroup { name: String },

    #[error("invalid {what} identifier: '{value}'")]
    InvalidIdentifier { what: &'static str, value: String },

    #[error("group '{name}' is defined more than once")]
    DuplicateGroup { name: String },

    #[error("'{referrer}' references unknown group '{group}'")]
    UnknownGroup { referrer: String, group: String },

    #[error("rule '{rule}' references unknown category '{category}'")]
    UnknownCategory { rule: String, category: String },

    #[error("invalid regex pattern '{pattern}'")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("configuration (de)serialization failed")]
    Serde(#[from] serde_json::Error),
}

fn default_true() -> bool {
    true
}

/// Immutable, validated routing configuration.
///
/// Rules are stored sorted descending by priority (stable on ties). When no
/// explicit default rule was supplied, a synthetic one at priority -1000 is
/// appended at build time so that routing always has a fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfiguration {
    rules: Vec<RoutingRule>,
    #[serde(default)]
    custom_groups: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    custom_categories: BTreeSet<String>,
    #[serde(default)]
    default_group: Option<String>,
    #[serde(default = "default_true")]
    enable_sampling: bool,
    #[serde(default = "default_true")]
    enable_consent_checking: bool,
    #[serde(default)]
    debug_mode: bool,
}

impl RoutingConfiguration {
    pub fn builder() -> RoutingConfigurationBuilder {
        RoutingConfigurationBuilder::new()
    }

    /// Rules in evaluation order (descending priority).
    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }

    pub fn custom_groups(&self) -> &BTreeMap<String, Vec<String>> {
        &self.custom_groups
    }

    pub fn custom_categories(&self) -> &BTreeSet<String> {
        &self.custom_categories
    }

    pub fn default_group(&self) -> Option<&str> {
        self.default_group.as_deref()
    }

    pub fn sampling_enabled(&self) -> bool {
        self.enable_sampling
    }

    pub fn consent_checking_enabled(&self) -> bool {
        self.enable_consent_checking
    }

    pub fn is_debug_mode(&self) -> bool {
        self.debug_mode
    }

    /// Resolve a tracker group against the trackers available right now.
    ///
    /// Named groups resolve to the intersection of configured and available
    /// ids; unavailable ids are silently dropped. A group name unknown at
    /// this point (only reachable through a hand-built value) degrades to
    /// the empty set rather than failing.
    pub fn resolve_group(
        &self,
        group: &TrackerGroup,
        available: &BTreeSet<String>,
    ) -> BTreeSet<String> {
        match group {
            TrackerGroup::All => available.clone(),
            TrackerGroup::Trackers(ids) => ids
                .iter()
                .filter(|id| available.contains(*id))
                .cloned()
                .collect(),
            TrackerGroup::Group(name) => self
                .custom_groups
                .get(name)
                .map(|ids| {
                    ids.iter()
                        .filter(|id| available.contains(*id))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Non-throwing lint pass over an already-built configuration.
    ///
    /// Surfaces the soft problems build() deliberately tolerates:
    /// duplicate rule ids, out-of-range sample rates (defensive - build
    /// rejects them first), a missing default, and custom groups nothing
    /// references.
    pub fn validate(&self) -> Vec<String> {
        let mut findings = Vec::new();

        let mut seen_ids: HashSet<&str> = HashSet::new();
        for rule in &self.rules {
            if let Some(id) = &rule.id {
                if !seen_ids.insert(id.as_str()) {
                    findings.push(format!("duplicate rule id '{}'", id));
                }
            }
            if !rule.sample_rate.is_finite() || !(0.0..=1.0).contains(&rule.sample_rate) {
                findings.push(format!(
                    "rule '{}' has sample rate {} outside [0,1]",
                    rule.label(),
                    rule.sample_rate
                ));
            }
        }

        if !self.rules.iter().any(|r| r.is_default) && self.default_group.is_none() {
            findings.push("configuration has no default rule and no default group".to_string());
        }

        let mut referenced: HashSet<&str> = HashSet::new();
        if let Some(group) = &self.default_group {
            referenced.insert(group.as_str());
        }
        for rule in &self.rules {
            if let TrackerGroup::Group(name) = &rule.target {
                referenced.insert(name.as_str());
            }
        }
        for name in self.custom_groups.keys() {
            if !referenced.contains(name.as_str()) {
                findings.push(format!("custom group '{}' is never referenced", name));
            }
        }

        findings
    }

    /// Serialize the configuration to a plain JSON value.
    pub fn to_value(&self) -> Result<serde_json::Value, ConfigurationError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Reconstruct a configuration from a value produced by `to_value`
    /// (or any declarative source of the same shape). Invariants are
    /// re-checked on the way in; regex predicates recompile during
    /// deserialization.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigurationError> {
        let config: Self = serde_json::from_value(value)?;
        config.check_invariants()?;
        Ok(config)
    }

    /// Fail-fast invariant checks shared by `build()` and `from_value()`.
    fn check_invariants(&self) -> Result<(), ConfigurationError> {
        for (name, ids) in &self.custom_groups {
            check_identifier("group name", name)?;
            if ids.is_empty() {
                return Err(ConfigurationError::EmptyGroup { name: name.clone() });
            }
            for id in ids {
                check_identifier("tracker id", id)?;
            }
        }

        if let Some(group) = &self.default_group {
            if !self.custom_groups.contains_key(group) {
                return Err(ConfigurationError::UnknownGroup {
                    referrer: "default group".to_string(),
                    group: group.clone(),
                });
            }
        }

        for rule in &self.rules {
            if let Some(id) = &rule.id {
                check_identifier("rule id", id)?;
            }

            if !rule.sample_rate.is_finite() || !(0.0..=1.0).contains(&rule.sample_rate) {
                return Err(ConfigurationError::InvalidSampleRate {
                    rule: rule.label(),
                    rate: rule.sample_rate,
                });
            }

            match &rule.target {
                TrackerGroup::All => {}
                TrackerGroup::Trackers(ids) => {
                    if ids.is_empty() {
                        return Err(ConfigurationError::EmptyTrackerList { rule: rule.label() });
                    }
                    for id in ids {
                        check_identifier("tracker id", id)?;
                    }
                }
                TrackerGroup::Group(name) => {
                    if !self.custom_groups.contains_key(name) {
                        return Err(ConfigurationError::UnknownGroup {
                            referrer: format!("rule '{}'", rule.label()),
                            group: name.clone(),
                        });
                    }
                }
            }

            // Category references are only checkable when a registry exists.
            if !self.custom_categories.is_empty() {
                for predicate in &rule.predicates {
                    if let RulePredicate::Category(category) = predicate {
                        if !self.custom_categories.contains(category) {
                            return Err(ConfigurationError::UnknownCategory {
                                rule: rule.label(),
                                category: category.clone(),
                            });
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

fn check_identifier(what: &'static str, value: &str) -> Result<(), ConfigurationError> {
    if IDENT_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidIdentifier {
            what,
            value: value.to_string(),
        })
    }
}

fn dedupe_preserving_order(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Fluent builder assembling an immutable `RoutingConfiguration`.
///
/// `build()` borrows the builder, so building twice from an unchanged
/// builder yields identical configurations.
#[derive(Debug, Default, Clone)]
pub struct RoutingConfigurationBuilder {
    rules: Vec<RoutingRule>,
    groups: Vec<(String, Vec<String>)>,
    categories: BTreeSet<String>,
    default_group: Option<String>,
    enable_sampling: bool,
    enable_consent_checking: bool,
    debug_mode: bool,
}

impl RoutingConfigurationBuilder {
    pub fn new() -> Self {
        Self {
            enable_sampling: true,
            enable_consent_checking: true,
            ..Self::default()
        }
    }

    pub fn rule(mut self, rule: RoutingRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn group<I, S>(mut self, name: impl Into<String>, tracker_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.push((
            name.into(),
            tracker_ids.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn category(mut self, name: impl Into<String>) -> Self {
        self.categories.insert(name.into());
        self
    }

    pub fn default_group(mut self, name: impl Into<String>) -> Self {
        self.default_group = Some(name.into());
        self
    }

    pub fn enable_sampling(mut self, enabled: bool) -> Self {
        self.enable_sampling = enabled;
        self
    }

    pub fn enable_consent_checking(mut self, enabled: bool) -> Self {
        self.enable_consent_checking = enabled;
        self
    }

    pub fn debug_mode(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }

    /// Validate and assemble the configuration.
    ///
    /// Normalizes tracker id lists (order-preserving de-duplication),
    /// sorts rules descending by priority (stable on ties) and appends the
    /// synthetic default rule when no explicit one exists.
    pub fn build(&self) -> Result<RoutingConfiguration, ConfigurationError> {
        let mut custom_groups = BTreeMap::new();
        for (name, ids) in &self.groups {
            if custom_groups
                .insert(name.clone(), dedupe_preserving_order(ids))
                .is_some()
            {
                return Err(ConfigurationError::DuplicateGroup { name: name.clone() });
            }
        }

        let mut rules: Vec<RoutingRule> = self
            .rules
            .iter()
            .cloned()
            .map(|mut rule| {
                if let TrackerGroup::Trackers(ids) = &mut rule.target {
                    let deduped = dedupe_preserving_order(ids);
                    *ids = deduped;
                }
                rule
            })
            .collect();

        if !rules.iter().any(|r| r.is_default) {
            rules.push(synthetic_default_rule(self.default_group.as_deref()));
        }

        rules.sort_by_key(|r| std::cmp::Reverse(r.priority));

        let config = RoutingConfiguration {
            rules,
            custom_groups,
            custom_categories: self.categories.clone(),
            default_group: self.default_group.clone(),
            enable_sampling: self.enable_sampling,
            enable_consent_checking: self.enable_consent_checking,
            debug_mode: self.debug_mode,
        };

        config.check_invariants()?;

        log::debug!(
            "CONFIG_BUILT rules={} groups={} default_group={:?} sampling={} consent={} debug={}",
            config.rules.len(),
            config.custom_groups.len(),
            config.default_group,
            config.enable_sampling,
            config.enable_consent_checking,
            config.debug_mode
        );

        Ok(config)
    }
}

/// The fallback rule appended when no explicit default was configured. It
/// targets the configured default group when one exists, otherwise every
/// available tracker.
fn synthetic_default_rule(default_group: Option<&str>) -> RoutingRule {
    RoutingRule {
        id: None,
        description: Some("synthesized default rule".to_string()),
        predicates: Vec::new(),
        is_default: true,
        target: match default_group {
            Some(name) => TrackerGroup::Group(name.to_string()),
            None => TrackerGroup::All,
        },
        sample_rate: 1.0,
        sampling: Default::default(),
        require_consent: false,
        require_pii_consent: false,
        environment: None,
        priority: -1000,
    }
}
