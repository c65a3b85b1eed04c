//! Predicate evaluation.
//!
//! A rule matches an event iff every predicate it specifies holds.
//! Unspecified aspects are vacuously true, so a rule with no predicates
//! matches every event. That is deliberate but easy to author by
//! accident; the configuration lint does not flag it.

use crate::model::event::EventDescriptor;
use crate::model::rule::{RoutingRule, RulePredicate};

/// Outcome of matching a single rule against an event.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub matched: bool,
    /// Set on non-matches: which predicate failed and why.
    pub reason: Option<String>,
}

impl MatchOutcome {
    pub fn hit() -> Self {
        Self {
            matched: true,
            reason: None,
        }
    }

    pub fn miss(reason: impl Into<String>) -> Self {
        Self {
            matched: false,
            reason: Some(reason.into()),
        }
    }
}

/// Evaluate every predicate of `rule` against `event`.
///
/// Returns on the first failing predicate. `is_default` is not a
/// predicate: default rules match unconditionally here and the engine
/// decides separately whether a default is eligible.
pub fn match_rule(event: &EventDescriptor, rule: &RoutingRule) -> MatchOutcome {
    for predicate in &rule.predicates {
        if let Some(reason) = check_predicate(event, predicate) {
            return MatchOutcome::miss(reason);
        }
    }
    MatchOutcome::hit()
}

/// Returns `None` when the predicate holds, otherwise the failure reason.
fn check_predicate(event: &EventDescriptor, predicate: &RulePredicate) -> Option<String> {
    match predicate {
        RulePredicate::Kind(kind) => {
            if event.kind == *kind {
                None
            } else {
                Some(format!(
                    "event kind {:?} does not match required {:?}",
                    event.kind, kind
                ))
            }
        }
        RulePredicate::NameContains(fragment) => {
            if event.name.contains(fragment.as_str()) {
                None
            } else {
                Some(format!(
                    "name '{}' does not contain '{}'",
                    event.name, fragment
                ))
            }
        }
        RulePredicate::NameMatches(regex) => {
            if regex.is_match(&event.name) {
                None
            } else {
                Some(format!(
                    "name '{}' does not match /{}/",
                    event.name,
                    regex.pattern()
                ))
            }
        }
        RulePredicate::Category(category) => match &event.category {
            Some(actual) if actual == category => None,
            Some(actual) => Some(format!(
                "category '{}' does not equal required '{}'",
                actual, category
            )),
            None => Some(format!(
                "event has no category, rule requires '{}'",
                category
            )),
        },
        RulePredicate::Property { key, value } => match event.properties.get(key) {
            None => Some(format!("event is missing property '{}'", key)),
            Some(actual) => match value {
                Some(expected) if actual != expected => Some(format!(
                    "property '{}' is '{}', rule requires '{}'",
                    key, actual, expected
                )),
                _ => None,
            },
        },
        RulePredicate::ContainsPii(expected) => {
            flag_check("contains_pii", event.contains_pii, *expected)
        }
        RulePredicate::HighVolume(expected) => {
            flag_check("is_high_volume", event.is_high_volume, *expected)
        }
        RulePredicate::Essential(expected) => {
            flag_check("is_essential", event.is_essential, *expected)
        }
    }
}

fn flag_check(flag: &str, actual: bool, expected: bool) -> Option<String> {
    if actual == expected {
        None
    } else {
        Some(format!("{} is {}, rule requires {}", flag, actual, expected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::event::EventKind;
    use crate::model::rule::RoutingRule;

    fn event() -> EventDescriptor {
        EventDescriptor::new("checkout_completed")
            .with_kind(EventKind::Action)
            .with_category("business")
            .with_property("plan", "pro")
            .with_property("amount", 42i64)
    }

    #[test]
    fn test_empty_predicates_match_everything() {
        let rule = RoutingRule::builder().to_all().build().unwrap();
        assert!(match_rule(&event(), &rule).matched);
    }

    #[test]
    fn test_all_predicates_must_hold() {
        let rule = RoutingRule::builder()
            .kind(EventKind::Action)
            .category("business")
            .name_contains("checkout")
            .to_all()
            .build()
            .unwrap();
        assert!(match_rule(&event(), &rule).matched);

        let rule = RoutingRule::builder()
            .kind(EventKind::Action)
            .category("technical") // one miss is enough
            .to_all()
            .build()
            .unwrap();
        let outcome = match_rule(&event(), &rule);
        assert!(!outcome.matched);
        assert!(outcome.reason.unwrap().contains("category"));
    }

    #[test]
    fn test_name_contains_case_sensitive() {
        let rule = RoutingRule::builder()
            .name_contains("Checkout")
            .to_all()
            .build()
            .unwrap();
        assert!(!match_rule(&event(), &rule).matched);
    }

    #[test]
    fn test_name_regex_unanchored() {
        let rule = RoutingRule::builder()
            .name_matches("out_comp")
            .to_all()
            .build()
            .unwrap();
        assert!(match_rule(&event(), &rule).matched);

        let rule = RoutingRule::builder()
            .name_matches("^completed$")
            .to_all()
            .build()
            .unwrap();
        assert!(!match_rule(&event(), &rule).matched);
    }

    #[test]
    fn test_category_hierarchy_not_decomposed() {
        let parent_rule = RoutingRule::builder()
            .category("business")
            .to_all()
            .build()
            .unwrap();
        let child_event = EventDescriptor::new("e").with_category("business.revenue");
        // Subcategory naming is informational only: no prefix matching.
        assert!(!match_rule(&child_event, &parent_rule).matched);
    }

    #[test]
    fn test_property_presence_and_value() {
        let presence = RoutingRule::builder()
            .has_property("plan")
            .to_all()
            .build()
            .unwrap();
        assert!(match_rule(&event(), &presence).matched);

        let wrong_value = RoutingRule::builder()
            .property_equals("plan", "free")
            .to_all()
            .build()
            .unwrap();
        let outcome = match_rule(&event(), &wrong_value);
        assert!(!outcome.matched);
        assert!(outcome.reason.unwrap().contains("plan"));

        let missing = RoutingRule::builder()
            .has_property("coupon")
            .to_all()
            .build()
            .unwrap();
        assert!(!match_rule(&event(), &missing).matched);
    }

    #[test]
    fn test_flag_predicates_exact_equality() {
        let pii_event = event().with_pii(true);

        let wants_pii = RoutingRule::builder()
            .contains_pii(true)
            .to_all()
            .build()
            .unwrap();
        assert!(match_rule(&pii_event, &wants_pii).matched);
        assert!(!match_rule(&event(), &wants_pii).matched);

        let wants_clean = RoutingRule::builder()
            .contains_pii(false)
            .to_all()
            .build()
            .unwrap();
        assert!(!match_rule(&pii_event, &wants_clean).matched);
    }

    #[test]
    fn test_default_rule_matches_unconditionally() {
        let rule = RoutingRule::builder()
            .default_rule()
            .to_all()
            .build()
            .unwrap();
        assert!(match_rule(&event(), &rule).matched);
    }
}
