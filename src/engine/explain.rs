//! Explainability reporting.
//!
//! Answers "why was / wasn't this event tracked" by classifying every
//! configured rule as matching or non-matching (with the failing
//! predicate's reason) alongside the full routing result. Purely
//! diagnostic: it never mutates engine or configuration state.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::consent::ConsentState;
use crate::engine::router::{RoutingEngine, RoutingResult};
use crate::matching::match_rule;
use crate::model::event::EventDescriptor;

/// A non-matching rule and the reason its first failing predicate gave.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleExplanation {
    pub rule: String,
    pub reason: String,
}

/// Full diagnostic picture for one event.
///
/// Unlike `RoutingResult`, this covers every configured rule, including
/// ones the engine would have dropped for environment or priority reasons.
#[derive(Debug, Clone, Serialize)]
pub struct ExplainReport {
    pub all_rules: Vec<String>,
    pub matching_rules: Vec<String>,
    pub non_matching_rules: Vec<RuleExplanation>,
    pub routing_result: RoutingResult,
}

impl RoutingEngine {
    /// Classify every configured rule against `event` and compute the
    /// routing decision it would produce.
    pub fn explain_event(
        &self,
        event: &EventDescriptor,
        consent: &ConsentState,
        available_trackers: &BTreeSet<String>,
    ) -> ExplainReport {
        let mut all_rules = Vec::new();
        let mut matching_rules = Vec::new();
        let mut non_matching_rules = Vec::new();

        for rule in self.config().rules() {
            let label = rule.label();
            all_rules.push(label.clone());

            let outcome = match_rule(event, rule);
            if outcome.matched {
                matching_rules.push(label);
            } else {
                non_matching_rules.push(RuleExplanation {
                    rule: label,
                    reason: outcome
                        .reason
                        .unwrap_or_else(|| "did not match".to_string()),
                });
            }
        }

        ExplainReport {
            all_rules,
            matching_rules,
            non_matching_rules,
            routing_result: self.route_event(event, consent, available_trackers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::RoutingConfiguration;
    use crate::model::rule::RoutingRule;
    use crate::sampling::SamplingEngine;

    fn available(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn test_engine() -> RoutingEngine {
        let config = RoutingConfiguration::builder()
            .rule(
                RoutingRule::builder()
                    .id("business")
                    .category("business")
                    .priority(10)
                    .to(["biz"])
                    .build()
                    .unwrap(),
            )
            .rule(
                RoutingRule::builder()
                    .id("errors")
                    .name_contains("error")
                    .priority(20)
                    .to(["sentry"])
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        RoutingEngine::with_sampler(config, SamplingEngine::with_seed(1))
    }

    #[test]
    fn test_every_rule_classified() {
        let engine = test_engine();
        let event = EventDescriptor::new("payment_error").with_category("business");

        let report = engine.explain_event(
            &event,
            &ConsentState::full(),
            &available(&["biz", "sentry"]),
        );

        // Two explicit rules plus the synthetic default.
        assert_eq!(report.all_rules.len(), 3);
        assert_eq!(
            report.matching_rules,
            vec![
                "errors".to_string(),
                "business".to_string(),
                "synthesized default rule".to_string()
            ]
        );
        assert!(report.non_matching_rules.is_empty());
    }

    #[test]
    fn test_non_matching_rules_carry_reasons() {
        let engine = test_engine();
        let event = EventDescriptor::new("page_view");

        let report =
            engine.explain_event(&event, &ConsentState::full(), &available(&["biz", "sentry"]));

        let business = report
            .non_matching_rules
            .iter()
            .find(|e| e.rule == "business")
            .unwrap();
        assert!(business.reason.contains("category"));

        let errors = report
            .non_matching_rules
            .iter()
            .find(|e| e.rule == "errors")
            .unwrap();
        assert!(errors.reason.contains("does not contain"));
    }

    #[test]
    fn test_report_includes_routing_result() {
        let engine = test_engine();
        let event = EventDescriptor::new("error_thrown");
        let avail = available(&["biz", "sentry"]);

        let report = engine.explain_event(&event, &ConsentState::full(), &avail);
        let direct = engine.route_event(&event, &ConsentState::full(), &avail);

        assert_eq!(
            report.routing_result.target_trackers,
            direct.target_trackers
        );
        assert!(report
            .routing_result
            .target_trackers
            .contains("sentry"));
    }
}
