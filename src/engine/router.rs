//! Routing orchestration.
//!
//! Turns (event, consent state, available trackers) into a `RoutingResult`
//! against an immutable configuration:
//! 1. Environment filtering (debug-only / production-only rules)
//! 2. Predicate matching
//! 3. Default rules held back as fallback
//! 4. Priority resolution (top-priority ties are unioned)
//! 5. Consent evaluation
//! 6. Sampling
//! 7. Tracker group resolution against the available set
//!
//! Routing has no fatal runtime errors: every ambiguous condition degrades
//! to "not tracked" plus a warning, so a misconfigured routing table can
//! never crash the host application.

use std::collections::BTreeSet;

use serde::Serialize;
use uuid::Uuid;

use crate::consent::{self, ConsentState};
use crate::logging::LogContext;
use crate::matching::match_rule;
use crate::model::config::RoutingConfiguration;
use crate::model::event::EventDescriptor;
use crate::model::rule::{RoutingRule, SamplingMode};
use crate::sampling::SamplingEngine;

/// Warning recorded when no rule (default included) matched the event.
pub const NO_RULES_MATCHED_WARNING: &str = "No routing rules matched the event";

/// A rule that contributed trackers to the result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedRule {
    pub rule: String,
    pub trackers: BTreeSet<String>,
}

/// A rule that matched but was excluded, with the reason why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRule {
    pub rule: String,
    pub reason: String,
}

/// The routing decision for one event, freshly constructed per call and
/// handed to the dispatch layer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoutingResult {
    pub target_trackers: BTreeSet<String>,
    pub applied_rules: Vec<AppliedRule>,
    pub skipped_rules: Vec<SkippedRule>,
    pub warnings: Vec<String>,
}

impl RoutingResult {
    pub fn will_be_tracked(&self) -> bool {
        !self.target_trackers.is_empty()
    }
}

/// The routing decision engine.
///
/// A pure, synchronous function over an immutable configuration: multiple
/// callers may route concurrently against one shared engine. The injected
/// sampling engine is the only internally-synchronized piece.
#[derive(Debug)]
pub struct RoutingEngine {
    config: RoutingConfiguration,
    sampler: SamplingEngine,
    log_ctx: LogContext,
}

impl RoutingEngine {
    pub fn new(config: RoutingConfiguration) -> Self {
        Self::with_sampler(config, SamplingEngine::new())
    }

    /// Construct with an explicit sampling engine (seeded in tests).
    pub fn with_sampler(config: RoutingConfiguration, sampler: SamplingEngine) -> Self {
        let engine_id = format!("engine-{}", &Uuid::new_v4().to_string()[..8]);
        Self {
            config,
            sampler,
            log_ctx: LogContext::new(&engine_id),
        }
    }

    pub fn config(&self) -> &RoutingConfiguration {
        &self.config
    }

    /// Decide which tracker ids should receive `event` and why.
    pub fn route_event(
        &self,
        event: &EventDescriptor,
        consent: &ConsentState,
        available_trackers: &BTreeSet<String>,
    ) -> RoutingResult {
        let ctx = self.log_ctx.with_event(&event.name);
        log::debug!(
            "{} ROUTE_START rules={} available={}",
            ctx,
            self.config.rules().len(),
            available_trackers.len()
        );

        let mut result = RoutingResult::default();

        // [1] Environment filter.
        let debug_mode = self.config.is_debug_mode();
        let active: Vec<&RoutingRule> = self
            .config
            .rules()
            .iter()
            .filter(|rule| {
                let keep = rule.active_in(debug_mode);
                if !keep {
                    log::debug!(
                        "{} RULE_ENV_FILTERED rule={} debug_mode={}",
                        ctx,
                        rule.label(),
                        debug_mode
                    );
                }
                keep
            })
            .collect();

        // [2] Predicate matching.
        let mut matched: Vec<&RoutingRule> = Vec::new();
        for rule in active {
            let outcome = match_rule(event, rule);
            if outcome.matched {
                matched.push(rule);
            } else {
                log::debug!(
                    "{} RULE_UNMATCHED rule={} reason={:?}",
                    ctx,
                    rule.label(),
                    outcome.reason
                );
            }
        }

        // [3] Defaults are fallback-only: held back while any non-default
        // rule matched, reconsidered if every candidate is gated out below.
        let (defaults, non_defaults): (Vec<&RoutingRule>, Vec<&RoutingRule>) =
            matched.into_iter().partition(|r| r.is_default);
        let (matched, fallback) = if non_defaults.is_empty() {
            (defaults, Vec::new())
        } else {
            (non_defaults, defaults)
        };

        // [4] Nothing matched at all.
        let Some(top_priority) = matched.iter().map(|r| r.priority).max() else {
            log::warn!("{} ROUTE_NO_MATCH", ctx);
            result.warnings.push(NO_RULES_MATCHED_WARNING.to_string());
            return result;
        };

        // [5] Priority resolution: every matched rule at the top priority
        // is a candidate (ties are unioned), the rest are skipped.
        let mut candidates = Vec::new();
        for rule in matched {
            if rule.priority == top_priority {
                candidates.push(rule);
            } else {
                log::debug!(
                    "{} RULE_SKIPPED rule={} priority={} top={}",
                    ctx,
                    rule.label(),
                    rule.priority,
                    top_priority
                );
                result.skipped_rules.push(SkippedRule {
                    rule: rule.label(),
                    reason: "lower priority than applied rule(s)".to_string(),
                });
            }
        }

        // [6][7] Consent and sampling gates.
        let mut survivors = self.gate_candidates(&ctx, event, consent, candidates, &mut result);

        // A consent- or sample-gated top rule falls back to the matched
        // defaults, so e.g. a PII rule denied consent still routes the
        // event to the general default destination.
        if survivors.is_empty() && !fallback.is_empty() {
            log::debug!("{} ROUTE_FALLBACK_TO_DEFAULT", ctx);
            let top_default = fallback.iter().map(|r| r.priority).max();
            let default_candidates = fallback
                .into_iter()
                .filter(|r| Some(r.priority) == top_default)
                .collect();
            survivors = self.gate_candidates(&ctx, event, consent, default_candidates, &mut result);
        }

        // [8][9] Resolve groups and union the contributions.
        for rule in survivors {
            let trackers = self.config.resolve_group(&rule.target, available_trackers);
            if trackers.is_empty() {
                log::warn!("{} GROUP_EMPTY rule={}", ctx, rule.label());
                result.skipped_rules.push(SkippedRule {
                    rule: rule.label(),
                    reason: "No available trackers in group".to_string(),
                });
                result.warnings.push(format!(
                    "rule '{}': no available trackers in group",
                    rule.label()
                ));
                continue;
            }

            result.target_trackers.extend(trackers.iter().cloned());
            result.applied_rules.push(AppliedRule {
                rule: rule.label(),
                trackers,
            });
        }

        log::info!(
            "{} ROUTE_COMPLETE tracked={} targets={:?} applied={} skipped={}",
            ctx,
            result.will_be_tracked(),
            result.target_trackers,
            result.applied_rules.len(),
            result.skipped_rules.len()
        );

        result
    }

    /// Apply the consent and sampling gates to candidate rules, recording
    /// skips on `result` and returning the survivors.
    fn gate_candidates<'a>(
        &self,
        ctx: &LogContext,
        event: &EventDescriptor,
        consent: &ConsentState,
        candidates: Vec<&'a RoutingRule>,
        result: &mut RoutingResult,
    ) -> Vec<&'a RoutingRule> {
        let mut survivors = Vec::new();

        for rule in candidates {
            if self.config.consent_checking_enabled() {
                let decision = consent::evaluate(event, rule, consent);
                if !decision.allowed {
                    log::info!(
                        "{} CONSENT_DENIED rule={} reason={}",
                        ctx,
                        rule.label(),
                        decision.reason
                    );
                    result.skipped_rules.push(SkippedRule {
                        rule: rule.label(),
                        reason: decision.reason,
                    });
                    continue;
                }
            }

            // Essential events are exempt from sampling as well as consent.
            if self.config.sampling_enabled() && !event.is_essential {
                let passed = match &rule.sampling {
                    SamplingMode::Deterministic { key_property } => {
                        let key = event
                            .properties
                            .get(key_property)
                            .map(|v| v.to_string())
                            .unwrap_or_else(|| event.name.clone());
                        self.sampler.sample_deterministic(&key, rule.sample_rate)
                    }
                    SamplingMode::Uniform => self.sampler.sample_uniform(rule.sample_rate),
                };

                if !passed {
                    log::debug!(
                        "{} RULE_SAMPLED_OUT rule={} rate={}",
                        ctx,
                        rule.label(),
                        rule.sample_rate
                    );
                    result.skipped_rules.push(SkippedRule {
                        rule: rule.label(),
                        reason: format!("Rule sampled out (rate={})", rule.sample_rate),
                    });
                    continue;
                }
            }

            survivors.push(rule);
        }

        survivors
    }
}
