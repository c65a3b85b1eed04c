//! Consent checks for routing rules.
//!
//! Check order: essential bypass, then PII consent, then general consent,
//! then unconditional allow. The rule's own flags are authoritative; the
//! event's `requires_consent` field is informational and never consulted.

use serde::{Deserialize, Serialize};

use crate::model::event::EventDescriptor;
use crate::model::rule::RoutingRule;

/// End-user data-collection permission, supplied by the caller per call.
/// The engine never owns or persists this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentState {
    pub has_general_consent: bool,
    pub has_pii_consent: bool,
}

impl ConsentState {
    pub fn new(has_general_consent: bool, has_pii_consent: bool) -> Self {
        Self {
            has_general_consent,
            has_pii_consent,
        }
    }

    /// Both flags granted.
    pub fn full() -> Self {
        Self::new(true, true)
    }

    /// Both flags withheld.
    pub fn none() -> Self {
        Self::new(false, false)
    }
}

/// Outcome of a consent check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentDecision {
    pub allowed: bool,
    pub reason: String,
}

impl ConsentDecision {
    fn allowed(reason: &str) -> Self {
        Self {
            allowed: true,
            reason: reason.to_string(),
        }
    }

    fn denied(reason: &str) -> Self {
        Self {
            allowed: false,
            reason: reason.to_string(),
        }
    }
}

/// Decide whether `rule` may receive `event` under `consent`.
///
/// The global `enable_consent_checking` toggle is applied by the engine
/// before this is called; evaluation itself is pure.
pub fn evaluate(
    event: &EventDescriptor,
    rule: &RoutingRule,
    consent: &ConsentState,
) -> ConsentDecision {
    if event.is_essential {
        return ConsentDecision::allowed("essential event bypasses consent");
    }

    if rule.require_pii_consent {
        return if consent.has_pii_consent {
            ConsentDecision::allowed("PII consent granted")
        } else {
            ConsentDecision::denied("PII consent not granted")
        };
    }

    if rule.require_consent {
        return if consent.has_general_consent {
            ConsentDecision::allowed("general consent granted")
        } else {
            ConsentDecision::denied("general consent not granted")
        };
    }

    ConsentDecision::allowed("rule has no consent requirements")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(require_consent: bool, require_pii_consent: bool) -> RoutingRule {
        let mut builder = RoutingRule::builder().to_all();
        if require_consent {
            builder = builder.require_consent();
        }
        if require_pii_consent {
            builder = builder.require_pii_consent();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_essential_bypasses_everything() {
        let event = EventDescriptor::new("crash_report").with_essential(true);
        let strict = rule(true, true);
        let decision = evaluate(&event, &strict, &ConsentState::none());
        assert!(decision.allowed);
        assert!(decision.reason.contains("essential"));
    }

    #[test]
    fn test_pii_consent_checked_before_general() {
        let event = EventDescriptor::new("profile_updated");
        let pii_rule = rule(true, true);

        // General consent alone is not enough when PII consent is required.
        let decision = evaluate(&event, &pii_rule, &ConsentState::new(true, false));
        assert!(!decision.allowed);
        assert!(decision.reason.contains("PII"));

        let decision = evaluate(&event, &pii_rule, &ConsentState::new(false, true));
        assert!(decision.allowed);
    }

    #[test]
    fn test_general_consent() {
        let event = EventDescriptor::new("page_view");
        let general_rule = rule(true, false);

        assert!(!evaluate(&event, &general_rule, &ConsentState::none()).allowed);
        assert!(evaluate(&event, &general_rule, &ConsentState::new(true, false)).allowed);
    }

    #[test]
    fn test_no_requirements_always_allowed() {
        let event = EventDescriptor::new("page_view");
        let decision = evaluate(&event, &rule(false, false), &ConsentState::none());
        assert!(decision.allowed);
    }

    #[test]
    fn test_event_requires_consent_is_informational() {
        // The rule is authoritative: an event flagged requires_consent does
        // not tighten a rule without consent requirements.
        let event = EventDescriptor::new("page_view").with_requires_consent(true);
        let decision = evaluate(&event, &rule(false, false), &ConsentState::none());
        assert!(decision.allowed);
    }
}
