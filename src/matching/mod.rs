//! Rule predicate matching.
//!
//! Pure evaluation of a rule's predicates against an event, with a
//! human-readable reason for every non-match.

pub mod matcher;

pub use matcher::{match_rule, MatchOutcome};
