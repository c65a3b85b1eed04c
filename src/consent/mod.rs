//! Consent evaluation.
//!
//! Decides whether a rule's consent requirements are satisfied by the
//! caller-supplied consent state. Essential events bypass consent.

pub mod evaluator;

pub use evaluator::{evaluate, ConsentDecision, ConsentState};
