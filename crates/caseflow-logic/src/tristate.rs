// crates/caseflow-logic/src/tristate.rs
// ============================================================================
// Module: Tri-state logic
// Description: Three-valued (True/False/Unknown) logic used to evaluate
//              requirement trees against incomplete evidence.
// Purpose: Give policy predicates a principled way to say "don't know" and
//          to compose that uncertainty the same way every time it matters.
// Dependencies: serde
// ============================================================================

//! ## Overview
//!
//! [`TriState`] extends ordinary booleans with an `Unknown` value for
//! conditions that could not be evaluated (missing evidence, a provider that
//! timed out, a field that was never set). [`TriLogic`] implementations fix
//! how `Unknown` combines with `and`/`or`/`not`:
//!
//! - [`KleeneLogic`] (strong Kleene logic) lets a known `False` short-circuit
//!   an `and`, and a known `True` short-circuit an `or`, even when other
//!   operands are `Unknown`. This is the default: an escalation rule that
//!   already knows one gate failed does not need to know the rest.
//! - [`BochvarLogic`] (weak/external Bochvar logic) treats `Unknown` as
//!   contagious: any operand being `Unknown` makes the whole combination
//!   `Unknown`, regardless of the other operands. Used where a policy must
//!   refuse to decide at all unless every input was actually evaluated.
//!
//! [`LogicMode`] is the runtime-selectable form of this choice, so a
//! `Requirement` tree can be authored once and evaluated under either
//! interpretation depending on configuration.

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: TriState
// ============================================================================

/// A three-valued logic result: true, false, or unknown.
///
/// `Unknown` is produced whenever evidence needed to decide a condition is
/// missing, unreadable, or not yet available. Combinators never silently
/// promote `Unknown` to `True` or `False`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriState {
    /// The condition is known to hold.
    True,
    /// The condition is known not to hold.
    False,
    /// The condition could not be evaluated.
    Unknown,
}

impl TriState {
    /// Returns `true` when the value is [`TriState::True`].
    #[must_use]
    pub const fn is_true(self) -> bool {
        matches!(self, Self::True)
    }

    /// Returns `true` when the value is [`TriState::False`].
    #[must_use]
    pub const fn is_false(self) -> bool {
        matches!(self, Self::False)
    }

    /// Returns `true` when the value is [`TriState::Unknown`].
    #[must_use]
    pub const fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Collapses the value to a plain `bool`, treating `Unknown` as the
    /// supplied fail-closed default.
    #[must_use]
    pub const fn resolve_or(self, default_when_unknown: bool) -> bool {
        match self {
            Self::True => true,
            Self::False => false,
            Self::Unknown => default_when_unknown,
        }
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

// ============================================================================
// SECTION: Logic interpretations
// ============================================================================

/// Fixes how `Unknown` combines under `and`/`or`/`not`.
///
/// Implementations are stateless; they exist so [`LogicMode`] can dispatch
/// between interpretations at runtime while `Requirement::evaluate` stays
/// generic over the choice.
pub trait TriLogic {
    /// Combines two operands with logical AND.
    fn and(a: TriState, b: TriState) -> TriState;
    /// Combines two operands with logical OR.
    fn or(a: TriState, b: TriState) -> TriState;
    /// Negates a single operand.
    fn not(a: TriState) -> TriState;
}

/// Strong Kleene logic: a determining operand short-circuits the
/// combination even in the presence of `Unknown` siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KleeneLogic;

impl TriLogic for KleeneLogic {
    fn and(a: TriState, b: TriState) -> TriState {
        match (a, b) {
            (TriState::False, _) | (_, TriState::False) => TriState::False,
            (TriState::True, TriState::True) => TriState::True,
            _ => TriState::Unknown,
        }
    }

    fn or(a: TriState, b: TriState) -> TriState {
        match (a, b) {
            (TriState::True, _) | (_, TriState::True) => TriState::True,
            (TriState::False, TriState::False) => TriState::False,
            _ => TriState::Unknown,
        }
    }

    fn not(a: TriState) -> TriState {
        match a {
            TriState::True => TriState::False,
            TriState::False => TriState::True,
            TriState::Unknown => TriState::Unknown,
        }
    }
}

/// Weak (Bochvar external) logic: any `Unknown` operand poisons the whole
/// combination, regardless of the other operands' values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BochvarLogic;

impl TriLogic for BochvarLogic {
    fn and(a: TriState, b: TriState) -> TriState {
        if a.is_unknown() || b.is_unknown() {
            return TriState::Unknown;
        }
        KleeneLogic::and(a, b)
    }

    fn or(a: TriState, b: TriState) -> TriState {
        if a.is_unknown() || b.is_unknown() {
            return TriState::Unknown;
        }
        KleeneLogic::or(a, b)
    }

    fn not(a: TriState) -> TriState {
        KleeneLogic::not(a)
    }
}

/// Runtime-selectable choice between the two [`TriLogic`] interpretations.
///
/// `Requirement::evaluate` and `Requirement::evaluate_with_trace` take a
/// `LogicMode` so the same authored tree can be interpreted strictly or
/// permissively depending on the caller's policy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicMode {
    /// Strong Kleene logic (the default).
    Kleene,
    /// Weak Bochvar logic.
    Bochvar,
}

impl Default for LogicMode {
    fn default() -> Self {
        Self::Kleene
    }
}

impl LogicMode {
    /// Combines two operands with logical AND under this mode.
    #[must_use]
    pub fn and(self, a: TriState, b: TriState) -> TriState {
        match self {
            Self::Kleene => KleeneLogic::and(a, b),
            Self::Bochvar => BochvarLogic::and(a, b),
        }
    }

    /// Combines two operands with logical OR under this mode.
    #[must_use]
    pub fn or(self, a: TriState, b: TriState) -> TriState {
        match self {
            Self::Kleene => KleeneLogic::or(a, b),
            Self::Bochvar => BochvarLogic::or(a, b),
        }
    }

    /// Negates a single operand under this mode.
    #[must_use]
    pub fn not(self, a: TriState) -> TriState {
        match self {
            Self::Kleene => KleeneLogic::not(a),
            Self::Bochvar => BochvarLogic::not(a),
        }
    }
}

// ============================================================================
// SECTION: Condition evaluation
// ============================================================================

/// Evaluates a leaf condition of type `P` to a [`TriState`].
///
/// Implement this against whatever evidence store or snapshot backs your
/// domain's condition type; `Requirement::evaluate` calls it once per leaf.
pub trait TriStateConditionEval<P> {
    /// Evaluates a single condition.
    fn eval(&self, condition: &P) -> TriState;
}

impl<P, F> TriStateConditionEval<P> for F
where
    F: Fn(&P) -> TriState,
{
    fn eval(&self, condition: &P) -> TriState {
        (self)(condition)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    reason = "test assertions only"
)]
mod tests {
    use super::BochvarLogic;
    use super::KleeneLogic;
    use super::LogicMode;
    use super::TriLogic;
    use super::TriState;

    #[test]
    fn kleene_and_short_circuits_on_false() {
        assert_eq!(KleeneLogic::and(TriState::False, TriState::Unknown), TriState::False);
        assert_eq!(KleeneLogic::and(TriState::Unknown, TriState::False), TriState::False);
    }

    #[test]
    fn kleene_or_short_circuits_on_true() {
        assert_eq!(KleeneLogic::or(TriState::True, TriState::Unknown), TriState::True);
        assert_eq!(KleeneLogic::or(TriState::Unknown, TriState::True), TriState::True);
    }

    #[test]
    fn kleene_unknown_propagates_when_undetermined() {
        assert_eq!(KleeneLogic::and(TriState::True, TriState::Unknown), TriState::Unknown);
        assert_eq!(KleeneLogic::or(TriState::False, TriState::Unknown), TriState::Unknown);
    }

    #[test]
    fn bochvar_unknown_always_poisons() {
        assert_eq!(BochvarLogic::and(TriState::False, TriState::Unknown), TriState::Unknown);
        assert_eq!(BochvarLogic::or(TriState::True, TriState::Unknown), TriState::Unknown);
    }

    #[test]
    fn logic_mode_dispatches_to_matching_interpretation() {
        assert_eq!(
            LogicMode::Kleene.and(TriState::False, TriState::Unknown),
            KleeneLogic::and(TriState::False, TriState::Unknown)
        );
        assert_eq!(
            LogicMode::Bochvar.and(TriState::False, TriState::Unknown),
            BochvarLogic::and(TriState::False, TriState::Unknown)
        );
    }

    #[test]
    fn resolve_or_applies_fail_closed_default() {
        assert!(TriState::Unknown.resolve_or(false) == false);
        assert!(TriState::True.resolve_or(false));
    }
}
