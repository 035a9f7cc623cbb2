// crates/caseflow-logic/src/requirement.rs
// ============================================================================
// Module: Requirement tree
// Description: Generic boolean requirement tree evaluated under tri-state
//              logic against a domain-specific condition type `P`.
// Purpose: Let callers (the DSL parser, policy configuration, tests) build
//          and evaluate and/or/not/at-least trees over arbitrary conditions.
// Dependencies: crate::tristate
// ============================================================================

//! ## Overview
//!
//! [`Requirement<P>`] is a closed tree of boolean combinators over a leaf
//! condition type `P`. It carries no evaluation logic of its own beyond
//! structure; [`Requirement::evaluate`] walks the tree against a
//! [`TriStateConditionEval`](crate::tristate::TriStateConditionEval) and a
//! chosen [`LogicMode`](crate::tristate::LogicMode).
//!
//! [`Requirement::evaluate_with_trace`] does the same walk but also returns a
//! [`RequirementTrace`] mirroring the tree shape with the tri-state result
//! recorded at every node, so a caller can explain *why* a policy decision
//! came out the way it did (e.g. "auto-approved because A and B were true;
//! C was never evaluated").

use serde::Deserialize;
use serde::Serialize;

use crate::tristate::LogicMode;
use crate::tristate::TriState;
use crate::tristate::TriStateConditionEval;

// ============================================================================
// SECTION: Requirement tree
// ============================================================================

/// A boolean requirement tree over a leaf condition type `P`.
///
/// # Invariants
/// - `And`/`Or` with zero members evaluate to the identity for their
///   operator (`True` for `And`, `False` for `Or`), matching the usual
///   empty-conjunction/empty-disjunction convention.
/// - `AtLeast` with `min == 0` always evaluates to `True`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement<P> {
    /// A single leaf condition, resolved by a [`TriStateConditionEval`].
    Condition(P),
    /// All members must hold (tri-state AND, folded left to right).
    And(Vec<Requirement<P>>),
    /// At least one member must hold (tri-state OR, folded left to right).
    Or(Vec<Requirement<P>>),
    /// Negation of a single member.
    Not(Box<Requirement<P>>),
    /// At least `min` of the listed members must evaluate to `True`.
    AtLeast {
        /// Minimum number of members that must be `True`.
        min: u8,
        /// Member requirements counted toward `min`.
        members: Vec<Requirement<P>>,
    },
}

impl<P> Requirement<P> {
    /// Builds a leaf condition requirement.
    pub fn condition(value: P) -> Self {
        Self::Condition(value)
    }

    /// Builds a conjunction over the given members.
    pub fn and(members: impl IntoIterator<Item = Self>) -> Self {
        Self::And(members.into_iter().collect())
    }

    /// Builds a disjunction over the given members.
    pub fn or(members: impl IntoIterator<Item = Self>) -> Self {
        Self::Or(members.into_iter().collect())
    }

    /// Builds the negation of a single requirement.
    pub fn negate(inner: Self) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Builds an at-least-`min`-of-members requirement.
    pub fn require_group(min: u8, members: impl IntoIterator<Item = Self>) -> Self {
        Self::AtLeast {
            min,
            members: members.into_iter().collect(),
        }
    }

    /// Evaluates the tree under the given logic mode, without recording a
    /// trace.
    pub fn evaluate<E>(&self, eval: &E, mode: LogicMode) -> TriState
    where
        E: TriStateConditionEval<P>,
    {
        match self {
            Self::Condition(p) => eval.eval(p),
            Self::And(members) => members
                .iter()
                .map(|m| m.evaluate(eval, mode))
                .fold(TriState::True, |acc, next| mode.and(acc, next)),
            Self::Or(members) => members
                .iter()
                .map(|m| m.evaluate(eval, mode))
                .fold(TriState::False, |acc, next| mode.or(acc, next)),
            Self::Not(inner) => mode.not(inner.evaluate(eval, mode)),
            Self::AtLeast {
                min,
                members,
            } => {
                let counts = GroupCounts::tally(members.iter().map(|m| m.evaluate(eval, mode)));
                at_least_result(*min, &counts)
            }
        }
    }

    /// Evaluates the tree under the given logic mode, recording a
    /// [`RequirementTrace`] that mirrors the tree shape.
    pub fn evaluate_with_trace<E>(&self, eval: &E, mode: LogicMode) -> (TriState, RequirementTrace<P>)
    where
        E: TriStateConditionEval<P>,
        P: Clone,
    {
        match self {
            Self::Condition(p) => {
                let result = eval.eval(p);
                (
                    result,
                    RequirementTrace::Condition {
                        condition: p.clone(),
                        result,
                    },
                )
            }
            Self::And(members) => {
                let children: Vec<_> =
                    members.iter().map(|m| m.evaluate_with_trace(eval, mode)).collect();
                let result = children
                    .iter()
                    .map(|(r, _)| *r)
                    .fold(TriState::True, |acc, next| mode.and(acc, next));
                (
                    result,
                    RequirementTrace::And {
                        result,
                        children: children.into_iter().map(|(_, t)| t).collect(),
                    },
                )
            }
            Self::Or(members) => {
                let children: Vec<_> =
                    members.iter().map(|m| m.evaluate_with_trace(eval, mode)).collect();
                let result = children
                    .iter()
                    .map(|(r, _)| *r)
                    .fold(TriState::False, |acc, next| mode.or(acc, next));
                (
                    result,
                    RequirementTrace::Or {
                        result,
                        children: children.into_iter().map(|(_, t)| t).collect(),
                    },
                )
            }
            Self::Not(inner) => {
                let (inner_result, inner_trace) = inner.evaluate_with_trace(eval, mode);
                let result = mode.not(inner_result);
                (
                    result,
                    RequirementTrace::Not {
                        result,
                        child: Box::new(inner_trace),
                    },
                )
            }
            Self::AtLeast {
                min,
                members,
            } => {
                let children: Vec<_> =
                    members.iter().map(|m| m.evaluate_with_trace(eval, mode)).collect();
                let counts = GroupCounts::tally(children.iter().map(|(r, _)| *r));
                let result = at_least_result(*min, &counts);
                (
                    result,
                    RequirementTrace::AtLeast {
                        result,
                        min: *min,
                        counts,
                        children: children.into_iter().map(|(_, t)| t).collect(),
                    },
                )
            }
        }
    }

    /// Returns the direct members of a composite node, or an empty slice for
    /// leaves and `Not`.
    #[must_use]
    pub fn members(&self) -> &[Self] {
        match self {
            Self::And(members) | Self::Or(members) => members,
            Self::AtLeast {
                members, ..
            } => members,
            Self::Condition(_) | Self::Not(_) => &[],
        }
    }

    /// Returns the tree's depth, counting a leaf as depth `1`.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Condition(_) => 1,
            Self::Not(inner) => 1 + inner.depth(),
            Self::And(members) | Self::Or(members) => {
                1 + members.iter().map(Self::depth).max().unwrap_or(0)
            }
            Self::AtLeast {
                members, ..
            } => 1 + members.iter().map(Self::depth).max().unwrap_or(0),
        }
    }
}

/// Resolves an `AtLeast` node's result from tallied member outcomes.
///
/// `True` once `min` members are confirmed `True`; `False` once enough
/// members are confirmed `False` that `min` `True`s are no longer reachable;
/// `Unknown` otherwise.
fn at_least_result(min: u8, counts: &GroupCounts) -> TriState {
    if min == 0 {
        return TriState::True;
    }
    let min = usize::from(min);
    if counts.true_count >= min {
        return TriState::True;
    }
    let reachable = counts.total.saturating_sub(counts.false_count);
    if reachable < min {
        return TriState::False;
    }
    TriState::Unknown
}

// ============================================================================
// SECTION: Group tallies
// ============================================================================

/// Tallies of member outcomes feeding an `AtLeast` (`require_group`)
/// evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCounts {
    /// Number of members that evaluated to `True`.
    pub true_count: usize,
    /// Number of members that evaluated to `False`.
    pub false_count: usize,
    /// Number of members that evaluated to `Unknown`.
    pub unknown_count: usize,
    /// Total number of members tallied.
    pub total: usize,
}

impl GroupCounts {
    /// Tallies an iterator of tri-state member outcomes.
    pub fn tally(results: impl IntoIterator<Item = TriState>) -> Self {
        let mut counts = Self {
            true_count: 0,
            false_count: 0,
            unknown_count: 0,
            total: 0,
        };
        for result in results {
            counts.total += 1;
            match result {
                TriState::True => counts.true_count += 1,
                TriState::False => counts.false_count += 1,
                TriState::Unknown => counts.unknown_count += 1,
            }
        }
        counts
    }
}

// ============================================================================
// SECTION: Evaluation trace
// ============================================================================

/// An evaluation trace mirroring a [`Requirement`] tree, with the tri-state
/// result recorded at every node.
///
/// Intended for surfacing "why" a policy predicate reached its outcome,
/// without re-walking the original tree against live evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementTrace<P> {
    /// Trace of a leaf condition evaluation.
    Condition {
        /// The condition that was evaluated.
        condition: P,
        /// The result of evaluating it.
        result: TriState,
    },
    /// Trace of a conjunction.
    And {
        /// The combined result.
        result: TriState,
        /// Traces of each member, in order.
        children: Vec<RequirementTrace<P>>,
    },
    /// Trace of a disjunction.
    Or {
        /// The combined result.
        result: TriState,
        /// Traces of each member, in order.
        children: Vec<RequirementTrace<P>>,
    },
    /// Trace of a negation.
    Not {
        /// The negated result.
        result: TriState,
        /// Trace of the negated member.
        child: Box<RequirementTrace<P>>,
    },
    /// Trace of an at-least-`min` group.
    AtLeast {
        /// The combined result.
        result: TriState,
        /// The configured minimum.
        min: u8,
        /// Tallied member outcomes.
        counts: GroupCounts,
        /// Traces of each member, in order.
        children: Vec<RequirementTrace<P>>,
    },
}

impl<P> RequirementTrace<P> {
    /// Returns the tri-state result recorded at this node.
    #[must_use]
    pub const fn result(&self) -> TriState {
        match self {
            Self::Condition {
                result, ..
            }
            | Self::And {
                result, ..
            }
            | Self::Or {
                result, ..
            }
            | Self::Not {
                result, ..
            }
            | Self::AtLeast {
                result, ..
            } => *result,
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    reason = "test assertions only"
)]
mod tests {
    use super::Requirement;
    use crate::tristate::LogicMode;
    use crate::tristate::TriState;

    fn eval_fn(state: TriState) -> impl Fn(&u8) -> TriState {
        move |_| state
    }

    #[test]
    fn and_short_circuits_on_known_false() {
        let req = Requirement::and([
            Requirement::condition(1u8),
            Requirement::condition(2u8),
        ]);
        let eval = |p: &u8| if *p == 1 { TriState::False } else { TriState::Unknown };
        assert_eq!(req.evaluate(&eval, LogicMode::Kleene), TriState::False);
    }

    #[test]
    fn at_least_true_once_threshold_reachable_regardless_of_unknowns() {
        let req = Requirement::require_group(
            2,
            [Requirement::condition(1u8), Requirement::condition(2u8), Requirement::condition(3u8)],
        );
        let eval = |p: &u8| match p {
            1 => TriState::True,
            2 => TriState::True,
            _ => TriState::Unknown,
        };
        assert_eq!(req.evaluate(&eval, LogicMode::Kleene), TriState::True);
    }

    #[test]
    fn at_least_false_once_threshold_unreachable() {
        let req = Requirement::require_group(
            2,
            [Requirement::condition(1u8), Requirement::condition(2u8), Requirement::condition(3u8)],
        );
        let eval = |p: &u8| match p {
            1 => TriState::False,
            2 => TriState::False,
            _ => TriState::Unknown,
        };
        assert_eq!(req.evaluate(&eval, LogicMode::Kleene), TriState::False);
    }

    #[test]
    fn empty_and_or_use_identity_values() {
        let empty_and: Requirement<u8> = Requirement::and([]);
        let empty_or: Requirement<u8> = Requirement::or([]);
        let eval = eval_fn(TriState::Unknown);
        assert_eq!(empty_and.evaluate(&eval, LogicMode::Kleene), TriState::True);
        assert_eq!(empty_or.evaluate(&eval, LogicMode::Kleene), TriState::False);
    }

    #[test]
    fn trace_mirrors_tree_shape_with_results() {
        let req = Requirement::and([Requirement::condition(1u8), Requirement::condition(2u8)]);
        let eval = |p: &u8| if *p == 1 { TriState::True } else { TriState::False };
        let (result, trace) = req.evaluate_with_trace(&eval, LogicMode::Kleene);
        assert_eq!(result, TriState::False);
        assert_eq!(trace.result(), TriState::False);
    }
}
