// crates/caseflow-logic/src/serde_support.rs
// ============================================================================
// Module: Requirement structural validation
// Description: Post-parse / post-deserialize structural limits for
//              Requirement trees (depth, group arity).
// Purpose: Keep untrusted requirement trees (from the DSL or a JSON config
//          payload) bounded before they are evaluated or persisted.
// Dependencies: crate::requirement
// ============================================================================

//! ## Overview
//!
//! A [`Requirement`] tree can be built directly (trusted, programmatic
//! construction), parsed from the DSL ([`crate::dsl::parse_requirement`]),
//! or deserialized from stored policy configuration. The latter two paths
//! treat the tree as untrusted input and run it through
//! [`RequirementValidator`] before it is accepted.

use std::fmt;

use crate::requirement::Requirement;

/// Default maximum tree depth accepted by [`RequirementValidator::with_defaults`].
const DEFAULT_MAX_DEPTH: usize = 32;
/// Default maximum member count for any single `And`/`Or`/`AtLeast` node.
const DEFAULT_MAX_GROUP_MEMBERS: usize = 256;

/// Structural problems found when validating a [`Requirement`] tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementValidationError {
    /// The tree's depth exceeded the configured maximum.
    DepthExceeded {
        /// Maximum allowed depth.
        max_depth: usize,
        /// Actual depth observed.
        actual_depth: usize,
    },
    /// An `AtLeast` group had no members.
    EmptyGroup,
    /// An `AtLeast` group's minimum exceeded its member count.
    GroupMinExceedsMembers {
        /// Configured minimum.
        min: u8,
        /// Number of members available.
        members: usize,
    },
    /// A composite node had more members than allowed.
    TooManyMembers {
        /// Maximum allowed members.
        max_members: usize,
        /// Actual member count observed.
        actual_members: usize,
    },
}

impl fmt::Display for RequirementValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepthExceeded {
                max_depth,
                actual_depth,
            } => {
                write!(f, "requirement depth {actual_depth} exceeds maximum {max_depth}")
            }
            Self::EmptyGroup => write!(f, "require_group has no members"),
            Self::GroupMinExceedsMembers {
                min,
                members,
            } => {
                write!(f, "require_group minimum {min} exceeds member count {members}")
            }
            Self::TooManyMembers {
                max_members,
                actual_members,
            } => {
                write!(f, "requirement node has {actual_members} members, exceeding maximum {max_members}")
            }
        }
    }
}

impl std::error::Error for RequirementValidationError {}

/// Validates structural limits on a [`Requirement`] tree.
///
/// # Invariants
/// - `max_depth` and `max_group_members` are both at least `1` once
///   constructed via [`Self::with_defaults`] or [`Self::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequirementValidator {
    /// Maximum accepted tree depth.
    max_depth: usize,
    /// Maximum accepted member count for any single composite node.
    max_group_members: usize,
}

impl RequirementValidator {
    /// Builds a validator with explicit limits.
    #[must_use]
    pub const fn new(max_depth: usize, max_group_members: usize) -> Self {
        Self {
            max_depth,
            max_group_members,
        }
    }

    /// Builds a validator using conservative defaults suitable for
    /// untrusted input (DSL text, stored policy configuration).
    #[must_use]
    pub const fn with_defaults() -> Self {
        Self::new(DEFAULT_MAX_DEPTH, DEFAULT_MAX_GROUP_MEMBERS)
    }

    /// Validates the given requirement tree against this validator's
    /// limits.
    ///
    /// # Errors
    /// Returns [`RequirementValidationError`] when the tree's depth or any
    /// node's member count exceeds the configured limits, or when an
    /// `AtLeast` group is empty or has a minimum greater than its member
    /// count.
    pub fn validate<P>(&self, requirement: &Requirement<P>) -> Result<(), RequirementValidationError> {
        let depth = requirement.depth();
        if depth > self.max_depth {
            return Err(RequirementValidationError::DepthExceeded {
                max_depth: self.max_depth,
                actual_depth: depth,
            });
        }
        self.validate_node(requirement)
    }

    /// Recursively validates per-node member-count and group-arity rules.
    fn validate_node<P>(&self, requirement: &Requirement<P>) -> Result<(), RequirementValidationError> {
        match requirement {
            Requirement::Condition(_) => Ok(()),
            Requirement::Not(inner) => self.validate_node(inner),
            Requirement::And(members) | Requirement::Or(members) => {
                self.check_member_count(members.len())?;
                members.iter().try_for_each(|m| self.validate_node(m))
            }
            Requirement::AtLeast {
                min,
                members,
            } => {
                if members.is_empty() {
                    return Err(RequirementValidationError::EmptyGroup);
                }
                self.check_member_count(members.len())?;
                if usize::from(*min) > members.len() {
                    return Err(RequirementValidationError::GroupMinExceedsMembers {
                        min: *min,
                        members: members.len(),
                    });
                }
                members.iter().try_for_each(|m| self.validate_node(m))
            }
        }
    }

    /// Checks a composite node's member count against the configured
    /// maximum.
    fn check_member_count(&self, actual: usize) -> Result<(), RequirementValidationError> {
        if actual > self.max_group_members {
            return Err(RequirementValidationError::TooManyMembers {
                max_members: self.max_group_members,
                actual_members: actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    reason = "test assertions only"
)]
mod tests {
    use super::RequirementValidationError;
    use super::RequirementValidator;
    use crate::requirement::Requirement;

    #[test]
    fn rejects_empty_require_group() {
        let req: Requirement<u8> = Requirement::require_group(1, []);
        let err = RequirementValidator::with_defaults().validate(&req).unwrap_err();
        assert_eq!(err, RequirementValidationError::EmptyGroup);
    }

    #[test]
    fn rejects_min_exceeding_member_count() {
        let req = Requirement::require_group(3, [Requirement::condition(1u8), Requirement::condition(2u8)]);
        let err = RequirementValidator::with_defaults().validate(&req).unwrap_err();
        assert_eq!(
            err,
            RequirementValidationError::GroupMinExceedsMembers {
                min: 3,
                members: 2
            }
        );
    }

    #[test]
    fn rejects_excessive_depth() {
        let mut req = Requirement::condition(0u8);
        for _ in 0 .. 10 {
            req = Requirement::negate(req);
        }
        let validator = RequirementValidator::new(5, 256);
        let err = validator.validate(&req).unwrap_err();
        assert!(matches!(err, RequirementValidationError::DepthExceeded { .. }));
    }

    #[test]
    fn accepts_well_formed_tree() {
        let req = Requirement::and([
            Requirement::condition(1u8),
            Requirement::require_group(1, [Requirement::condition(2u8), Requirement::condition(3u8)]),
        ]);
        assert!(RequirementValidator::with_defaults().validate(&req).is_ok());
    }
}
