//! The pattern ledger: patterns bound at the current nesting depth, in
//! tuple order.
//!
//! The ledger never holds more patterns than the current pattern offset.
//! Leaving a subnetwork restores the offset, which truncates the ledger
//! back to the patterns visible outside it.

use std::sync::Arc;

use trellis_foundation::{Error, Result};
use trellis_network::{BetaConstraint, Declaration, QueryArgument};

use crate::condition::Pattern;

// =============================================================================
// Pattern Ledger
// =============================================================================

/// Patterns bound at the current depth; index = tuple position.
#[derive(Clone, Debug, Default)]
pub struct PatternLedger {
    patterns: Vec<Arc<Pattern>>,
}

impl PatternLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pattern.
    pub fn push(&mut self, pattern: Arc<Pattern>) {
        self.patterns.push(pattern);
    }

    /// Drops every pattern past `len`.
    pub fn truncate(&mut self, len: usize) {
        self.patterns.truncate(len);
    }

    /// Removes every pattern.
    pub fn clear(&mut self) {
        self.patterns.clear();
    }

    /// Iterates patterns in tuple order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Pattern>> + '_ {
        self.patterns.iter()
    }

    /// Returns the pattern at a tuple position.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&Arc<Pattern>> {
        self.patterns.get(position)
    }

    /// Returns the most recently bound pattern.
    #[must_use]
    pub fn last(&self) -> Option<&Arc<Pattern>> {
        self.patterns.last()
    }

    /// Finds the tuple position of the pattern declared at `offset`.
    #[must_use]
    pub fn find(&self, offset: usize) -> Option<usize> {
        self.patterns
            .iter()
            .position(|pattern| pattern.offset == offset && !pattern.is_synthetic())
    }

    /// Returns true if a pattern at `offset` is bound in scope.
    #[must_use]
    pub fn binds(&self, offset: usize) -> bool {
        self.find(offset).is_some()
    }

    /// Returns true if joining `pattern` onto the bound patterns would
    /// relate them by nothing but a cross product.
    ///
    /// With `suppress_synthetic` set, the identity guard injected by
    /// for-all expansion does not count as a relation.
    #[must_use]
    pub fn is_cross_product(&self, pattern: &Pattern, suppress_synthetic: bool) -> bool {
        if self.is_empty() {
            return false;
        }
        !pattern
            .join_constraints()
            .iter()
            .filter(|c| !(suppress_synthetic && c.is_synthetic()))
            .any(|c| self.binds(c.referenced_offset()))
    }

    /// Rewrites declaration offsets into tuple positions.
    ///
    /// Node constraints refer to tuple positions so that two rules binding
    /// the same prefix compare equal however their patterns were numbered.
    ///
    /// # Errors
    /// Returns `UnboundDeclaration` if a constraint reads from a pattern
    /// that is not bound in scope.
    pub fn resolve(&self, constraints: &[BetaConstraint]) -> Result<Vec<BetaConstraint>> {
        constraints
            .iter()
            .map(|constraint| {
                let offset = constraint.referenced_offset();
                self.find(offset)
                    .map(|position| constraint.with_referenced_offset(position))
                    .ok_or_else(|| Error::unbound_declaration(offset, describe_field(constraint)))
            })
            .collect()
    }

    /// Rewrites bound query arguments into tuple positions.
    ///
    /// # Errors
    /// Returns `UnboundDeclaration` if an argument is not bound in scope.
    pub fn resolve_arguments(&self, arguments: &[QueryArgument]) -> Result<Vec<QueryArgument>> {
        arguments
            .iter()
            .map(|argument| match argument {
                QueryArgument::Literal(_) => Ok(argument.clone()),
                QueryArgument::Bound(declaration) => self
                    .find(declaration.offset)
                    .map(|position| {
                        QueryArgument::Bound(Declaration::new(position, declaration.field))
                    })
                    .ok_or_else(|| {
                        Error::unbound_declaration(
                            declaration.offset,
                            format!("{:?}", declaration.field),
                        )
                    }),
            })
            .collect()
    }

    /// Number of bound patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn describe_field(constraint: &BetaConstraint) -> String {
    match constraint {
        BetaConstraint::Join { declaration, .. } => format!("{:?}", declaration.field),
        BetaConstraint::ForallIdentity { .. } => "this".to_string(),
        BetaConstraint::Temporal { .. } => "timestamp".to_string(),
    }
}

// =============================================================================
// Last Built Patterns
// =============================================================================

/// The two most recently attached patterns; newest first.
#[derive(Clone, Debug, Default)]
pub struct LastBuiltPatterns {
    slots: [Option<Arc<Pattern>>; 2],
}

impl LastBuiltPatterns {
    /// Records a newly attached pattern, shifting the previous one down.
    pub fn record(&mut self, pattern: Arc<Pattern>) {
        self.slots[1] = self.slots[0].take();
        self.slots[0] = Some(pattern);
    }

    /// The most recently attached pattern.
    #[must_use]
    pub fn latest(&self) -> Option<&Arc<Pattern>> {
        self.slots[0].as_ref()
    }

    /// The pattern attached before the latest.
    #[must_use]
    pub fn previous(&self) -> Option<&Arc<Pattern>> {
        self.slots[1].as_ref()
    }

    /// Forgets both slots.
    pub fn clear(&mut self) {
        self.slots = [None, None];
    }
}
