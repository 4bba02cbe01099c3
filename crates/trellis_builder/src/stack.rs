//! The two build-time stacks: condition elements being traversed and the
//! rule components being traced.
//!
//! Both must be empty when a rule starts and when it finishes. A pop or
//! peek that finds nothing means the traversal pushed and popped out of
//! step; that is reported as an error, never papered over.

use trellis_foundation::{Error, Result, StackKind};
use trellis_network::RuleComponent;

use crate::condition::{ConditionElement, GroupKind};

// =============================================================================
// Build Stack
// =============================================================================

/// Condition elements enclosing the element being attached.
#[derive(Clone, Debug, Default)]
pub struct BuildStack {
    elements: Vec<ConditionElement>,
}

impl BuildStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes an element.
    pub fn push(&mut self, element: ConditionElement) {
        self.elements.push(element);
    }

    /// Pops the top element.
    ///
    /// # Errors
    /// Returns `EmptyStack` if nothing was pushed.
    pub fn pop(&mut self) -> Result<ConditionElement> {
        self.elements
            .pop()
            .ok_or_else(|| Error::empty_stack(StackKind::Build))
    }

    /// Returns the top element.
    ///
    /// # Errors
    /// Returns `EmptyStack` if nothing was pushed.
    pub fn peek(&self) -> Result<&ConditionElement> {
        self.elements
            .last()
            .ok_or_else(|| Error::empty_stack(StackKind::Build))
    }

    /// Iterates from the top of the stack down.
    pub fn iter(&self) -> impl Iterator<Item = &ConditionElement> + '_ {
        self.elements.iter().rev()
    }

    /// Returns true if a group of this kind encloses the current element.
    #[must_use]
    pub fn enclosing(&self, kind: GroupKind) -> bool {
        self.iter()
            .any(|element| matches!(element, ConditionElement::Group(g) if g.kind == kind))
    }

    /// Offset of the innermost enclosing pattern, if any.
    #[must_use]
    pub fn innermost_pattern_offset(&self) -> Option<usize> {
        self.iter().find_map(ConditionElement::pattern_offset)
    }

    /// Number of elements on the stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Fails unless the stack is empty.
    ///
    /// # Errors
    /// Returns `UnbalancedStack` with the number of leftover elements.
    pub fn check_balanced(&self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::unbalanced_stack(StackKind::Build, self.depth()))
        }
    }
}

// =============================================================================
// Rule Component Trace
// =============================================================================

/// Rule-language constructs enclosing the node being created.
///
/// Unlike the build stack, peeking an empty trace is not an error: at the
/// top level there is simply no construct to attribute a node to.
#[derive(Clone, Debug, Default)]
pub struct RuleComponentStack {
    components: Vec<RuleComponent>,
}

impl RuleComponentStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a component.
    pub fn push(&mut self, component: RuleComponent) {
        self.components.push(component);
    }

    /// Pops the top component.
    ///
    /// # Errors
    /// Returns `EmptyStack` if nothing was pushed.
    pub fn pop(&mut self) -> Result<RuleComponent> {
        self.components
            .pop()
            .ok_or_else(|| Error::empty_stack(StackKind::RuleComponent))
    }

    /// Returns the top component, if any.
    #[must_use]
    pub fn peek(&self) -> Option<&RuleComponent> {
        self.components.last()
    }

    /// Iterates from the top of the stack down.
    pub fn iter(&self) -> impl Iterator<Item = &RuleComponent> + '_ {
        self.components.iter().rev()
    }

    /// Number of components on the stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// Returns true if the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Fails unless the stack is empty.
    ///
    /// # Errors
    /// Returns `UnbalancedStack` with the number of leftover components.
    pub fn check_balanced(&self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::unbalanced_stack(StackKind::RuleComponent, self.depth()))
        }
    }
}
