//! Error types for network construction.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.
//! Every kind here aborts the compilation of the current rule; none of
//! them is recovered silently.

use std::fmt;

use thiserror::Error;

use crate::ids::{NodeId, RuleId};

/// Result alias used throughout Trellis.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Trellis operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates an empty stack error.
    #[must_use]
    pub fn empty_stack(stack: StackKind) -> Self {
        Self::new(ErrorKind::EmptyStack(stack))
    }

    /// Creates an unbalanced stack error.
    #[must_use]
    pub fn unbalanced_stack(stack: StackKind, depth: usize) -> Self {
        Self::new(ErrorKind::UnbalancedStack { stack, depth })
    }

    /// Creates an error for releasing an id that was never handed out.
    #[must_use]
    pub fn id_never_allocated(id: NodeId) -> Self {
        Self::new(ErrorKind::IdNeverAllocated(id))
    }

    /// Creates an error for releasing an id twice.
    #[must_use]
    pub fn id_already_released(id: NodeId) -> Self {
        Self::new(ErrorKind::IdAlreadyReleased(id))
    }

    /// Creates a node not found error.
    #[must_use]
    pub fn node_not_found(id: NodeId) -> Self {
        Self::new(ErrorKind::NodeNotFound(id))
    }

    /// Creates a rule not found error.
    #[must_use]
    pub fn rule_not_found(id: RuleId) -> Self {
        Self::new(ErrorKind::RuleNotFound(id))
    }

    /// Creates a duplicate rule error.
    #[must_use]
    pub fn duplicate_rule(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateRule(name.into()))
    }

    /// Creates an unbound declaration error.
    #[must_use]
    pub fn unbound_declaration(offset: usize, field: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnboundDeclaration {
            offset,
            field: field.into(),
        })
    }

    /// Creates an unsatisfiable temporal constraint error.
    #[must_use]
    pub fn unsatisfiable_temporal(from: usize, to: usize) -> Self {
        Self::new(ErrorKind::UnsatisfiableTemporal { from, to })
    }

    /// Creates an unexpected element error.
    #[must_use]
    pub fn unexpected_element(description: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnexpectedElement(description.into()))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }

    /// Returns true if this error signals a bookkeeping defect in the
    /// traversal rather than a problem with the rule itself.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::EmptyStack(_)
                | ErrorKind::UnbalancedStack { .. }
                | ErrorKind::IdNeverAllocated(_)
                | ErrorKind::IdAlreadyReleased(_)
                | ErrorKind::Internal(_)
        )
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Pop or peek on a stack with nothing on it.
    #[error("{0} stack is empty")]
    EmptyStack(StackKind),

    /// A stack was not empty at the start or end of a rule.
    #[error("{stack} stack unbalanced: {depth} element(s) left")]
    UnbalancedStack {
        /// The offending stack.
        stack: StackKind,
        /// Number of elements still on the stack.
        depth: usize,
    },

    /// Released an id that was never allocated.
    #[error("node id {0} was never allocated")]
    IdNeverAllocated(NodeId),

    /// Released an id that is not currently allocated.
    #[error("node id {0} already released")]
    IdAlreadyReleased(NodeId),

    /// Node was not found in the network.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Rule was not registered with the knowledge base.
    #[error("rule not found: {0}")]
    RuleNotFound(RuleId),

    /// A rule with this name is already registered.
    #[error("duplicate rule: {0}")]
    DuplicateRule(String),

    /// A join constraint refers to a pattern that is not bound in scope.
    #[error("unbound declaration: pattern {offset} field {field}")]
    UnboundDeclaration {
        /// Offset of the referenced pattern.
        offset: usize,
        /// Field read from the referenced pattern.
        field: String,
    },

    /// Temporal constraints between two patterns admit no solution.
    #[error("unsatisfiable temporal constraints between patterns {from} and {to}")]
    UnsatisfiableTemporal {
        /// First pattern offset.
        from: usize,
        /// Second pattern offset.
        to: usize,
    },

    /// The traversal met an element it cannot attach at this position.
    #[error("unexpected element: {0}")]
    UnexpectedElement(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Which build-time stack an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackKind {
    /// The condition-element build stack.
    Build,
    /// The rule-component trace stack.
    RuleComponent,
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::RuleComponent => write!(f, "rule component"),
        }
    }
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Name of the rule being compiled.
    pub rule: Option<String>,
    /// Offset of the pattern being attached.
    pub pattern_offset: Option<usize>,
    /// Enclosing elements, outermost first.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rule name.
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Sets the offending pattern offset.
    #[must_use]
    pub fn with_pattern_offset(mut self, offset: usize) -> Self {
        self.pattern_offset = Some(offset);
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(rule) = &self.rule {
            write!(f, "in rule {rule}")?;
            if let Some(offset) = self.pattern_offset {
                write!(f, " at pattern {offset}")?;
            }
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  in {frame}")?;
            }
        }
        Ok(())
    }
}
