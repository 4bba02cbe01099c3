//! The build context: mutable state threaded through the compilation of
//! one rule.
//!
//! The context tracks where the next node attaches (the current tuple and
//! object sources), how many patterns are bound (the pattern offset and
//! the ledger kept in step with it), the two traversal stacks, and every
//! node the rule created or touched so a failed build can be undone.
//!
//! One context compiles one rule. The knowledge base, its id allocator
//! and the partition persist across rules; everything else is cleared by
//! [`BuildContext::reset_for_rule`].

use std::sync::Arc;

use tracing::{debug, trace};
use trellis_foundation::{
    EntryPointId, Error, ErrorContext, NodeId, PartitionId, Result, RuleId, StackKind,
};
use trellis_network::{
    AlphaConstraint, BetaConstraint, ComponentFactory, Expiration, KnowledgeBase, Network, Node,
    NodeKind, ObjectSource, RuleComponent, TupleSource, WorkingMemory,
};

use crate::condition::{ConditionElement, Pattern, RuleDefinition, SubRule};
use crate::ledger::{LastBuiltPatterns, PatternLedger};
use crate::partition::PartitionAssigner;
use crate::stack::{BuildStack, RuleComponentStack};
use crate::temporal::TemporalDependencyMatrix;

// =============================================================================
// Attached Nodes
// =============================================================================

/// A node the current rule created or started referencing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttachedNode {
    /// The node.
    pub id: NodeId,
    /// True if the rule created the node; false if it shared an existing one.
    pub created: bool,
    /// Partition before the rule touched the node.
    pub previous_partition: Option<PartitionId>,
    /// Temporal annotation before the rule touched the node.
    pub previous_temporal: Option<Expiration>,
}

// =============================================================================
// Build Context
// =============================================================================

/// State of one rule compilation against a knowledge base.
pub struct BuildContext<'kb> {
    kb: &'kb mut KnowledgeBase,
    component_factory: Arc<dyn ComponentFactory>,
    working_memories: Option<Vec<Arc<dyn WorkingMemory>>>,

    tuple_source: Option<TupleSource>,
    object_source: Option<ObjectSource>,
    root_object_type_node: Option<NodeId>,

    current_pattern_offset: usize,
    object_types: PatternLedger,
    build_stack: Option<BuildStack>,
    rule_components: Option<RuleComponentStack>,
    last_built_patterns: LastBuiltPatterns,

    alpha_constraints: Vec<AlphaConstraint>,
    beta_constraints: Vec<BetaConstraint>,
    current_entry_point: EntryPointId,

    tuple_memory_enabled: bool,
    object_type_node_memory_enabled: bool,
    empty_forall_beta_constraints: bool,

    rule: Option<Arc<RuleDefinition>>,
    rule_id: Option<RuleId>,
    query: bool,
    sub_rule: Option<SubRule>,

    nodes: Vec<AttachedNode>,
    partition_id: Option<PartitionId>,
    temporal_distance: Option<Arc<TemporalDependencyMatrix>>,
}

impl<'kb> BuildContext<'kb> {
    /// Creates a context over a knowledge base.
    #[must_use]
    pub fn new(kb: &'kb mut KnowledgeBase) -> Self {
        let component_factory = kb.component_factory();
        let object_type_node_memory_enabled = kb.config().object_type_memory;
        Self {
            kb,
            component_factory,
            working_memories: None,
            tuple_source: None,
            object_source: None,
            root_object_type_node: None,
            current_pattern_offset: 0,
            object_types: PatternLedger::new(),
            build_stack: None,
            rule_components: None,
            last_built_patterns: LastBuiltPatterns::default(),
            alpha_constraints: Vec::new(),
            beta_constraints: Vec::new(),
            current_entry_point: EntryPointId::Default,
            tuple_memory_enabled: true,
            object_type_node_memory_enabled,
            empty_forall_beta_constraints: false,
            rule: None,
            rule_id: None,
            query: false,
            sub_rule: None,
            nodes: Vec::new(),
            partition_id: None,
            temporal_distance: None,
        }
    }

    // -------------------------------------------------------------------------
    // Pattern offset and ledger
    // -------------------------------------------------------------------------

    /// Number of tuple slots bound so far.
    #[must_use]
    pub fn current_pattern_offset(&self) -> usize {
        self.current_pattern_offset
    }

    /// Sets the pattern offset and truncates the ledger to match.
    pub fn set_current_pattern_offset(&mut self, offset: usize) {
        self.current_pattern_offset = offset;
        self.sync_object_types_with_pattern_offset();
    }

    /// Advances the pattern offset by one.
    pub fn increment_current_pattern_offset(&mut self) {
        self.current_pattern_offset += 1;
    }

    /// Steps the pattern offset back by one and truncates the ledger.
    ///
    /// # Errors
    /// Returns an internal error if the offset is already zero.
    pub fn decrement_current_pattern_offset(&mut self) -> Result<()> {
        self.current_pattern_offset = self
            .current_pattern_offset
            .checked_sub(1)
            .ok_or_else(|| Error::internal("pattern offset decremented below zero"))?;
        self.sync_object_types_with_pattern_offset();
        Ok(())
    }

    /// Truncates the ledger to the current pattern offset.
    pub fn sync_object_types_with_pattern_offset(&mut self) {
        self.object_types.truncate(self.current_pattern_offset);
    }

    /// Patterns bound at the current depth.
    #[must_use]
    pub fn object_types(&self) -> &PatternLedger {
        &self.object_types
    }

    /// Binds a pattern into the next tuple slot.
    ///
    /// The offset advances first so the ledger never outgrows it.
    pub fn bind_pattern(&mut self, pattern: Arc<Pattern>) {
        self.increment_current_pattern_offset();
        self.object_types.push(pattern);
    }

    /// Replaces the ledger wholesale.
    ///
    /// # Errors
    /// Returns an internal error if the ledger is longer than the offset.
    pub fn set_object_types(&mut self, ledger: PatternLedger) -> Result<()> {
        if ledger.len() > self.current_pattern_offset {
            return Err(Error::internal(format!(
                "ledger of {} pattern(s) exceeds offset {}",
                ledger.len(),
                self.current_pattern_offset
            )));
        }
        self.object_types = ledger;
        Ok(())
    }

    /// Records a successfully attached pattern.
    pub fn set_last_built_pattern(&mut self, pattern: Arc<Pattern>) {
        self.last_built_patterns.record(pattern);
    }

    /// The two most recently attached patterns.
    #[must_use]
    pub fn last_built_patterns(&self) -> &LastBuiltPatterns {
        &self.last_built_patterns
    }

    // -------------------------------------------------------------------------
    // Build stack
    // -------------------------------------------------------------------------

    /// Pushes a condition element.
    pub fn push(&mut self, element: ConditionElement) {
        self.build_stack
            .get_or_insert_with(BuildStack::new)
            .push(element);
    }

    /// Pops the innermost condition element.
    ///
    /// # Errors
    /// Returns `EmptyStack` if nothing was pushed.
    pub fn pop(&mut self) -> Result<ConditionElement> {
        self.build_stack
            .as_mut()
            .ok_or_else(|| Error::empty_stack(StackKind::Build))?
            .pop()
    }

    /// Returns the innermost condition element.
    ///
    /// # Errors
    /// Returns `EmptyStack` if nothing was pushed.
    pub fn peek(&self) -> Result<&ConditionElement> {
        self.build_stack
            .as_ref()
            .ok_or_else(|| Error::empty_stack(StackKind::Build))?
            .peek()
    }

    /// Iterates the enclosing condition elements, innermost first.
    pub fn stack_iter(&self) -> impl Iterator<Item = &ConditionElement> + '_ {
        self.build_stack.iter().flat_map(BuildStack::iter)
    }

    /// The build stack, once something was pushed.
    #[must_use]
    pub fn build_stack(&self) -> Option<&BuildStack> {
        self.build_stack.as_ref()
    }

    // -------------------------------------------------------------------------
    // Rule component trace
    // -------------------------------------------------------------------------

    /// Pushes a rule component.
    pub fn push_rule_component(&mut self, component: RuleComponent) {
        self.rule_components
            .get_or_insert_with(RuleComponentStack::new)
            .push(component);
    }

    /// Pops the innermost rule component.
    ///
    /// # Errors
    /// Returns `EmptyStack` if nothing was pushed.
    pub fn pop_rule_component(&mut self) -> Result<RuleComponent> {
        self.rule_components
            .as_mut()
            .ok_or_else(|| Error::empty_stack(StackKind::RuleComponent))?
            .pop()
    }

    /// Returns the innermost rule component, if any.
    #[must_use]
    pub fn peek_rule_component(&self) -> Option<&RuleComponent> {
        self.rule_components.as_ref().and_then(RuleComponentStack::peek)
    }

    /// Fails unless both stacks are empty.
    ///
    /// # Errors
    /// Returns `UnbalancedStack` naming the first non-empty stack.
    pub fn check_balanced(&self) -> Result<()> {
        if let Some(stack) = &self.build_stack {
            stack.check_balanced()?;
        }
        if let Some(stack) = &self.rule_components {
            stack.check_balanced()?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Rule
    // -------------------------------------------------------------------------

    /// Sets the rule being compiled; the query flag follows the rule.
    pub fn set_rule(&mut self, rule: Arc<RuleDefinition>, id: RuleId) {
        self.query = rule.is_query();
        self.rule = Some(rule);
        self.rule_id = Some(id);
    }

    /// The rule being compiled.
    #[must_use]
    pub fn rule(&self) -> Option<&Arc<RuleDefinition>> {
        self.rule.as_ref()
    }

    /// Id of the rule being compiled.
    #[must_use]
    pub fn rule_id(&self) -> Option<RuleId> {
        self.rule_id
    }

    /// Returns true while compiling a query.
    #[must_use]
    pub fn is_query(&self) -> bool {
        self.query
    }

    /// Sets the sub-rule being compiled.
    pub fn set_sub_rule(&mut self, sub_rule: Option<SubRule>) {
        self.sub_rule = sub_rule;
    }

    /// The sub-rule being compiled.
    #[must_use]
    pub fn sub_rule(&self) -> Option<&SubRule> {
        self.sub_rule.as_ref()
    }

    // -------------------------------------------------------------------------
    // Attachment points
    // -------------------------------------------------------------------------

    /// Where the next beta node takes its left input.
    #[must_use]
    pub fn tuple_source(&self) -> Option<TupleSource> {
        self.tuple_source
    }

    /// Sets the left attachment point.
    pub fn set_tuple_source(&mut self, source: Option<TupleSource>) {
        self.tuple_source = source;
    }

    /// Where the next node takes its object input.
    #[must_use]
    pub fn object_source(&self) -> Option<ObjectSource> {
        self.object_source
    }

    /// Sets the object attachment point.
    pub fn set_object_source(&mut self, source: Option<ObjectSource>) {
        self.object_source = source;
    }

    /// Object-type root of the pattern being attached.
    #[must_use]
    pub fn root_object_type_node(&self) -> Option<NodeId> {
        self.root_object_type_node
    }

    /// Sets the object-type root of the pattern being attached.
    pub fn set_root_object_type_node(&mut self, node: Option<NodeId>) {
        self.root_object_type_node = node;
    }

    /// Entry point of the pattern being attached.
    #[must_use]
    pub fn current_entry_point(&self) -> &EntryPointId {
        &self.current_entry_point
    }

    /// Sets the entry point of the pattern being attached.
    pub fn set_current_entry_point(&mut self, entry_point: EntryPointId) {
        self.current_entry_point = entry_point;
    }

    // -------------------------------------------------------------------------
    // Staged constraints
    // -------------------------------------------------------------------------

    /// Literal constraints of the pattern being attached.
    #[must_use]
    pub fn alpha_constraints(&self) -> &[AlphaConstraint] {
        &self.alpha_constraints
    }

    /// Stages literal constraints.
    pub fn set_alpha_constraints(&mut self, constraints: Vec<AlphaConstraint>) {
        self.alpha_constraints = constraints;
    }

    /// Resolved join constraints of the beta node being attached.
    #[must_use]
    pub fn beta_constraints(&self) -> &[BetaConstraint] {
        &self.beta_constraints
    }

    /// Stages join constraints.
    pub fn set_beta_constraints(&mut self, constraints: Vec<BetaConstraint>) {
        self.beta_constraints = constraints;
    }

    // -------------------------------------------------------------------------
    // Flags
    // -------------------------------------------------------------------------

    /// Whether beta nodes built now memorize left tuples.
    #[must_use]
    pub fn is_tuple_memory_enabled(&self) -> bool {
        self.tuple_memory_enabled
    }

    /// Sets whether beta nodes built now memorize left tuples.
    pub fn set_tuple_memory_enabled(&mut self, enabled: bool) {
        self.tuple_memory_enabled = enabled;
    }

    /// Whether object-type roots created now memorize facts.
    #[must_use]
    pub fn is_object_type_node_memory_enabled(&self) -> bool {
        self.object_type_node_memory_enabled
    }

    /// Sets whether object-type roots created now memorize facts.
    pub fn set_object_type_node_memory_enabled(&mut self, enabled: bool) {
        self.object_type_node_memory_enabled = enabled;
    }

    /// Whether the for-all identity guard is ignored by sharing.
    #[must_use]
    pub fn is_empty_forall_beta_constraints(&self) -> bool {
        self.empty_forall_beta_constraints
    }

    /// Sets whether the for-all identity guard is ignored by sharing.
    pub fn set_empty_forall_beta_constraints(&mut self, empty: bool) {
        self.empty_forall_beta_constraints = empty;
    }

    // -------------------------------------------------------------------------
    // Partition and temporal analysis
    // -------------------------------------------------------------------------

    /// Partition of the rule being compiled.
    #[must_use]
    pub fn partition_id(&self) -> Option<PartitionId> {
        self.partition_id
    }

    /// Sets the partition of the rule being compiled.
    pub fn set_partition_id(&mut self, partition: Option<PartitionId>) {
        self.partition_id = partition;
    }

    /// Temporal matrix of the rule, in stream mode.
    #[must_use]
    pub fn temporal_distance(&self) -> Option<&Arc<TemporalDependencyMatrix>> {
        self.temporal_distance.as_ref()
    }

    /// Attaches or clears the temporal matrix.
    pub fn set_temporal_distance(&mut self, matrix: Option<Arc<TemporalDependencyMatrix>>) {
        self.temporal_distance = matrix;
    }

    /// Returns true iff a temporal matrix is attached.
    #[must_use]
    pub fn is_stream_mode(&self) -> bool {
        self.temporal_distance.is_some()
    }

    /// Retention requirement for facts matched by `pattern`, in stream mode.
    #[must_use]
    pub fn expiration_for(&self, pattern: &Pattern) -> Option<Expiration> {
        let matrix = self.temporal_distance.as_ref()?;
        (pattern.event && !pattern.is_synthetic()).then(|| matrix.expiration_offset(pattern.offset))
    }

    // -------------------------------------------------------------------------
    // Knowledge base access
    // -------------------------------------------------------------------------

    /// The knowledge base.
    #[must_use]
    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &*self.kb
    }

    /// The knowledge base, mutably.
    pub fn knowledge_base_mut(&mut self) -> &mut KnowledgeBase {
        &mut *self.kb
    }

    /// The network being built.
    #[must_use]
    pub fn network(&self) -> &Network {
        self.kb.network()
    }

    /// The component factory nodes are built with.
    #[must_use]
    pub fn component_factory(&self) -> &Arc<dyn ComponentFactory> {
        &self.component_factory
    }

    /// Overrides the component factory for this compilation.
    pub fn set_component_factory(&mut self, factory: Arc<dyn ComponentFactory>) {
        self.component_factory = factory;
    }

    /// Working memories attached to the knowledge base, read once.
    pub fn working_memories(&mut self) -> &[Arc<dyn WorkingMemory>] {
        let kb = &*self.kb;
        self.working_memories
            .get_or_insert_with(|| kb.working_memories())
    }

    /// Issues a node id.
    pub fn next_id(&mut self) -> NodeId {
        self.kb.ids_mut().next_id()
    }

    /// Returns a node id to the allocator.
    ///
    /// # Errors
    /// Returns an error if the id is not currently allocated.
    pub fn release_id(&mut self, id: NodeId) -> Result<()> {
        self.kb.ids_mut().release_id(id)
    }

    // -------------------------------------------------------------------------
    // Node attachment
    // -------------------------------------------------------------------------

    /// Every node the rule created or touched, in attachment order.
    #[must_use]
    pub fn nodes(&self) -> &[AttachedNode] {
        &self.nodes
    }

    /// Takes the attachment record, leaving it empty.
    pub fn take_nodes(&mut self) -> Vec<AttachedNode> {
        std::mem::take(&mut self.nodes)
    }

    /// Creates a node, inserts it into the network, and claims it for the
    /// current rule.
    ///
    /// The innermost rule component is stamped onto the node as its origin.
    ///
    /// # Errors
    /// Returns an error if no rule is set or the network rejects the node.
    pub fn create_node(&mut self, kind: NodeKind, temporal: Option<Expiration>) -> Result<NodeId> {
        self.require_rule_id()?;
        let id = self.next_id();
        let mut node = Node::new(id, kind);
        node.origin = self.peek_rule_component().cloned();
        if let Err(err) = self.kb.network_mut().insert(node) {
            self.release_id(id)?;
            return Err(err);
        }
        self.nodes.push(AttachedNode {
            id,
            created: true,
            previous_partition: None,
            previous_temporal: None,
        });
        self.claim(id, temporal)?;
        debug!(node = %id, "node created");
        Ok(id)
    }

    /// Claims an existing node for the current rule.
    ///
    /// # Errors
    /// Returns an error if no rule is set or the node does not exist.
    pub fn share_node(&mut self, id: NodeId, temporal: Option<Expiration>) -> Result<NodeId> {
        let rule = self.require_rule_id()?;
        let node = self.kb.network().require(id)?;
        if !node.rules.contains(&rule) {
            self.nodes.push(AttachedNode {
                id,
                created: false,
                previous_partition: node.partition,
                previous_temporal: node.temporal,
            });
        }
        self.claim(id, temporal)?;
        trace!(node = %id, "node shared");
        Ok(id)
    }

    /// Adds the rule to the node's owners, stamps its partition, and merges
    /// its retention requirement.
    fn claim(&mut self, id: NodeId, temporal: Option<Expiration>) -> Result<()> {
        let rule = self.require_rule_id()?;
        let partition = self.partition_id.unwrap_or(PartitionId::SHARED);
        let node = self.kb.network_mut().require_mut(id)?;
        node.rules.insert(rule);
        PartitionAssigner::stamp(node, partition);
        if let Some(expiration) = temporal {
            node.require_retention(rule, expiration);
        }
        Ok(())
    }

    fn require_rule_id(&self) -> Result<RuleId> {
        self.rule_id
            .ok_or_else(|| Error::internal("no rule set on build context"))
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Clears per-sub-rule state before traversing the next sub-rule.
    pub fn reset_for_sub_rule(&mut self) {
        self.tuple_source = None;
        self.object_source = None;
        self.root_object_type_node = None;
        self.set_current_pattern_offset(0);
        self.last_built_patterns.clear();
        self.alpha_constraints.clear();
        self.beta_constraints.clear();
        self.current_entry_point = EntryPointId::Default;
        self.tuple_memory_enabled = true;
        self.empty_forall_beta_constraints = false;
        self.sub_rule = None;
    }

    /// Clears per-rule state so the context can compile another rule.
    ///
    /// The knowledge base, component factory and partition are kept.
    ///
    /// # Errors
    /// Returns `UnbalancedStack` if the previous rule left its stacks
    /// unbalanced.
    pub fn reset_for_rule(&mut self) -> Result<()> {
        self.check_balanced()?;
        self.reset_for_sub_rule();
        self.build_stack = None;
        self.rule_components = None;
        self.object_type_node_memory_enabled = self.kb.config().object_type_memory;
        self.rule = None;
        self.rule_id = None;
        self.query = false;
        self.nodes.clear();
        self.temporal_distance = None;
        self.working_memories = None;
        Ok(())
    }

    /// Drops whatever the stacks hold after a failed traversal.
    pub fn discard_stacks(&mut self) {
        self.build_stack = None;
        self.rule_components = None;
    }

    /// Checks the stacks are balanced and hands back the attachment record.
    ///
    /// # Errors
    /// Returns `UnbalancedStack` if a stack is not empty.
    pub fn finish(&mut self) -> Result<Vec<AttachedNode>> {
        self.check_balanced()?;
        Ok(self.take_nodes())
    }

    /// Describes where the traversal is, for error reports.
    #[must_use]
    pub fn error_context(&self) -> ErrorContext {
        let mut context = ErrorContext::new();
        if let Some(rule) = &self.rule {
            context = context.with_rule(rule.name.clone());
        }
        if let Some(offset) = self
            .build_stack
            .as_ref()
            .and_then(BuildStack::innermost_pattern_offset)
            .filter(|offset| *offset != Pattern::SYNTHETIC_OFFSET)
        {
            context = context.with_pattern_offset(offset);
        }
        let frames: Vec<String> = self.stack_iter().map(ToString::to_string).collect();
        for frame in frames.into_iter().rev() {
            context = context.with_frame(frame);
        }
        context
    }
}
