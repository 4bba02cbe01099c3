//! Rule compilation into the shared network.
//!
//! [`ReteBuilder`] turns a [`RuleDefinition`] into nodes: it splits the body
//! into `or`-free sub-rules, walks each one depth-first, and ends every
//! sub-rule in its own terminal. Nodes are shared with earlier rules where
//! an equivalent node already exists. A failed build leaves the network as
//! it found it.

mod group;
mod pattern;
mod query;

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};
use trellis_foundation::{Error, NodeId, PartitionId, Result, RuleId};
use trellis_network::{KnowledgeBase, RuleComponent, RuleEntry};

use crate::condition::RuleDefinition;
use crate::context::{AttachedNode, BuildContext};
use crate::partition::PartitionAssigner;
use crate::temporal::TemporalDependencyMatrix;

// =============================================================================
// Results
// =============================================================================

/// Outcome of adding one rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleBuild {
    /// Id the rule was registered under.
    pub rule: RuleId,
    /// Partition the rule compiled into.
    pub partition: PartitionId,
    /// One terminal per sub-rule, in sub-rule order.
    pub terminals: Vec<NodeId>,
    /// Nodes the rule created.
    pub created: Vec<NodeId>,
    /// Pre-existing nodes the rule shares.
    pub shared: Vec<NodeId>,
}

impl RuleBuild {
    /// Every node the rule references, created ones first.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.created.iter().chain(self.shared.iter()).copied()
    }
}

/// Outcome of removing one rule.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleRemoval {
    /// Nodes no remaining rule used, now gone from the network.
    pub removed: Vec<NodeId>,
    /// Surviving nodes whose partition changed.
    pub repartitioned: Vec<NodeId>,
}

// =============================================================================
// Rete Builder
// =============================================================================

/// Compiles rules into a knowledge base's network.
pub struct ReteBuilder;

impl ReteBuilder {
    /// Compiles a rule into the knowledge base.
    ///
    /// # Errors
    /// Returns an error if the rule name is taken, the body is malformed,
    /// a join refers to an unbound pattern, or temporal constraints
    /// contradict each other. The network is left unchanged.
    pub fn add_rule(kb: &mut KnowledgeBase, rule: RuleDefinition) -> Result<RuleBuild> {
        let mut ctx = BuildContext::new(kb);
        Self::build(&mut ctx, rule)
    }

    /// Compiles several rules in order with one context.
    ///
    /// Stops at the first failure; rules compiled before it stay in the
    /// network.
    ///
    /// # Errors
    /// Returns the first rule's error, as [`add_rule`](Self::add_rule).
    pub fn add_rules(
        kb: &mut KnowledgeBase,
        rules: impl IntoIterator<Item = RuleDefinition>,
    ) -> Result<Vec<RuleBuild>> {
        let mut ctx = BuildContext::new(kb);
        rules
            .into_iter()
            .map(|rule| Self::build(&mut ctx, rule))
            .collect()
    }

    /// Compiles a rule with an existing context.
    ///
    /// The context is reset first, so it may be reused across rules.
    ///
    /// # Errors
    /// As [`add_rule`](Self::add_rule).
    #[instrument(skip_all, fields(rule = %rule.name))]
    pub fn build(ctx: &mut BuildContext<'_>, rule: RuleDefinition) -> Result<RuleBuild> {
        ctx.reset_for_rule()?;
        let rule = Arc::new(rule);
        let id = ctx.knowledge_base_mut().reserve_rule(&rule.name)?;
        let partition = PartitionAssigner::assign_rule(ctx.knowledge_base_mut());
        ctx.set_rule(Arc::clone(&rule), id);
        ctx.set_partition_id(Some(partition));

        let terminals = match Self::attach_sub_rules(ctx, &rule) {
            Ok(terminals) => terminals,
            Err(err) => {
                let context = ctx.error_context();
                let attached = ctx.take_nodes();
                ctx.discard_stacks();
                Self::rollback(ctx, id, &attached);
                warn!(error = %err, "rule build failed");
                return Err(err.with_context(context));
            }
        };

        let attached = ctx.finish()?;
        let nodes: Vec<NodeId> = attached.iter().map(|node| node.id).collect();
        let entry = RuleEntry {
            id,
            name: rule.name.clone(),
            query: rule.is_query(),
            partition,
            nodes: nodes.clone(),
        };
        if let Err(err) = ctx.knowledge_base_mut().register_rule(entry) {
            Self::rollback(ctx, id, &attached);
            return Err(err);
        }

        for memory in ctx.working_memories() {
            memory.nodes_attached(id, &nodes);
        }

        let (created, shared): (Vec<&AttachedNode>, Vec<&AttachedNode>) =
            attached.iter().partition(|node| node.created);
        let build = RuleBuild {
            rule: id,
            partition,
            terminals,
            created: created.into_iter().map(|node| node.id).collect(),
            shared: shared.into_iter().map(|node| node.id).collect(),
        };
        info!(
            %partition,
            created = build.created.len(),
            shared = build.shared.len(),
            "rule added"
        );
        Ok(build)
    }

    fn attach_sub_rules(ctx: &mut BuildContext<'_>, rule: &RuleDefinition) -> Result<Vec<NodeId>> {
        let stream = ctx.knowledge_base().config().is_stream();
        let sub_rules = rule.sub_rules()?;
        let mut terminals = Vec::with_capacity(sub_rules.len());
        for sub_rule in sub_rules {
            ctx.reset_for_sub_rule();
            ctx.check_balanced()?;
            // each disjunct is its own conjunction of events
            let matrix = if stream {
                Some(Arc::new(TemporalDependencyMatrix::calculate(&sub_rule.body.patterns())?))
            } else {
                None
            };
            ctx.set_temporal_distance(matrix);
            let body = sub_rule.body.clone();
            let index = sub_rule.index;
            ctx.set_sub_rule(Some(sub_rule));
            ctx.push_rule_component(RuleComponent::Rule {
                name: rule.name.clone(),
            });

            group::build_and(ctx, &body)?;
            if ctx.tuple_source().is_none() {
                pattern::attach_initial_fact(ctx)?;
            }
            terminals.push(query::attach_terminal(ctx)?);

            ctx.pop_rule_component()?;
            ctx.check_balanced()?;
            debug!(sub_rule = index, "sub-rule attached");
        }
        Ok(terminals)
    }

    /// Undoes a partial build, newest node first.
    ///
    /// Created nodes are removed and their ids released; shared nodes get
    /// their previous partition and retention back.
    fn rollback(ctx: &mut BuildContext<'_>, rule: RuleId, attached: &[AttachedNode]) {
        for record in attached.iter().rev() {
            if let Err(err) = Self::undo(ctx.knowledge_base_mut(), rule, record) {
                error!(node = %record.id, error = %err, "rollback failed");
            }
        }
        debug!(nodes = attached.len(), "build rolled back");
    }

    fn undo(kb: &mut KnowledgeBase, rule: RuleId, record: &AttachedNode) -> Result<()> {
        let (network, ids) = kb.network_and_ids_mut();
        if record.created {
            network.remove(record.id)?;
            ids.release_id(record.id)
        } else {
            let node = network.require_mut(record.id)?;
            node.rules.remove(&rule);
            node.expirations.remove(&rule);
            node.partition = record.previous_partition;
            node.temporal = record.previous_temporal;
            Ok(())
        }
    }

    /// Removes a rule from the network.
    ///
    /// Nodes the rule was the last user of are removed and their ids
    /// released; type roots stay. Surviving nodes are repartitioned and
    /// their retention recomputed from the rules still using them.
    ///
    /// # Errors
    /// Returns `RuleNotFound` if the rule is not registered, or an error if
    /// the network disagrees with the rule's node record.
    #[instrument(skip(kb))]
    pub fn remove_rule(kb: &mut KnowledgeBase, rule: RuleId) -> Result<RuleRemoval> {
        let entry = kb.unregister_rule(rule)?;
        let mut removal = RuleRemoval::default();
        let mut survivors = Vec::new();

        for &id in entry.nodes.iter().rev() {
            let (network, ids) = kb.network_and_ids_mut();
            let node = network.require_mut(id)?;
            node.rules.remove(&rule);
            node.release_retention(rule);
            if node.rules.is_empty() && !node.kind.is_root() {
                network.remove(id)?;
                ids.release_id(id)?;
                removal.removed.push(id);
            } else {
                survivors.push(id);
            }
        }

        let partitions = kb.rule_partitions();
        for id in survivors {
            let before = kb.network().require(id)?.partition;
            let after = PartitionAssigner::repartition(kb.network_mut(), id, &partitions)?;
            if after != before {
                removal.repartitioned.push(id);
            }
        }

        for memory in kb.working_memories() {
            memory.nodes_detached(rule, &removal.removed);
        }
        info!(
            name = %entry.name,
            removed = removal.removed.len(),
            repartitioned = removal.repartitioned.len(),
            "rule removed"
        );
        Ok(removal)
    }

    /// Removes a rule by name.
    ///
    /// # Errors
    /// Returns `Internal` if no rule has this name, otherwise as
    /// [`remove_rule`](Self::remove_rule).
    pub fn remove_rule_named(kb: &mut KnowledgeBase, name: &str) -> Result<RuleRemoval> {
        let id = kb
            .rule_by_name(name)
            .map(|entry| entry.id)
            .ok_or_else(|| Error::internal(format!("no rule named {name}")))?;
        Self::remove_rule(kb, id)
    }
}
