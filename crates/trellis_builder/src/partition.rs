//! Partition assignment.
//!
//! Each rule compiles into a partition. A node takes the partition of the
//! first rule that creates or touches it; when a rule from a different
//! partition touches it later, the node is promoted to
//! [`PartitionId::SHARED`]. Compilation never moves a node out of the
//! shared partition. Retraction may, but only through [`repartition`].
//!
//! [`repartition`]: PartitionAssigner::repartition

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;
use trellis_foundation::{NodeId, PartitionId, Result, RuleId};
use trellis_network::{KnowledgeBase, Network, Node};

/// Outcome of stamping a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stamp {
    /// The node had no partition and took the rule's.
    Claimed,
    /// The node already carried this partition, or was already shared.
    Unchanged,
    /// The node moved to the shared partition.
    Promoted,
}

/// Stateless partition policy.
pub struct PartitionAssigner;

impl PartitionAssigner {
    /// Picks the partition a new rule compiles into.
    ///
    /// Every rule gets a fresh partition when partitioning is enabled;
    /// otherwise everything lives in the shared partition.
    pub fn assign_rule(kb: &mut KnowledgeBase) -> PartitionId {
        if kb.config().partitioning {
            kb.next_partition()
        } else {
            PartitionId::SHARED
        }
    }

    /// Stamps a node created or touched by a rule of `partition`.
    pub fn stamp(node: &mut Node, partition: PartitionId) -> Stamp {
        match node.partition {
            None => {
                node.partition = Some(partition);
                Stamp::Claimed
            }
            Some(current) if current == partition || current.is_shared() => Stamp::Unchanged,
            Some(current) => {
                debug!(node = %node.id, from = %current, "node promoted to shared partition");
                node.partition = Some(PartitionId::SHARED);
                Stamp::Promoted
            }
        }
    }

    /// Recomputes a node's partition from the rules still using it.
    ///
    /// A node used by rules of a single partition returns to that
    /// partition; rules from several partitions keep it shared. A node no
    /// rule uses keeps whatever it had.
    ///
    /// # Errors
    /// Returns `NodeNotFound` if the node does not exist.
    pub fn repartition(
        network: &mut Network,
        node: NodeId,
        rule_partitions: &BTreeMap<RuleId, PartitionId>,
    ) -> Result<Option<PartitionId>> {
        let node = network.require_mut(node)?;
        let partitions: BTreeSet<PartitionId> = node
            .rules
            .iter()
            .filter_map(|rule| rule_partitions.get(rule).copied())
            .collect();

        let target = match partitions.len() {
            0 => return Ok(node.partition),
            1 => partitions.into_iter().next(),
            _ => Some(PartitionId::SHARED),
        };
        if target != node.partition {
            debug!(node = %node.id, ?target, "node repartitioned");
            node.partition = target;
        }
        Ok(node.partition)
    }
}
