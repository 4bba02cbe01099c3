//! The knowledge base: owner of the network and everything that persists
//! across rule compilations.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use trellis_foundation::{Error, Interner, NodeId, PartitionId, Result, RuleId};

use crate::config::KnowledgeBaseConfig;
use crate::factory::ComponentFactory;
use crate::id_alloc::IdAllocator;
use crate::network::Network;

// =============================================================================
// Working Memory Boundary
// =============================================================================

/// A live runtime session evaluating the network.
///
/// The builder notifies every attached working memory when a rule's
/// nodes are attached or detached so the session can populate or drop
/// node memories.
pub trait WorkingMemory: Send + Sync {
    /// Identifier of the session.
    fn id(&self) -> u64;

    /// Called after a rule's nodes have been added to the network.
    fn nodes_attached(&self, rule: RuleId, nodes: &[NodeId]);

    /// Called after a rule's exclusive nodes have been removed.
    fn nodes_detached(&self, rule: RuleId, nodes: &[NodeId]);
}

// =============================================================================
// Rule Registry
// =============================================================================

/// Book-keeping for one compiled rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleEntry {
    /// Rule id.
    pub id: RuleId,
    /// Rule name.
    pub name: String,
    /// True for query definitions.
    pub query: bool,
    /// Partition the rule was compiled into.
    pub partition: PartitionId,
    /// Every node the rule references, in attachment order.
    pub nodes: Vec<NodeId>,
}

// =============================================================================
// Knowledge Base
// =============================================================================

/// A knowledge base: configuration, network, id allocator, partitions,
/// registered rules, and attached working memories.
///
/// Only one rule compilation may run against a knowledge base at a time;
/// the `&mut` receivers enforce this.
pub struct KnowledgeBase {
    config: KnowledgeBaseConfig,
    network: Network,
    ids: IdAllocator,
    interner: Interner,
    rules: BTreeMap<RuleId, RuleEntry>,
    names: BTreeMap<String, RuleId>,
    next_rule: u32,
    next_partition: u32,
    working_memories: Vec<Arc<dyn WorkingMemory>>,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new(KnowledgeBaseConfig::default())
    }
}

impl KnowledgeBase {
    /// Creates an empty knowledge base.
    #[must_use]
    pub fn new(config: KnowledgeBaseConfig) -> Self {
        Self {
            config,
            network: Network::new(),
            ids: IdAllocator::new(),
            interner: Interner::new(),
            rules: BTreeMap::new(),
            names: BTreeMap::new(),
            next_rule: 0,
            next_partition: PartitionId::SHARED.index() + 1,
            working_memories: Vec::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &KnowledgeBaseConfig {
        &self.config
    }

    /// Returns the configured component factory.
    #[must_use]
    pub fn component_factory(&self) -> Arc<dyn ComponentFactory> {
        Arc::clone(&self.config.component_factory)
    }

    /// Returns the network.
    #[must_use]
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Returns the network mutably.
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    /// Returns a snapshot of the network for the runtime.
    #[must_use]
    pub fn snapshot(&self) -> Network {
        self.network.clone()
    }

    /// Returns the id allocator.
    #[must_use]
    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    /// Returns the id allocator mutably.
    pub fn ids_mut(&mut self) -> &mut IdAllocator {
        &mut self.ids
    }

    /// Splits the borrow into the network and the id allocator.
    pub fn network_and_ids_mut(&mut self) -> (&mut Network, &mut IdAllocator) {
        (&mut self.network, &mut self.ids)
    }

    /// Returns the name interner.
    #[must_use]
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Returns the name interner mutably.
    pub fn interner_mut(&mut self) -> &mut Interner {
        &mut self.interner
    }

    /// Issues a fresh exclusive partition.
    pub fn next_partition(&mut self) -> PartitionId {
        let partition = PartitionId::new(self.next_partition);
        self.next_partition += 1;
        partition
    }

    /// Reserves an id for a rule about to be compiled.
    ///
    /// # Errors
    /// Returns `DuplicateRule` if a rule with this name is registered.
    pub fn reserve_rule(&mut self, name: &str) -> Result<RuleId> {
        if self.names.contains_key(name) {
            return Err(Error::duplicate_rule(name));
        }
        let id = RuleId::new(self.next_rule);
        self.next_rule += 1;
        Ok(id)
    }

    /// Registers a compiled rule.
    ///
    /// # Errors
    /// Returns `DuplicateRule` if the name or id is already registered.
    pub fn register_rule(&mut self, entry: RuleEntry) -> Result<()> {
        if self.names.contains_key(&entry.name) || self.rules.contains_key(&entry.id) {
            return Err(Error::duplicate_rule(entry.name));
        }
        self.names.insert(entry.name.clone(), entry.id);
        self.rules.insert(entry.id, entry);
        Ok(())
    }

    /// Removes a rule's registration.
    ///
    /// # Errors
    /// Returns `RuleNotFound` if the rule is not registered.
    pub fn unregister_rule(&mut self, id: RuleId) -> Result<RuleEntry> {
        let entry = self.rules.remove(&id).ok_or_else(|| Error::rule_not_found(id))?;
        self.names.remove(&entry.name);
        Ok(entry)
    }

    /// Returns a registered rule.
    #[must_use]
    pub fn rule(&self, id: RuleId) -> Option<&RuleEntry> {
        self.rules.get(&id)
    }

    /// Looks a rule up by name.
    #[must_use]
    pub fn rule_by_name(&self, name: &str) -> Option<&RuleEntry> {
        self.names.get(name).and_then(|id| self.rules.get(id))
    }

    /// Iterates registered rules in id order.
    pub fn rules(&self) -> impl Iterator<Item = &RuleEntry> + '_ {
        self.rules.values()
    }

    /// Returns the partition each registered rule was compiled into.
    #[must_use]
    pub fn rule_partitions(&self) -> BTreeMap<RuleId, PartitionId> {
        self.rules
            .values()
            .map(|entry| (entry.id, entry.partition))
            .collect()
    }

    /// Attaches a working memory.
    pub fn attach_working_memory(&mut self, memory: Arc<dyn WorkingMemory>) {
        self.working_memories.push(memory);
    }

    /// Detaches a working memory by id.
    pub fn detach_working_memory(&mut self, id: u64) {
        self.working_memories.retain(|memory| memory.id() != id);
    }

    /// Returns the attached working memories.
    #[must_use]
    pub fn working_memories(&self) -> Vec<Arc<dyn WorkingMemory>> {
        self.working_memories.clone()
    }
}

impl fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("config", &self.config)
            .field("nodes", &self.network.len())
            .field("rules", &self.rules.len())
            .field("working_memories", &self.working_memories.len())
            .finish_non_exhaustive()
    }
}
