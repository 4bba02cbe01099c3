//! Index-addressed node arena.
//!
//! The `Network` owns every node of one knowledge base. Attachment points
//! held elsewhere are [`NodeId`]s into this arena, never references, so
//! removing a node can never leave a dangling pointer behind. The arena is
//! built on persistent collections: cloning it is cheap and yields an
//! independent snapshot the runtime can read while building continues.

use im::{OrdMap, Vector};
use tracing::trace;
use trellis_foundation::{EntryPointId, Error, NodeId, Result, Symbol};

use crate::node::{Node, NodeKind};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The discrimination network of one knowledge base.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Network {
    /// Node slots indexed by id.
    slots: Vector<Option<Node>>,
    /// Entry-point root per entry point.
    entry_points: OrdMap<EntryPointId, NodeId>,
    /// Object-type root per (entry point, type).
    object_types: OrdMap<(EntryPointId, Symbol), NodeId>,
    /// Number of occupied slots.
    len: usize,
}

impl Network {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node and links it into the sinks of its sources.
    ///
    /// # Errors
    /// Returns an error if the id is already occupied or a source is
    /// missing.
    pub fn insert(&mut self, node: Node) -> Result<NodeId> {
        let id = node.id;
        if self.contains(id) {
            return Err(Error::internal(format!("node slot {id} already occupied")));
        }

        let sources = node.kind.sources();
        for source in &sources {
            if !self.contains(*source) {
                return Err(Error::node_not_found(*source));
            }
        }
        for source in sources {
            if let Some(parent) = self.get_mut(source) {
                parent.sinks.push(id);
            }
        }

        match &node.kind {
            NodeKind::EntryPoint { id: entry_point } => {
                self.entry_points.insert(entry_point.clone(), id);
            }
            NodeKind::ObjectType {
                entry_point,
                object_type,
                ..
            } => {
                self.object_types
                    .insert((entry_point.clone(), *object_type), id);
                if let Some(root) = self.entry_point_node(entry_point) {
                    if let Some(root) = self.get_mut(root) {
                        root.sinks.push(id);
                    }
                }
            }
            _ => {}
        }

        let idx = id.index() as usize;
        while self.slots.len() <= idx {
            self.slots.push_back(None);
        }
        trace!(node = %id, kind = node.kind.name(), "node inserted");
        self.slots.set(idx, Some(node));
        self.len += 1;
        Ok(id)
    }

    /// Removes a node and unlinks it from its sources.
    ///
    /// # Errors
    /// Returns an error if the node does not exist or still has sinks.
    pub fn remove(&mut self, id: NodeId) -> Result<Node> {
        let sinks = self.get(id).ok_or_else(|| Error::node_not_found(id))?.sinks.len();
        if sinks > 0 {
            return Err(Error::internal(format!(
                "cannot remove {id}: {sinks} sink(s) still attached"
            )));
        }

        let idx = id.index() as usize;
        let node = self
            .slots
            .set(idx, None)
            .ok_or_else(|| Error::node_not_found(id))?;
        self.len -= 1;
        trace!(node = %id, kind = node.kind.name(), "node removed");

        for source in node.kind.sources() {
            if let Some(parent) = self.get_mut(source) {
                parent.sinks.retain(|sink| *sink != id);
            }
        }

        match &node.kind {
            NodeKind::EntryPoint { id: entry_point } => {
                self.entry_points.remove(entry_point);
            }
            NodeKind::ObjectType {
                entry_point,
                object_type,
                ..
            } => {
                self.object_types
                    .remove(&(entry_point.clone(), *object_type));
                if let Some(root) = self.entry_point_node(entry_point) {
                    if let Some(root) = self.get_mut(root) {
                        root.sinks.retain(|sink| *sink != id);
                    }
                }
            }
            _ => {}
        }

        Ok(node)
    }

    /// Returns the node with the given id.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.index() as usize).and_then(Option::as_ref)
    }

    /// Returns the node with the given id, mutably.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index() as usize)
            .and_then(Option::as_mut)
    }

    /// Returns the node with the given id or a `NodeNotFound` error.
    ///
    /// # Errors
    /// Returns an error if the node does not exist.
    pub fn require(&self, id: NodeId) -> Result<&Node> {
        self.get(id).ok_or_else(|| Error::node_not_found(id))
    }

    /// Returns the node with the given id mutably, or a `NodeNotFound` error.
    ///
    /// # Errors
    /// Returns an error if the node does not exist.
    pub fn require_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.get_mut(id).ok_or_else(|| Error::node_not_found(id))
    }

    /// Returns true if a node with this id exists.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Iterates the sinks of a node.
    pub fn sinks(&self, id: NodeId) -> impl Iterator<Item = &Node> + '_ {
        self.get(id)
            .into_iter()
            .flat_map(|node| node.sinks.iter())
            .filter_map(|sink| self.get(*sink))
    }

    /// Returns the root node of an entry point.
    #[must_use]
    pub fn entry_point_node(&self, entry_point: &EntryPointId) -> Option<NodeId> {
        self.entry_points.get(entry_point).copied()
    }

    /// Returns the object-type root for a type under an entry point.
    #[must_use]
    pub fn object_type_node(&self, entry_point: &EntryPointId, object_type: Symbol) -> Option<NodeId> {
        self.object_types
            .get(&(entry_point.clone(), object_type))
            .copied()
    }

    /// Iterates all entry-point roots.
    pub fn roots(&self) -> impl Iterator<Item = (&EntryPointId, NodeId)> + '_ {
        self.entry_points.iter().map(|(entry_point, id)| (entry_point, *id))
    }

    /// Iterates all nodes in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> + '_ {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the network has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
