//! Node id allocation with release and reuse.
//!
//! The `IdAllocator` hands out node ids for one knowledge base and takes
//! them back when rules are retracted, so removed rules do not leak id
//! space.

use trellis_foundation::{Error, NodeId, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Issues and reclaims node ids for one knowledge base.
///
/// Ids are allocated from a free list when available, otherwise a new
/// index is issued. Each index carries a generation counter: odd
/// generations are allocated, even generations are released. Releasing
/// flips the slot back to even and puts the index on the free list.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IdAllocator {
    /// Generation counter for each id index.
    generations: Vec<u32>,
    /// Released indices available for reuse.
    free_list: Vec<u32>,
    /// Count of allocated ids.
    live_count: usize,
}

impl IdAllocator {
    /// Creates a new allocator with nothing allocated.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next free id.
    ///
    /// Reuses released ids before issuing new ones.
    pub fn next_id(&mut self) -> NodeId {
        self.live_count += 1;

        if let Some(index) = self.free_list.pop() {
            // was even/released, now odd/allocated
            self.generations[index as usize] += 1;
            NodeId::new(index)
        } else {
            // u32 ids cap the network well beyond any realistic rule base
            #[allow(clippy::cast_possible_truncation)]
            let index = self.generations.len() as u32;
            self.generations.push(1);
            NodeId::new(index)
        }
    }

    /// Releases an id so it can be reused.
    ///
    /// # Errors
    /// Returns `IdNeverAllocated` if the id was never handed out and
    /// `IdAlreadyReleased` if it is not currently allocated.
    pub fn release_id(&mut self, id: NodeId) -> Result<()> {
        let idx = id.index() as usize;
        let Some(generation) = self.generations.get_mut(idx) else {
            return Err(Error::id_never_allocated(id));
        };

        if *generation % 2 == 0 {
            return Err(Error::id_already_released(id));
        }

        *generation += 1;
        self.free_list.push(id.index());
        self.live_count -= 1;
        Ok(())
    }

    /// Returns true if the id is currently allocated.
    #[must_use]
    pub fn is_allocated(&self, id: NodeId) -> bool {
        self.generations
            .get(id.index() as usize)
            .is_some_and(|generation| generation % 2 == 1)
    }

    /// Returns how many times the id has been handed out.
    #[must_use]
    pub fn allocation_count(&self, id: NodeId) -> u32 {
        self.generations
            .get(id.index() as usize)
            .map_or(0, |generation| generation.div_ceil(2))
    }

    /// Returns the number of allocated ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live_count
    }

    /// Returns true if no id is allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Returns the highest index ever issued plus one.
    #[must_use]
    pub fn high_water_mark(&self) -> usize {
        self.generations.len()
    }

    /// Iterates over all allocated ids in index order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.generations
            .iter()
            .enumerate()
            .filter(|(_, generation)| *generation % 2 == 1)
            .map(|(idx, _)| {
                #[allow(clippy::cast_possible_truncation)]
                NodeId::new(idx as u32)
            })
    }
}
