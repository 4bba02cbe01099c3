//! Node arena, id allocation, and knowledge base for Trellis.
//!
//! This crate provides:
//! - [`IdAllocator`] - Node id issue, release, and reuse
//! - [`Node`] / [`NodeKind`] - Network vertices as a closed sum type
//! - [`Network`] - Index-addressed node arena with cheap snapshots
//! - [`KnowledgeBase`] - Owner of the network across rule compilations
//! - [`ComponentFactory`] - Node-construction strategies

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod component;
pub mod config;
pub mod constraint;
pub mod factory;
pub mod id_alloc;
pub mod knowledge_base;
pub mod network;
pub mod node;

pub use component::RuleComponent;
pub use config::{EventProcessingMode, KnowledgeBaseConfig};
pub use constraint::{AlphaConstraint, BetaConstraint, CompareOp, Declaration, TemporalOp};
pub use factory::{ComponentFactory, ReteComponentFactory};
pub use id_alloc::IdAllocator;
pub use knowledge_base::{KnowledgeBase, RuleEntry, WorkingMemory};
pub use network::Network;
pub use node::{
    BetaKind, BetaNode, Expiration, Node, NodeKind, ObjectSource, QueryArgument, TupleSource,
};
