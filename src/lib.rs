//! Trellis - Incremental discrimination-network construction
//!
//! This crate re-exports all layers of the Trellis system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: trellis_builder    - Rule compilation, sharing, partitions, temporal analysis
//! Layer 1: trellis_network    - Node arena, id allocation, knowledge base
//! Layer 0: trellis_foundation - Core types (ids, Value, Symbol, Error)
//! ```

pub use trellis_builder as builder;
pub use trellis_foundation as foundation;
pub use trellis_network as network;
