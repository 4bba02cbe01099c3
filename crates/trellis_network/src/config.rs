//! Configuration for a knowledge base.

use std::sync::Arc;

use crate::factory::{ComponentFactory, ReteComponentFactory};

/// How facts are interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EventProcessingMode {
    /// Facts are timeless; no temporal reasoning.
    #[default]
    Cloud,
    /// Facts may be timestamped events; temporal distances are tracked.
    Stream,
}

/// Configuration for a knowledge base.
///
/// Controls node sharing, partitioning, event processing, and which
/// component factory builds nodes.
#[derive(Clone, Debug)]
pub struct KnowledgeBaseConfig {
    /// Whether alpha nodes are shared between rules.
    pub alpha_sharing: bool,

    /// Whether beta nodes are shared between rules.
    pub beta_sharing: bool,

    /// Whether each rule gets its own evaluation partition.
    pub partitioning: bool,

    /// Event processing mode.
    pub event_mode: EventProcessingMode,

    /// Whether object-type nodes memorize facts.
    pub object_type_memory: bool,

    /// Factory for node variants.
    pub component_factory: Arc<dyn ComponentFactory>,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            alpha_sharing: true,
            beta_sharing: true,
            partitioning: false,
            event_mode: EventProcessingMode::Cloud,
            object_type_memory: true,
            component_factory: Arc::new(ReteComponentFactory),
        }
    }
}

impl KnowledgeBaseConfig {
    /// Creates a configuration for stream (event) processing.
    #[must_use]
    pub fn stream() -> Self {
        Self {
            event_mode: EventProcessingMode::Stream,
            ..Self::default()
        }
    }

    /// Creates a configuration with one partition per rule.
    #[must_use]
    pub fn partitioned() -> Self {
        Self {
            partitioning: true,
            ..Self::default()
        }
    }

    /// Returns true in stream mode.
    #[must_use]
    pub fn is_stream(&self) -> bool {
        self.event_mode == EventProcessingMode::Stream
    }

    /// Builder method to enable/disable alpha sharing.
    #[must_use]
    pub fn with_alpha_sharing(mut self, share: bool) -> Self {
        self.alpha_sharing = share;
        self
    }

    /// Builder method to enable/disable beta sharing.
    #[must_use]
    pub fn with_beta_sharing(mut self, share: bool) -> Self {
        self.beta_sharing = share;
        self
    }

    /// Builder method to enable/disable partitioning.
    #[must_use]
    pub fn with_partitioning(mut self, partitioning: bool) -> Self {
        self.partitioning = partitioning;
        self
    }

    /// Builder method to set the event processing mode.
    #[must_use]
    pub fn with_event_mode(mut self, mode: EventProcessingMode) -> Self {
        self.event_mode = mode;
        self
    }

    /// Builder method to enable/disable object-type node memory.
    #[must_use]
    pub fn with_object_type_memory(mut self, enabled: bool) -> Self {
        self.object_type_memory = enabled;
        self
    }

    /// Builder method to set the component factory.
    #[must_use]
    pub fn with_component_factory(mut self, factory: Arc<dyn ComponentFactory>) -> Self {
        self.component_factory = factory;
        self
    }
}
