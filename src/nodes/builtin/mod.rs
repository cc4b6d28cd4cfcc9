pub mod delay_node;

use std::sync::Arc;
use crate::nodes::NodeRegistry;

/// Register all built-in nodes into the registry.
pub fn register_all(registry: &mut NodeRegistry) {
    registry.register(Arc::new(delay_node::DelayNodeDefinition));
}
