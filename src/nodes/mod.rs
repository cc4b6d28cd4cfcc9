pub mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::engine::error::{NodeError, NodeResult};
use crate::engine::types::{
    Connection, EditorDefinition, NodeUiData, PayloadMap, PortDefinition, SerializedNode,
};

/// A node instance: defines its ports, renders its editors, executes.
#[async_trait]
pub trait Node: Send + Sync {
    /// Identifier of this instance within its graph.
    fn id(&self) -> &str;

    /// Node type tag (e.g. "delay").
    fn node_type(&self) -> &str;

    /// Input ports for the given connection set. Must be pure.
    fn input_definitions(&self, connections: &[Connection]) -> Vec<PortDefinition>;

    /// Output ports for the given connection set. Must be pure.
    fn output_definitions(&self, connections: &[Connection]) -> Vec<PortDefinition>;

    /// Editor fields bound to the node's configuration.
    fn editors(&self) -> Vec<EditorDefinition>;

    /// One-line label rendered inside the node on the canvas.
    fn body(&self) -> Option<String>;

    /// Execute the node against the resolved input payloads.
    ///
    /// Must observe `cancel` at every suspension point and return
    /// [`NodeError::Cancelled`] instead of partial output.
    async fn process(&self, inputs: PayloadMap, cancel: &CancellationToken)
    -> NodeResult<PayloadMap>;
}

/// A registered node type: metadata plus a factory for instances.
pub trait NodeDefinition: Send + Sync {
    /// Stable type tag used in serialized graphs.
    fn node_type(&self) -> &str;

    /// Human-readable title.
    fn title(&self) -> &str;

    fn ui_data(&self) -> NodeUiData;

    /// Build a fresh serialized node with default configuration.
    fn create(&self) -> SerializedNode;

    /// Interpret a serialized node, validating its configuration.
    fn instantiate(&self, node: &SerializedNode) -> NodeResult<Box<dyn Node>>;
}

/// Registry of available node types.
pub struct NodeRegistry {
    definitions: HashMap<String, Arc<dyn NodeDefinition>>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
        }
    }

    /// Create a registry with all built-in nodes registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Register a node definition, replacing any previous one with the same tag.
    pub fn register(&mut self, definition: Arc<dyn NodeDefinition>) {
        self.definitions
            .insert(definition.node_type().to_string(), definition);
    }

    /// Look up a node definition by type tag.
    pub fn get(&self, node_type: &str) -> Option<Arc<dyn NodeDefinition>> {
        self.definitions.get(node_type).cloned()
    }

    /// List all registered node types with their titles, sorted by tag.
    pub fn list(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .definitions
            .values()
            .map(|d| (d.node_type(), d.title()))
            .collect();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }

    /// Create a new serialized node of the given type.
    pub fn create(&self, node_type: &str) -> NodeResult<SerializedNode> {
        let definition = self
            .get(node_type)
            .ok_or_else(|| NodeError::UnknownNodeType(node_type.to_string()))?;
        Ok(definition.create())
    }

    /// Instantiate a serialized node through the definition matching its type tag.
    pub fn instantiate(&self, node: &SerializedNode) -> NodeResult<Box<dyn Node>> {
        let definition = self
            .get(&node.node_type)
            .ok_or_else(|| NodeError::UnknownNodeType(node.node_type.clone()))?;
        definition.instantiate(node)
    }
}
