use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier of a node instance within a graph.
pub type NodeId = String;

/// Identifier of a port on a node (e.g. `input1`, `output3`).
pub type PortId = String;

/// Values flowing through a node's ports during one execution, keyed by port.
/// Only ports that actually carried a value are present.
pub type PayloadMap = HashMap<PortId, serde_json::Value>;

/// A serialized node whose `data` blob has not been interpreted yet.
pub type SerializedNode = ChartNode<serde_json::Value>;

/// Directed edge `(output_node_id, output_id) -> (input_node_id, input_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub output_node_id: NodeId,
    pub output_id: PortId,
    pub input_node_id: NodeId,
    pub input_id: PortId,
}

impl Connection {
    pub fn new(
        output_node_id: impl Into<NodeId>,
        output_id: impl Into<PortId>,
        input_node_id: impl Into<NodeId>,
        input_id: impl Into<PortId>,
    ) -> Self {
        Self {
            output_node_id: output_node_id.into(),
            output_id: output_id.into(),
            input_node_id: input_node_id.into(),
            input_id: input_id.into(),
        }
    }
}

/// Type accepted or produced by a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Unconstrained: any JSON value.
    Any,
}

/// Descriptor of a single port, generated on demand from the connection set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDefinition {
    pub id: PortId,
    pub title: String,
    pub data_type: DataType,
}

/// Placement of a node on the graph canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualData {
    pub x: f64,
    pub y: f64,
    pub width: f64,
}

impl Default for VisualData {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 150.0,
        }
    }
}

/// Serialized form of a node instance as stored in a graph document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartNode<T> {
    #[serde(rename = "type")]
    pub node_type: String,
    pub title: String,
    pub id: NodeId,
    #[serde(default)]
    pub visual_data: VisualData,
    pub data: T,
}

/// Editor field exposed by a node for one of its configuration keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EditorDefinition {
    Number {
        label: String,
        data_key: String,
        default_value: f64,
    },
}

/// Palette and documentation metadata for a node type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeUiData {
    pub info_box_title: String,
    pub info_box_body: String,
    pub context_menu_title: String,
    pub group: Vec<String>,
}

/// Status of a single node execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
    Cancelled,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Success => write!(f, "success"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Record of one node execution driven by the host harness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRun {
    pub node_id: NodeId,
    pub node_type: String,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PayloadMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished: Option<DateTime<Utc>>,
}

impl NodeRun {
    pub fn new(node_id: &str, node_type: &str) -> Self {
        Self {
            node_id: node_id.to_string(),
            node_type: node_type.to_string(),
            status: RunStatus::Running,
            output: None,
            error: None,
            started: Utc::now(),
            finished: None,
        }
    }
}
