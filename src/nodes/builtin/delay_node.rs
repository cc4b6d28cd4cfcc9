use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::error::{NodeError, NodeResult};
use crate::engine::types::{
    ChartNode, Connection, DataType, EditorDefinition, NodeUiData, PayloadMap, PortDefinition,
    PortId, SerializedNode, VisualData,
};
use crate::nodes::{Node, NodeDefinition};

pub const NODE_TYPE: &str = "delay";

const TITLE: &str = "Delay";
const INPUT_PREFIX: &str = "input";
const OUTPUT_PREFIX: &str = "output";

/// Highest port index the node recognises; larger indices are treated as malformed.
pub const MAX_PORT_INDEX: usize = 1024;

/// Configuration of a delay node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayNodeData {
    /// Delay in milliseconds before inputs are forwarded.
    #[serde(default)]
    pub delay: u64,
}

pub type DelayChartNode = ChartNode<DelayNodeData>;

/// Waits `delay` milliseconds, then forwards `inputN` to `outputN` unchanged.
///
/// The node has no fixed shape: it exposes one input slot past the highest
/// connected `inputN` and one output per connected-or-gap input slot.
pub struct DelayNode {
    chart_node: DelayChartNode,
}

impl DelayNode {
    /// Build a new chart node with default configuration and a fresh id.
    pub fn create() -> DelayChartNode {
        ChartNode {
            node_type: NODE_TYPE.to_string(),
            title: TITLE.to_string(),
            id: Uuid::new_v4().to_string(),
            visual_data: VisualData::default(),
            data: DelayNodeData::default(),
        }
    }

    pub fn new(chart_node: DelayChartNode) -> Self {
        Self { chart_node }
    }

    /// Interpret a serialized node, rejecting anything but a non-negative
    /// integer `delay`.
    pub fn from_serialized(node: &SerializedNode) -> NodeResult<Self> {
        if node.node_type != NODE_TYPE {
            return Err(NodeError::TypeMismatch {
                expected: NODE_TYPE.to_string(),
                found: node.node_type.clone(),
            });
        }

        let data: DelayNodeData =
            serde_json::from_value(node.data.clone()).map_err(|e| NodeError::InvalidConfig {
                node_type: NODE_TYPE.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self::new(ChartNode {
            node_type: node.node_type.clone(),
            title: node.title.clone(),
            id: node.id.clone(),
            visual_data: node.visual_data.clone(),
            data,
        }))
    }

    /// Highest connected input index plus one free slot.
    fn input_port_count(&self, connections: &[Connection]) -> usize {
        let max_connected = connections
            .iter()
            .filter(|c| c.input_node_id == self.chart_node.id)
            .filter_map(|c| port_index(&c.input_id, INPUT_PREFIX))
            .max()
            .unwrap_or(0);

        max_connected + 1
    }
}

/// Parse `N` out of `<prefix>N`. Only canonical decimal integers in
/// `1..=MAX_PORT_INDEX` match: no sign, no leading zero.
fn port_index(port_id: &str, prefix: &str) -> Option<usize> {
    let digits = port_id.strip_prefix(prefix)?;
    if digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=MAX_PORT_INDEX).contains(n))
}

fn port_id(prefix: &str, index: usize) -> PortId {
    format!("{prefix}{index}")
}

#[async_trait]
impl Node for DelayNode {
    fn id(&self) -> &str {
        &self.chart_node.id
    }

    fn node_type(&self) -> &str {
        NODE_TYPE
    }

    fn input_definitions(&self, connections: &[Connection]) -> Vec<PortDefinition> {
        (1..=self.input_port_count(connections))
            .map(|i| PortDefinition {
                id: port_id(INPUT_PREFIX, i),
                title: format!("Input {i}"),
                data_type: DataType::Any,
            })
            .collect()
    }

    fn output_definitions(&self, connections: &[Connection]) -> Vec<PortDefinition> {
        let output_count = self.input_port_count(connections).saturating_sub(1);
        (1..=output_count)
            .map(|i| PortDefinition {
                id: port_id(OUTPUT_PREFIX, i),
                title: format!("Output {i}"),
                data_type: DataType::Any,
            })
            .collect()
    }

    fn editors(&self) -> Vec<EditorDefinition> {
        vec![EditorDefinition::Number {
            label: "Delay (ms)".to_string(),
            data_key: "delay".to_string(),
            default_value: 0.0,
        }]
    }

    fn body(&self) -> Option<String> {
        Some(format!("Delay {}ms", self.chart_node.data.delay))
    }

    async fn process(
        &self,
        mut inputs: PayloadMap,
        cancel: &CancellationToken,
    ) -> NodeResult<PayloadMap> {
        let delay_ms = self.chart_node.data.delay;

        if delay_ms > 0 {
            debug!(node_id = %self.chart_node.id, delay_ms, "Waiting before pass-through");
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    info!(node_id = %self.chart_node.id, "Delay cancelled");
                    return Err(NodeError::Cancelled);
                }

                () = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
            }
        } else if cancel.is_cancelled() {
            return Err(NodeError::Cancelled);
        }

        let present = inputs
            .keys()
            .filter(|k| port_index(k, INPUT_PREFIX).is_some())
            .count();

        let mut outputs = PayloadMap::with_capacity(present);
        for i in 1..=present {
            let port = port_id(INPUT_PREFIX, i);
            let value = inputs
                .remove(&port)
                .ok_or(NodeError::MissingInput { port })?;
            outputs.insert(port_id(OUTPUT_PREFIX, i), value);
        }

        debug!(node_id = %self.chart_node.id, outputs = present, "Forwarded inputs");
        Ok(outputs)
    }
}

/// Registry entry for [`DelayNode`].
pub struct DelayNodeDefinition;

impl NodeDefinition for DelayNodeDefinition {
    fn node_type(&self) -> &str {
        NODE_TYPE
    }

    fn title(&self) -> &str {
        TITLE
    }

    fn ui_data(&self) -> NodeUiData {
        NodeUiData {
            info_box_title: "Delay Node".to_string(),
            info_box_body: "Delays the execution and then passes the input value to the output \
                            without any modifications."
                .to_string(),
            context_menu_title: TITLE.to_string(),
            group: vec!["Logic".to_string()],
        }
    }

    fn create(&self) -> SerializedNode {
        let node = DelayNode::create();
        ChartNode {
            node_type: node.node_type,
            title: node.title,
            id: node.id,
            visual_data: node.visual_data,
            data: serde_json::json!({ "delay": node.data.delay }),
        }
    }

    fn instantiate(&self, node: &SerializedNode) -> NodeResult<Box<dyn Node>> {
        Ok(Box::new(DelayNode::from_serialized(node)?))
    }
}
