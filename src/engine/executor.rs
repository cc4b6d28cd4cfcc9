use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::engine::error::NodeError;
use crate::engine::types::*;
use crate::nodes::Node;

/// Drives a single node execution on behalf of the graph runtime.
///
/// Classifies the outcome as success, failure or cancellation; a timeout
/// cancels the node and counts as a failure.
pub struct NodeExecutor {
    timeout: Option<Duration>,
}

impl Default for NodeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeExecutor {
    pub fn new() -> Self {
        Self { timeout: None }
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Execute `node` against `inputs`, observing `cancel`.
    pub async fn run(
        &self,
        node: &dyn Node,
        inputs: PayloadMap,
        cancel: &CancellationToken,
    ) -> NodeRun {
        let mut run = NodeRun::new(node.id(), node.node_type());

        info!(
            node_id = %run.node_id,
            node_type = %run.node_type,
            inputs = inputs.len(),
            "Running node"
        );

        // Child token so a timeout aborts the node without cancelling the caller.
        let node_cancel = cancel.child_token();

        let result = match self.timeout {
            Some(timeout) => {
                match tokio::time::timeout(timeout, node.process(inputs, &node_cancel)).await {
                    Ok(r) => r.map_err(RunError::Node),
                    Err(_) => {
                        node_cancel.cancel();
                        Err(RunError::TimedOut(timeout))
                    }
                }
            }
            None => node.process(inputs, &node_cancel).await.map_err(RunError::Node),
        };

        run.finished = Some(Utc::now());

        match result {
            Ok(output) => {
                info!(node_id = %run.node_id, outputs = output.len(), "Node completed successfully");
                run.status = RunStatus::Success;
                run.output = Some(output);
            }
            Err(RunError::Node(NodeError::Cancelled)) => {
                warn!(node_id = %run.node_id, "Node execution cancelled");
                run.status = RunStatus::Cancelled;
            }
            Err(e) => {
                let err_msg = e.to_string();
                error!(node_id = %run.node_id, error = %err_msg, "Node failed");
                run.status = RunStatus::Failed;
                run.error = Some(err_msg);
            }
        }

        run
    }
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Node(NodeError),

    #[error("Node timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),
}
