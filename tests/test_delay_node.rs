//! Tests for the delay pass-through node: port derivation and execution.

use std::collections::HashMap;

use ironflow_delay::engine::NodeError;
use ironflow_delay::engine::types::*;
use ironflow_delay::nodes::Node;
use ironflow_delay::nodes::builtin::delay_node::{DelayNode, DelayNodeData, MAX_PORT_INDEX};
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

// --- Helpers ---

fn delay_node(delay: u64) -> DelayNode {
    let mut chart = DelayNode::create();
    chart.data = DelayNodeData { delay };
    DelayNode::new(chart)
}

fn wire(node: &DelayNode, input_ids: &[&str]) -> Vec<Connection> {
    input_ids
        .iter()
        .enumerate()
        .map(|(i, input)| Connection::new(format!("source{i}"), "output1", node.id(), *input))
        .collect()
}

fn ids(ports: &[PortDefinition]) -> Vec<&str> {
    ports.iter().map(|p| p.id.as_str()).collect()
}

fn payload(pairs: Vec<(&str, serde_json::Value)>) -> PayloadMap {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

// --- Construction ---

#[test]
fn create_has_defaults() {
    let chart = DelayNode::create();
    assert_eq!(chart.node_type, "delay");
    assert_eq!(chart.title, "Delay");
    assert_eq!(chart.data.delay, 0);
    assert_eq!(chart.visual_data.x, 0.0);
    assert_eq!(chart.visual_data.y, 0.0);
    assert_eq!(chart.visual_data.width, 150.0);
}

#[test]
fn create_assigns_unique_ids() {
    let a = DelayNode::create();
    let b = DelayNode::create();
    assert!(!a.id.is_empty());
    assert_ne!(a.id, b.id);
}

// --- Port derivation ---

#[test]
fn no_connections_offers_single_input() {
    let node = delay_node(0);
    let inputs = node.input_definitions(&[]);
    let outputs = node.output_definitions(&[]);

    assert_eq!(ids(&inputs), vec!["input1"]);
    assert!(outputs.is_empty());
}

#[test]
fn contiguous_inputs_add_one_free_slot() {
    let node = delay_node(0);
    let conns = wire(&node, &["input1", "input2"]);

    assert_eq!(
        ids(&node.input_definitions(&conns)),
        vec!["input1", "input2", "input3"]
    );
    assert_eq!(
        ids(&node.output_definitions(&conns)),
        vec!["output1", "output2"]
    );
}

#[test]
fn gaps_are_driven_by_max_index() {
    let node = delay_node(0);
    let conns = wire(&node, &["input1", "input3"]);

    assert_eq!(
        ids(&node.input_definitions(&conns)),
        vec!["input1", "input2", "input3", "input4"]
    );
    assert_eq!(
        ids(&node.output_definitions(&conns)),
        vec!["output1", "output2", "output3"]
    );
}

#[test]
fn port_counts_track_max_connected_index() {
    let node = delay_node(0);
    for max in 0..8usize {
        let port_names: Vec<String> = (1..=max).map(|i| format!("input{i}")).collect();
        let refs: Vec<&str> = port_names.iter().map(String::as_str).collect();
        let conns = wire(&node, &refs);

        assert_eq!(node.input_definitions(&conns).len(), max + 1);
        assert_eq!(node.output_definitions(&conns).len(), max);
    }
}

#[test]
fn connections_to_other_nodes_are_ignored() {
    let node = delay_node(0);
    let conns = vec![Connection::new("a", "output1", "some-other-node", "input7")];

    assert_eq!(node.input_definitions(&conns).len(), 1);
    assert!(node.output_definitions(&conns).is_empty());
}

#[test]
fn malformed_port_ids_are_ignored() {
    let node = delay_node(0);
    let conns = wire(
        &node,
        &[
            "input", "input0", "input01", "inputx", "input-3", "prompt9", "input2",
        ],
    );

    assert_eq!(
        ids(&node.input_definitions(&conns)),
        vec!["input1", "input2", "input3"]
    );
}

#[test]
fn overflowing_port_index_is_ignored() {
    let node = delay_node(0);
    let huge = format!("input{}", usize::MAX);
    let conns = wire(&node, &[huge.as_str(), "input2"]);

    assert_eq!(node.input_definitions(&conns).len(), 3);
    assert_eq!(
        ids(&node.output_definitions(&conns)),
        vec!["output1", "output2"]
    );
}

#[test]
fn port_index_beyond_limit_is_ignored() {
    let node = delay_node(0);
    let too_far = format!("input{}", MAX_PORT_INDEX + 1);
    let conns = wire(&node, &["input4000000000", too_far.as_str()]);

    assert_eq!(ids(&node.input_definitions(&conns)), vec!["input1"]);
    assert!(node.output_definitions(&conns).is_empty());
}

#[test]
fn highest_allowed_port_index_is_honoured() {
    let node = delay_node(0);
    let last = format!("input{MAX_PORT_INDEX}");
    let conns = wire(&node, &[last.as_str()]);

    assert_eq!(node.input_definitions(&conns).len(), MAX_PORT_INDEX + 1);
    assert_eq!(node.output_definitions(&conns).len(), MAX_PORT_INDEX);
}

#[test]
fn port_definitions_have_titles_and_any_type() {
    let node = delay_node(0);
    let conns = wire(&node, &["input1"]);

    let inputs = node.input_definitions(&conns);
    assert_eq!(inputs[0].title, "Input 1");
    assert_eq!(inputs[1].title, "Input 2");
    assert!(inputs.iter().all(|p| p.data_type == DataType::Any));

    let outputs = node.output_definitions(&conns);
    assert_eq!(outputs[0].title, "Output 1");
    assert_eq!(outputs[0].data_type, DataType::Any);
}

#[test]
fn port_derivation_is_idempotent() {
    let node = delay_node(0);
    let conns = wire(&node, &["input2", "input5"]);

    assert_eq!(node.input_definitions(&conns), node.input_definitions(&conns));
    assert_eq!(
        node.output_definitions(&conns),
        node.output_definitions(&conns)
    );
}

// --- Editor metadata ---

#[test]
fn editors_expose_delay_field() {
    let node = delay_node(0);
    assert_eq!(
        node.editors(),
        vec![EditorDefinition::Number {
            label: "Delay (ms)".to_string(),
            data_key: "delay".to_string(),
            default_value: 0.0,
        }]
    );
}

#[test]
fn body_reflects_delay() {
    assert_eq!(delay_node(250).body().as_deref(), Some("Delay 250ms"));
    assert_eq!(delay_node(0).body().as_deref(), Some("Delay 0ms"));
}

// --- Execution ---

#[tokio::test(start_paused = true)]
async fn empty_payload_yields_empty_output() {
    let node = delay_node(0);
    let start = Instant::now();

    let result = node
        .process(HashMap::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn forwards_inputs_after_delay() {
    let node = delay_node(50);
    let inputs = payload(vec![
        ("input1", serde_json::json!("a")),
        ("input2", serde_json::json!("b")),
    ]);
    let start = Instant::now();

    let result = node.process(inputs, &CancellationToken::new()).await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(50));
    assert_eq!(result.len(), 2);
    assert_eq!(result["output1"], serde_json::json!("a"));
    assert_eq!(result["output2"], serde_json::json!("b"));
}

#[tokio::test]
async fn forwards_structured_values_unchanged() {
    let node = delay_node(0);
    let value = serde_json::json!({ "nested": [1, 2, { "k": null }], "n": 1.5 });
    let inputs = payload(vec![("input1", value.clone())]);

    let result = node.process(inputs, &CancellationToken::new()).await.unwrap();
    assert_eq!(result, payload(vec![("output1", value)]));
}

#[tokio::test]
async fn non_port_keys_do_not_count() {
    let node = delay_node(0);
    let inputs = payload(vec![
        ("input1", serde_json::json!(1)),
        ("trigger", serde_json::json!(true)),
        ("inputx", serde_json::json!("ignored")),
    ]);

    let result = node.process(inputs, &CancellationToken::new()).await.unwrap();
    assert_eq!(result, payload(vec![("output1", serde_json::json!(1))]));
}

#[tokio::test]
async fn zero_padded_keys_do_not_count() {
    let node = delay_node(0);
    let inputs = payload(vec![
        ("input1", serde_json::json!("a")),
        ("input01", serde_json::json!("b")),
    ]);

    let result = node.process(inputs, &CancellationToken::new()).await.unwrap();
    assert_eq!(result, payload(vec![("output1", serde_json::json!("a"))]));
}

#[tokio::test]
async fn missing_input_mid_range_fails() {
    let node = delay_node(0);
    let inputs = payload(vec![
        ("input1", serde_json::json!("a")),
        ("input3", serde_json::json!("c")),
    ]);

    let err = node
        .process(inputs, &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        NodeError::MissingInput { port } => assert_eq!(port, "input2"),
        other => panic!("expected MissingInput, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn cancellation_aborts_pending_delay() {
    let node = delay_node(10_000);
    let cancel = CancellationToken::new();
    let start = Instant::now();

    let task_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        node.process(
            payload(vec![("input1", serde_json::json!("a"))]),
            &task_cancel,
        )
        .await
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    cancel.cancel();

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(NodeError::Cancelled)));
    assert!(start.elapsed() < Duration::from_millis(10_000));
}

#[tokio::test]
async fn already_cancelled_token_short_circuits() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = delay_node(0).process(HashMap::new(), &cancel).await;
    assert!(matches!(result, Err(NodeError::Cancelled)));
}

#[tokio::test(start_paused = true)]
async fn concurrent_executions_do_not_block_each_other() {
    let slow = delay_node(100);
    let fast = delay_node(10);
    let cancel = CancellationToken::new();
    let start = Instant::now();

    let (slow_res, fast_res) = tokio::join!(
        slow.process(payload(vec![("input1", serde_json::json!("s"))]), &cancel),
        async {
            let r = fast
                .process(payload(vec![("input1", serde_json::json!("f"))]), &cancel)
                .await;
            (r, start.elapsed())
        }
    );

    let (fast_res, fast_elapsed) = fast_res;
    assert!(fast_elapsed < Duration::from_millis(100));
    assert_eq!(fast_res.unwrap()["output1"], serde_json::json!("f"));
    assert_eq!(slow_res.unwrap()["output1"], serde_json::json!("s"));
    assert!(start.elapsed() >= Duration::from_millis(100));
}
