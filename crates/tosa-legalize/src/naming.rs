//! Tensor and block naming.
//!
//! Emitted blocks carry no edge objects: a consumer block refers to its
//! producer's output tensor purely by name, so every name derived here must be
//! a deterministic function of the graph node it describes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::spec::FunctionTag;

/// Input name used when a block is built without an owning graph node.
pub const STANDALONE_INPUT_NAME: &str = "input_";
/// Output name used when a block is built without an owning graph node.
pub const STANDALONE_OUTPUT_NAME: &str = "output0_";

const INPUT_PREFIX: &str = "input_";

/// Source of fresh tokens for block names.
pub trait UniqueIdSource: Send + Sync {
    fn next_id(&self) -> String;
}

/// Monotonic counter handing out `1`, `2`, `3`, ...
#[derive(Debug, Default)]
pub struct AtomicIdSource {
    counter: AtomicU64,
}

impl AtomicIdSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts counting after `value`.
    pub fn starting_after(value: u64) -> Self {
        Self {
            counter: AtomicU64::new(value),
        }
    }
}

impl UniqueIdSource for AtomicIdSource {
    fn next_id(&self) -> String {
        (self.counter.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }
}

static GLOBAL_IDS: OnceLock<AtomicIdSource> = OnceLock::new();

/// Process-wide token source shared by every block of one serialized program.
pub fn global_id_source() -> &'static AtomicIdSource {
    GLOBAL_IDS.get_or_init(AtomicIdSource::new)
}

/// Role of a graph node, as far as naming is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Input,
    Output,
    Constant,
    Operator,
}

/// Identity of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub kind: NodeKind,
    pub guid: u64,
}

impl NodeRef {
    pub fn new(kind: NodeKind, guid: u64) -> Self {
        Self { kind, guid }
    }

    pub fn input(guid: u64) -> Self {
        Self::new(NodeKind::Input, guid)
    }

    pub fn output(guid: u64) -> Self {
        Self::new(NodeKind::Output, guid)
    }

    pub fn constant(guid: u64) -> Self {
        Self::new(NodeKind::Constant, guid)
    }

    pub fn operator(guid: u64) -> Self {
        Self::new(NodeKind::Operator, guid)
    }
}

/// Graph position of the node being legalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeContext {
    /// The node being lowered.
    pub node: NodeRef,
    /// Node producing our single input.
    pub producer: NodeRef,
    /// Output slot of `producer` feeding our input.
    pub producer_slot: u32,
    /// First consumer of our output, if connected.
    pub consumer: Option<NodeRef>,
}

impl NodeContext {
    pub fn new(node: NodeRef, producer: NodeRef) -> Self {
        Self {
            node,
            producer,
            producer_slot: 0,
            consumer: None,
        }
    }

    pub fn with_producer_slot(mut self, slot: u32) -> Self {
        self.producer_slot = slot;
        self
    }

    pub fn with_consumer(mut self, consumer: NodeRef) -> Self {
        self.consumer = Some(consumer);
        self
    }
}

/// Name of the tensor produced on `slot` of `node`.
pub fn unique_name(node: NodeRef, slot: u32) -> String {
    let guid = node.guid;
    match node.kind {
        NodeKind::Input => format!("{INPUT_PREFIX}{guid}"),
        NodeKind::Output => format!("output{slot}_{guid}"),
        NodeKind::Constant => format!("constant_{guid}"),
        NodeKind::Operator => format!("intermediate{slot}_{guid}"),
    }
}

/// Input tensor name for the node, or the standalone sentinel.
pub fn input_name(context: Option<&NodeContext>) -> String {
    match context {
        Some(context) => unique_name(context.producer, context.producer_slot),
        None => STANDALONE_INPUT_NAME.to_string(),
    }
}

/// Output tensor name for the node, or the standalone sentinel.
///
/// When the output feeds a graph output node the tensor takes that node's
/// name, so the program's declared outputs line up with the graph.
pub fn output_name(context: Option<&NodeContext>) -> String {
    match context {
        Some(context) => match context.consumer {
            Some(consumer) if consumer.kind == NodeKind::Output => unique_name(consumer, 0),
            _ => unique_name(context.node, 0),
        },
        None => STANDALONE_OUTPUT_NAME.to_string(),
    }
}

/// Whether a block must declare its input tensor itself.
///
/// Only graph inputs and the standalone sentinel qualify; every other input
/// is declared by the block that produced it.
pub fn declares_input(name: &str) -> bool {
    name.starts_with(INPUT_PREFIX)
}

pub fn block_name(function: FunctionTag, ids: &dyn UniqueIdSource) -> String {
    format!("Op_{}_block_{}", function.mnemonic(), ids.next_id())
}
