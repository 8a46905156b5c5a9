//! Quantization-aware legalization of activation functions into TOSA-style
//! basic blocks.
//!
//! Gelu, Sigmoid, TanH, Log and Rsqrt nodes are lowered either to a native
//! ISA instruction or, on quantized data, to a `TABLE` instruction carrying a
//! precomputed lookup table.

pub mod block;
pub mod error;
pub mod legalize;
pub mod naming;
pub mod region;
pub mod spec;
pub mod table;

pub use block::{
    BasicBlock, BasicBlockBuilder, NativeOp, Opcode, OperatorRecord, TensorDeclaration,
};
pub use error::{LegalizeError, LegalizeResult};
pub use legalize::{
    is_activation_supported, legalize_activation, legalizer_for, ActivationLegalizer,
    LegalizeOptions, Lowering, TABLE_TRACE_TARGET,
};
pub use naming::{
    global_id_source, AtomicIdSource, NodeContext, NodeKind, NodeRef, UniqueIdSource,
};
pub use region::{Region, RegionBuilder};
pub use spec::{
    ActivationDescriptor, DataType, FunctionKind, FunctionTag, QuantizationParams, Shape,
    TargetDType, TensorDescriptor,
};
pub use table::{synthesize_16bit_table, synthesize_8bit_table, LookupTable};
