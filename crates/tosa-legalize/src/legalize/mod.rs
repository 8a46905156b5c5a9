//! Activation legalization.
//!
//! Each supported function is described by one [`ActivationLegalizer`]: the
//! function tag it accepts and a capability table deciding how every input
//! data type is lowered. The dispatch skeleton is shared; the per-function
//! tables and float transforms live in [`functions`].

mod functions;

use std::slice;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::block::{BasicBlock, BasicBlockBuilder, NativeOp, OperatorRecord, TensorDeclaration};
use crate::error::{LegalizeError, LegalizeResult};
use crate::naming::{self, AtomicIdSource, NodeContext, UniqueIdSource};
use crate::spec::{
    ActivationDescriptor, DataType, FunctionKind, FunctionTag, QuantizationParams, TargetDType,
    TensorDescriptor,
};
use crate::table::{self, LookupTable};

pub use functions::{GELU, LOG, RSQRT, SIGMOID, TANH};

/// Region tag used when the caller does not supply one.
pub const DEFAULT_REGION: &str = "main";

/// Target of the trace events dumping synthesized tables; enable it with a
/// subscriber filter such as `tosa_legalize::tables=trace`.
pub const TABLE_TRACE_TARGET: &str = "tosa_legalize::tables";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalizeOptions {
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl Default for LegalizeOptions {
    fn default() -> Self {
        Self {
            region: default_region(),
        }
    }
}

impl LegalizeOptions {
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }
}

/// Codegen strategy for one `(function, data type)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lowering {
    /// 256-entry int8 lookup table.
    Table8,
    /// 513-entry int16 lookup table; disabled until validated.
    Table16,
    /// Single native ISA instruction.
    Native(NativeOp),
    /// Lowering exists in principle but is not wired up.
    NotYetImplemented,
    Unsupported,
}

impl Lowering {
    fn is_available(self) -> bool {
        match self {
            Lowering::Table8 | Lowering::Native(_) => true,
            Lowering::Table16 => table::INT16_TABLES_VALIDATED,
            Lowering::NotYetImplemented | Lowering::Unsupported => false,
        }
    }
}

pub type CapabilityFn = fn(DataType) -> Lowering;

pub struct ActivationLegalizer {
    name: &'static str,
    tag: FunctionTag,
    capabilities: CapabilityFn,
}

impl ActivationLegalizer {
    pub const fn new(
        name: &'static str,
        tag: FunctionTag,
        capabilities: CapabilityFn,
    ) -> Self {
        Self {
            name,
            tag,
            capabilities,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn tag(&self) -> FunctionTag {
        self.tag
    }

    pub fn lowering(&self, dtype: DataType) -> Lowering {
        (self.capabilities)(dtype)
    }

    /// Data types this function can currently be lowered for.
    pub fn supported_types(&self) -> Vec<DataType> {
        DataType::ALL
            .into_iter()
            .filter(|dtype| self.lowering(*dtype).is_available())
            .collect()
    }

    /// Evaluates the float-domain transform of `function` at `x`.
    pub fn transform(&self, function: &FunctionKind, output: &QuantizationParams, x: f64) -> f64 {
        functions::evaluate(function, output, x)
    }

    /// Lowers one activation node into a basic block.
    ///
    /// `node` is `None` in validation mode, where tensor names fall back to
    /// fixed sentinels.
    #[instrument(skip_all, fields(function = %self.tag))]
    pub fn legalize(
        &self,
        node: Option<&NodeContext>,
        descriptor: &ActivationDescriptor,
        inputs: &[TensorDescriptor],
        outputs: &[TensorDescriptor],
        ids: &dyn UniqueIdSource,
        options: &LegalizeOptions,
    ) -> LegalizeResult<BasicBlock> {
        if inputs.len() != 1 {
            return Err(LegalizeError::argument(
                self.name,
                format!("1 input tensor required, got {}", inputs.len()),
            ));
        }
        if outputs.len() != 1 {
            return Err(LegalizeError::argument(
                self.name,
                format!("1 output tensor required, got {}", outputs.len()),
            ));
        }
        let function = descriptor.function;
        if function.tag() != self.tag {
            return Err(LegalizeError::argument(
                self.name,
                format!(
                    "descriptor operation {} does not match {}",
                    function.tag(),
                    self.tag
                ),
            ));
        }

        let input = &inputs[0];
        let output = &outputs[0];
        let input_name = naming::input_name(node);
        let output_name = naming::output_name(node);

        let lowering = self.lowering(input.data_type);
        debug!(dtype = %input.data_type, ?lowering, "selected lowering");

        let op = match lowering {
            Lowering::Table8 => {
                let table = self.table8(&function, input, output)?;
                OperatorRecord::table(table, input_name.clone(), output_name.clone())
            }
            Lowering::Table16 => {
                if !table::INT16_TABLES_VALIDATED {
                    return Err(self.not_yet_implemented(input.data_type));
                }
                let table = self.table16(&function, input, output)?;
                OperatorRecord::table(table, input_name.clone(), output_name.clone())
            }
            Lowering::Native(native) => {
                if !output.data_type.is_float() {
                    return Err(LegalizeError::argument(
                        self.name,
                        format!(
                            "native {} expects a float output, got {}",
                            native.mnemonic(),
                            output.data_type
                        ),
                    ));
                }
                OperatorRecord::native(native, input_name.clone(), output_name.clone())
            }
            Lowering::NotYetImplemented => return Err(self.not_yet_implemented(input.data_type)),
            Lowering::Unsupported => return Err(self.unsupported(input.data_type)),
        };

        let block_name = naming::block_name(self.tag, ids);
        let mut builder = BasicBlockBuilder::new(block_name.clone(), options.region.clone());
        if naming::declares_input(&input_name) {
            builder.declare(TensorDeclaration::new(
                input_name.clone(),
                input.shape.clone(),
                self.target_dtype(input.data_type)?,
            ));
        }
        builder
            .declare(TensorDeclaration::new(
                output_name.clone(),
                output.shape.clone(),
                self.target_dtype(output.data_type)?,
            ))
            .push_operator(op)
            .add_input(input_name)
            .add_output(output_name);

        let block = builder.finish()?;
        debug!(block = %block.name, tensors = block.tensors.len(), "emitted block");
        Ok(block)
    }

    fn table8(
        &self,
        function: &FunctionKind,
        input: &TensorDescriptor,
        output: &TensorDescriptor,
    ) -> LegalizeResult<LookupTable> {
        if !matches!(output.data_type, DataType::Int8Asymm | DataType::Int8Symm) {
            return Err(LegalizeError::argument(
                self.name,
                format!("8-bit table expects an 8-bit output, got {}", output.data_type),
            ));
        }
        let input_q = self.quantization(input, "input")?;
        let output_q = self.quantization(output, "output")?;
        let table = table::synthesize_8bit_table(input_q, output_q, |x| {
            functions::evaluate(function, &output_q, x)
        });
        self.trace_table(&table);
        Ok(table)
    }

    fn table16(
        &self,
        function: &FunctionKind,
        input: &TensorDescriptor,
        output: &TensorDescriptor,
    ) -> LegalizeResult<LookupTable> {
        let input_q = self.quantization(input, "input")?;
        let output_q = self.quantization(output, "output")?;
        let table = table::synthesize_16bit_table(input_q, output_q, |x| {
            functions::evaluate(function, &output_q, x)
        });
        self.trace_table(&table);
        Ok(table)
    }

    fn trace_table(&self, table: &LookupTable) {
        trace!(
            target: TABLE_TRACE_TARGET,
            function = %self.tag,
            len = table.len(),
            entries = ?table.widened(),
            "synthesized table"
        );
    }

    fn quantization(
        &self,
        tensor: &TensorDescriptor,
        role: &str,
    ) -> LegalizeResult<QuantizationParams> {
        let params = tensor.quantization.ok_or_else(|| {
            LegalizeError::argument(
                self.name,
                format!("{role} tensor of type {} has no quantization", tensor.data_type),
            )
        })?;
        if !params.is_valid() {
            return Err(LegalizeError::argument(
                self.name,
                format!("{role} quantization scale must be positive, got {}", params.scale),
            ));
        }
        Ok(params)
    }

    fn target_dtype(&self, dtype: DataType) -> LegalizeResult<TargetDType> {
        TargetDType::from_data_type(dtype).ok_or_else(|| self.unsupported(dtype))
    }

    fn unsupported(&self, dtype: DataType) -> LegalizeError {
        LegalizeError::UnsupportedType {
            operator: self.name,
            dtype,
            supported: self.supported_types(),
        }
    }

    fn not_yet_implemented(&self, dtype: DataType) -> LegalizeError {
        LegalizeError::NotYetImplemented {
            operator: self.name,
            dtype,
            supported: self.supported_types(),
        }
    }
}

/// Returns the legalizer handling `tag`.
pub fn legalizer_for(tag: FunctionTag) -> &'static ActivationLegalizer {
    match tag {
        FunctionTag::Gelu => &GELU,
        FunctionTag::Sigmoid => &SIGMOID,
        FunctionTag::TanH => &TANH,
        FunctionTag::Log => &LOG,
        FunctionTag::Rsqrt => &RSQRT,
    }
}

/// Lowers an activation node with the legalizer matching its descriptor.
pub fn legalize_activation(
    node: Option<&NodeContext>,
    descriptor: &ActivationDescriptor,
    inputs: &[TensorDescriptor],
    outputs: &[TensorDescriptor],
    ids: &dyn UniqueIdSource,
    options: &LegalizeOptions,
) -> LegalizeResult<BasicBlock> {
    legalizer_for(descriptor.function.tag()).legalize(
        node, descriptor, inputs, outputs, ids, options,
    )
}

/// Probes whether an activation can be lowered, without a graph.
///
/// Runs the full legalization in validation mode and discards the block.
pub fn is_activation_supported(
    descriptor: &ActivationDescriptor,
    input: &TensorDescriptor,
    output: &TensorDescriptor,
) -> LegalizeResult<()> {
    let ids = AtomicIdSource::new();
    legalize_activation(
        None,
        descriptor,
        slice::from_ref(input),
        slice::from_ref(output),
        &ids,
        &LegalizeOptions::default(),
    )
    .map(|_| ())
}
