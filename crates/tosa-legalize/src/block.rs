use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{LegalizeError, LegalizeResult};
use crate::spec::{Shape, TargetDType};
use crate::table::LookupTable;

/// Native ISA instructions the activation legalizers may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeOp {
    Sigmoid,
    Rsqrt,
}

impl NativeOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            NativeOp::Sigmoid => "SIGMOID",
            NativeOp::Rsqrt => "RSQRT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    Table,
    Native(NativeOp),
}

impl Opcode {
    pub fn is_table(self) -> bool {
        matches!(self, Opcode::Table)
    }

    pub fn is_native(self) -> bool {
        matches!(self, Opcode::Native(_))
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Table => "TABLE",
            Opcode::Native(op) => op.mnemonic(),
        }
    }
}

/// Named tensor declared by a block. Declarations carry no data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorDeclaration {
    pub name: String,
    pub shape: Shape,
    pub dtype: TargetDType,
}

impl TensorDeclaration {
    pub fn new(name: impl Into<String>, shape: Shape, dtype: TargetDType) -> Self {
        Self {
            name: name.into(),
            shape,
            dtype,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRecord {
    pub opcode: Opcode,
    pub attribute: Option<LookupTable>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl OperatorRecord {
    pub fn table(table: LookupTable, input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            opcode: Opcode::Table,
            attribute: Some(table),
            inputs: vec![input.into()],
            outputs: vec![output.into()],
        }
    }

    pub fn native(op: NativeOp, input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            opcode: Opcode::Native(op),
            attribute: None,
            inputs: vec![input.into()],
            outputs: vec![output.into()],
        }
    }
}

/// Serializable unit produced by one legalization call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub name: String,
    /// Opaque region tag, passed through unchanged.
    pub region: String,
    pub tensors: Vec<TensorDeclaration>,
    pub operators: Vec<OperatorRecord>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

#[derive(Debug, Error)]
pub enum BlockSerdeError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
}

impl BasicBlock {
    pub fn tensor(&self, name: &str) -> Option<&TensorDeclaration> {
        self.tensors.iter().find(|tensor| tensor.name == name)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.tensor(name).is_some()
    }

    pub fn to_json_string(&self) -> Result<String, BlockSerdeError> {
        serde_json::to_string_pretty(self).map_err(BlockSerdeError::from)
    }

    pub fn from_json_str(src: &str) -> Result<Self, BlockSerdeError> {
        serde_json::from_str(src).map_err(BlockSerdeError::from)
    }

    pub fn to_bincode_bytes(&self) -> Result<Vec<u8>, BlockSerdeError> {
        bincode::serialize(self).map_err(BlockSerdeError::from)
    }

    pub fn from_bincode_slice(bytes: &[u8]) -> Result<Self, BlockSerdeError> {
        bincode::deserialize(bytes).map_err(BlockSerdeError::from)
    }

    pub fn to_text(&self) -> String {
        format!("{self}")
    }

    /// Checks the block-local connectivity rules.
    ///
    /// Operator inputs that are not declared here must be listed as block
    /// inputs; they are declared by whichever block produced them.
    pub fn validate(&self) -> LegalizeResult<()> {
        let mut declared = HashSet::with_capacity(self.tensors.len());
        for tensor in &self.tensors {
            if !declared.insert(tensor.name.as_str()) {
                return Err(LegalizeError::invalid_block(format!(
                    "{}: tensor '{}' declared more than once",
                    self.name, tensor.name
                )));
            }
        }

        for (idx, op) in self.operators.iter().enumerate() {
            for name in &op.inputs {
                if !declared.contains(name.as_str()) && !self.inputs.contains(name) {
                    return Err(LegalizeError::invalid_block(format!(
                        "{}: operator {idx} reads undeclared tensor '{name}'",
                        self.name
                    )));
                }
            }
            for name in &op.outputs {
                if !declared.contains(name.as_str()) {
                    return Err(LegalizeError::invalid_block(format!(
                        "{}: operator {idx} writes undeclared tensor '{name}'",
                        self.name
                    )));
                }
            }
        }

        for name in &self.outputs {
            if !declared.contains(name.as_str()) {
                return Err(LegalizeError::invalid_block(format!(
                    "{}: block output '{name}' is not declared",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Accumulates the parts of a [`BasicBlock`] and validates them on `finish`.
#[derive(Debug, Clone)]
pub struct BasicBlockBuilder {
    name: String,
    region: String,
    tensors: Vec<TensorDeclaration>,
    operators: Vec<OperatorRecord>,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

impl BasicBlockBuilder {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            tensors: Vec::new(),
            operators: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn declare(&mut self, tensor: TensorDeclaration) -> &mut Self {
        self.tensors.push(tensor);
        self
    }

    pub fn push_operator(&mut self, op: OperatorRecord) -> &mut Self {
        self.operators.push(op);
        self
    }

    pub fn add_input(&mut self, name: impl Into<String>) -> &mut Self {
        self.inputs.push(name.into());
        self
    }

    pub fn add_output(&mut self, name: impl Into<String>) -> &mut Self {
        self.outputs.push(name.into());
        self
    }

    pub fn finish(self) -> LegalizeResult<BasicBlock> {
        let block = BasicBlock {
            name: self.name,
            region: self.region,
            tensors: self.tensors,
            operators: self.operators,
            inputs: self.inputs,
            outputs: self.outputs,
        };
        block.validate()?;
        Ok(block)
    }
}

pub(crate) fn write_line(f: &mut fmt::Formatter<'_>, indent: usize, text: &str) -> fmt::Result {
    for _ in 0..indent {
        f.write_str("  ")?;
    }
    f.write_str(text)?;
    f.write_str("\n")
}

pub(crate) fn fmt_block(
    block: &BasicBlock,
    indent: usize,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    write_line(
        f,
        indent,
        &format!("block @{} (region = {}) {{", block.name, block.region),
    )?;
    if !block.tensors.is_empty() {
        write_line(f, indent + 1, "tensors:")?;
        for tensor in &block.tensors {
            write_line(
                f,
                indent + 2,
                &format!("{} : tensor<{}, {}>", tensor.name, tensor.dtype, tensor.shape),
            )?;
        }
    }
    if !block.operators.is_empty() {
        write_line(f, indent + 1, "ops:")?;
        for op in &block.operators {
            let mut line = format!(
                "{}({}) -> {}",
                op.opcode.mnemonic(),
                op.inputs.join(", "),
                op.outputs.join(", ")
            );
            match &op.attribute {
                Some(LookupTable::Int8(entries)) => {
                    line.push_str(&format!(" table=i8[{}]", entries.len()));
                }
                Some(LookupTable::Int16(entries)) => {
                    line.push_str(&format!(" table=i16[{}]", entries.len()));
                }
                None => {}
            }
            write_line(f, indent + 2, &line)?;
        }
    }
    write_line(f, indent + 1, &format!("inputs: [{}]", block.inputs.join(", ")))?;
    write_line(f, indent + 1, &format!("outputs: [{}]", block.outputs.join(", ")))?;
    write_line(f, indent, "}")
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_block(self, 0, f)
    }
}
