use std::fmt;

use serde::{Deserialize, Serialize};

/// Element types a frontend tensor may carry into legalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Float32,
    Float16,
    Int8Asymm,
    Int8Symm,
    Int16Symm,
    Int32,
    Int64,
}

impl DataType {
    pub const ALL: [DataType; 7] = [
        DataType::Float32,
        DataType::Float16,
        DataType::Int8Asymm,
        DataType::Int8Symm,
        DataType::Int16Symm,
        DataType::Int32,
        DataType::Int64,
    ];

    /// Returns `true` for fixed-point types that carry a scale and zero point.
    pub fn is_quantized(self) -> bool {
        matches!(
            self,
            DataType::Int8Asymm | DataType::Int8Symm | DataType::Int16Symm
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float16)
    }

    pub fn bitwidth(self) -> usize {
        match self {
            DataType::Int8Asymm | DataType::Int8Symm => 8,
            DataType::Float16 | DataType::Int16Symm => 16,
            DataType::Float32 | DataType::Int32 => 32,
            DataType::Int64 => 64,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Float32 => "Float32",
            DataType::Float16 => "Float16",
            DataType::Int8Asymm => "QAsymmS8",
            DataType::Int8Symm => "QSymmS8",
            DataType::Int16Symm => "QSymmS16",
            DataType::Int32 => "Signed32",
            DataType::Int64 => "Signed64",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element types of the target tensor ISA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetDType {
    Int8,
    Int16,
    Int32,
    Fp16,
    Fp32,
}

impl TargetDType {
    /// Maps a frontend type onto the ISA. `Int64` has no ISA counterpart.
    pub fn from_data_type(dtype: DataType) -> Option<Self> {
        match dtype {
            DataType::Float16 => Some(TargetDType::Fp16),
            DataType::Float32 => Some(TargetDType::Fp32),
            DataType::Int8Asymm | DataType::Int8Symm => Some(TargetDType::Int8),
            DataType::Int16Symm => Some(TargetDType::Int16),
            DataType::Int32 => Some(TargetDType::Int32),
            DataType::Int64 => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TargetDType::Int8 => "i8",
            TargetDType::Int16 => "i16",
            TargetDType::Int32 => "i32",
            TargetDType::Fp16 => "f16",
            TargetDType::Fp32 => "f32",
        }
    }
}

impl fmt::Display for TargetDType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Affine mapping `real = scale * (code - zero_point)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantizationParams {
    pub scale: f64,
    pub zero_point: i32,
}

impl QuantizationParams {
    pub fn new(scale: f64, zero_point: i32) -> Self {
        Self { scale, zero_point }
    }

    pub fn is_valid(&self) -> bool {
        self.scale.is_finite() && self.scale > 0.0
    }

    pub fn dequantize(&self, code: i32) -> f64 {
        self.scale * (f64::from(code) - f64::from(self.zero_point))
    }
}

/// Logical tensor shape as an ordered list of static extents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: impl Into<Vec<usize>>) -> Self {
        Self { dims: dims.into() }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the element count, or `None` on overflow.
    pub fn element_count(&self) -> Option<usize> {
        self.dims
            .iter()
            .try_fold(1usize, |count, dim| count.checked_mul(*dim))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims = self
            .dims
            .iter()
            .map(|dim| dim.to_string())
            .collect::<Vec<_>>()
            .join("x");
        f.write_str(&dims)
    }
}

/// Tensor metadata handed to a legalizer: shape, element type and optional quantization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorDescriptor {
    pub shape: Shape,
    pub data_type: DataType,
    pub quantization: Option<QuantizationParams>,
}

impl TensorDescriptor {
    pub fn new(data_type: DataType, shape: Shape) -> Self {
        Self {
            shape,
            data_type,
            quantization: None,
        }
    }

    pub fn quantized(data_type: DataType, shape: Shape, params: QuantizationParams) -> Self {
        Self {
            shape,
            data_type,
            quantization: Some(params),
        }
    }
}

/// Activation functions this stage knows how to lower, with their float-domain parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FunctionKind {
    Gelu,
    Sigmoid,
    /// `a * tanh(b * x)`.
    TanH {
        a: f64,
        b: f64,
    },
    Log,
    Rsqrt,
}

impl FunctionKind {
    pub fn tag(&self) -> FunctionTag {
        match self {
            FunctionKind::Gelu => FunctionTag::Gelu,
            FunctionKind::Sigmoid => FunctionTag::Sigmoid,
            FunctionKind::TanH { .. } => FunctionTag::TanH,
            FunctionKind::Log => FunctionTag::Log,
            FunctionKind::Rsqrt => FunctionTag::Rsqrt,
        }
    }
}

/// Parameter-free discriminant of [`FunctionKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionTag {
    Gelu,
    Sigmoid,
    TanH,
    Log,
    Rsqrt,
}

impl FunctionTag {
    pub const ALL: [FunctionTag; 5] = [
        FunctionTag::Gelu,
        FunctionTag::Sigmoid,
        FunctionTag::TanH,
        FunctionTag::Log,
        FunctionTag::Rsqrt,
    ];

    /// Upper-case mnemonic used in block names.
    pub fn mnemonic(self) -> &'static str {
        match self {
            FunctionTag::Gelu => "GELU",
            FunctionTag::Sigmoid => "SIGMOID",
            FunctionTag::TanH => "TANH",
            FunctionTag::Log => "LOG",
            FunctionTag::Rsqrt => "RSQRT",
        }
    }
}

impl fmt::Display for FunctionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Graph-layer description of an activation node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivationDescriptor {
    pub function: FunctionKind,
}

impl ActivationDescriptor {
    pub fn new(function: FunctionKind) -> Self {
        Self { function }
    }

    pub fn tanh(a: f64, b: f64) -> Self {
        Self::new(FunctionKind::TanH { a, b })
    }
}
