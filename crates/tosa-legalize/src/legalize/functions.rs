use std::f64::consts::SQRT_2;

use super::{ActivationLegalizer, Lowering};
use crate::block::NativeOp;
use crate::spec::{DataType, FunctionKind, FunctionTag, QuantizationParams};

pub static GELU: ActivationLegalizer =
    ActivationLegalizer::new("legalize_gelu", FunctionTag::Gelu, gelu_lowering);

pub static SIGMOID: ActivationLegalizer =
    ActivationLegalizer::new("legalize_sigmoid", FunctionTag::Sigmoid, sigmoid_lowering);

pub static TANH: ActivationLegalizer =
    ActivationLegalizer::new("legalize_tanh", FunctionTag::TanH, tanh_lowering);

pub static LOG: ActivationLegalizer =
    ActivationLegalizer::new("legalize_log", FunctionTag::Log, log_lowering);

pub static RSQRT: ActivationLegalizer =
    ActivationLegalizer::new("legalize_rsqrt", FunctionTag::Rsqrt, rsqrt_lowering);

/// Float-domain transform `y = f(x)` for `function`. `output` lets functions
/// with a restricted domain clamp to the output range.
pub(super) fn evaluate(function: &FunctionKind, output: &QuantizationParams, x: f64) -> f64 {
    match *function {
        FunctionKind::Gelu => gelu(x),
        FunctionKind::Sigmoid => sigmoid(x),
        FunctionKind::TanH { a, b } => tanh(a, b, x),
        FunctionKind::Log => log(output, x),
        FunctionKind::Rsqrt => rsqrt(output, x),
    }
}

fn gelu_lowering(dtype: DataType) -> Lowering {
    match dtype {
        DataType::Int8Asymm | DataType::Int8Symm => Lowering::Table8,
        DataType::Int16Symm => Lowering::Table16,
        DataType::Int32 | DataType::Int64 => Lowering::Unsupported,
        DataType::Float32 | DataType::Float16 => Lowering::NotYetImplemented,
    }
}

fn gelu(x: f64) -> f64 {
    0.5 * x * libm::erfc(-x / SQRT_2)
}

fn sigmoid_lowering(dtype: DataType) -> Lowering {
    match dtype {
        DataType::Int8Asymm | DataType::Int8Symm => Lowering::Table8,
        DataType::Int16Symm => Lowering::Table16,
        DataType::Int32 | DataType::Int64 => Lowering::Unsupported,
        DataType::Float32 | DataType::Float16 => Lowering::Native(NativeOp::Sigmoid),
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn tanh_lowering(dtype: DataType) -> Lowering {
    match dtype {
        DataType::Int8Asymm | DataType::Int8Symm => Lowering::Table8,
        DataType::Int16Symm => Lowering::Table16,
        DataType::Int32 | DataType::Int64 => Lowering::Unsupported,
        DataType::Float32 | DataType::Float16 => Lowering::NotYetImplemented,
    }
}

fn tanh(a: f64, b: f64, x: f64) -> f64 {
    a * (b * x).tanh()
}

fn log_lowering(dtype: DataType) -> Lowering {
    match dtype {
        DataType::Int8Asymm | DataType::Int8Symm => Lowering::Table8,
        DataType::Int16Symm | DataType::Int32 | DataType::Int64 => Lowering::Unsupported,
        DataType::Float32 | DataType::Float16 => Lowering::NotYetImplemented,
    }
}

/// Non-positive inputs clamp to the smallest representable output.
fn log(output: &QuantizationParams, x: f64) -> f64 {
    if x > 0.0 {
        x.ln()
    } else {
        output.dequantize(i32::from(i8::MIN))
    }
}

fn rsqrt_lowering(dtype: DataType) -> Lowering {
    match dtype {
        DataType::Int8Asymm | DataType::Int8Symm => Lowering::Table8,
        DataType::Int16Symm | DataType::Int32 | DataType::Int64 => Lowering::Unsupported,
        DataType::Float32 | DataType::Float16 => Lowering::Native(NativeOp::Rsqrt),
    }
}

/// Non-positive inputs clamp to the largest representable output.
fn rsqrt(output: &QuantizationParams, x: f64) -> f64 {
    if x > 0.0 {
        1.0 / x.sqrt()
    } else {
        output.dequantize(i32::from(i8::MAX))
    }
}
