//! Lookup-table synthesis for quantized activations.
//!
//! A table maps every quantized input code to the quantized value of `f`
//! evaluated at the dequantized input. The runtime `TABLE` instruction indexes
//! it with the input code offset, so entry order follows code order.

use serde::{Deserialize, Serialize};

use crate::spec::QuantizationParams;

pub const INT8_TABLE_LEN: usize = 256;
pub const INT16_TABLE_LEN: usize = 513;

/// The 16-bit synthesis has not been validated against a reference runtime;
/// legalizers refuse to emit it while this is `false`.
pub(crate) const INT16_TABLES_VALIDATED: bool = false;

/// Precomputed table attached to a `TABLE` operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookupTable {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
}

impl LookupTable {
    pub fn len(&self) -> usize {
        match self {
            LookupTable::Int8(entries) => entries.len(),
            LookupTable::Int16(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_int8(&self) -> Option<&[i8]> {
        match self {
            LookupTable::Int8(entries) => Some(entries),
            LookupTable::Int16(_) => None,
        }
    }

    pub fn as_int16(&self) -> Option<&[i16]> {
        match self {
            LookupTable::Int16(entries) => Some(entries),
            LookupTable::Int8(_) => None,
        }
    }

    /// Entry for an 8-bit input code in `[-128, 127]`.
    pub fn lookup_i8(&self, code: i8) -> Option<i8> {
        let index = (i16::from(code) + 128) as usize;
        self.as_int8().and_then(|entries| entries.get(index).copied())
    }

    /// Entries widened to `i32`, in table order.
    pub fn widened(&self) -> Vec<i32> {
        match self {
            LookupTable::Int8(entries) => entries.iter().map(|v| i32::from(*v)).collect(),
            LookupTable::Int16(entries) => entries.iter().map(|v| i32::from(*v)).collect(),
        }
    }
}

/// Builds the 256-entry int8 table approximating `f`.
///
/// Results at or above the saturation bound map to `i8::MAX` instead of being
/// rescaled, so an infinite `f(x)` never wraps. `f` is expected to keep its
/// own domain NaN-free.
pub fn synthesize_8bit_table<F>(
    input: QuantizationParams,
    output: QuantizationParams,
    f: F,
) -> LookupTable
where
    F: Fn(f64) -> f64,
{
    let max = if output.scale > 1.0 {
        f64::MAX
    } else {
        f64::MAX * output.scale
    };

    let mut entries = Vec::with_capacity(INT8_TABLE_LEN);
    for code in i32::from(i8::MIN)..=i32::from(i8::MAX) {
        let transformed = f(input.dequantize(code));
        if transformed >= max {
            entries.push(i8::MAX);
            continue;
        }
        let rescaled = (transformed / output.scale).round() as i64;
        let quantized = rescaled.saturating_add(i64::from(output.zero_point));
        entries.push(quantized.clamp(i64::from(i8::MIN), i64::from(i8::MAX)) as i8);
    }
    LookupTable::Int8(entries)
}

/// Builds the 513-entry int16 table approximating `f`.
///
/// Each entry is biased so that linear interpolation between neighbouring
/// entries lands on `f` at the midpoint of the step. Legalizers do not emit
/// these tables until the synthesis has been validated.
pub fn synthesize_16bit_table<F>(
    input: QuantizationParams,
    output: QuantizationParams,
    f: F,
) -> LookupTable
where
    F: Fn(f64) -> f64,
{
    let input_min = input.dequantize(i32::from(i16::MIN));
    let input_max = input.dequantize(i32::from(i16::MAX));
    let output_min = output.dequantize(i32::from(i16::MIN));
    let output_max = output.dequantize(i32::from(i16::MAX));

    let steps = (INT16_TABLE_LEN - 1) as f64;
    let step = (input_max - input_min) / steps;
    let half_step = step / 2.0;
    let output_scaling_inv = 65536.0 / (output_max - output_min);
    let scaled = |x: f64| (f(x) * output_scaling_inv).round();

    let mut entries = Vec::with_capacity(INT16_TABLE_LEN);
    for i in 0..INT16_TABLE_LEN - 1 {
        let x = input_min + i as f64 * step;
        let sample = scaled(x);
        let next = scaled(input_min + (i + 1) as f64 * step);
        let midpoint_interp = ((next + sample) / 2.0).round();
        let midpoint_actual = scaled(x + half_step);
        let bias = ((midpoint_interp - midpoint_actual) / 2.0).round();
        entries.push(clamp_i16(sample - bias));
    }
    entries.push(clamp_i16(scaled(input_max)));
    LookupTable::Int16(entries)
}

fn clamp_i16(value: f64) -> i16 {
    value.clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}
