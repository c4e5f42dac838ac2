// src/query/ops.rs

use crate::core::value::{ArrayData, ScalarValue};
use crate::error::DafError;
use crate::query::registry::{
    check_params, numeric_param, register_eltwise, register_reduction, EltwiseOp, ParamMap,
    ReductionOp,
};

fn numeric_mismatch(op: &str, values: &ArrayData) -> DafError {
    DafError::TypeMismatch {
        what: format!("input of the operation: {}", op),
        expected: "a numeric kind".to_string(),
        actual: values.kind().to_string(),
    }
}

fn empty_reduction(op: &str) -> DafError {
    DafError::InvalidData {
        what: format!("input of the operation: {}", op),
        reason: "the array is empty".to_string(),
    }
}

/// Registers the built-in operations. Safe to call any number of times; the
/// registrations come from fixed sites in this file, so repeats are no-ops.
pub fn register_builtin_ops() -> Result<(), DafError> {
    register_eltwise("Abs", Abs::create)?;
    register_eltwise("Clamp", Clamp::create)?;
    register_eltwise("Round", Round::create)?;
    register_eltwise("Log", Log::create)?;
    register_eltwise("Fraction", Fraction::create)?;
    register_reduction("Sum", Sum::create)?;
    register_reduction("Mean", Mean::create)?;
    register_reduction("Min", Min::create)?;
    register_reduction("Max", Max::create)?;
    register_reduction("Std", Std::create)?;
    Ok(())
}

/// Absolute value, preserving the element kind. Signed minima saturate.
struct Abs;

impl Abs {
    fn create(params: &ParamMap) -> Result<Box<dyn EltwiseOp>, DafError> {
        check_params("Abs", params, &[])?;
        Ok(Box::new(Abs))
    }
}

impl EltwiseOp for Abs {
    fn apply_array(&self, values: &ArrayData) -> Result<ArrayData, DafError> {
        Ok(match values {
            ArrayData::I8(v) => ArrayData::I8(v.iter().map(|&x| x.saturating_abs()).collect()),
            ArrayData::I16(v) => ArrayData::I16(v.iter().map(|&x| x.saturating_abs()).collect()),
            ArrayData::I32(v) => ArrayData::I32(v.iter().map(|&x| x.saturating_abs()).collect()),
            ArrayData::I64(v) => ArrayData::I64(v.iter().map(|&x| x.saturating_abs()).collect()),
            ArrayData::U8(_)
            | ArrayData::U16(_)
            | ArrayData::U32(_)
            | ArrayData::U64(_) => values.clone(),
            ArrayData::F32(v) => ArrayData::F32(v.iter().map(|&x| x.abs()).collect()),
            ArrayData::F64(v) => ArrayData::F64(v.iter().map(|&x| x.abs()).collect()),
            other => return Err(numeric_mismatch("Abs", other)),
        })
    }
}

/// Clamp into `[min, max]`, preserving the element kind.
struct Clamp {
    min: f64,
    max: f64,
}

impl Clamp {
    fn create(params: &ParamMap) -> Result<Box<dyn EltwiseOp>, DafError> {
        check_params("Clamp", params, &["min", "max"])?;
        let min = numeric_param("Clamp", params, "min", f64::NEG_INFINITY)?;
        let max = numeric_param("Clamp", params, "max", f64::INFINITY)?;
        if min > max {
            return Err(DafError::InvalidData {
                what: "parameter of the operation: Clamp".to_string(),
                reason: format!("min: {} is above max: {}", min, max),
            });
        }
        Ok(Box::new(Clamp { min, max }))
    }
}

macro_rules! clamp_ints {
    ($self:expr, $v:expr, $ty:ty) => {
        $v.iter()
            .map(|&x| {
                let value = x as f64;
                if value < $self.min {
                    $self.min as $ty
                } else if value > $self.max {
                    $self.max as $ty
                } else {
                    x
                }
            })
            .collect()
    };
}

impl EltwiseOp for Clamp {
    fn apply_array(&self, values: &ArrayData) -> Result<ArrayData, DafError> {
        Ok(match values {
            ArrayData::I8(v) => ArrayData::I8(clamp_ints!(self, v, i8)),
            ArrayData::I16(v) => ArrayData::I16(clamp_ints!(self, v, i16)),
            ArrayData::I32(v) => ArrayData::I32(clamp_ints!(self, v, i32)),
            ArrayData::I64(v) => ArrayData::I64(clamp_ints!(self, v, i64)),
            ArrayData::U8(v) => ArrayData::U8(clamp_ints!(self, v, u8)),
            ArrayData::U16(v) => ArrayData::U16(clamp_ints!(self, v, u16)),
            ArrayData::U32(v) => ArrayData::U32(clamp_ints!(self, v, u32)),
            ArrayData::U64(v) => ArrayData::U64(clamp_ints!(self, v, u64)),
            ArrayData::F32(v) => ArrayData::F32(
                v.iter()
                    .map(|&x| (x as f64).clamp(self.min, self.max) as f32)
                    .collect(),
            ),
            ArrayData::F64(v) => {
                ArrayData::F64(v.iter().map(|&x| x.clamp(self.min, self.max)).collect())
            }
            other => return Err(numeric_mismatch("Clamp", other)),
        })
    }
}

/// Round floats to the nearest integer value, keeping the float kind;
/// integers pass through unchanged.
struct Round;

impl Round {
    fn create(params: &ParamMap) -> Result<Box<dyn EltwiseOp>, DafError> {
        check_params("Round", params, &[])?;
        Ok(Box::new(Round))
    }
}

impl EltwiseOp for Round {
    fn apply_array(&self, values: &ArrayData) -> Result<ArrayData, DafError> {
        Ok(match values {
            ArrayData::F32(v) => ArrayData::F32(v.iter().map(|&x| x.round()).collect()),
            ArrayData::F64(v) => ArrayData::F64(v.iter().map(|&x| x.round()).collect()),
            other if other.kind().is_numeric() => other.clone(),
            other => return Err(numeric_mismatch("Round", other)),
        })
    }
}

/// Logarithm in a configurable base with an additive epsilon; the result is
/// always f64.
struct Log {
    base: f64,
    eps: f64,
}

impl Log {
    fn create(params: &ParamMap) -> Result<Box<dyn EltwiseOp>, DafError> {
        check_params("Log", params, &["base", "eps"])?;
        Ok(Box::new(Log {
            base: numeric_param("Log", params, "base", std::f64::consts::E)?,
            eps: numeric_param("Log", params, "eps", 0.0)?,
        }))
    }
}

impl EltwiseOp for Log {
    fn apply_array(&self, values: &ArrayData) -> Result<ArrayData, DafError> {
        if !values.kind().is_numeric() {
            return Err(numeric_mismatch("Log", values));
        }
        let scale = self.base.ln();
        let mut result = Vec::with_capacity(values.len());
        for value in values.to_f64_vec()? {
            let shifted = value + self.eps;
            if shifted <= 0.0 {
                return Err(DafError::InvalidData {
                    what: "input of the operation: Log".to_string(),
                    reason: format!("the value: {} is not positive", shifted),
                });
            }
            result.push(shifted.ln() / scale);
        }
        Ok(ArrayData::F64(result))
    }
}

/// Each value divided by the total, as f64.
struct Fraction;

impl Fraction {
    fn create(params: &ParamMap) -> Result<Box<dyn EltwiseOp>, DafError> {
        check_params("Fraction", params, &[])?;
        Ok(Box::new(Fraction))
    }
}

impl EltwiseOp for Fraction {
    fn apply_array(&self, values: &ArrayData) -> Result<ArrayData, DafError> {
        if !values.kind().is_numeric() {
            return Err(numeric_mismatch("Fraction", values));
        }
        let dense = values.to_f64_vec()?;
        let total: f64 = dense.iter().sum();
        if total == 0.0 {
            return Err(DafError::InvalidData {
                what: "input of the operation: Fraction".to_string(),
                reason: "the total is zero".to_string(),
            });
        }
        Ok(ArrayData::F64(dense.iter().map(|x| x / total).collect()))
    }
}

/// Sum; signed integers widen to i64, unsigned to u64, floats to f64,
/// booleans count the true entries.
struct Sum;

impl Sum {
    fn create(params: &ParamMap) -> Result<Box<dyn ReductionOp>, DafError> {
        check_params("Sum", params, &[])?;
        Ok(Box::new(Sum))
    }
}

impl ReductionOp for Sum {
    fn reduce_array(&self, values: &ArrayData) -> Result<ScalarValue, DafError> {
        Ok(match values {
            ArrayData::I8(v) => {
                ScalarValue::I64(v.iter().fold(0i64, |s, &x| s.wrapping_add(x as i64)))
            }
            ArrayData::I16(v) => {
                ScalarValue::I64(v.iter().fold(0i64, |s, &x| s.wrapping_add(x as i64)))
            }
            ArrayData::I32(v) => {
                ScalarValue::I64(v.iter().fold(0i64, |s, &x| s.wrapping_add(x as i64)))
            }
            ArrayData::I64(v) => ScalarValue::I64(v.iter().fold(0i64, |s, &x| s.wrapping_add(x))),
            ArrayData::U8(v) => {
                ScalarValue::U64(v.iter().fold(0u64, |s, &x| s.wrapping_add(x as u64)))
            }
            ArrayData::U16(v) => {
                ScalarValue::U64(v.iter().fold(0u64, |s, &x| s.wrapping_add(x as u64)))
            }
            ArrayData::U32(v) => {
                ScalarValue::U64(v.iter().fold(0u64, |s, &x| s.wrapping_add(x as u64)))
            }
            ArrayData::U64(v) => ScalarValue::U64(v.iter().fold(0u64, |s, &x| s.wrapping_add(x))),
            ArrayData::F32(v) => ScalarValue::F64(v.iter().map(|&x| x as f64).sum()),
            ArrayData::F64(v) => ScalarValue::F64(v.iter().sum()),
            ArrayData::Bool(v) => ScalarValue::U64(v.iter().filter(|&&x| x).count() as u64),
            other => return Err(numeric_mismatch("Sum", other)),
        })
    }
}

/// Arithmetic mean as f64.
struct Mean;

impl Mean {
    fn create(params: &ParamMap) -> Result<Box<dyn ReductionOp>, DafError> {
        check_params("Mean", params, &[])?;
        Ok(Box::new(Mean))
    }
}

impl ReductionOp for Mean {
    fn reduce_array(&self, values: &ArrayData) -> Result<ScalarValue, DafError> {
        if !values.kind().is_numeric() {
            return Err(numeric_mismatch("Mean", values));
        }
        if values.is_empty() {
            return Err(empty_reduction("Mean"));
        }
        let dense = values.to_f64_vec()?;
        Ok(ScalarValue::F64(
            dense.iter().sum::<f64>() / dense.len() as f64,
        ))
    }
}

macro_rules! int_extremum {
    ($v:expr, $variant:ident, $method:ident, $op:expr) => {
        $v.iter()
            .copied()
            .$method()
            .map(ScalarValue::$variant)
            .ok_or_else(|| empty_reduction($op))
    };
}

/// Minimum, preserving the element kind.
struct Min;

impl Min {
    fn create(params: &ParamMap) -> Result<Box<dyn ReductionOp>, DafError> {
        check_params("Min", params, &[])?;
        Ok(Box::new(Min))
    }
}

impl ReductionOp for Min {
    fn reduce_array(&self, values: &ArrayData) -> Result<ScalarValue, DafError> {
        if values.is_empty() {
            return Err(empty_reduction("Min"));
        }
        Ok(match values {
            ArrayData::I8(v) => int_extremum!(v, I8, min, "Min")?,
            ArrayData::I16(v) => int_extremum!(v, I16, min, "Min")?,
            ArrayData::I32(v) => int_extremum!(v, I32, min, "Min")?,
            ArrayData::I64(v) => int_extremum!(v, I64, min, "Min")?,
            ArrayData::U8(v) => int_extremum!(v, U8, min, "Min")?,
            ArrayData::U16(v) => int_extremum!(v, U16, min, "Min")?,
            ArrayData::U32(v) => int_extremum!(v, U32, min, "Min")?,
            ArrayData::U64(v) => int_extremum!(v, U64, min, "Min")?,
            ArrayData::F32(v) => {
                ScalarValue::F32(v.iter().copied().fold(f32::INFINITY, f32::min))
            }
            ArrayData::F64(v) => {
                ScalarValue::F64(v.iter().copied().fold(f64::INFINITY, f64::min))
            }
            ArrayData::Bool(v) => ScalarValue::Bool(v.iter().all(|&x| x)),
            other => return Err(numeric_mismatch("Min", other)),
        })
    }
}

/// Maximum, preserving the element kind.
struct Max;

impl Max {
    fn create(params: &ParamMap) -> Result<Box<dyn ReductionOp>, DafError> {
        check_params("Max", params, &[])?;
        Ok(Box::new(Max))
    }
}

impl ReductionOp for Max {
    fn reduce_array(&self, values: &ArrayData) -> Result<ScalarValue, DafError> {
        if values.is_empty() {
            return Err(empty_reduction("Max"));
        }
        Ok(match values {
            ArrayData::I8(v) => int_extremum!(v, I8, max, "Max")?,
            ArrayData::I16(v) => int_extremum!(v, I16, max, "Max")?,
            ArrayData::I32(v) => int_extremum!(v, I32, max, "Max")?,
            ArrayData::I64(v) => int_extremum!(v, I64, max, "Max")?,
            ArrayData::U8(v) => int_extremum!(v, U8, max, "Max")?,
            ArrayData::U16(v) => int_extremum!(v, U16, max, "Max")?,
            ArrayData::U32(v) => int_extremum!(v, U32, max, "Max")?,
            ArrayData::U64(v) => int_extremum!(v, U64, max, "Max")?,
            ArrayData::F32(v) => {
                ScalarValue::F32(v.iter().copied().fold(f32::NEG_INFINITY, f32::max))
            }
            ArrayData::F64(v) => {
                ScalarValue::F64(v.iter().copied().fold(f64::NEG_INFINITY, f64::max))
            }
            ArrayData::Bool(v) => ScalarValue::Bool(v.iter().any(|&x| x)),
            other => return Err(numeric_mismatch("Max", other)),
        })
    }
}

/// Population standard deviation as f64.
struct Std;

impl Std {
    fn create(params: &ParamMap) -> Result<Box<dyn ReductionOp>, DafError> {
        check_params("Std", params, &[])?;
        Ok(Box::new(Std))
    }
}

impl ReductionOp for Std {
    fn reduce_array(&self, values: &ArrayData) -> Result<ScalarValue, DafError> {
        if !values.kind().is_numeric() {
            return Err(numeric_mismatch("Std", values));
        }
        if values.is_empty() {
            return Err(empty_reduction("Std"));
        }
        let dense = values.to_f64_vec()?;
        let mean = dense.iter().sum::<f64>() / dense.len() as f64;
        let variance =
            dense.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / dense.len() as f64;
        Ok(ScalarValue::F64(variance.sqrt()))
    }
}
