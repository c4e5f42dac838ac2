// src/core/value.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DafError;

/// Closed set of element kinds storable in a daf dataset.
///
/// Strings are legal for scalars and vectors only; matrix elements must be
/// numeric or boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    Str,
}

impl ElementKind {
    pub fn is_numeric(&self) -> bool {
        !matches!(self, ElementKind::Bool | ElementKind::Str)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ElementKind::F32 | ElementKind::F64)
    }

    /// Whether the kind may appear as a matrix element.
    pub fn is_matrix_element(&self) -> bool {
        !matches!(self, ElementKind::Str)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ElementKind::I8 => "i8",
            ElementKind::I16 => "i16",
            ElementKind::I32 => "i32",
            ElementKind::I64 => "i64",
            ElementKind::U8 => "u8",
            ElementKind::U16 => "u16",
            ElementKind::U32 => "u32",
            ElementKind::U64 => "u64",
            ElementKind::F32 => "f32",
            ElementKind::F64 => "f64",
            ElementKind::Bool => "bool",
            ElementKind::Str => "str",
        };
        write!(f, "{}", text)
    }
}

/// A single stored value - scalars and individual vector/matrix elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScalarValue {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Str(String),
}

impl ScalarValue {
    pub fn kind(&self) -> ElementKind {
        match self {
            ScalarValue::I8(_) => ElementKind::I8,
            ScalarValue::I16(_) => ElementKind::I16,
            ScalarValue::I32(_) => ElementKind::I32,
            ScalarValue::I64(_) => ElementKind::I64,
            ScalarValue::U8(_) => ElementKind::U8,
            ScalarValue::U16(_) => ElementKind::U16,
            ScalarValue::U32(_) => ElementKind::U32,
            ScalarValue::U64(_) => ElementKind::U64,
            ScalarValue::F32(_) => ElementKind::F32,
            ScalarValue::F64(_) => ElementKind::F64,
            ScalarValue::Bool(_) => ElementKind::Bool,
            ScalarValue::Str(_) => ElementKind::Str,
        }
    }

    /// Numeric view as f64, if the value is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::I8(v) => Some(*v as f64),
            ScalarValue::I16(v) => Some(*v as f64),
            ScalarValue::I32(v) => Some(*v as f64),
            ScalarValue::I64(v) => Some(*v as f64),
            ScalarValue::U8(v) => Some(*v as f64),
            ScalarValue::U16(v) => Some(*v as f64),
            ScalarValue::U32(v) => Some(*v as f64),
            ScalarValue::U64(v) => Some(*v as f64),
            ScalarValue::F32(v) => Some(*v as f64),
            ScalarValue::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::I8(v) => Some(*v as i64),
            ScalarValue::I16(v) => Some(*v as i64),
            ScalarValue::I32(v) => Some(*v as i64),
            ScalarValue::I64(v) => Some(*v),
            ScalarValue::U8(v) => Some(*v as i64),
            ScalarValue::U16(v) => Some(*v as i64),
            ScalarValue::U32(v) => Some(*v as i64),
            ScalarValue::U64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The zero value of a kind: 0 for numbers, false for booleans, the
    /// empty string for strings.
    pub fn zero_of(kind: ElementKind) -> ScalarValue {
        match kind {
            ElementKind::I8 => ScalarValue::I8(0),
            ElementKind::I16 => ScalarValue::I16(0),
            ElementKind::I32 => ScalarValue::I32(0),
            ElementKind::I64 => ScalarValue::I64(0),
            ElementKind::U8 => ScalarValue::U8(0),
            ElementKind::U16 => ScalarValue::U16(0),
            ElementKind::U32 => ScalarValue::U32(0),
            ElementKind::U64 => ScalarValue::U64(0),
            ElementKind::F32 => ScalarValue::F32(0.0),
            ElementKind::F64 => ScalarValue::F64(0.0),
            ElementKind::Bool => ScalarValue::Bool(false),
            ElementKind::Str => ScalarValue::Str(String::new()),
        }
    }
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScalarValue::I8(a), ScalarValue::I8(b)) => a == b,
            (ScalarValue::I16(a), ScalarValue::I16(b)) => a == b,
            (ScalarValue::I32(a), ScalarValue::I32(b)) => a == b,
            (ScalarValue::I64(a), ScalarValue::I64(b)) => a == b,
            (ScalarValue::U8(a), ScalarValue::U8(b)) => a == b,
            (ScalarValue::U16(a), ScalarValue::U16(b)) => a == b,
            (ScalarValue::U32(a), ScalarValue::U32(b)) => a == b,
            (ScalarValue::U64(a), ScalarValue::U64(b)) => a == b,
            // bit equality so NaN round-trips compare equal
            (ScalarValue::F32(a), ScalarValue::F32(b)) => a.to_bits() == b.to_bits(),
            (ScalarValue::F64(a), ScalarValue::F64(b)) => a.to_bits() == b.to_bits(),
            (ScalarValue::Bool(a), ScalarValue::Bool(b)) => a == b,
            (ScalarValue::Str(a), ScalarValue::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::I8(v) => write!(f, "{}", v),
            ScalarValue::I16(v) => write!(f, "{}", v),
            ScalarValue::I32(v) => write!(f, "{}", v),
            ScalarValue::I64(v) => write!(f, "{}", v),
            ScalarValue::U8(v) => write!(f, "{}", v),
            ScalarValue::U16(v) => write!(f, "{}", v),
            ScalarValue::U32(v) => write!(f, "{}", v),
            ScalarValue::U64(v) => write!(f, "{}", v),
            ScalarValue::F32(v) => write!(f, "{}", v),
            ScalarValue::F64(v) => write!(f, "{}", v),
            ScalarValue::Bool(v) => write!(f, "{}", v),
            ScalarValue::Str(v) => write!(f, "\"{}\"", v),
        }
    }
}

/// A typed homogeneous array - vector values, dense matrix storage and the
/// values array of sparse artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ArrayData {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

/// Expands to a match over every `ArrayData` variant, binding the inner
/// vector to `$v` and evaluating `$body` for it.
macro_rules! with_array {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            $crate::core::value::ArrayData::I8($v) => $body,
            $crate::core::value::ArrayData::I16($v) => $body,
            $crate::core::value::ArrayData::I32($v) => $body,
            $crate::core::value::ArrayData::I64($v) => $body,
            $crate::core::value::ArrayData::U8($v) => $body,
            $crate::core::value::ArrayData::U16($v) => $body,
            $crate::core::value::ArrayData::U32($v) => $body,
            $crate::core::value::ArrayData::U64($v) => $body,
            $crate::core::value::ArrayData::F32($v) => $body,
            $crate::core::value::ArrayData::F64($v) => $body,
            $crate::core::value::ArrayData::Bool($v) => $body,
            $crate::core::value::ArrayData::Str($v) => $body,
        }
    };
}
pub(crate) use with_array;

/// Like `with_array`, but rebuilds the same variant from the body's vector.
macro_rules! map_array {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            $crate::core::value::ArrayData::I8($v) => $crate::core::value::ArrayData::I8($body),
            $crate::core::value::ArrayData::I16($v) => $crate::core::value::ArrayData::I16($body),
            $crate::core::value::ArrayData::I32($v) => $crate::core::value::ArrayData::I32($body),
            $crate::core::value::ArrayData::I64($v) => $crate::core::value::ArrayData::I64($body),
            $crate::core::value::ArrayData::U8($v) => $crate::core::value::ArrayData::U8($body),
            $crate::core::value::ArrayData::U16($v) => $crate::core::value::ArrayData::U16($body),
            $crate::core::value::ArrayData::U32($v) => $crate::core::value::ArrayData::U32($body),
            $crate::core::value::ArrayData::U64($v) => $crate::core::value::ArrayData::U64($body),
            $crate::core::value::ArrayData::F32($v) => $crate::core::value::ArrayData::F32($body),
            $crate::core::value::ArrayData::F64($v) => $crate::core::value::ArrayData::F64($body),
            $crate::core::value::ArrayData::Bool($v) => $crate::core::value::ArrayData::Bool($body),
            $crate::core::value::ArrayData::Str($v) => $crate::core::value::ArrayData::Str($body),
        }
    };
}
pub(crate) use map_array;

impl ArrayData {
    pub fn kind(&self) -> ElementKind {
        match self {
            ArrayData::I8(_) => ElementKind::I8,
            ArrayData::I16(_) => ElementKind::I16,
            ArrayData::I32(_) => ElementKind::I32,
            ArrayData::I64(_) => ElementKind::I64,
            ArrayData::U8(_) => ElementKind::U8,
            ArrayData::U16(_) => ElementKind::U16,
            ArrayData::U32(_) => ElementKind::U32,
            ArrayData::U64(_) => ElementKind::U64,
            ArrayData::F32(_) => ElementKind::F32,
            ArrayData::F64(_) => ElementKind::F64,
            ArrayData::Bool(_) => ElementKind::Bool,
            ArrayData::Str(_) => ElementKind::Str,
        }
    }

    pub fn len(&self) -> usize {
        with_array!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A zero-initialized array of the given kind and length. Strings become
    /// empty strings, booleans false.
    pub fn zeros(kind: ElementKind, len: usize) -> ArrayData {
        match kind {
            ElementKind::I8 => ArrayData::I8(vec![0; len]),
            ElementKind::I16 => ArrayData::I16(vec![0; len]),
            ElementKind::I32 => ArrayData::I32(vec![0; len]),
            ElementKind::I64 => ArrayData::I64(vec![0; len]),
            ElementKind::U8 => ArrayData::U8(vec![0; len]),
            ElementKind::U16 => ArrayData::U16(vec![0; len]),
            ElementKind::U32 => ArrayData::U32(vec![0; len]),
            ElementKind::U64 => ArrayData::U64(vec![0; len]),
            ElementKind::F32 => ArrayData::F32(vec![0.0; len]),
            ElementKind::F64 => ArrayData::F64(vec![0.0; len]),
            ElementKind::Bool => ArrayData::Bool(vec![false; len]),
            ElementKind::Str => ArrayData::Str(vec![String::new(); len]),
        }
    }

    /// An array of `len` copies of `value`.
    pub fn broadcast(value: &ScalarValue, len: usize) -> ArrayData {
        match value {
            ScalarValue::I8(v) => ArrayData::I8(vec![*v; len]),
            ScalarValue::I16(v) => ArrayData::I16(vec![*v; len]),
            ScalarValue::I32(v) => ArrayData::I32(vec![*v; len]),
            ScalarValue::I64(v) => ArrayData::I64(vec![*v; len]),
            ScalarValue::U8(v) => ArrayData::U8(vec![*v; len]),
            ScalarValue::U16(v) => ArrayData::U16(vec![*v; len]),
            ScalarValue::U32(v) => ArrayData::U32(vec![*v; len]),
            ScalarValue::U64(v) => ArrayData::U64(vec![*v; len]),
            ScalarValue::F32(v) => ArrayData::F32(vec![*v; len]),
            ScalarValue::F64(v) => ArrayData::F64(vec![*v; len]),
            ScalarValue::Bool(v) => ArrayData::Bool(vec![*v; len]),
            ScalarValue::Str(v) => ArrayData::Str(vec![v.clone(); len]),
        }
    }

    pub fn get(&self, index: usize) -> ScalarValue {
        match self {
            ArrayData::I8(v) => ScalarValue::I8(v[index]),
            ArrayData::I16(v) => ScalarValue::I16(v[index]),
            ArrayData::I32(v) => ScalarValue::I32(v[index]),
            ArrayData::I64(v) => ScalarValue::I64(v[index]),
            ArrayData::U8(v) => ScalarValue::U8(v[index]),
            ArrayData::U16(v) => ScalarValue::U16(v[index]),
            ArrayData::U32(v) => ScalarValue::U32(v[index]),
            ArrayData::U64(v) => ScalarValue::U64(v[index]),
            ArrayData::F32(v) => ScalarValue::F32(v[index]),
            ArrayData::F64(v) => ScalarValue::F64(v[index]),
            ArrayData::Bool(v) => ScalarValue::Bool(v[index]),
            ArrayData::Str(v) => ScalarValue::Str(v[index].clone()),
        }
    }

    /// Stores `value` at `index`; the value kind must match the array kind.
    pub fn set(&mut self, index: usize, value: &ScalarValue) -> Result<(), DafError> {
        match (self, value) {
            (ArrayData::I8(v), ScalarValue::I8(x)) => v[index] = *x,
            (ArrayData::I16(v), ScalarValue::I16(x)) => v[index] = *x,
            (ArrayData::I32(v), ScalarValue::I32(x)) => v[index] = *x,
            (ArrayData::I64(v), ScalarValue::I64(x)) => v[index] = *x,
            (ArrayData::U8(v), ScalarValue::U8(x)) => v[index] = *x,
            (ArrayData::U16(v), ScalarValue::U16(x)) => v[index] = *x,
            (ArrayData::U32(v), ScalarValue::U32(x)) => v[index] = *x,
            (ArrayData::U64(v), ScalarValue::U64(x)) => v[index] = *x,
            (ArrayData::F32(v), ScalarValue::F32(x)) => v[index] = *x,
            (ArrayData::F64(v), ScalarValue::F64(x)) => v[index] = *x,
            (ArrayData::Bool(v), ScalarValue::Bool(x)) => v[index] = *x,
            (ArrayData::Str(v), ScalarValue::Str(x)) => v[index] = x.clone(),
            (array, value) => {
                return Err(DafError::TypeMismatch {
                    what: "array element".to_string(),
                    expected: array.kind().to_string(),
                    actual: value.kind().to_string(),
                })
            }
        }
        Ok(())
    }

    /// A new array holding the elements at `indices`, in that order.
    pub fn take_indices(&self, indices: &[usize]) -> ArrayData {
        map_array!(self, v => indices.iter().map(|&i| v[i].clone()).collect())
    }

    /// Appends all elements of `other`, which must be of the same kind.
    pub fn extend_from(&mut self, other: &ArrayData) -> Result<(), DafError> {
        if self.kind() != other.kind() {
            return Err(DafError::TypeMismatch {
                what: "array extension".to_string(),
                expected: self.kind().to_string(),
                actual: other.kind().to_string(),
            });
        }
        match (self, other) {
            (ArrayData::I8(a), ArrayData::I8(b)) => a.extend_from_slice(b),
            (ArrayData::I16(a), ArrayData::I16(b)) => a.extend_from_slice(b),
            (ArrayData::I32(a), ArrayData::I32(b)) => a.extend_from_slice(b),
            (ArrayData::I64(a), ArrayData::I64(b)) => a.extend_from_slice(b),
            (ArrayData::U8(a), ArrayData::U8(b)) => a.extend_from_slice(b),
            (ArrayData::U16(a), ArrayData::U16(b)) => a.extend_from_slice(b),
            (ArrayData::U32(a), ArrayData::U32(b)) => a.extend_from_slice(b),
            (ArrayData::U64(a), ArrayData::U64(b)) => a.extend_from_slice(b),
            (ArrayData::F32(a), ArrayData::F32(b)) => a.extend_from_slice(b),
            (ArrayData::F64(a), ArrayData::F64(b)) => a.extend_from_slice(b),
            (ArrayData::Bool(a), ArrayData::Bool(b)) => a.extend_from_slice(b),
            (ArrayData::Str(a), ArrayData::Str(b)) => a.extend_from_slice(b),
            _ => unreachable!("kinds checked above"),
        }
        Ok(())
    }

    /// Numeric view as f64 values; errors for bool and string arrays.
    pub fn to_f64_vec(&self) -> Result<Vec<f64>, DafError> {
        match self {
            ArrayData::I8(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            ArrayData::I16(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            ArrayData::I32(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            ArrayData::I64(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            ArrayData::U8(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            ArrayData::U16(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            ArrayData::U32(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            ArrayData::U64(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            ArrayData::F32(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            ArrayData::F64(v) => Ok(v.clone()),
            other => Err(DafError::TypeMismatch {
                what: "numeric array".to_string(),
                expected: "a numeric kind".to_string(),
                actual: other.kind().to_string(),
            }),
        }
    }

    /// Boolean view, used for mask slicing.
    pub fn as_bools(&self) -> Option<&[bool]> {
        match self {
            ArrayData::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl PartialEq for ArrayData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ArrayData::F32(a), ArrayData::F32(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (ArrayData::F64(a), ArrayData::F64(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (ArrayData::I8(a), ArrayData::I8(b)) => a == b,
            (ArrayData::I16(a), ArrayData::I16(b)) => a == b,
            (ArrayData::I32(a), ArrayData::I32(b)) => a == b,
            (ArrayData::I64(a), ArrayData::I64(b)) => a == b,
            (ArrayData::U8(a), ArrayData::U8(b)) => a == b,
            (ArrayData::U16(a), ArrayData::U16(b)) => a == b,
            (ArrayData::U32(a), ArrayData::U32(b)) => a == b,
            (ArrayData::U64(a), ArrayData::U64(b)) => a == b,
            (ArrayData::Bool(a), ArrayData::Bool(b)) => a == b,
            (ArrayData::Str(a), ArrayData::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ArrayData {}

macro_rules! array_from_vec {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for ArrayData {
                fn from(v: Vec<$ty>) -> Self {
                    ArrayData::$variant(v)
                }
            }
        )*
    };
}

array_from_vec!(
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    f32 => F32, f64 => F64, bool => Bool, String => Str,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_kinds() {
        assert_eq!(ScalarValue::I64(42).kind(), ElementKind::I64);
        assert_eq!(ScalarValue::F32(1.5).kind(), ElementKind::F32);
        assert_eq!(
            ScalarValue::Str("hello".to_string()).kind(),
            ElementKind::Str
        );
        assert!(ElementKind::F64.is_numeric());
        assert!(!ElementKind::Str.is_matrix_element());
        assert!(ElementKind::Bool.is_matrix_element());
    }

    #[test]
    fn test_nan_round_trip_equality() {
        let a = ScalarValue::F64(f64::NAN);
        let b = ScalarValue::F64(f64::NAN);
        assert_eq!(a, b);
    }

    #[test]
    fn test_zeros_and_broadcast() {
        let z = ArrayData::zeros(ElementKind::I32, 4);
        assert_eq!(z, ArrayData::I32(vec![0; 4]));

        let b = ArrayData::broadcast(&ScalarValue::Str("x".to_string()), 2);
        assert_eq!(b, ArrayData::Str(vec!["x".to_string(), "x".to_string()]));
    }

    #[test]
    fn test_take_indices_preserves_order() {
        let a: ArrayData = vec![10i64, 20, 30, 40].into();
        assert_eq!(a.take_indices(&[3, 0]), ArrayData::I64(vec![40, 10]));
    }

    #[test]
    fn test_extend_rejects_kind_mismatch() {
        let mut a: ArrayData = vec![1i64, 2].into();
        let b: ArrayData = vec![1.0f64].into();
        assert!(a.extend_from(&b).is_err());
        assert!(a.extend_from(&vec![3i64].into()).is_ok());
        assert_eq!(a.len(), 3);
    }
}
