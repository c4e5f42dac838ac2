// src/query/registry.rs

use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::Location;
use std::sync::LazyLock;

use crate::core::value::{ArrayData, ScalarValue};
use crate::error::{DafError, OpKind};

/// A parsed operation parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Str(String),
    Bool(bool),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

pub type ParamMap = HashMap<String, ParamValue>;

/// An element-wise operation: shape preserving, possibly changing the
/// element kind. Applicable to single values, vectors and (through their
/// flat element array) matrices.
pub trait EltwiseOp: Send + Sync {
    fn apply_array(&self, values: &ArrayData) -> Result<ArrayData, DafError>;

    fn apply_scalar(&self, value: &ScalarValue) -> Result<ScalarValue, DafError> {
        Ok(self.apply_array(&ArrayData::broadcast(value, 1))?.get(0))
    }
}

/// A reduction operation, collapsing an array to a single value. The query
/// evaluator lifts it to matrices by reducing each major line.
pub trait ReductionOp: Send + Sync {
    fn reduce_array(&self, values: &ArrayData) -> Result<ScalarValue, DafError>;
}

pub type EltwiseCtor = fn(&ParamMap) -> Result<Box<dyn EltwiseOp>, DafError>;
pub type ReductionCtor = fn(&ParamMap) -> Result<Box<dyn ReductionOp>, DafError>;

struct Registration<C> {
    site: &'static Location<'static>,
    ctor: C,
}

static ELTWISE: LazyLock<Mutex<HashMap<String, Registration<EltwiseCtor>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));
static REDUCTION: LazyLock<Mutex<HashMap<String, Registration<ReductionCtor>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn same_site(a: &'static Location<'static>, b: &'static Location<'static>) -> bool {
    a.file() == b.file() && a.line() == b.line() && a.column() == b.column()
}

fn register<C>(
    registry: &Mutex<HashMap<String, Registration<C>>>,
    kind: OpKind,
    name: &str,
    site: &'static Location<'static>,
    ctor: C,
) -> Result<(), DafError> {
    let mut registry = registry.lock();
    match registry.get(name) {
        // registering again from the same line is a no-op
        Some(existing) if same_site(existing.site, site) => Ok(()),
        Some(_) => Err(DafError::ConflictingRegistration {
            kind,
            name: name.to_string(),
        }),
        None => {
            registry.insert(name.to_string(), Registration { site, ctor });
            Ok(())
        }
    }
}

/// Registers an element-wise operation under `name`. Idempotent per call
/// site; a second registration of the same name from a different site is a
/// hard error.
#[track_caller]
pub fn register_eltwise(name: &str, ctor: EltwiseCtor) -> Result<(), DafError> {
    register(&ELTWISE, OpKind::Eltwise, name, Location::caller(), ctor)
}

/// Registers a reduction operation under `name`; same rules as
/// [`register_eltwise`].
#[track_caller]
pub fn register_reduction(name: &str, ctor: ReductionCtor) -> Result<(), DafError> {
    register(&REDUCTION, OpKind::Reduction, name, Location::caller(), ctor)
}

/// Instantiates a registered element-wise operation, or `None` if the name
/// is not an element-wise operation.
pub fn new_eltwise(name: &str, params: &ParamMap) -> Result<Option<Box<dyn EltwiseOp>>, DafError> {
    let ctor = ELTWISE.lock().get(name).map(|r| r.ctor);
    match ctor {
        Some(ctor) => Ok(Some(ctor(params)?)),
        None => Ok(None),
    }
}

/// Instantiates a registered reduction operation, or `None` if the name is
/// not a reduction.
pub fn new_reduction(
    name: &str,
    params: &ParamMap,
) -> Result<Option<Box<dyn ReductionOp>>, DafError> {
    let ctor = REDUCTION.lock().get(name).map(|r| r.ctor);
    match ctor {
        Some(ctor) => Ok(Some(ctor(params)?)),
        None => Ok(None),
    }
}

/// Rejects parameters not in `allowed`.
pub(crate) fn check_params(
    op: &str,
    params: &ParamMap,
    allowed: &[&str],
) -> Result<(), DafError> {
    for name in params.keys() {
        if !allowed.contains(&name.as_str()) {
            return Err(DafError::InvalidData {
                what: format!("parameter of the operation: {}", op),
                reason: format!("unknown parameter: {}", name),
            });
        }
    }
    Ok(())
}

/// Fetches a numeric parameter with a default.
pub(crate) fn numeric_param(
    op: &str,
    params: &ParamMap,
    name: &str,
    default: f64,
) -> Result<f64, DafError> {
    match params.get(name) {
        None => Ok(default),
        Some(value) => value.as_f64().ok_or_else(|| DafError::InvalidData {
            what: format!("parameter of the operation: {}", op),
            reason: format!("the parameter: {} is not a number", name),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_ctor(_params: &ParamMap) -> Result<Box<dyn EltwiseOp>, DafError> {
        struct Noop;
        impl EltwiseOp for Noop {
            fn apply_array(&self, values: &ArrayData) -> Result<ArrayData, DafError> {
                Ok(values.clone())
            }
        }
        Ok(Box::new(Noop))
    }

    #[test]
    fn test_repeated_registration_from_one_site_is_a_noop() {
        for _ in 0..3 {
            register_eltwise("TestNoop", noop_ctor).unwrap();
        }
        assert!(new_eltwise("TestNoop", &ParamMap::new()).unwrap().is_some());
    }

    #[test]
    fn test_conflicting_registration_is_an_error() {
        register_eltwise("TestConflict", noop_ctor).unwrap();
        let error = register_eltwise("TestConflict", noop_ctor).unwrap_err();
        assert_eq!(
            error.to_string(),
            "conflicting registrations for the eltwise operation: TestConflict"
        );
    }

    #[test]
    fn test_unknown_operation_lookup_is_none() {
        assert!(new_eltwise("NoSuchOp", &ParamMap::new()).unwrap().is_none());
        assert!(new_reduction("NoSuchOp", &ParamMap::new())
            .unwrap()
            .is_none());
    }
}
