pub mod eval;
pub mod ops;
pub mod parse;
pub mod registry;

pub use eval::{evaluate, evaluate_parsed, QueryValue};
pub use ops::register_builtin_ops;
pub use parse::{parse_query, Query, Selection, Stage};
pub use registry::{
    register_eltwise, register_reduction, EltwiseOp, ParamMap, ParamValue, ReductionOp,
};
