mod arithmetic;
mod compare;
mod constant;
mod filter;
mod kernels;
mod logical;
mod nulls;

pub(crate) use arithmetic::{eval_long_arithmetic_col, eval_long_arithmetic_scalar};
pub(crate) use compare::{
    eval_double_compare_scalar, eval_long_compare_col, eval_long_compare_scalar,
    eval_string_compare_scalar,
};
pub(crate) use constant::eval_constant;
pub(crate) use filter::{eval_filter_long_compare_scalar, eval_select_column_is_true};
pub(crate) use logical::{eval_col_and_col, eval_col_or_col, eval_not_col};
pub(crate) use nulls::eval_is_null;
