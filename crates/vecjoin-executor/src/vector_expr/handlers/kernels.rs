//! Shared loops behind every long-vector operator.
//!
//! The binary kernel owns the sixteen structural cases: nulls absent or
//! possible, times which side repeats, times selection on or off (the last
//! split lives in [`RowSelection::for_each`]). Operators differ only in the
//! value function and the [`NullRule`] they pass in.

use vecjoin_common::error::Result;
use vecjoin_storage::{ColumnIo, ColumnVector, RowSelection};

/// How the nullity of a binary result is derived from its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NullRule {
    /// Null when either input is null.
    Propagate,
    /// Three-valued OR: a non-null true on either side decides.
    KleeneOr,
    /// Three-valued AND: a non-null false on either side decides.
    KleeneAnd,
}

impl NullRule {
    #[inline(always)]
    fn is_null(self, a: i64, a_null: bool, b: i64, b_null: bool) -> bool {
        match self {
            NullRule::Propagate => a_null || b_null,
            NullRule::KleeneOr => {
                (!a_null && a == 0 && b_null)
                    || (a_null && !b_null && b == 0)
                    || (a_null && b_null)
            }
            NullRule::KleeneAnd => {
                (!a_null && a != 0 && b_null)
                    || (a_null && !b_null && b != 0)
                    || (a_null && b_null)
            }
        }
    }
}

/// Evaluates `f` over two long inputs into a long output. Values are computed
/// for every active row regardless of nullity; the null rule alone decides
/// which results are null.
pub(crate) fn binary_long<F>(io: ColumnIo<'_, 2>, rule: NullRule, f: F) -> Result<()>
where
    F: Fn(i64, i64) -> i64,
{
    let ColumnIo {
        rows,
        inputs: [a, b],
        output,
    } = io;
    let av = a.longs()?;
    let bv = b.longs()?;

    let no_nulls = a.no_nulls && b.no_nulls;
    output.no_nulls = no_nulls;
    output.is_repeating = a.is_repeating && b.is_repeating;
    let (out, out_nulls) = output.long_parts_mut()?;

    if no_nulls {
        match (a.is_repeating, b.is_repeating) {
            (true, true) => out[0] = f(av[0], bv[0]),
            (true, false) => {
                let a0 = av[0];
                rows.for_each(|i| out[i] = f(a0, bv[i]));
            }
            (false, true) => {
                let b0 = bv[0];
                rows.for_each(|i| out[i] = f(av[i], b0));
            }
            (false, false) => rows.for_each(|i| out[i] = f(av[i], bv[i])),
        }
        return Ok(());
    }

    let (a_has_nulls, a_nulls) = (!a.no_nulls, a.nulls());
    let (b_has_nulls, b_nulls) = (!b.no_nulls, b.nulls());
    let a_null = |i: usize| a_has_nulls && a_nulls.is_null(i);
    let b_null = |i: usize| b_has_nulls && b_nulls.is_null(i);

    match (a.is_repeating, b.is_repeating) {
        (true, true) => {
            out[0] = f(av[0], bv[0]);
            out_nulls.set(0, rule.is_null(av[0], a_null(0), bv[0], b_null(0)));
        }
        (true, false) => {
            let (a0, a0_null) = (av[0], a_null(0));
            rows.for_each(|i| {
                out[i] = f(a0, bv[i]);
                out_nulls.set(i, rule.is_null(a0, a0_null, bv[i], b_null(i)));
            });
        }
        (false, true) => {
            let (b0, b0_null) = (bv[0], b_null(0));
            rows.for_each(|i| {
                out[i] = f(av[i], b0);
                out_nulls.set(i, rule.is_null(av[i], a_null(i), b0, b0_null));
            });
        }
        (false, false) => {
            rows.for_each(|i| {
                out[i] = f(av[i], bv[i]);
                out_nulls.set(i, rule.is_null(av[i], a_null(i), bv[i], b_null(i)));
            });
        }
    }
    Ok(())
}

/// Maps one input vector into a long output, carrying the input's nullity
/// and repetition across unchanged.
pub(crate) fn unary_to_long<T, F>(
    rows: RowSelection<'_>,
    input: &ColumnVector,
    slots: &[T],
    output: &mut ColumnVector,
    f: F,
) -> Result<()>
where
    F: Fn(&T) -> i64,
{
    output.is_repeating = input.is_repeating;
    output.no_nulls = input.no_nulls;
    let in_nulls = input.nulls();
    let (out, out_nulls) = output.long_parts_mut()?;

    if input.is_repeating {
        out[0] = f(&slots[0]);
        if !input.no_nulls {
            out_nulls.set(0, in_nulls.is_null(0));
        }
    } else if input.no_nulls {
        rows.for_each(|i| out[i] = f(&slots[i]));
    } else {
        rows.for_each(|i| {
            out[i] = f(&slots[i]);
            out_nulls.set(i, in_nulls.is_null(i));
        });
    }
    Ok(())
}
