pub mod descriptor;
mod handlers;

use serde::{Deserialize, Serialize};
use vecjoin_common::error::{Error, Result};
use vecjoin_common::types::{DataType, Value};
use vecjoin_storage::ColumnBatch;

pub use descriptor::{
    ArgumentType, Descriptor, DescriptorBuilder, ExprArg, ExpressionCatalog, InputExpressionType,
    Mode, OperatorSignature,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    #[inline(always)]
    pub fn apply<T: PartialOrd + ?Sized>(self, a: &T, b: &T) -> bool {
        match self {
            CompareOp::Eq => a == b,
            CompareOp::NotEq => a != b,
            CompareOp::Lt => a < b,
            CompareOp::LtEq => a <= b,
            CompareOp::Gt => a > b,
            CompareOp::GtEq => a >= b,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        }
    }

    pub const ALL: [CompareOp; 6] = [
        CompareOp::Eq,
        CompareOp::NotEq,
        CompareOp::Lt,
        CompareOp::LtEq,
        CompareOp::Gt,
        CompareOp::GtEq,
    ];
}

/// Integer arithmetic with two's complement wrapping on overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
}

impl ArithmeticOp {
    #[inline(always)]
    pub fn apply(self, a: i64, b: i64) -> i64 {
        match self {
            ArithmeticOp::Add => a.wrapping_add(b),
            ArithmeticOp::Subtract => a.wrapping_sub(b),
            ArithmeticOp::Multiply => a.wrapping_mul(b),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
        }
    }

    pub const ALL: [ArithmeticOp; 3] = [
        ArithmeticOp::Add,
        ArithmeticOp::Subtract,
        ArithmeticOp::Multiply,
    ];
}

/// The operation a [`VectorExpression`] node performs. Column fields are
/// indices into the batch the expression is evaluated against.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    ColOrCol {
        left: usize,
        right: usize,
    },
    ColAndCol {
        left: usize,
        right: usize,
    },
    NotCol {
        input: usize,
    },
    IsNull {
        input: usize,
    },
    IsNotNull {
        input: usize,
    },
    LongColCompareLongCol {
        op: CompareOp,
        left: usize,
        right: usize,
    },
    LongColCompareLongScalar {
        op: CompareOp,
        input: usize,
        scalar: i64,
    },
    DoubleColCompareDoubleScalar {
        op: CompareOp,
        input: usize,
        scalar: f64,
    },
    StringColCompareStringScalar {
        op: CompareOp,
        input: usize,
        scalar: String,
    },
    LongColArithmeticLongCol {
        op: ArithmeticOp,
        left: usize,
        right: usize,
    },
    LongColArithmeticLongScalar {
        op: ArithmeticOp,
        input: usize,
        scalar: i64,
    },
    Constant {
        value: Value,
        data_type: DataType,
    },
    SelectColumnIsTrue {
        input: usize,
    },
    FilterLongColCompareLongScalar {
        op: CompareOp,
        input: usize,
        scalar: i64,
    },
    FilterAnd,
}

impl ExprKind {
    pub fn mode(&self) -> Mode {
        match self {
            ExprKind::SelectColumnIsTrue { .. }
            | ExprKind::FilterLongColCompareLongScalar { .. }
            | ExprKind::FilterAnd => Mode::Filter,
            ExprKind::ColOrCol { .. }
            | ExprKind::ColAndCol { .. }
            | ExprKind::NotCol { .. }
            | ExprKind::IsNull { .. }
            | ExprKind::IsNotNull { .. }
            | ExprKind::LongColCompareLongCol { .. }
            | ExprKind::LongColCompareLongScalar { .. }
            | ExprKind::DoubleColCompareDoubleScalar { .. }
            | ExprKind::StringColCompareStringScalar { .. }
            | ExprKind::LongColArithmeticLongCol { .. }
            | ExprKind::LongColArithmeticLongScalar { .. }
            | ExprKind::Constant { .. } => Mode::Projection,
        }
    }

    /// Type of the output column, `None` for filters.
    pub fn output_type(&self) -> Option<DataType> {
        match self {
            ExprKind::ColOrCol { .. }
            | ExprKind::ColAndCol { .. }
            | ExprKind::NotCol { .. }
            | ExprKind::IsNull { .. }
            | ExprKind::IsNotNull { .. }
            | ExprKind::LongColCompareLongCol { .. }
            | ExprKind::LongColCompareLongScalar { .. }
            | ExprKind::DoubleColCompareDoubleScalar { .. }
            | ExprKind::StringColCompareStringScalar { .. } => Some(DataType::Bool),
            ExprKind::LongColArithmeticLongCol { .. }
            | ExprKind::LongColArithmeticLongScalar { .. } => Some(DataType::Int64),
            ExprKind::Constant { data_type, .. } => Some(*data_type),
            ExprKind::SelectColumnIsTrue { .. }
            | ExprKind::FilterLongColCompareLongScalar { .. }
            | ExprKind::FilterAnd => None,
        }
    }

    pub fn input_columns(&self) -> Vec<usize> {
        match self {
            ExprKind::ColOrCol { left, right }
            | ExprKind::ColAndCol { left, right }
            | ExprKind::LongColCompareLongCol { left, right, .. }
            | ExprKind::LongColArithmeticLongCol { left, right, .. } => vec![*left, *right],
            ExprKind::NotCol { input }
            | ExprKind::IsNull { input }
            | ExprKind::IsNotNull { input }
            | ExprKind::LongColCompareLongScalar { input, .. }
            | ExprKind::DoubleColCompareDoubleScalar { input, .. }
            | ExprKind::StringColCompareStringScalar { input, .. }
            | ExprKind::LongColArithmeticLongScalar { input, .. }
            | ExprKind::SelectColumnIsTrue { input }
            | ExprKind::FilterLongColCompareLongScalar { input, .. } => vec![*input],
            ExprKind::Constant { .. } | ExprKind::FilterAnd => Vec::new(),
        }
    }
}

/// A node of a compiled expression tree.
///
/// Children are evaluated first, in order. A projection node then overwrites
/// its output column for the active rows; a filter node narrows the batch
/// selection. Nothing else in the batch is written.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorExpression {
    kind: ExprKind,
    children: Vec<VectorExpression>,
    output_column: Option<usize>,
}

impl VectorExpression {
    pub fn projection(kind: ExprKind, output_column: usize) -> Result<Self> {
        if kind.mode() != Mode::Projection {
            return Err(Error::configuration(format!(
                "{:?} is a filter and has no output column",
                kind
            )));
        }
        if kind.input_columns().contains(&output_column) {
            return Err(Error::configuration(format!(
                "output column {} is also an input of {:?}",
                output_column, kind
            )));
        }
        Ok(Self {
            kind,
            children: Vec::new(),
            output_column: Some(output_column),
        })
    }

    pub fn filter(kind: ExprKind) -> Result<Self> {
        if kind.mode() != Mode::Filter {
            return Err(Error::configuration(format!(
                "{:?} is a projection and needs an output column",
                kind
            )));
        }
        Ok(Self {
            kind,
            children: Vec::new(),
            output_column: None,
        })
    }

    pub fn col_or_col(left: usize, right: usize, output_column: usize) -> Result<Self> {
        Self::projection(ExprKind::ColOrCol { left, right }, output_column)
    }

    pub fn col_and_col(left: usize, right: usize, output_column: usize) -> Result<Self> {
        Self::projection(ExprKind::ColAndCol { left, right }, output_column)
    }

    pub fn filter_and(children: Vec<VectorExpression>) -> Result<Self> {
        if let Some(c) = children.iter().find(|c| c.mode() != Mode::Filter) {
            return Err(Error::configuration(format!(
                "filter AND child {:?} is not a filter",
                c.kind
            )));
        }
        Ok(Self::filter(ExprKind::FilterAnd)?.with_children(children))
    }

    pub fn with_children(mut self, children: Vec<VectorExpression>) -> Self {
        self.children = children;
        self
    }

    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    pub fn children(&self) -> &[VectorExpression] {
        &self.children
    }

    pub fn mode(&self) -> Mode {
        self.kind.mode()
    }

    pub fn output_column(&self) -> Option<usize> {
        self.output_column
    }

    pub fn output_type(&self) -> Option<DataType> {
        self.kind.output_type()
    }

    /// Declarative shape of this node.
    pub fn descriptor(&self) -> Descriptor {
        Descriptor::for_kind(&self.kind)
    }

    pub fn evaluate(&self, batch: &mut ColumnBatch) -> Result<()> {
        for child in &self.children {
            child.evaluate(batch)?;
        }
        if batch.is_empty() {
            return Ok(());
        }
        match (&self.kind, self.output_column) {
            (ExprKind::SelectColumnIsTrue { input }, _) => {
                handlers::eval_select_column_is_true(batch, *input)
            }
            (ExprKind::FilterLongColCompareLongScalar { op, input, scalar }, _) => {
                handlers::eval_filter_long_compare_scalar(batch, *op, *input, *scalar)
            }
            (ExprKind::FilterAnd, _) => Ok(()),
            (kind, Some(output)) => self.evaluate_projection(kind, output, batch),
            (kind, None) => Err(Error::internal(format!(
                "projection {:?} has no output column",
                kind
            ))),
        }
    }

    fn evaluate_projection(
        &self,
        kind: &ExprKind,
        output: usize,
        batch: &mut ColumnBatch,
    ) -> Result<()> {
        match kind {
            ExprKind::ColOrCol { left, right } => {
                handlers::eval_col_or_col(batch, *left, *right, output)
            }
            ExprKind::ColAndCol { left, right } => {
                handlers::eval_col_and_col(batch, *left, *right, output)
            }
            ExprKind::NotCol { input } => handlers::eval_not_col(batch, *input, output),
            ExprKind::IsNull { input } => handlers::eval_is_null(batch, *input, output, false),
            ExprKind::IsNotNull { input } => handlers::eval_is_null(batch, *input, output, true),
            ExprKind::LongColCompareLongCol { op, left, right } => {
                handlers::eval_long_compare_col(batch, *op, *left, *right, output)
            }
            ExprKind::LongColCompareLongScalar { op, input, scalar } => {
                handlers::eval_long_compare_scalar(batch, *op, *input, *scalar, output)
            }
            ExprKind::DoubleColCompareDoubleScalar { op, input, scalar } => {
                handlers::eval_double_compare_scalar(batch, *op, *input, *scalar, output)
            }
            ExprKind::StringColCompareStringScalar { op, input, scalar } => {
                handlers::eval_string_compare_scalar(batch, *op, *input, scalar, output)
            }
            ExprKind::LongColArithmeticLongCol { op, left, right } => {
                handlers::eval_long_arithmetic_col(batch, *op, *left, *right, output)
            }
            ExprKind::LongColArithmeticLongScalar { op, input, scalar } => {
                handlers::eval_long_arithmetic_scalar(batch, *op, *input, *scalar, output)
            }
            ExprKind::Constant { value, data_type } => {
                handlers::eval_constant(batch, value, *data_type, output)
            }
            ExprKind::SelectColumnIsTrue { .. }
            | ExprKind::FilterLongColCompareLongScalar { .. }
            | ExprKind::FilterAnd => Err(Error::internal(format!(
                "filter {:?} evaluated as a projection",
                kind
            ))),
        }
    }
}
