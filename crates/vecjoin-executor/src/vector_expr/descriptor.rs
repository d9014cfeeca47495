//! Declarative operator shapes and the catalog that binds them to
//! [`VectorExpression`] nodes.

use std::fmt;

use indexmap::IndexMap;
use vecjoin_common::error::{Error, Result};
use vecjoin_common::types::{DataType, Value};

use super::{ArithmeticOp, CompareOp, ExprKind, VectorExpression};

const MAX_NUM_ARGUMENTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Projection,
    Filter,
}

/// Physical argument family. `Bool` arguments are `Long`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentType {
    Long,
    Double,
    String,
    Any,
}

impl ArgumentType {
    pub fn from_data_type(data_type: DataType) -> Self {
        match data_type {
            DataType::Bool | DataType::Int64 => ArgumentType::Long,
            DataType::Float64 => ArgumentType::Double,
            DataType::String => ArgumentType::String,
        }
    }

    /// Whether an operator declaring `self` accepts an argument of `actual`.
    pub fn accepts(self, actual: ArgumentType) -> bool {
        self == ArgumentType::Any || self == actual
    }

    fn default_data_type(self) -> Option<DataType> {
        match self {
            ArgumentType::Long => Some(DataType::Int64),
            ArgumentType::Double => Some(DataType::Float64),
            ArgumentType::String => Some(DataType::String),
            ArgumentType::Any => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputExpressionType {
    Column,
    Scalar,
}

/// Mode, arity, argument families and column-vs-scalar shape of an operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Descriptor {
    mode: Mode,
    argument_types: Vec<ArgumentType>,
    input_types: Vec<InputExpressionType>,
}

impl Descriptor {
    pub fn builder() -> DescriptorBuilder {
        DescriptorBuilder::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn num_arguments(&self) -> usize {
        self.argument_types.len()
    }

    pub fn argument_types(&self) -> &[ArgumentType] {
        &self.argument_types
    }

    pub fn input_expression_types(&self) -> &[InputExpressionType] {
        &self.input_types
    }

    /// Whether an operator declared with `self` can serve a call shaped like
    /// `requested`.
    pub fn accepts(&self, requested: &Descriptor) -> bool {
        self.mode == requested.mode
            && self.input_types == requested.input_types
            && self.argument_types.len() == requested.argument_types.len()
            && self
                .argument_types
                .iter()
                .zip(&requested.argument_types)
                .all(|(declared, actual)| declared.accepts(*actual))
    }

    pub(crate) fn for_kind(kind: &ExprKind) -> Descriptor {
        use ArgumentType::{Any, Double, Long, String};
        use InputExpressionType::{Column, Scalar};
        let (mode, args): (Mode, Vec<(ArgumentType, InputExpressionType)>) = match kind {
            ExprKind::ColOrCol { .. }
            | ExprKind::ColAndCol { .. }
            | ExprKind::LongColCompareLongCol { .. }
            | ExprKind::LongColArithmeticLongCol { .. } => {
                (Mode::Projection, vec![(Long, Column), (Long, Column)])
            }
            ExprKind::NotCol { .. } => (Mode::Projection, vec![(Long, Column)]),
            ExprKind::IsNull { .. } | ExprKind::IsNotNull { .. } => {
                (Mode::Projection, vec![(Any, Column)])
            }
            ExprKind::LongColCompareLongScalar { .. }
            | ExprKind::LongColArithmeticLongScalar { .. } => {
                (Mode::Projection, vec![(Long, Column), (Long, Scalar)])
            }
            ExprKind::DoubleColCompareDoubleScalar { .. } => {
                (Mode::Projection, vec![(Double, Column), (Double, Scalar)])
            }
            ExprKind::StringColCompareStringScalar { .. } => {
                (Mode::Projection, vec![(String, Column), (String, Scalar)])
            }
            ExprKind::Constant { data_type, .. } => {
                return Descriptor {
                    mode: Mode::Projection,
                    argument_types: vec![ArgumentType::from_data_type(*data_type)],
                    input_types: vec![Scalar],
                };
            }
            ExprKind::SelectColumnIsTrue { .. } => (Mode::Filter, vec![(Long, Column)]),
            ExprKind::FilterLongColCompareLongScalar { .. } => {
                (Mode::Filter, vec![(Long, Column), (Long, Scalar)])
            }
            ExprKind::FilterAnd => (Mode::Filter, vec![]),
        };
        Descriptor {
            mode,
            argument_types: args.iter().map(|(t, _)| *t).collect(),
            input_types: args.iter().map(|(_, i)| *i).collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DescriptorBuilder {
    mode: Option<Mode>,
    num_arguments: usize,
    argument_types: Vec<ArgumentType>,
    input_types: Vec<InputExpressionType>,
}

impl DescriptorBuilder {
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn num_arguments(mut self, n: usize) -> Self {
        self.num_arguments = n;
        self
    }

    pub fn argument_types(mut self, types: &[ArgumentType]) -> Self {
        self.argument_types = types.to_vec();
        self
    }

    pub fn input_expression_types(mut self, types: &[InputExpressionType]) -> Self {
        self.input_types = types.to_vec();
        self
    }

    pub fn build(self) -> Result<Descriptor> {
        if self.num_arguments > MAX_NUM_ARGUMENTS {
            return Err(Error::configuration(format!(
                "descriptor declares {} arguments, at most {} are supported",
                self.num_arguments, MAX_NUM_ARGUMENTS
            )));
        }
        if self.argument_types.len() != self.num_arguments
            || self.input_types.len() != self.num_arguments
        {
            return Err(Error::configuration(format!(
                "descriptor declares {} arguments but has {} argument types and {} input types",
                self.num_arguments,
                self.argument_types.len(),
                self.input_types.len()
            )));
        }
        Ok(Descriptor {
            mode: self.mode.unwrap_or(Mode::Projection),
            argument_types: self.argument_types,
            input_types: self.input_types,
        })
    }
}

/// An actual argument bound at instantiation time.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprArg {
    Column(usize),
    Scalar(Value),
}

impl ExprArg {
    fn input_type(&self) -> InputExpressionType {
        match self {
            ExprArg::Column(_) => InputExpressionType::Column,
            ExprArg::Scalar(_) => InputExpressionType::Scalar,
        }
    }
}

type BindFn = Box<dyn Fn(&[ExprArg], &Descriptor) -> Result<ExprKind> + Send + Sync>;

/// One registered overload of a named operator.
pub struct OperatorSignature {
    name: &'static str,
    descriptor: Descriptor,
    bind: BindFn,
}

impl OperatorSignature {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }
}

impl fmt::Debug for OperatorSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorSignature")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

fn column_at(args: &[ExprArg], i: usize) -> Result<usize> {
    match args.get(i) {
        Some(ExprArg::Column(c)) => Ok(*c),
        other => Err(Error::configuration(format!(
            "argument {} must be a column, got {:?}",
            i, other
        ))),
    }
}

fn scalar_at(args: &[ExprArg], i: usize) -> Result<&Value> {
    match args.get(i) {
        Some(ExprArg::Scalar(v)) => Ok(v),
        other => Err(Error::configuration(format!(
            "argument {} must be a scalar, got {:?}",
            i, other
        ))),
    }
}

fn long_scalar_at(args: &[ExprArg], i: usize) -> Result<i64> {
    let v = scalar_at(args, i)?;
    v.as_long_encoding()
        .ok_or_else(|| Error::type_mismatch("LONG scalar", format!("{:?}", v)))
}

fn double_scalar_at(args: &[ExprArg], i: usize) -> Result<f64> {
    let v = scalar_at(args, i)?;
    v.as_f64()
        .ok_or_else(|| Error::type_mismatch("DOUBLE scalar", format!("{:?}", v)))
}

fn string_scalar_at(args: &[ExprArg], i: usize) -> Result<String> {
    let v = scalar_at(args, i)?;
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::type_mismatch("STRING scalar", format!("{:?}", v)))
}

/// Registry of vectorized operators keyed by lower-case name, each with one
/// or more overloads distinguished by descriptor.
pub struct ExpressionCatalog {
    operators: IndexMap<&'static str, Vec<OperatorSignature>>,
}

impl ExpressionCatalog {
    pub fn new() -> Self {
        let mut catalog = Self {
            operators: IndexMap::new(),
        };
        catalog.register_builtins();
        catalog
    }

    fn register<F>(&mut self, name: &'static str, kind_template: &ExprKind, bind: F)
    where
        F: Fn(&[ExprArg], &Descriptor) -> Result<ExprKind> + Send + Sync + 'static,
    {
        self.operators
            .entry(name)
            .or_default()
            .push(OperatorSignature {
                name,
                descriptor: Descriptor::for_kind(kind_template),
                bind: Box::new(bind),
            });
    }

    fn register_builtins(&mut self) {
        self.register("or", &ExprKind::ColOrCol { left: 0, right: 0 }, |a, _| {
            Ok(ExprKind::ColOrCol {
                left: column_at(a, 0)?,
                right: column_at(a, 1)?,
            })
        });
        self.register("and", &ExprKind::ColAndCol { left: 0, right: 0 }, |a, _| {
            Ok(ExprKind::ColAndCol {
                left: column_at(a, 0)?,
                right: column_at(a, 1)?,
            })
        });
        self.register("and", &ExprKind::FilterAnd, |_, _| Ok(ExprKind::FilterAnd));
        self.register("not", &ExprKind::NotCol { input: 0 }, |a, _| {
            Ok(ExprKind::NotCol {
                input: column_at(a, 0)?,
            })
        });
        self.register("isnull", &ExprKind::IsNull { input: 0 }, |a, _| {
            Ok(ExprKind::IsNull {
                input: column_at(a, 0)?,
            })
        });
        self.register("isnotnull", &ExprKind::IsNotNull { input: 0 }, |a, _| {
            Ok(ExprKind::IsNotNull {
                input: column_at(a, 0)?,
            })
        });
        self.register("istrue", &ExprKind::SelectColumnIsTrue { input: 0 }, |a, _| {
            Ok(ExprKind::SelectColumnIsTrue {
                input: column_at(a, 0)?,
            })
        });
        for data_type in [DataType::Int64, DataType::Float64, DataType::String] {
            let template = ExprKind::Constant {
                value: Value::Null,
                data_type,
            };
            self.register("constant", &template, |a, d| {
                let value = scalar_at(a, 0)?.clone();
                let data_type = match value.data_type() {
                    Some(t) => t,
                    None => d
                        .argument_types()
                        .first()
                        .and_then(|t| t.default_data_type())
                        .ok_or_else(|| Error::configuration("untyped null constant"))?,
                };
                Ok(ExprKind::Constant { value, data_type })
            });
        }

        for op in CompareOp::ALL {
            let name = op.symbol();
            self.register(
                name,
                &ExprKind::LongColCompareLongCol {
                    op,
                    left: 0,
                    right: 0,
                },
                move |a, _| {
                    Ok(ExprKind::LongColCompareLongCol {
                        op,
                        left: column_at(a, 0)?,
                        right: column_at(a, 1)?,
                    })
                },
            );
            self.register(
                name,
                &ExprKind::LongColCompareLongScalar {
                    op,
                    input: 0,
                    scalar: 0,
                },
                move |a, _| {
                    Ok(ExprKind::LongColCompareLongScalar {
                        op,
                        input: column_at(a, 0)?,
                        scalar: long_scalar_at(a, 1)?,
                    })
                },
            );
            self.register(
                name,
                &ExprKind::DoubleColCompareDoubleScalar {
                    op,
                    input: 0,
                    scalar: 0.0,
                },
                move |a, _| {
                    Ok(ExprKind::DoubleColCompareDoubleScalar {
                        op,
                        input: column_at(a, 0)?,
                        scalar: double_scalar_at(a, 1)?,
                    })
                },
            );
            self.register(
                name,
                &ExprKind::StringColCompareStringScalar {
                    op,
                    input: 0,
                    scalar: String::new(),
                },
                move |a, _| {
                    Ok(ExprKind::StringColCompareStringScalar {
                        op,
                        input: column_at(a, 0)?,
                        scalar: string_scalar_at(a, 1)?,
                    })
                },
            );
            self.register(
                name,
                &ExprKind::FilterLongColCompareLongScalar {
                    op,
                    input: 0,
                    scalar: 0,
                },
                move |a, _| {
                    Ok(ExprKind::FilterLongColCompareLongScalar {
                        op,
                        input: column_at(a, 0)?,
                        scalar: long_scalar_at(a, 1)?,
                    })
                },
            );
        }

        for op in ArithmeticOp::ALL {
            let name = op.symbol();
            self.register(
                name,
                &ExprKind::LongColArithmeticLongCol {
                    op,
                    left: 0,
                    right: 0,
                },
                move |a, _| {
                    Ok(ExprKind::LongColArithmeticLongCol {
                        op,
                        left: column_at(a, 0)?,
                        right: column_at(a, 1)?,
                    })
                },
            );
            self.register(
                name,
                &ExprKind::LongColArithmeticLongScalar {
                    op,
                    input: 0,
                    scalar: 0,
                },
                move |a, _| {
                    Ok(ExprKind::LongColArithmeticLongScalar {
                        op,
                        input: column_at(a, 0)?,
                        scalar: long_scalar_at(a, 1)?,
                    })
                },
            );
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.operators.keys().copied()
    }

    /// Finds the overload of `name` whose declared shape accepts `descriptor`.
    pub fn lookup(&self, name: &str, descriptor: &Descriptor) -> Result<&OperatorSignature> {
        let key = name.to_ascii_lowercase();
        let overloads = self
            .operators
            .get(key.as_str())
            .ok_or_else(|| Error::unsupported(format!("no vectorized operator named {}", name)))?;
        overloads
            .iter()
            .find(|sig| sig.descriptor.accepts(descriptor))
            .ok_or_else(|| {
                Error::unsupported(format!(
                    "no vectorized overload of {} for {:?}",
                    name, descriptor
                ))
            })
    }

    /// Resolves `name` against `descriptor`, binds `args` and returns the
    /// expression node. Projections require `output`; filters ignore it.
    pub fn instantiate(
        &self,
        name: &str,
        descriptor: &Descriptor,
        args: &[ExprArg],
        output: Option<usize>,
    ) -> Result<VectorExpression> {
        if args.len() != descriptor.num_arguments() {
            return Err(Error::configuration(format!(
                "{} expects {} arguments, got {}",
                name,
                descriptor.num_arguments(),
                args.len()
            )));
        }
        for (i, (arg, expected)) in args.iter().zip(&descriptor.input_types).enumerate() {
            if arg.input_type() != *expected {
                return Err(Error::configuration(format!(
                    "argument {} of {} is a {:?}, descriptor says {:?}",
                    i,
                    name,
                    arg.input_type(),
                    expected
                )));
            }
        }
        let sig = self.lookup(name, descriptor)?;
        let kind = (sig.bind)(args, descriptor)?;
        match (descriptor.mode(), output) {
            (Mode::Projection, Some(out)) => VectorExpression::projection(kind, out),
            (Mode::Projection, None) => Err(Error::configuration(format!(
                "projection {} needs an output column",
                name
            ))),
            (Mode::Filter, _) => VectorExpression::filter(kind),
        }
    }
}

impl Default for ExpressionCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_col_scalar(mode: Mode) -> Descriptor {
        Descriptor::builder()
            .mode(mode)
            .num_arguments(2)
            .argument_types(&[ArgumentType::Long, ArgumentType::Long])
            .input_expression_types(&[InputExpressionType::Column, InputExpressionType::Scalar])
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_validates_arity() {
        let err = Descriptor::builder()
            .num_arguments(2)
            .argument_types(&[ArgumentType::Long])
            .input_expression_types(&[InputExpressionType::Column])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = Descriptor::builder().num_arguments(4).build().unwrap_err();
        assert!(err.to_string().contains("at most 3"));
    }

    #[test]
    fn test_lookup_distinguishes_mode() {
        let catalog = ExpressionCatalog::new();
        let projection = catalog.lookup("<", &long_col_scalar(Mode::Projection)).unwrap();
        assert_eq!(projection.descriptor().mode(), Mode::Projection);
        let filter = catalog.lookup("<", &long_col_scalar(Mode::Filter)).unwrap();
        assert_eq!(filter.descriptor().mode(), Mode::Filter);
    }

    #[test]
    fn test_lookup_unknown() {
        let catalog = ExpressionCatalog::new();
        let err = catalog
            .lookup("like", &long_col_scalar(Mode::Projection))
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = ExpressionCatalog::new();
        let d = Descriptor::builder()
            .num_arguments(2)
            .argument_types(&[ArgumentType::Long, ArgumentType::Long])
            .input_expression_types(&[InputExpressionType::Column, InputExpressionType::Column])
            .build()
            .unwrap();
        assert_eq!(catalog.lookup("OR", &d).unwrap().name(), "or");
    }

    #[test]
    fn test_instantiate_or() {
        let catalog = ExpressionCatalog::new();
        let d = Descriptor::builder()
            .mode(Mode::Projection)
            .num_arguments(2)
            .argument_types(&[ArgumentType::Long, ArgumentType::Long])
            .input_expression_types(&[InputExpressionType::Column, InputExpressionType::Column])
            .build()
            .unwrap();
        let e = catalog
            .instantiate("or", &d, &[ExprArg::Column(0), ExprArg::Column(1)], Some(2))
            .unwrap();
        assert_eq!(e.kind(), &ExprKind::ColOrCol { left: 0, right: 1 });
        assert_eq!(e.output_column(), Some(2));
        assert_eq!(e.descriptor(), d);
    }

    #[test]
    fn test_instantiate_filter_compare() {
        let catalog = ExpressionCatalog::new();
        let e = catalog
            .instantiate(
                ">=",
                &long_col_scalar(Mode::Filter),
                &[ExprArg::Column(3), ExprArg::Scalar(Value::int64(10))],
                None,
            )
            .unwrap();
        assert_eq!(
            e.kind(),
            &ExprKind::FilterLongColCompareLongScalar {
                op: CompareOp::GtEq,
                input: 3,
                scalar: 10
            }
        );
    }

    #[test]
    fn test_instantiate_double_compare() {
        let catalog = ExpressionCatalog::new();
        let d = Descriptor::builder()
            .num_arguments(2)
            .argument_types(&[ArgumentType::Double, ArgumentType::Double])
            .input_expression_types(&[InputExpressionType::Column, InputExpressionType::Scalar])
            .build()
            .unwrap();
        let e = catalog
            .instantiate(
                "=",
                &d,
                &[ExprArg::Column(0), ExprArg::Scalar(Value::float64(0.5))],
                Some(1),
            )
            .unwrap();
        assert_eq!(e.output_type(), Some(DataType::Bool));
    }

    #[test]
    fn test_instantiate_rejects_shape_mismatch() {
        let catalog = ExpressionCatalog::new();
        let err = catalog
            .instantiate(
                "+",
                &long_col_scalar(Mode::Projection),
                &[ExprArg::Column(0), ExprArg::Column(1)],
                Some(2),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_instantiate_projection_needs_output() {
        let catalog = ExpressionCatalog::new();
        let err = catalog
            .instantiate(
                "+",
                &long_col_scalar(Mode::Projection),
                &[ExprArg::Column(0), ExprArg::Scalar(Value::int64(1))],
                None,
            )
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_instantiate_typed_null_constant() {
        let catalog = ExpressionCatalog::new();
        let d = Descriptor::builder()
            .num_arguments(1)
            .argument_types(&[ArgumentType::String])
            .input_expression_types(&[InputExpressionType::Scalar])
            .build()
            .unwrap();
        let e = catalog
            .instantiate("constant", &d, &[ExprArg::Scalar(Value::Null)], Some(0))
            .unwrap();
        assert_eq!(e.output_type(), Some(DataType::String));
    }

    #[test]
    fn test_is_null_accepts_any_type() {
        let catalog = ExpressionCatalog::new();
        let d = Descriptor::builder()
            .num_arguments(1)
            .argument_types(&[ArgumentType::String])
            .input_expression_types(&[InputExpressionType::Column])
            .build()
            .unwrap();
        assert!(catalog.lookup("isnull", &d).is_ok());
    }
}
