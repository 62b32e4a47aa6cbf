use std::sync::{Arc, Mutex};

use ndarray::{ArrayD, Axis, IxDyn, Slice};

use super::dataset::TIME_DIM;
use super::DataError;

/// Slice of the time dimension materialized in one evaluation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: usize,
    pub count: usize,
}

impl TimeWindow {
    pub fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Exp,
}

/// Deferred computation over gridded fields. Nothing is read or computed
/// until `eval` materializes one time window; the writer is the only caller,
/// so each output variable is materialized exactly once, chunk by chunk.
#[derive(Clone)]
pub enum DataExpr {
    /// Windowed read from an open file. `squeezed` lists on-disk size-1
    /// dimensions dropped from the materialized array.
    Source {
        file: Arc<Mutex<netcdf::File>>,
        var_name: String,
        squeezed: Vec<String>,
    },
    /// In-memory array; `has_time` marks axis 0 as the time axis so windows
    /// apply to it.
    Literal { data: ArrayD<f64>, has_time: bool },
    Scalar(f64),
    /// Replicate a static field across the time axis of the current window
    Broadcast(Box<DataExpr>),
    Unary {
        op: UnaryOp,
        a: Box<DataExpr>,
    },
    Binary {
        op: BinOp,
        a: Box<DataExpr>,
        b: Box<DataExpr>,
    },
}

enum Value {
    Array(ArrayD<f64>),
    Number(f64),
}

fn apply(op: BinOp, a: f64, b: f64) -> f64 {
    match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
    }
}

impl DataExpr {
    pub fn source(file: Arc<Mutex<netcdf::File>>, var_name: &str) -> Self {
        DataExpr::Source {
            file,
            var_name: var_name.to_string(),
            squeezed: Vec::new(),
        }
    }

    /// Static in-memory field, unaffected by time windows
    pub fn literal(data: ArrayD<f64>) -> Self {
        DataExpr::Literal {
            data,
            has_time: false,
        }
    }

    /// In-memory field whose leading axis is the time axis
    pub fn time_series(data: ArrayD<f64>) -> Self {
        DataExpr::Literal {
            data,
            has_time: true,
        }
    }

    pub fn scalar(value: f64) -> Self {
        DataExpr::Scalar(value)
    }

    /// Expand this static field with a new leading time axis sized by the
    /// evaluation window
    pub fn broadcast_over_time(self) -> Self {
        DataExpr::Broadcast(Box::new(self))
    }

    pub fn add(self, rhs: DataExpr) -> Self {
        self.binary(BinOp::Add, rhs)
    }

    pub fn sub(self, rhs: DataExpr) -> Self {
        self.binary(BinOp::Sub, rhs)
    }

    pub fn mul(self, rhs: DataExpr) -> Self {
        self.binary(BinOp::Mul, rhs)
    }

    pub fn div(self, rhs: DataExpr) -> Self {
        self.binary(BinOp::Div, rhs)
    }

    pub fn exp(self) -> Self {
        DataExpr::Unary {
            op: UnaryOp::Exp,
            a: Box::new(self),
        }
    }

    fn binary(self, op: BinOp, rhs: DataExpr) -> Self {
        DataExpr::Binary {
            op,
            a: Box::new(self),
            b: Box::new(rhs),
        }
    }

    /// Mark an on-disk size-1 dimension as dropped from materialized arrays
    pub fn squeeze_dim(&mut self, dim: &str) {
        match self {
            DataExpr::Source { squeezed, .. } => squeezed.push(dim.to_string()),
            DataExpr::Broadcast(a) | DataExpr::Unary { a, .. } => a.squeeze_dim(dim),
            DataExpr::Binary { a, b, .. } => {
                a.squeeze_dim(dim);
                b.squeeze_dim(dim);
            }
            DataExpr::Literal { .. } | DataExpr::Scalar(_) => {}
        }
    }

    /// Materialize one time window of this expression
    pub fn eval(&self, window: TimeWindow) -> Result<ArrayD<f64>, DataError> {
        match self.eval_value(window)? {
            Value::Array(array) => Ok(array),
            Value::Number(_) => Err(DataError::Conversion(
                "scalar expression has no array shape".to_string(),
            )),
        }
    }

    fn eval_value(&self, window: TimeWindow) -> Result<Value, DataError> {
        match self {
            DataExpr::Source {
                file,
                var_name,
                squeezed,
            } => {
                let guard = file
                    .lock()
                    .map_err(|_| DataError::Conversion("dataset handle lock poisoned".to_string()))?;
                let var = guard
                    .variable(var_name)
                    .ok_or_else(|| DataError::MissingVariable(var_name.clone()))?;

                let mut starts = Vec::new();
                let mut counts = Vec::new();
                let mut squeeze_axes = Vec::new();
                for (axis, dim) in var.dimensions().iter().enumerate() {
                    let dim_name = dim.name();
                    if squeezed.iter().any(|s| *s == dim_name) {
                        starts.push(0);
                        counts.push(1);
                        squeeze_axes.push(axis);
                    } else if dim_name == TIME_DIM {
                        starts.push(window.start);
                        counts.push(window.count);
                    } else {
                        starts.push(0);
                        counts.push(dim.len());
                    }
                }

                let raw: Vec<f64> = var.get_values((starts.as_slice(), counts.as_slice()))?;
                let mut array = ArrayD::from_shape_vec(IxDyn(&counts), raw)
                    .map_err(|e| DataError::Conversion(e.to_string()))?;
                for axis in squeeze_axes.iter().rev() {
                    array = array.index_axis_move(Axis(*axis), 0);
                }
                Ok(Value::Array(array))
            }
            DataExpr::Literal { data, has_time } => {
                if *has_time {
                    let end = window.start + window.count;
                    if end > data.shape()[0] {
                        return Err(DataError::ShapeMismatch {
                            expected: vec![end],
                            actual: vec![data.shape()[0]],
                        });
                    }
                    Ok(Value::Array(
                        data.slice_axis(Axis(0), Slice::from(window.start..end))
                            .to_owned(),
                    ))
                } else {
                    Ok(Value::Array(data.clone()))
                }
            }
            DataExpr::Scalar(value) => Ok(Value::Number(*value)),
            DataExpr::Broadcast(inner) => {
                let field = match inner.eval_value(window)? {
                    Value::Array(array) => array,
                    Value::Number(_) => {
                        return Err(DataError::Conversion(
                            "cannot broadcast a bare scalar over time".to_string(),
                        ))
                    }
                };
                let mut shape = vec![window.count];
                shape.extend_from_slice(field.shape());
                let expanded = field.view().insert_axis(Axis(0));
                let broadcast = expanded.broadcast(IxDyn(&shape)).ok_or_else(|| {
                    DataError::ShapeMismatch {
                        expected: shape.clone(),
                        actual: field.shape().to_vec(),
                    }
                })?;
                Ok(Value::Array(broadcast.to_owned()))
            }
            DataExpr::Unary { op, a } => {
                let value = a.eval_value(window)?;
                Ok(match (op, value) {
                    (UnaryOp::Exp, Value::Array(array)) => Value::Array(array.mapv(f64::exp)),
                    (UnaryOp::Exp, Value::Number(n)) => Value::Number(n.exp()),
                })
            }
            DataExpr::Binary { op, a, b } => {
                let left = a.eval_value(window)?;
                let right = b.eval_value(window)?;
                match (left, right) {
                    (Value::Array(x), Value::Array(y)) => {
                        if x.shape() != y.shape() {
                            return Err(DataError::ShapeMismatch {
                                expected: x.shape().to_vec(),
                                actual: y.shape().to_vec(),
                            });
                        }
                        let result = match op {
                            BinOp::Add => &x + &y,
                            BinOp::Sub => &x - &y,
                            BinOp::Mul => &x * &y,
                            BinOp::Div => &x / &y,
                        };
                        Ok(Value::Array(result))
                    }
                    (Value::Array(x), Value::Number(n)) => {
                        Ok(Value::Array(x.mapv(|v| apply(*op, v, n))))
                    }
                    (Value::Number(n), Value::Array(y)) => {
                        Ok(Value::Array(y.mapv(|v| apply(*op, n, v))))
                    }
                    (Value::Number(m), Value::Number(n)) => Ok(Value::Number(apply(*op, m, n))),
                }
            }
        }
    }
}
