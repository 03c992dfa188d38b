//! Conversion between nested JSON lists and flat row-major arrays.

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NdJsonError {
    #[error("Ragged array at depth {depth}")]
    Ragged { depth: usize },

    #[error("Expected a number, found {0}")]
    NotNumeric(String),

    #[error("Shape {0:?} holds more values than can be addressed")]
    Overflow(Vec<usize>),

    #[error("Shape {shape:?} holds {expected} values, got {actual}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },
}

/// Number of values addressed by `shape`; the empty shape is a scalar. Fails when the product
/// does not fit a `usize`.
pub fn element_count(shape: &[usize]) -> Result<usize, NdJsonError> {
    if shape.contains(&0) {
        return Ok(0);
    }
    shape
        .iter()
        .try_fold(1usize, |acc, dim| acc.checked_mul(*dim))
        .ok_or_else(|| NdJsonError::Overflow(shape.to_vec()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl NdArray {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self, NdJsonError> {
        let expected = element_count(&shape)?;
        if data.len() != expected {
            return Err(NdJsonError::ShapeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn from_json(value: &Value) -> Result<Self, NdJsonError> {
        let shape = infer_shape(value);
        let mut data = Vec::with_capacity(element_count(&shape)?);
        flatten(value, &shape, 0, &mut data)?;
        Ok(Self { shape, data })
    }

    pub fn to_json(&self) -> Value {
        nest(&self.shape, &self.data)
    }
}

// Shape implied by following the first element down; `flatten` checks the rest against it.
fn infer_shape(value: &Value) -> Vec<usize> {
    let mut shape = vec![];
    let mut current = value;
    while let Value::Array(items) = current {
        shape.push(items.len());
        match items.first() {
            Some(first) => current = first,
            None => break,
        }
    }
    shape
}

fn flatten(
    value: &Value,
    shape: &[usize],
    depth: usize,
    out: &mut Vec<f64>,
) -> Result<(), NdJsonError> {
    match (value, shape.get(depth)) {
        (Value::Array(items), Some(&len)) => {
            if items.len() != len {
                return Err(NdJsonError::Ragged { depth });
            }
            items
                .iter()
                .try_for_each(|item| flatten(item, shape, depth + 1, out))
        }
        (Value::Number(n), None) => {
            let v = n
                .as_f64()
                .ok_or_else(|| NdJsonError::NotNumeric(n.to_string()))?;
            out.push(v);
            Ok(())
        }
        (Value::Array(_), None) | (Value::Number(_), Some(_)) => {
            Err(NdJsonError::Ragged { depth })
        }
        (other, _) => Err(NdJsonError::NotNumeric(other.to_string())),
    }
}

fn nest(shape: &[usize], data: &[f64]) -> Value {
    match shape.split_first() {
        None => Value::from(data[0]),
        Some((&len, rest)) => {
            // bounded by the data length whenever `len > 0`
            let stride = rest.iter().fold(1usize, |acc, dim| acc.saturating_mul(*dim));
            Value::Array(
                (0..len)
                    .map(|i| nest(rest, &data[i * stride..(i + 1) * stride]))
                    .collect(),
            )
        }
    }
}
