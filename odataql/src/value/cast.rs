use crate::{schema::PrimitiveType, value::Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CastError {
    /// Cannot cast from source type to target type
    #[error("cannot cast {value} to {to:?}")]
    IncompatibleTypes { value: String, to: PrimitiveType },
    /// Numeric overflow when casting between numeric types
    #[error("numeric overflow: '{value}' cannot fit in {target_type:?}")]
    NumericOverflow { value: String, target_type: PrimitiveType },
}

fn overflow(value: impl ToString, target_type: PrimitiveType) -> CastError {
    CastError::NumericOverflow { value: value.to_string(), target_type }
}

impl Value {
    /// Cast this value to the specified numeric type, widening or range-checked narrowing. Null casts to null.
    pub fn cast_to(&self, target_type: PrimitiveType) -> Result<Value, CastError> {
        if self.is_null() || self.primitive_type() == Some(target_type) {
            return Ok(self.clone());
        }

        match (self, target_type) {
            // Numeric conversions
            (Value::I16(n), PrimitiveType::Int32) => Ok(Value::I32(*n as i32)),
            (Value::I16(n), PrimitiveType::Int64) => Ok(Value::I64(*n as i64)),
            (Value::I16(n), PrimitiveType::Double) => Ok(Value::F64(*n as f64)),

            (Value::I32(n), PrimitiveType::Int16) => i16::try_from(*n).map(Value::I16).map_err(|_| overflow(n, target_type)),
            (Value::I32(n), PrimitiveType::Int64) => Ok(Value::I64(*n as i64)),
            (Value::I32(n), PrimitiveType::Double) => Ok(Value::F64(*n as f64)),

            (Value::I64(n), PrimitiveType::Int16) => i16::try_from(*n).map(Value::I16).map_err(|_| overflow(n, target_type)),
            (Value::I64(n), PrimitiveType::Int32) => i32::try_from(*n).map(Value::I32).map_err(|_| overflow(n, target_type)),
            (Value::I64(n), PrimitiveType::Double) => Ok(Value::F64(*n as f64)),

            (Value::F64(n), PrimitiveType::Int16) => {
                if n.is_finite() && *n >= i16::MIN as f64 && *n <= i16::MAX as f64 {
                    Ok(Value::I16(*n as i16))
                } else {
                    Err(overflow(n, target_type))
                }
            }
            (Value::F64(n), PrimitiveType::Int32) => {
                if n.is_finite() && *n >= i32::MIN as f64 && *n <= i32::MAX as f64 {
                    Ok(Value::I32(*n as i32))
                } else {
                    Err(overflow(n, target_type))
                }
            }
            (Value::F64(n), PrimitiveType::Int64) => {
                if n.is_finite() && *n >= i64::MIN as f64 && *n <= i64::MAX as f64 {
                    Ok(Value::I64(*n as i64))
                } else {
                    Err(overflow(n, target_type))
                }
            }

            _ => Err(CastError::IncompatibleTypes { value: self.to_string(), to: target_type }),
        }
    }
}
