//! Typed attribute values and their conversion from raw SQLite cells.

use geopackage::FieldValue;
use serde::{Deserialize, Serialize};

use crate::schema::ScalarType;

/// A validated attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Float(f64),
    Integer(i64),
    Text(String),
    Boolean(bool),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view; integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Carry an undeclared column through with its natural type.
    ///
    /// Blobs have no scalar counterpart and yield `None`.
    pub fn from_field(field: &FieldValue) -> Option<Self> {
        match field {
            FieldValue::Null => Some(Self::Null),
            FieldValue::Integer(v) => Some(Self::Integer(*v)),
            FieldValue::Real(v) if v.is_nan() => Some(Self::Null),
            FieldValue::Real(v) => Some(Self::Float(*v)),
            FieldValue::Text(v) => Some(Self::Text(v.clone())),
            FieldValue::Blob(_) => None,
        }
    }

    /// Convert a raw cell to a declared type.
    ///
    /// NULL and NaN both mean "absent" and give `Ok(Value::Null)`. Lossless
    /// widenings are accepted: integers as floats, integral floats as
    /// integers, numeric text, and 0/1 as booleans.
    pub fn convert(field: &FieldValue, ty: ScalarType) -> Result<Self, String> {
        match (field, ty) {
            (FieldValue::Null, _) => Ok(Self::Null),
            (FieldValue::Real(v), _) if v.is_nan() => Ok(Self::Null),
            (FieldValue::Blob(_), _) => Err(format!("binary value cannot be read as {}", ty)),

            (FieldValue::Real(v), ScalarType::Float) => Ok(Self::Float(*v)),
            (FieldValue::Integer(v), ScalarType::Float) => Ok(Self::Float(*v as f64)),
            (FieldValue::Text(s), ScalarType::Float) => s
                .trim()
                .parse::<f64>()
                .map(Self::Float)
                .map_err(|_| format!("'{}' is not a number", s)),

            (FieldValue::Integer(v), ScalarType::Integer) => Ok(Self::Integer(*v)),
            (FieldValue::Real(v), ScalarType::Integer) => {
                if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
                    Ok(Self::Integer(*v as i64))
                } else {
                    Err(format!("{} is not an integer", v))
                }
            }
            (FieldValue::Text(s), ScalarType::Integer) => s
                .trim()
                .parse::<i64>()
                .map(Self::Integer)
                .map_err(|_| format!("'{}' is not an integer", s)),

            (FieldValue::Text(s), ScalarType::Text) => Ok(Self::Text(s.clone())),
            (FieldValue::Integer(v), ScalarType::Text) => Ok(Self::Text(v.to_string())),
            (FieldValue::Real(v), ScalarType::Text) => Ok(Self::Text(v.to_string())),

            (FieldValue::Integer(0), ScalarType::Boolean) => Ok(Self::Boolean(false)),
            (FieldValue::Integer(1), ScalarType::Boolean) => Ok(Self::Boolean(true)),
            (FieldValue::Real(v), ScalarType::Boolean) if *v == 0.0 => Ok(Self::Boolean(false)),
            (FieldValue::Real(v), ScalarType::Boolean) if *v == 1.0 => Ok(Self::Boolean(true)),
            (FieldValue::Text(s), ScalarType::Boolean) => {
                match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Ok(Self::Boolean(true)),
                    "false" | "0" => Ok(Self::Boolean(false)),
                    _ => Err(format!("'{}' is not a boolean", s)),
                }
            }
            (other, ScalarType::Boolean) => Err(format!("{:?} is not a boolean", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_widening() {
        assert_eq!(
            Value::convert(&FieldValue::Integer(5), ScalarType::Float),
            Ok(Value::Float(5.0))
        );
        assert_eq!(
            Value::convert(&FieldValue::Text(" 2.5 ".into()), ScalarType::Float),
            Ok(Value::Float(2.5))
        );
    }

    #[test]
    fn test_integer_from_integral_float() {
        assert_eq!(
            Value::convert(&FieldValue::Real(2.0), ScalarType::Integer),
            Ok(Value::Integer(2))
        );
        assert!(Value::convert(&FieldValue::Real(2.5), ScalarType::Integer).is_err());
    }

    #[test]
    fn test_nan_is_absent() {
        assert_eq!(
            Value::convert(&FieldValue::Real(f64::NAN), ScalarType::Float),
            Ok(Value::Null)
        );
        assert_eq!(
            Value::from_field(&FieldValue::Real(f64::NAN)),
            Some(Value::Null)
        );
    }

    #[test]
    fn test_boolean_conversion() {
        assert_eq!(
            Value::convert(&FieldValue::Integer(1), ScalarType::Boolean),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            Value::convert(&FieldValue::Text("False".into()), ScalarType::Boolean),
            Ok(Value::Boolean(false))
        );
        assert!(Value::convert(&FieldValue::Integer(2), ScalarType::Boolean).is_err());
    }

    #[test]
    fn test_blob_rejected() {
        assert!(Value::convert(&FieldValue::Blob(vec![1, 2]), ScalarType::Text).is_err());
        assert_eq!(Value::from_field(&FieldValue::Blob(vec![])), None);
    }

    #[test]
    fn test_text_not_number() {
        let err = Value::convert(&FieldValue::Text("abc".into()), ScalarType::Float).unwrap_err();
        assert!(err.contains("abc"));
    }
}
