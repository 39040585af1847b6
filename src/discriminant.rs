//! Hashable keys for scalar discriminator values.

use serde_json::Value;

/// A scalar JSON value usable as a hash key.
///
/// Numbers are keyed by their canonical text, so `1` and `1.0` are distinct
/// keys, matching `Value` equality. Both float zeros share one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Discriminant {
    Null,
    Bool(bool),
    Number(String),
    String(String),
}

impl Discriminant {
    /// Returns `None` for arrays and objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Discriminant::Null),
            Value::Bool(b) => Some(Discriminant::Bool(*b)),
            Value::Number(n) if n.is_f64() && n.as_f64() == Some(0.0) => {
                Some(Discriminant::Number("0.0".to_string()))
            }
            Value::Number(n) => Some(Discriminant::Number(n.to_string())),
            Value::String(s) => Some(Discriminant::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// A discriminator field found on a validator: the input must carry `key`
/// with exactly `value` for the validator to accept it.
#[derive(Debug, Clone, PartialEq)]
pub struct Discriminator {
    pub key: String,
    pub value: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_have_keys() {
        assert_eq!(Discriminant::from_value(&json!(null)), Some(Discriminant::Null));
        assert_eq!(Discriminant::from_value(&json!(true)), Some(Discriminant::Bool(true)));
        assert_eq!(
            Discriminant::from_value(&json!("ok")),
            Some(Discriminant::String("ok".to_string()))
        );
    }

    #[test]
    fn test_compounds_have_no_key() {
        assert_eq!(Discriminant::from_value(&json!([1])), None);
        assert_eq!(Discriminant::from_value(&json!({"a": 1})), None);
    }

    #[test]
    fn test_integer_and_float_differ() {
        let int = Discriminant::from_value(&json!(1)).unwrap();
        let float = Discriminant::from_value(&json!(1.0)).unwrap();
        assert_ne!(int, float);
    }

    #[test]
    fn test_signed_zeros_share_a_key() {
        assert_eq!(
            Discriminant::from_value(&json!(-0.0)),
            Discriminant::from_value(&json!(0.0))
        );
    }

    #[test]
    fn test_string_and_number_differ() {
        let s = Discriminant::from_value(&json!("1")).unwrap();
        let n = Discriminant::from_value(&json!(1)).unwrap();
        assert_ne!(s, n);
    }
}
