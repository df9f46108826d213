use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, hash::Hash, str::FromStr};
use uuid::Uuid;

/// A single column value as decoded from a result set or bound as a parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    SmallInt(i16),
    Int32(i32),
    Int(i64),
    Uint(u64),
    Float(f64),
    Decimal(BigDecimal),
    String(String),
    Boolean(bool),
    Json(serde_json::Value),
    Uuid(Uuid),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(DateTime<Utc>),
    /// Wall-clock timestamp without zone, as returned by `TIMESTAMP` / `DATETIME` columns.
    TimestampNaive(NaiveDateTime),
    Null,
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        use Value::*;
        std::mem::discriminant(self).hash(state);
        match self {
            SmallInt(v) => v.hash(state),
            Int32(v) => v.hash(state),
            Int(v) => v.hash(state),
            Uint(v) => v.hash(state),
            Float(v) => {
                // Hash the bits of the float to handle NaN and -0.0 correctly
                v.to_bits().hash(state);
            }
            Decimal(v) => v.hash(state),
            String(v) => v.hash(state),
            Boolean(v) => v.hash(state),
            Json(v) => {
                let json_str = serde_json::to_string(v).unwrap_or_default();
                json_str.hash(state);
            }
            Uuid(v) => v.hash(state),
            Bytes(v) => v.hash(state),
            Date(v) => v.hash(state),
            Time(v) => v.hash(state),
            Timestamp(v) => v.hash(state),
            TimestampNaive(v) => v.hash(state),
            Null => {}
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Value::SmallInt(_) | Value::Int32(_) | Value::Int(_) | Value::Uint(_)
        )
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::SmallInt(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(*v),
            Value::Uint(v) => i64::try_from(*v).ok(),
            Value::String(v) => v.parse::<i64>().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Decimal(v) => v.to_string().parse::<f64>().ok(),
            Value::String(v) => v.parse::<f64>().ok(),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::String(v) => Some(v.clone()),
            Value::Json(v) => v.as_str().map(|s| s.to_string()),
            Value::Bytes(_) | Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Orders two values of compatible types; `None` when they cannot be compared.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Float(a), b) if b.is_integer() => b.as_i64().and_then(|b| a.partial_cmp(&(b as f64))),
            (a, Float(b)) if a.is_integer() => a.as_i64().and_then(|a| (a as f64).partial_cmp(b)),
            (Decimal(a), Decimal(b)) => Some(a.cmp(b)),
            (String(a), String(b)) => Some(a.cmp(b)),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Uuid(a), Uuid(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Time(a), Time(b)) => Some(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            (TimestampNaive(a), TimestampNaive(b)) => Some(a.cmp(b)),
            (Timestamp(a), TimestampNaive(b)) => Some(a.naive_utc().cmp(b)),
            (TimestampNaive(a), Timestamp(b)) => Some(a.cmp(&b.naive_utc())),
            (Uint(a), Uint(b)) => Some(a.cmp(b)),
            (a, b) if a.is_integer() && b.is_integer() => match (a.as_i64(), b.as_i64()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn equal(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Builds a value from a JSON scalar, as used for configured query parameters.
    ///
    /// Integers become `Int`, fractional numbers `Decimal`, strings stay strings; arrays
    /// and objects are kept as `Json`.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::Uint(u)
                } else {
                    BigDecimal::from_str(&n.to_string())
                        .map(Value::Decimal)
                        .unwrap_or_else(|_| Value::Float(n.as_f64().unwrap_or_default()))
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            other => Value::Json(other.clone()),
        }
    }

    /// Renders the value as plain JSON for downstream consumers.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::SmallInt(v) => Json::from(*v),
            Value::Int32(v) => Json::from(*v),
            Value::Int(v) => Json::from(*v),
            Value::Uint(v) => Json::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Decimal(v) => Json::String(v.to_string()),
            Value::String(v) => Json::String(v.clone()),
            Value::Boolean(v) => Json::Bool(*v),
            Value::Json(v) => v.clone(),
            Value::Uuid(v) => Json::String(v.to_string()),
            Value::Bytes(v) => Json::String(v.iter().map(|b| format!("{b:02x}")).collect()),
            Value::Date(v) => Json::String(v.to_string()),
            Value::Time(v) => Json::String(v.to_string()),
            Value::Timestamp(v) => Json::String(v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::TimestampNaive(v) => Json::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Value::Null => Json::Null,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::SmallInt(_) => "smallint",
            Value::Int32(_) => "int",
            Value::Int(_) => "bigint",
            Value::Uint(_) => "bigint unsigned",
            Value::Float(_) => "double",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "text",
            Value::Boolean(_) => "boolean",
            Value::Json(_) => "json",
            Value::Uuid(_) => "uuid",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "timestamptz",
            Value::TimestampNaive(_) => "timestamp",
            Value::Null => "null",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::SmallInt(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Uint(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Json(v) => write!(f, "'{}'", v.to_string().replace('\'', "''")),
            Value::Uuid(v) => write!(f, "{v}"),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Date(v) => write!(f, "'{v}'"),
            Value::Time(v) => write!(f, "'{v}'"),
            Value::Timestamp(v) => write!(f, "'{v}'"),
            Value::TimestampNaive(v) => write!(f, "'{v}'"),
            Value::Null => write!(f, "NULL"),
        }
    }
}

/// A named column value within a row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldValue {
    pub name: String,
    pub value: Option<Value>,
}

impl FieldValue {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        let value = if value.is_null() { None } else { Some(value) };
        FieldValue {
            name: name.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_widths_compare() {
        assert_eq!(
            Value::Int32(7).compare(&Value::Int(9)),
            Some(Ordering::Less)
        );
        assert!(Value::SmallInt(3).equal(&Value::Uint(3)));
        assert_eq!(Value::String("a".into()).compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(Value::from_json(&json!(42)), Value::Int(42));
        assert_eq!(Value::from_json(&json!("x")), Value::String("x".into()));
        assert_eq!(Value::from_json(&json!(null)), Value::Null);
        assert_eq!(Value::from_json(&json!(true)), Value::Boolean(true));
        assert!(matches!(Value::from_json(&json!(1.5)), Value::Decimal(_)));
        assert!(matches!(Value::from_json(&json!([1, 2])), Value::Json(_)));
    }

    #[test]
    fn test_to_json_temporal() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let ts = date.and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(Value::Date(date).to_json(), json!("2024-02-29"));
        assert_eq!(
            Value::TimestampNaive(ts).to_json(),
            json!("2024-02-29T10:30:00")
        );
        assert_eq!(
            Value::Timestamp(ts.and_utc()).to_json(),
            json!("2024-02-29T10:30:00Z")
        );
    }

    #[test]
    fn test_field_value_null_is_none() {
        assert_eq!(FieldValue::new("a", Value::Null).value, None);
        assert_eq!(
            FieldValue::new("a", Value::Int(1)).value,
            Some(Value::Int(1))
        );
    }
}
