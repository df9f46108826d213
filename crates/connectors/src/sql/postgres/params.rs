//! Binds `Value`s to whatever type the server inferred for each placeholder.
//!
//! Parameters come from configuration and from decoded rows, so their Rust
//! type rarely matches the column exactly (`Int` against an `int4` column, a
//! string against a `timestamptz`). Encoding is driven by the target type.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use model::core::value::Value;
use rust_decimal::Decimal as RustDecimal;
use std::{error::Error, str::FromStr};
use tokio_postgres::types::{IsNull, Json as PgJson, ToSql, Type, to_sql_checked};
use uuid::Uuid;

type EncodeResult = Result<IsNull, Box<dyn Error + Sync + Send>>;

#[derive(Debug)]
pub struct PgParam(Value);

impl PgParam {
    pub fn from_value(value: Value) -> Self {
        PgParam(value)
    }
}

impl ToSql for PgParam {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> EncodeResult {
        match &self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::SmallInt(v) => encode_int(i64::from(*v), ty, out),
            Value::Int32(v) => encode_int(i64::from(*v), ty, out),
            Value::Int(v) => encode_int(*v, ty, out),
            Value::Uint(v) => encode_int(i64::try_from(*v)?, ty, out),
            Value::Float(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else if *ty == Type::NUMERIC {
                    RustDecimal::try_from(*v)?.to_sql(ty, out)
                } else if is_text(ty) {
                    v.to_string().to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::Decimal(v) => {
                if *ty == Type::FLOAT8 || *ty == Type::FLOAT4 {
                    encode_str(&v.to_string(), ty, out)
                } else if is_text(ty) {
                    v.to_string().to_sql(ty, out)
                } else {
                    RustDecimal::from_str(&v.to_string())?.to_sql(ty, out)
                }
            }
            Value::String(v) => encode_str(v, ty, out),
            Value::Boolean(v) => v.to_sql(ty, out),
            Value::Json(v) => {
                if is_text(ty) {
                    v.to_string().to_sql(ty, out)
                } else {
                    PgJson(v).to_sql(ty, out)
                }
            }
            Value::Uuid(v) => {
                if is_text(ty) {
                    v.to_string().to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::Bytes(v) => v.to_sql(ty, out),
            Value::Date(v) => v.to_sql(ty, out),
            Value::Time(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => {
                if *ty == Type::TIMESTAMP {
                    v.naive_utc().to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::TimestampNaive(v) => {
                if *ty == Type::TIMESTAMPTZ {
                    v.and_utc().to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn is_text(ty: &Type) -> bool {
    *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME
}

fn encode_int(v: i64, ty: &Type, out: &mut BytesMut) -> EncodeResult {
    if *ty == Type::INT2 {
        i16::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::INT4 {
        i32::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::NUMERIC {
        RustDecimal::from(v).to_sql(ty, out)
    } else if *ty == Type::FLOAT8 {
        (v as f64).to_sql(ty, out)
    } else if *ty == Type::FLOAT4 {
        (v as f32).to_sql(ty, out)
    } else if is_text(ty) {
        v.to_string().to_sql(ty, out)
    } else {
        v.to_sql(ty, out)
    }
}

/// Strings are parsed into the target type so that configured parameters
/// such as `"2024-01-01T00:00:00Z"` bind against temporal columns.
fn encode_str(v: &str, ty: &Type, out: &mut BytesMut) -> EncodeResult {
    if *ty == Type::INT2 || *ty == Type::INT4 || *ty == Type::INT8 {
        encode_int(v.trim().parse::<i64>()?, ty, out)
    } else if *ty == Type::FLOAT8 {
        v.trim().parse::<f64>()?.to_sql(ty, out)
    } else if *ty == Type::FLOAT4 {
        v.trim().parse::<f32>()?.to_sql(ty, out)
    } else if *ty == Type::NUMERIC {
        RustDecimal::from_str(v.trim())?.to_sql(ty, out)
    } else if *ty == Type::BOOL {
        v.trim().parse::<bool>()?.to_sql(ty, out)
    } else if *ty == Type::TIMESTAMPTZ {
        DateTime::parse_from_rfc3339(v.trim())?
            .with_timezone(&Utc)
            .to_sql(ty, out)
    } else if *ty == Type::TIMESTAMP {
        parse_naive_datetime(v.trim())?.to_sql(ty, out)
    } else if *ty == Type::DATE {
        NaiveDate::from_str(v.trim())?.to_sql(ty, out)
    } else if *ty == Type::TIME {
        NaiveTime::from_str(v.trim())?.to_sql(ty, out)
    } else if *ty == Type::UUID {
        Uuid::parse_str(v.trim())?.to_sql(ty, out)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        PgJson(serde_json::from_str::<serde_json::Value>(v)?).to_sql(ty, out)
    } else {
        v.to_sql(ty, out)
    }
}

fn parse_naive_datetime(v: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(v, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(v, "%Y-%m-%d %H:%M:%S%.f"))
}

pub struct PgParamStore {
    pub params: Vec<PgParam>,
}

impl PgParamStore {
    pub fn from_values(values: &[Value]) -> Self {
        Self {
            params: values.iter().cloned().map(PgParam::from_value).collect(),
        }
    }

    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|param| param as &(dyn ToSql + Sync))
            .collect::<Vec<_>>()
    }
}
