use bigdecimal::BigDecimal;
use core::fmt;
use model::{
    core::value::{FieldValue, Value},
    records::row::RowData,
};
use mysql_async::{
    Row as MySqlRow,
    consts::{ColumnFlags, ColumnType},
    prelude::FromValue,
};
use rust_decimal::Decimal as RustDecimal;
use std::{fmt::Formatter, str::FromStr};
use tokio_postgres::{
    Row as PgRow,
    types::{FromSql, Json as PgJson, Type},
};
use tracing::warn;

/// MySQL collation id of the `binary` character set.
const MYSQL_BINARY_CHARSET: u16 = 63;

pub enum DbRow<'a> {
    MySqlRow(&'a MySqlRow),
    PostgresRow(&'a PgRow),
}

impl DbRow<'_> {
    /// Decodes every column in select-list order. Values the driver cannot
    /// decode become `Null`.
    pub fn to_row_data(&self) -> RowData {
        let field_values = self
            .columns()
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                let value = self.get_value(idx);
                FieldValue::new(name, value)
            })
            .collect();

        RowData::new(field_values)
    }

    pub fn columns(&self) -> Vec<String> {
        match self {
            DbRow::MySqlRow(row) => row
                .columns_ref()
                .iter()
                .map(|col| col.name_str().into_owned())
                .collect(),
            DbRow::PostgresRow(row) => row
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect(),
        }
    }

    pub fn get_value(&self, idx: usize) -> Value {
        match self {
            DbRow::MySqlRow(row) => mysql_value(row, idx),
            DbRow::PostgresRow(row) => pg_value(row, idx),
        }
        .unwrap_or(Value::Null)
    }
}

fn pg_get<'a, T: FromSql<'a>>(row: &'a PgRow, idx: usize) -> Option<T> {
    row.try_get::<_, Option<T>>(idx).ok().flatten()
}

fn pg_value(row: &PgRow, idx: usize) -> Option<Value> {
    let ty = row.columns()[idx].type_();

    if *ty == Type::INT2 {
        pg_get::<i16>(row, idx).map(Value::SmallInt)
    } else if *ty == Type::INT4 {
        pg_get::<i32>(row, idx).map(Value::Int32)
    } else if *ty == Type::INT8 {
        pg_get::<i64>(row, idx).map(Value::Int)
    } else if *ty == Type::OID {
        pg_get::<u32>(row, idx).map(|v| Value::Int(i64::from(v)))
    } else if *ty == Type::FLOAT4 {
        pg_get::<f32>(row, idx).map(|v| Value::Float(f64::from(v)))
    } else if *ty == Type::FLOAT8 {
        pg_get::<f64>(row, idx).map(Value::Float)
    } else if *ty == Type::NUMERIC {
        pg_get::<RustDecimal>(row, idx)
            .and_then(|d| BigDecimal::from_str(&d.to_string()).ok())
            .map(Value::Decimal)
    } else if *ty == Type::BOOL {
        pg_get::<bool>(row, idx).map(Value::Boolean)
    } else if *ty == Type::TIMESTAMP {
        pg_get::<chrono::NaiveDateTime>(row, idx).map(Value::TimestampNaive)
    } else if *ty == Type::TIMESTAMPTZ {
        pg_get::<chrono::DateTime<chrono::Utc>>(row, idx).map(Value::Timestamp)
    } else if *ty == Type::DATE {
        pg_get::<chrono::NaiveDate>(row, idx).map(Value::Date)
    } else if *ty == Type::TIME {
        pg_get::<chrono::NaiveTime>(row, idx).map(Value::Time)
    } else if *ty == Type::UUID {
        pg_get::<uuid::Uuid>(row, idx).map(Value::Uuid)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        pg_get::<PgJson<serde_json::Value>>(row, idx).map(|json| Value::Json(json.0))
    } else if *ty == Type::BYTEA {
        pg_get::<Vec<u8>>(row, idx).map(Value::Bytes)
    } else if <String as FromSql>::accepts(ty) {
        pg_get::<String>(row, idx).map(Value::String)
    } else {
        warn!(column = row.columns()[idx].name(), column_type = %ty, "Unsupported column type, emitting null");
        None
    }
}

fn mysql_get<T: FromValue>(row: &MySqlRow, idx: usize) -> Option<T> {
    row.get_opt::<Option<T>, usize>(idx)
        .and_then(|res| res.ok())
        .flatten()
}

fn mysql_value(row: &MySqlRow, idx: usize) -> Option<Value> {
    let column = &row.columns_ref()[idx];
    let unsigned = column.flags().contains(ColumnFlags::UNSIGNED_FLAG);
    let binary = column.character_set() == MYSQL_BINARY_CHARSET;

    match column.column_type() {
        ColumnType::MYSQL_TYPE_NULL => None,
        ColumnType::MYSQL_TYPE_LONGLONG if unsigned => mysql_get::<u64>(row, idx).map(Value::Uint),
        ColumnType::MYSQL_TYPE_TINY
        | ColumnType::MYSQL_TYPE_SHORT
        | ColumnType::MYSQL_TYPE_INT24
        | ColumnType::MYSQL_TYPE_LONG
        | ColumnType::MYSQL_TYPE_YEAR
            if unsigned =>
        {
            mysql_get::<u32>(row, idx).map(|v| Value::Int(i64::from(v)))
        }
        ColumnType::MYSQL_TYPE_TINY | ColumnType::MYSQL_TYPE_SHORT | ColumnType::MYSQL_TYPE_YEAR => {
            mysql_get::<i16>(row, idx).map(Value::SmallInt)
        }
        ColumnType::MYSQL_TYPE_INT24 | ColumnType::MYSQL_TYPE_LONG => {
            mysql_get::<i32>(row, idx).map(Value::Int32)
        }
        ColumnType::MYSQL_TYPE_LONGLONG => mysql_get::<i64>(row, idx).map(Value::Int),
        ColumnType::MYSQL_TYPE_FLOAT | ColumnType::MYSQL_TYPE_DOUBLE => {
            mysql_get::<f64>(row, idx).map(Value::Float)
        }
        ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
            mysql_get::<BigDecimal>(row, idx).map(Value::Decimal)
        }
        ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => {
            mysql_get::<chrono::NaiveDate>(row, idx).map(Value::Date)
        }
        ColumnType::MYSQL_TYPE_DATETIME
        | ColumnType::MYSQL_TYPE_DATETIME2
        | ColumnType::MYSQL_TYPE_TIMESTAMP
        | ColumnType::MYSQL_TYPE_TIMESTAMP2 => {
            mysql_get::<chrono::NaiveDateTime>(row, idx).map(Value::TimestampNaive)
        }
        ColumnType::MYSQL_TYPE_TIME | ColumnType::MYSQL_TYPE_TIME2 => {
            mysql_get::<chrono::NaiveTime>(row, idx).map(Value::Time)
        }
        ColumnType::MYSQL_TYPE_JSON => mysql_get::<String>(row, idx)
            .and_then(|s| serde_json::from_str(&s).ok())
            .map(Value::Json),
        ColumnType::MYSQL_TYPE_BIT | ColumnType::MYSQL_TYPE_GEOMETRY => {
            mysql_get::<Vec<u8>>(row, idx).map(Value::Bytes)
        }
        _ if binary => mysql_get::<Vec<u8>>(row, idx).map(Value::Bytes),
        _ => mysql_get::<String>(row, idx).map(Value::String),
    }
}

impl fmt::Debug for DbRow<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DbRow::MySqlRow(row) => write!(f, "{row:?}"),
            DbRow::PostgresRow(row) => write!(f, "{row:?}"),
        }
    }
}
