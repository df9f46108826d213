use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};
use model::core::value::Value;
use mysql_async::{Params, Value as MySqlValue};

/// Binds poll parameters positionally. Decimals, UUIDs and JSON go over the
/// wire as text and are coerced by the server.
pub fn bind(values: &[Value]) -> Params {
    if values.is_empty() {
        Params::Empty
    } else {
        Params::Positional(values.iter().map(to_mysql).collect())
    }
}

fn to_mysql(value: &Value) -> MySqlValue {
    match value {
        Value::Null => MySqlValue::NULL,
        Value::SmallInt(i) => MySqlValue::Int((*i).into()),
        Value::Int32(i) => MySqlValue::Int((*i).into()),
        Value::Int(i) => MySqlValue::Int(*i),
        Value::Uint(u) => MySqlValue::UInt(*u),
        Value::Float(f) => MySqlValue::Double(*f),
        Value::Boolean(b) => MySqlValue::Int(i64::from(*b)),
        Value::String(s) => MySqlValue::Bytes(s.as_bytes().to_vec()),
        Value::Bytes(b) => MySqlValue::Bytes(b.clone()),
        Value::Decimal(d) => text(d),
        Value::Uuid(u) => text(u),
        Value::Json(j) => text(j),
        Value::Date(d) => datetime(&d.and_time(NaiveTime::MIN)),
        Value::Time(t) => MySqlValue::Time(
            false,
            0,
            t.hour() as u8,
            t.minute() as u8,
            t.second() as u8,
            t.nanosecond() / 1_000,
        ),
        Value::Timestamp(ts) => datetime(&ts.naive_utc()),
        Value::TimestampNaive(ts) => datetime(ts),
    }
}

fn text(value: &impl ToString) -> MySqlValue {
    MySqlValue::Bytes(value.to_string().into_bytes())
}

fn datetime(naive: &NaiveDateTime) -> MySqlValue {
    MySqlValue::Date(
        naive.year() as u16,
        naive.month() as u8,
        naive.day() as u8,
        naive.hour() as u8,
        naive.minute() as u8,
        naive.second() as u8,
        naive.and_utc().timestamp_subsec_micros(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_empty_params() {
        assert_eq!(bind(&[]), Params::Empty);
    }

    #[test]
    fn test_positional_values() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_micro_opt(12, 30, 5, 250)
            .unwrap();
        let params = bind(&[
            Value::Int32(4),
            Value::Boolean(true),
            Value::TimestampNaive(ts),
            Value::Null,
        ]);
        assert_eq!(
            params,
            Params::Positional(vec![
                MySqlValue::Int(4),
                MySqlValue::Int(1),
                MySqlValue::Date(2024, 3, 1, 12, 30, 5, 250),
                MySqlValue::NULL,
            ])
        );
    }
}
