use crate::error::ConversionError;
use chrono::{LocalResult, TimeZone, Utc};
use chrono_tz::Tz;
use model::core::value::Value;

/// Per-value transformation applied before a value is placed in a record.
pub trait ValueTransform: Send + Sync {
    fn apply(&self, column: &str, value: Value) -> Result<Value, ConversionError>;
}

pub struct Passthrough;

impl ValueTransform for Passthrough {
    fn apply(&self, _column: &str, value: Value) -> Result<Value, ConversionError> {
        Ok(value)
    }
}

/// Interprets zone-less timestamps as wall-clock time in `timezone` and
/// converts them to UTC instants.
pub struct TemporalNormalizer {
    timezone: Tz,
}

impl TemporalNormalizer {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }
}

impl ValueTransform for TemporalNormalizer {
    fn apply(&self, column: &str, value: Value) -> Result<Value, ConversionError> {
        let Value::TimestampNaive(naive) = value else {
            return Ok(value);
        };

        match self.timezone.from_local_datetime(&naive) {
            LocalResult::Single(local) => Ok(Value::Timestamp(local.with_timezone(&Utc))),
            LocalResult::None => Err(ConversionError::NonexistentLocalTime {
                column: column.to_string(),
                value: naive.to_string(),
                timezone: self.timezone.name().to_string(),
            }),
            LocalResult::Ambiguous(..) => Err(ConversionError::AmbiguousLocalTime {
                column: column.to_string(),
                value: naive.to_string(),
                timezone: self.timezone.name().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_naive_timestamp_becomes_utc() {
        let normalizer = TemporalNormalizer::new(chrono_tz::Europe::Berlin);
        let value = normalizer
            .apply("ts", Value::TimestampNaive(naive(2024, 1, 15, 12, 0)))
            .unwrap();
        assert_eq!(value, Value::Timestamp(naive(2024, 1, 15, 11, 0).and_utc()));
    }

    #[test]
    fn test_other_values_untouched() {
        let normalizer = TemporalNormalizer::new(chrono_tz::UTC);
        assert_eq!(normalizer.apply("n", Value::Int(3)).unwrap(), Value::Int(3));
        assert_eq!(normalizer.apply("n", Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_daylight_saving_gaps_and_overlaps() {
        let normalizer = TemporalNormalizer::new(chrono_tz::Europe::Berlin);

        let gap = normalizer.apply("ts", Value::TimestampNaive(naive(2024, 3, 31, 2, 30)));
        assert!(matches!(
            gap,
            Err(ConversionError::NonexistentLocalTime { column, .. }) if column == "ts"
        ));

        let overlap = normalizer.apply("ts", Value::TimestampNaive(naive(2024, 10, 27, 2, 30)));
        assert!(matches!(overlap, Err(ConversionError::AmbiguousLocalTime { .. })));
    }
}
