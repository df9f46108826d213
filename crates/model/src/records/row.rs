use crate::core::value::{FieldValue, Value};
use serde::{Deserialize, Serialize};

/// One decoded result-set row, columns kept in select-list order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RowData {
    pub field_values: Vec<FieldValue>,
}

impl RowData {
    pub fn new(field_values: Vec<FieldValue>) -> Self {
        RowData { field_values }
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        RowData {
            field_values: pairs
                .into_iter()
                .map(|(name, value)| FieldValue::new(name, value))
                .collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.field_values
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(field))
    }

    pub fn get_value(&self, field: &str) -> Value {
        self.get(field)
            .and_then(|f| f.value.clone())
            .unwrap_or(Value::Null)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.field_values.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.field_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field_values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_value_is_case_insensitive() {
        let row = RowData::from_pairs([("Id", Value::Int(4)), ("name", Value::Null)]);
        assert_eq!(row.get_value("id"), Value::Int(4));
        assert_eq!(row.get_value("NAME"), Value::Null);
        assert_eq!(row.get_value("missing"), Value::Null);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["Id", "name"]);
    }
}
