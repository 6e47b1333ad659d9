//! Renders a record set as delimited text for spreadsheet import.
//!
//! Records are loosely typed: each one is an ordered mapping from field name
//! to a tagged [`Value`]. The column set is inferred from the first record
//! (its key order is the output column order) unless an explicit column list
//! is supplied through [`SerializerConfig`]. Escaping is unambiguous: every
//! string or flattened nested value is wrapped in double quotes with embedded
//! quotes doubled, so no cell can corrupt the row/column structure. The
//! functions here are pure; transport is the caller's concern.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A single cell value. The set is closed on purpose: serialization is total
/// over these variants, so there is no failure mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    /// A joined relation embedded in the row; flattened to compact JSON.
    Nested(serde_json::Value),
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Text(value.format("%Y-%m-%d").to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Text(value.to_rfc3339())
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::Nested(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

/// One exportable row: field names mapped to values, insertion order kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, builder style.
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    /// Append a field.
    pub fn push(&mut self, name: &str, value: impl Into<Value>) {
        self.fields.push((name.to_string(), value.into()));
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(field, _)| field.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Serializer settings.
#[derive(Debug, Clone)]
pub struct SerializerConfig {
    /// Cell separator, a single character.
    pub delimiter: char,
    /// Explicit column list. When unset, columns are inferred from the first
    /// record; when set, it also makes the header available for empty record
    /// sets.
    pub columns: Option<Vec<String>>,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            columns: None,
        }
    }
}

/// Serialize a record set with the default configuration (comma delimiter,
/// columns inferred from the first record).
///
/// With no records there is no schema to infer, so the output is the empty
/// string; use [`serialize_with`] and an explicit column list to get a header
/// for empty sets.
pub fn serialize(records: &[Record]) -> String {
    serialize_with(records, &SerializerConfig::default())
}

/// Serialize a record set.
///
/// The output is a header line followed by one line per record in input
/// order, separated by `\n` with no trailing newline. A field missing from a
/// record yields an empty cell. Identical input always produces identical
/// output.
pub fn serialize_with(records: &[Record], config: &SerializerConfig) -> String {
    let columns: Vec<String> = match &config.columns {
        Some(columns) => columns.clone(),
        None => match records.first() {
            Some(first) => first.keys().map(str::to_string).collect(),
            None => return String::new(),
        },
    };

    let delimiter = config.delimiter.to_string();
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(columns.join(&delimiter));

    for record in records {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| render_cell(record.get(column)))
            .collect();
        lines.push(cells.join(&delimiter));
    }

    lines.join("\n")
}

/// Render one cell. Null and missing become the empty string; numeric and
/// boolean literals pass through unquoted (they cannot contain the delimiter
/// or a quote); strings and flattened nested values are always quoted.
fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::Bool(value)) => value.to_string(),
        Some(Value::Int(value)) => value.to_string(),
        Some(Value::Float(value)) => value.to_string(),
        Some(Value::Decimal(value)) => value.to_string(),
        Some(Value::Text(value)) => quote(value),
        Some(Value::Nested(value)) => {
            quote(&serde_json::to_string(value).unwrap_or_default())
        }
    }
}

/// Wrap in double quotes, doubling any quote already present.
fn quote(raw: &str) -> String {
    let mut quoted = String::with_capacity(raw.len() + 2);
    quoted.push('"');
    for c in raw.chars() {
        if c == '"' {
            quoted.push('"');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn sample_records() -> Vec<Record> {
        vec![
            Record::new().with_field("id", 1).with_field("name", "A,B"),
            Record::new()
                .with_field("id", 2)
                .with_field("name", "Say \"hi\""),
        ]
    }

    #[test]
    fn test_reference_output() {
        let output = serialize(&sample_records());
        assert_eq!(output, "id,name\n1,\"A,B\"\n2,\"Say \"\"hi\"\"\"");
    }

    #[test]
    fn test_determinism() {
        let records = sample_records();
        assert_eq!(serialize(&records), serialize(&records));
    }

    #[test]
    fn test_header_follows_first_record_key_order() {
        let records = vec![Record::new()
            .with_field("z", 1)
            .with_field("a", 2)
            .with_field("m", 3)];
        let output = serialize(&records);
        assert_eq!(output.lines().next().unwrap(), "z,a,m");
    }

    #[test]
    fn test_missing_field_yields_empty_cell() {
        let records = vec![
            Record::new().with_field("id", 1).with_field("name", "full"),
            Record::new().with_field("id", 2),
        ];
        let output = serialize(&records);
        assert_eq!(output, "id,name\n1,\"full\"\n2,");
    }

    #[test]
    fn test_extra_fields_in_later_records_are_ignored() {
        let records = vec![
            Record::new().with_field("id", 1),
            Record::new().with_field("id", 2).with_field("name", "extra"),
        ];
        let output = serialize(&records);
        assert_eq!(output, "id\n1\n2");
    }

    #[test]
    fn test_strings_are_always_quoted() {
        let records = vec![Record::new().with_field("name", "plain")];
        assert_eq!(serialize(&records), "name\n\"plain\"");
    }

    #[test]
    fn test_embedded_quotes_are_doubled() {
        let records = vec![Record::new().with_field("quote", "He said \"hi\"")];
        assert_eq!(serialize(&records), "quote\n\"He said \"\"hi\"\"\"");
    }

    #[test]
    fn test_numbers_and_booleans_unquoted() {
        let records = vec![Record::new()
            .with_field("rent", 1200)
            .with_field("surface", 45.5)
            .with_field("amount", dec!(850.50))
            .with_field("furnished", true)];
        assert_eq!(serialize(&records), "rent,surface,amount,furnished\n1200,45.5,850.50,true");
    }

    #[test]
    fn test_null_yields_empty_cell() {
        let records = vec![Record::new()
            .with_field("id", 1)
            .with_field("phone", Value::Null)
            .with_field("name", "x")];
        assert_eq!(serialize(&records), "id,phone,name\n1,,\"x\"");
    }

    #[test]
    fn test_nested_values_flattened_and_quoted() {
        // Quoted even without a delimiter in the flattened text
        let records = vec![Record::new()
            .with_field("id", 1)
            .with_field("buildings", json!({"name": "Oliviers"}))];
        assert_eq!(
            serialize(&records),
            "id,buildings\n1,\"{\"\"name\"\":\"\"Oliviers\"\"}\""
        );
    }

    #[test]
    fn test_nested_array_value() {
        let records = vec![Record::new().with_field("tags", json!(["a", "b"]))];
        assert_eq!(serialize(&records), "tags\n\"[\"\"a\"\",\"\"b\"\"]\"");
    }

    #[test]
    fn test_empty_input_returns_empty_string() {
        assert_eq!(serialize(&[]), "");
    }

    #[test]
    fn test_empty_input_with_explicit_columns_returns_header() {
        let config = SerializerConfig {
            delimiter: ',',
            columns: Some(vec!["id".to_string(), "name".to_string()]),
        };
        assert_eq!(serialize_with(&[], &config), "id,name");
    }

    #[test]
    fn test_explicit_columns_override_record_order() {
        let config = SerializerConfig {
            delimiter: ',',
            columns: Some(vec!["name".to_string(), "id".to_string()]),
        };
        let records = vec![Record::new().with_field("id", 1).with_field("name", "x")];
        assert_eq!(serialize_with(&records, &config), "name,id\n\"x\",1");
    }

    #[test]
    fn test_custom_delimiter() {
        let config = SerializerConfig {
            delimiter: ';',
            columns: None,
        };
        let records = vec![Record::new().with_field("id", 1).with_field("name", "a;b")];
        // The quoting rule is delimiter-independent: strings are quoted anyway
        assert_eq!(serialize_with(&records, &config), "id;name\n1;\"a;b\"");
    }

    #[test]
    fn test_no_trailing_newline() {
        let output = serialize(&sample_records());
        assert!(!output.ends_with('\n'));
    }

    #[test]
    fn test_option_conversions() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(3_i64)), Value::Int(3));
        assert_eq!(
            Value::from(Some("x".to_string())),
            Value::Text("x".to_string())
        );
    }
}
