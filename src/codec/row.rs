//! Rows: column-name to tagged-value mappings.

use crate::codec::value::Value;
use crate::error::CodecError;
use crate::schema::{ColumnType, TableDefinition};
use serde::Serialize;
use std::collections::BTreeMap;

/// One physical record during marshalling.
///
/// Built by [`Table::encode`](crate::schema::Table::encode) for writes and
/// by the store for reads. Every key in a row written to a table must be
/// a column that table declares; see [`Row::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    values: BTreeMap<String, Value>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column value, builder style.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.put(column, value);
        self
    }

    /// Sets a column value, replacing any earlier one.
    pub fn put(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(column.into(), value.into());
        self
    }

    /// Raw value of a column, if present.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Returns true if the column is absent or holds `NULL`.
    #[must_use]
    pub fn is_null(&self, column: &str) -> bool {
        self.get(column).is_none_or(Value::is_null)
    }

    /// Number of columns set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no column is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over `(column, value)` pairs in column-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn require(&self, column: &str) -> Result<&Value, CodecError> {
        self.get(column).ok_or_else(|| CodecError::MissingColumn {
            column: column.to_string(),
        })
    }

    fn mismatch(column: &str, expected: &'static str, found: &Value) -> CodecError {
        CodecError::TypeMismatch {
            column: column.to_string(),
            expected,
            found: found.tag(),
        }
    }

    /// Integer value of a column.
    pub fn integer(&self, column: &str) -> Result<i64, CodecError> {
        match self.require(column)? {
            Value::Integer(i) => Ok(*i),
            other => Err(Self::mismatch(column, "INTEGER", other)),
        }
    }

    /// Integer value of a column, converted to a narrower integer type.
    pub fn integer_as<T: TryFrom<i64>>(&self, column: &str) -> Result<T, CodecError> {
        let value = self.integer(column)?;
        T::try_from(value).map_err(|_| CodecError::OutOfRange {
            column: column.to_string(),
            value,
        })
    }

    /// Floating-point value of a column.
    pub fn real(&self, column: &str) -> Result<f64, CodecError> {
        match self.require(column)? {
            Value::Real(r) => Ok(*r),
            other => Err(Self::mismatch(column, "REAL", other)),
        }
    }

    /// Text value of a column.
    pub fn text(&self, column: &str) -> Result<&str, CodecError> {
        match self.require(column)? {
            Value::Text(t) => Ok(t),
            other => Err(Self::mismatch(column, "TEXT", other)),
        }
    }

    /// Blob value of a column.
    pub fn blob(&self, column: &str) -> Result<&[u8], CodecError> {
        match self.require(column)? {
            Value::Blob(b) => Ok(b),
            other => Err(Self::mismatch(column, "BLOB", other)),
        }
    }

    /// Integer value, or `None` when the column is absent or `NULL`.
    pub fn optional_integer(&self, column: &str) -> Result<Option<i64>, CodecError> {
        if self.is_null(column) {
            return Ok(None);
        }
        self.integer(column).map(Some)
    }

    /// Floating-point value, or `None` when the column is absent or `NULL`.
    pub fn optional_real(&self, column: &str) -> Result<Option<f64>, CodecError> {
        if self.is_null(column) {
            return Ok(None);
        }
        self.real(column).map(Some)
    }

    /// Text value, or `None` when the column is absent or `NULL`.
    pub fn optional_text(&self, column: &str) -> Result<Option<&str>, CodecError> {
        if self.is_null(column) {
            return Ok(None);
        }
        self.text(column).map(Some)
    }

    /// Blob value, or `None` when the column is absent or `NULL`.
    pub fn optional_blob(&self, column: &str) -> Result<Option<&[u8]>, CodecError> {
        if self.is_null(column) {
            return Ok(None);
        }
        self.blob(column).map(Some)
    }

    /// Checks that every key is a column declared by `table`.
    pub fn validate(&self, table: &TableDefinition) -> Result<(), CodecError> {
        match self.values.keys().find(|k| table.column(k).is_none()) {
            Some(column) => Err(CodecError::UndeclaredColumn {
                table: table.name().to_string(),
                column: column.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Reads the declared columns of `table` from a result row.
    ///
    /// Each column is read with the accessor matching its declared type;
    /// `NULL`-typed columns always yield [`Value::Null`].
    ///
    /// Reads are strict. A stored value whose storage class the declared
    /// type cannot take, such as text in an `INTEGER` column, is not
    /// coerced: the conversion error fails the whole read, which the store
    /// reports as
    /// [`StorageError::Query`](crate::error::StorageError::Query). Integers
    /// stored in a `REAL` column are widened. Columns of an unrecognised
    /// type are read as whatever was stored.
    pub(crate) fn from_store(
        table: &TableDefinition,
        source: &rusqlite::Row<'_>,
    ) -> rusqlite::Result<Self> {
        let mut row = Self::new();
        for column in table.columns() {
            let name = column.name.as_str();
            let value = match column.column_type {
                ColumnType::Null => Value::Null,
                ColumnType::Integer => source.get::<_, Option<i64>>(name)?.into(),
                ColumnType::Real => source.get::<_, Option<f64>>(name)?.into(),
                ColumnType::Text => source.get::<_, Option<String>>(name)?.into(),
                ColumnType::Blob => source.get::<_, Option<Vec<u8>>>(name)?.into(),
                ColumnType::Other(_) => Value::from(source.get_ref(name)?),
            };
            row.values.insert(column.name.clone(), value);
        }
        Ok(row)
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnMarker, derive_columns};

    fn sample() -> Row {
        Row::new()
            .with("name", "Billie")
            .with("doors", 3_i64)
            .with("weight", 1.25_f64)
            .with("plate", vec![1_u8, 2, 3])
            .with("nickname", None::<String>)
    }

    #[test]
    fn test_typed_accessors() {
        let row = sample();
        assert_eq!(row.text("name").unwrap(), "Billie");
        assert_eq!(row.integer("doors").unwrap(), 3);
        assert!((row.real("weight").unwrap() - 1.25).abs() < f64::EPSILON);
        assert_eq!(row.blob("plate").unwrap(), &[1, 2, 3]);
        assert!(row.is_null("nickname"));
        assert_eq!(row.optional_text("nickname").unwrap(), None);
        assert_eq!(row.optional_integer("doors").unwrap(), Some(3));
    }

    #[test]
    fn test_type_mismatch() {
        let err = sample().integer("name").unwrap_err();
        assert_eq!(
            err,
            CodecError::TypeMismatch {
                column: "name".to_string(),
                expected: "INTEGER",
                found: "TEXT",
            }
        );
    }

    #[test]
    fn test_missing_column() {
        let err = sample().text("colour").unwrap_err();
        assert!(matches!(err, CodecError::MissingColumn { .. }));
    }

    #[test]
    fn test_integer_as_out_of_range() {
        let row = Row::new().with("big", i64::MAX);
        assert!(matches!(
            row.integer_as::<i32>("big"),
            Err(CodecError::OutOfRange { .. })
        ));
        let row = Row::new().with("small", 12_i64);
        assert_eq!(row.integer_as::<i32>("small").unwrap(), 12);
    }

    #[test]
    fn test_put_replaces() {
        let mut row = Row::new();
        row.put("a", 1_i64).put("a", 2_i64);
        assert_eq!(row.len(), 1);
        assert_eq!(row.integer("a").unwrap(), 2);
    }

    #[test]
    fn test_validate() {
        let table = TableDefinition::new(
            "T",
            derive_columns("T", &[ColumnMarker::new("name", "TEXT")]),
        );
        assert!(Row::new().with("name", "x").validate(&table).is_ok());
        let err = Row::new().with("colour", "x").validate(&table).unwrap_err();
        assert_eq!(
            err,
            CodecError::UndeclaredColumn {
                table: "T".to_string(),
                column: "colour".to_string(),
            }
        );
    }
}
