//! Filters, ordering, and query options.
//!
//! Filters render as parameterized `WHERE` fragments: `column=?`,
//! `column<?`, and `column>?`, with the compared value bound separately.

use crate::codec::Value;
use crate::error::StorageError;
use crate::schema::TableDefinition;

/// A `WHERE` predicate with its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    clause: String,
    params: Vec<Value>,
    columns: Vec<String>,
}

impl Filter {
    fn compare(column: &str, operator: &str, value: impl Into<Value>) -> Self {
        Self {
            clause: format!("{column}{operator}?"),
            params: vec![value.into()],
            columns: vec![column.to_string()],
        }
    }

    /// `column = value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tablekit::engine::Filter;
    ///
    /// let filter = Filter::equals("name", "Billie");
    /// assert_eq!(filter.clause(), "name=?");
    /// ```
    pub fn equals(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, "=", value)
    }

    /// `column < value`.
    pub fn less_than(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, "<", value)
    }

    /// `column > value`.
    pub fn greater_than(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, ">", value)
    }

    /// A caller-written clause with positional `?` parameters.
    ///
    /// Column names inside a raw clause are not checked against the table.
    pub fn raw(clause: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            clause: clause.into(),
            params,
            columns: Vec::new(),
        }
    }

    fn combine(self, other: Self, joiner: &str) -> Self {
        let mut params = self.params;
        params.extend(other.params);
        let mut columns = self.columns;
        columns.extend(other.columns);
        Self {
            clause: format!("({}) {joiner} ({})", self.clause, other.clause),
            params,
            columns,
        }
    }

    /// Both predicates must hold.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        self.combine(other, "AND")
    }

    /// Either predicate may hold.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        self.combine(other, "OR")
    }

    /// The `WHERE` fragment, without the `WHERE` keyword.
    #[must_use]
    pub fn clause(&self) -> &str {
        &self.clause
    }

    /// Bound parameters, in placeholder order.
    #[must_use]
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Checks that every column named by a builder exists in `table`.
    pub(crate) fn check(&self, table: &TableDefinition) -> Result<(), StorageError> {
        check_columns(table, self.columns.iter().map(String::as_str))
    }
}

fn check_columns<'a>(
    table: &TableDefinition,
    mut columns: impl Iterator<Item = &'a str>,
) -> Result<(), StorageError> {
    match columns.find(|c| !table.has_column(c)) {
        Some(column) => Err(StorageError::UnknownColumn {
            table: table.name().to_string(),
            column: column.to_string(),
        }),
        None => Ok(()),
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl Direction {
    const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filter, ordering, and limit for a multi-row query.
///
/// All parts are optional; an empty query scans the whole table in
/// store-native order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filter: Option<Filter>,
    order: Vec<(String, Direction)>,
    limit: Option<u32>,
}

impl Query {
    /// Unrestricted query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts rows with a filter.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Adds an ordering term. Terms apply in the order added.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push((column.into(), direction));
        self
    }

    /// Caps the number of rows returned.
    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The filter, if any.
    #[must_use]
    pub const fn filter_ref(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// The row limit, if any.
    #[must_use]
    pub const fn limit_value(&self) -> Option<u32> {
        self.limit
    }

    /// The `ORDER BY` fragment, if any ordering was requested.
    #[must_use]
    pub fn order_clause(&self) -> Option<String> {
        if self.order.is_empty() {
            return None;
        }
        Some(
            self.order
                .iter()
                .map(|(column, dir)| format!("{column} {}", dir.keyword()))
                .collect::<Vec<_>>()
                .join(", "),
        )
    }

    pub(crate) fn check(&self, table: &TableDefinition) -> Result<(), StorageError> {
        if let Some(filter) = &self.filter {
            filter.check(table)?;
        }
        check_columns(table, self.order.iter().map(|(c, _)| c.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnMarker, derive_columns};

    fn table() -> TableDefinition {
        TableDefinition::new(
            "CarTable",
            derive_columns(
                "CarTable",
                &[
                    ColumnMarker::new("name", "TEXT"),
                    ColumnMarker::new("colour", "TEXT"),
                ],
            ),
        )
    }

    #[test]
    fn test_builders() {
        assert_eq!(Filter::equals("name", "Jim").clause(), "name=?");
        assert_eq!(Filter::less_than("age", 3_i64).clause(), "age<?");
        assert_eq!(Filter::greater_than("age", 3_i64).clause(), "age>?");
        assert_eq!(
            Filter::equals("name", "Jim").params(),
            &[Value::Text("Jim".to_string())]
        );
    }

    #[test]
    fn test_value_is_bound_not_inlined() {
        let filter = Filter::equals("name", "x' OR '1'='1");
        assert_eq!(filter.clause(), "name=?");
        assert_eq!(filter.params().len(), 1);
    }

    #[test]
    fn test_compose() {
        let filter = Filter::equals("name", "Jim").or(Filter::equals("colour", "Red"));
        assert_eq!(filter.clause(), "(name=?) OR (colour=?)");
        assert_eq!(filter.params().len(), 2);

        let filter = filter.and(Filter::greater_than("_id", 1_i64));
        assert_eq!(filter.clause(), "((name=?) OR (colour=?)) AND (_id>?)");
        assert!(filter.check(&table()).is_ok());
    }

    #[test]
    fn test_check_unknown_column() {
        let err = Filter::equals("wheels", 4_i64).check(&table()).unwrap_err();
        assert!(matches!(err, StorageError::UnknownColumn { column, .. } if column == "wheels"));
    }

    #[test]
    fn test_raw_not_checked() {
        let filter = Filter::raw("length(name) > ?", vec![Value::Integer(2)]);
        assert!(filter.check(&table()).is_ok());
    }

    #[test]
    fn test_query_order_clause() {
        let query = Query::new()
            .order_by("name", Direction::Asc)
            .order_by("_id", Direction::Desc)
            .limit(5);
        assert_eq!(query.order_clause().as_deref(), Some("name ASC, _id DESC"));
        assert_eq!(query.limit_value(), Some(5));
        assert!(query.check(&table()).is_ok());

        let bad = Query::new().order_by("speed", Direction::Asc);
        assert!(bad.check(&table()).is_err());
        assert!(Query::new().order_clause().is_none());
    }
}
