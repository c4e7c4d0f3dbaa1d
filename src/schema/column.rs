//! Column markers, column types, and column derivation.

use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;
use tracing::warn;

/// Name of the surrogate identity column every table carries.
pub const ID_COLUMN: &str = "_id";

/// Declared scalar type of a column.
///
/// The five canonical storage classes plus a pass-through label for tags
/// that match none of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ColumnType {
    /// `NULL`.
    Null,
    /// `INTEGER`.
    Integer,
    /// `REAL`.
    Real,
    /// `TEXT`.
    Text,
    /// `BLOB`.
    Blob,
    /// Unrecognized tag, kept verbatim.
    Other(String),
}

impl ColumnType {
    /// Canonical keywords in classification priority order.
    const PRIORITY: [(&'static str, Self); 5] = [
        ("NULL", Self::Null),
        ("INTEGER", Self::Integer),
        ("REAL", Self::Real),
        ("TEXT", Self::Text),
        ("BLOB", Self::Blob),
    ];

    /// Classifies a free-text type tag such as `"TEXT DEFAULT ''"`.
    ///
    /// The tag is searched case-insensitively for each canonical keyword in
    /// the fixed order Null, Integer, Real, Text, Blob; the first keyword
    /// found wins. A tag containing none of them is returned unchanged as
    /// [`ColumnType::Other`].
    ///
    /// Any tag mentioning `NULL`, including a `NOT NULL` constraint,
    /// classifies as [`ColumnType::Null`] and decodes as null.
    ///
    /// # Examples
    ///
    /// ```
    /// use tablekit::schema::ColumnType;
    ///
    /// assert_eq!(ColumnType::classify("text unique"), ColumnType::Text);
    /// assert_eq!(ColumnType::classify("TEXT NOT NULL"), ColumnType::Null);
    /// assert_eq!(ColumnType::classify("INTEGER DEFAULT NULL"), ColumnType::Null);
    /// assert_eq!(ColumnType::classify("VARCHAR(10)"), ColumnType::Other("VARCHAR(10)".into()));
    /// ```
    #[must_use]
    pub fn classify(tag: &str) -> Self {
        let upper = tag.to_uppercase();
        Self::PRIORITY
            .iter()
            .find(|(keyword, _)| upper.contains(keyword))
            .map_or_else(|| Self::Other(tag.to_string()), |(_, ty)| ty.clone())
    }

    /// Returns the keyword used in generated DDL.
    #[must_use]
    pub fn keyword(&self) -> &str {
        match self {
            Self::Null => "NULL",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A declared column: a name paired with a free-text type tag.
///
/// Markers are what table types list; [`derive_columns`] turns them into
/// [`ColumnDefinition`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMarker {
    /// Column name.
    pub name: Cow<'static, str>,
    /// Type tag, e.g. `"INTEGER"` or `"TEXT COLLATE NOCASE"`.
    pub tag: Cow<'static, str>,
}

impl ColumnMarker {
    /// Creates a marker from static strings.
    #[must_use]
    pub const fn new(name: &'static str, tag: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            tag: Cow::Borrowed(tag),
        }
    }

    /// Creates a marker from owned strings (runtime-discovered columns).
    pub fn owned(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            tag: Cow::Owned(tag.into()),
        }
    }
}

/// A derived column: name and resolved type. Immutable once derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Resolved column type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// Returns true if `name` is a plain SQL identifier.
pub fn is_identifier(name: &str) -> bool {
    static IDENT: OnceLock<Option<Regex>> = OnceLock::new();
    IDENT
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}

/// Derives ordered column definitions from declared markers.
///
/// Output order is declaration order. Markers whose name is not a plain
/// identifier, that reuse the reserved [`ID_COLUMN`], or that repeat an
/// earlier name are logged and skipped; derivation itself never fails.
#[must_use]
pub fn derive_columns(table: &str, markers: &[ColumnMarker]) -> Vec<ColumnDefinition> {
    let mut columns: Vec<ColumnDefinition> = Vec::with_capacity(markers.len());

    for marker in markers {
        let name = marker.name.trim();
        if !is_identifier(name) {
            warn!(table, column = %marker.name, "skipping column marker with malformed name");
            continue;
        }
        if name == ID_COLUMN {
            warn!(table, "skipping column marker that redeclares the identity column");
            continue;
        }
        if columns.iter().any(|c| c.name == name) {
            warn!(table, column = name, "skipping duplicate column marker");
            continue;
        }
        columns.push(ColumnDefinition {
            name: name.to_string(),
            column_type: ColumnType::classify(&marker.tag),
        });
    }

    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("INTEGER", ColumnType::Integer; "plain integer")]
    #[test_case("integer primary key", ColumnType::Integer; "lowercase integer")]
    #[test_case("TEXT UNIQUE", ColumnType::Text; "text with constraint")]
    #[test_case("TEXT NOT NULL", ColumnType::Null; "not null mentions null")]
    #[test_case("real", ColumnType::Real; "lowercase real")]
    #[test_case("Blob", ColumnType::Blob; "mixed case blob")]
    #[test_case("NULL", ColumnType::Null; "null")]
    #[test_case("TEXT DEFAULT NULL", ColumnType::Null; "null outranks text")]
    #[test_case("INTEGER REAL", ColumnType::Integer; "integer outranks real")]
    fn test_classify(tag: &str, expected: ColumnType) {
        assert_eq!(ColumnType::classify(tag), expected);
    }

    #[test]
    fn test_classify_unrecognized_passes_through() {
        assert_eq!(
            ColumnType::classify("varchar(20)"),
            ColumnType::Other("varchar(20)".to_string())
        );
        assert_eq!(ColumnType::Other("varchar(20)".into()).keyword(), "varchar(20)");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("manufacturer_id"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("name; DROP TABLE x"));
    }

    #[test]
    fn test_derive_preserves_declaration_order() {
        let markers = [
            ColumnMarker::new("zeta", "TEXT"),
            ColumnMarker::new("alpha", "INTEGER"),
            ColumnMarker::new("mid", "REAL"),
        ];
        let names: Vec<_> = derive_columns("T", &markers)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_derive_skips_malformed_markers() {
        let markers = [
            ColumnMarker::new("", "TEXT"),
            ColumnMarker::new("ok", "TEXT"),
            ColumnMarker::new("_id", "INTEGER"),
            ColumnMarker::new("bad name", "TEXT"),
            ColumnMarker::new("ok", "INTEGER"),
        ];
        let columns = derive_columns("T", &markers);
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].name, "ok");
        assert_eq!(columns[0].column_type, ColumnType::Text);
    }
}
