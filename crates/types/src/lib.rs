//! Shared type definitions for the caldb client.
//!
//! These types describe the request side (namepath fields, resolved
//! coordinates, cache keys) and the result side (type tables and
//! assignments) of a calibration lookup. They carry no behavior beyond
//! construction and simple accessors; resolution lives in `caldb-client`.

mod error;

pub use error::CaldbError;

use serde::{Deserialize, Serialize};

/// Fields extracted from a request namepath, before defaults are applied.
///
/// A namepath has the form `path[:run][:variation][:time]`. Optional
/// segments that are absent or empty are `None` here; substituting the
/// client defaults is a resolution concern, not a parsing concern.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestFields {
    /// Mandatory data path, as written by the caller (may be relative).
    pub path: String,
    /// Run number, when the second segment was present and non-empty.
    pub run: Option<i64>,
    /// Variation name, when the third segment was present and non-empty.
    pub variation: Option<String>,
    /// Unix timestamp, when the fourth segment was present and non-empty.
    pub time: Option<i64>,
}

/// A request with every dimension pinned down.
///
/// Produced by the resolver from [`RequestFields`] plus the client
/// defaults. The path is always absolute (leading `/`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedRequest {
    /// Absolute data path.
    pub path: String,
    /// Run number the constants must be valid for.
    pub run: i64,
    /// Variation name, `"default"` unless the caller said otherwise.
    pub variation: String,
    /// Unix timestamp; values <= 0 mean "no time constraint".
    pub time: i64,
    /// Whether column metadata must be loaded alongside the data.
    pub load_columns: bool,
}

impl ResolvedRequest {
    /// The provider-facing time constraint: positive times only.
    pub fn time_constraint(&self) -> Option<i64> {
        (self.time > 0).then_some(self.time)
    }
}

/// Deterministic cache key built from a fully resolved request.
///
/// Two namepaths that resolve to the same tuple share a cache entry no
/// matter whether their qualifiers were written out or default-filled.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct CacheKey {
    path: String,
    run: i64,
    variation: String,
    time: i64,
    load_columns: bool,
}

impl From<&ResolvedRequest> for CacheKey {
    fn from(request: &ResolvedRequest) -> Self {
        Self {
            path: request.path.clone(),
            run: request.run,
            variation: request.variation.clone(),
            time: request.time,
            load_columns: request.load_columns,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cols = if self.load_columns { "cols" } else { "no_cols" };
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.path, self.run, self.variation, self.time, cols
        )
    }
}

/// A single column of a constants type table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name as stored in the backend.
    pub name: String,
    /// Declared cell type (`"string"`, `"int"`, `"double"`); informational.
    #[serde(default = "default_column_type")]
    pub column_type: String,
}

fn default_column_type() -> String {
    "string".into()
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
        }
    }
}

/// Metadata describing one constants table known to the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTable {
    /// Absolute path of the table, starting with `/`.
    pub full_path: String,
    /// Ordered column descriptions; may be empty when columns were not loaded.
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl TypeTable {
    /// Ordered column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// A resolved dataset handle: the raw string table plus its metadata.
///
/// Assignments are produced by a provider, then owned by the client cache
/// for the life of the process (the cache never evicts). Callers receive
/// shared handles and must treat them as read-only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    table: TypeTable,
    rows: Vec<Vec<String>>,
    request: ResolvedRequest,
}

impl Assignment {
    pub fn new(table: TypeTable, rows: Vec<Vec<String>>, request: ResolvedRequest) -> Self {
        Self { table, rows, request }
    }

    /// Raw table data: ordered rows of ordered string cells.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Row-major flattening of the table into a single vector view.
    pub fn flat_values(&self) -> Vec<&str> {
        self.rows
            .iter()
            .flat_map(|row| row.iter().map(String::as_str))
            .collect()
    }

    /// Type table metadata this assignment was resolved against.
    pub fn type_table(&self) -> &TypeTable {
        &self.table
    }

    /// The resolved request coordinates this assignment answers.
    pub fn request(&self) -> &ResolvedRequest {
        &self.request
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Column count, from metadata when loaded, else from the first row.
    pub fn column_count(&self) -> usize {
        if self.table.columns.is_empty() {
            self.rows.first().map(Vec::len).unwrap_or(0)
        } else {
            self.table.columns.len()
        }
    }

    /// Ordered column names; empty when columns were not loaded.
    pub fn column_names(&self) -> Vec<&str> {
        self.table.column_names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &str, run: i64, variation: &str, time: i64, load_columns: bool) -> ResolvedRequest {
        ResolvedRequest {
            path: path.into(),
            run,
            variation: variation.into(),
            time,
            load_columns,
        }
    }

    #[test]
    fn cache_key_ignores_how_defaults_were_supplied() {
        let explicit = request("/a/b", 0, "default", 0, true);
        let defaulted = request("/a/b", 0, "default", 0, true);
        assert_eq!(CacheKey::from(&explicit), CacheKey::from(&defaulted));
    }

    #[test]
    fn cache_key_separates_column_loading_modes() {
        let with_cols = request("/a/b", 5, "mc", 0, true);
        let without_cols = request("/a/b", 5, "mc", 0, false);
        assert_ne!(CacheKey::from(&with_cols), CacheKey::from(&without_cols));
        assert_eq!(CacheKey::from(&with_cols).to_string(), "/a/b:5:mc:0:cols");
    }

    #[test]
    fn time_constraint_drops_non_positive_times() {
        assert_eq!(request("/a", 0, "default", 0, true).time_constraint(), None);
        assert_eq!(request("/a", 0, "default", -7, true).time_constraint(), None);
        assert_eq!(request("/a", 0, "default", 42, true).time_constraint(), Some(42));
    }

    #[test]
    fn flat_values_are_row_major() {
        let table = TypeTable {
            full_path: "/a".into(),
            columns: vec![Column::new("x", "string"), Column::new("y", "string")],
        };
        let assignment = Assignment::new(
            table,
            vec![vec!["1".into(), "2".into()], vec!["3".into(), "4".into()]],
            request("/a", 0, "default", 0, false),
        );
        assert_eq!(assignment.flat_values(), vec!["1", "2", "3", "4"]);
        assert_eq!(assignment.row_count(), 2);
        assert_eq!(assignment.column_count(), 2);
    }

    #[test]
    fn column_count_falls_back_to_first_row() {
        let assignment = Assignment::new(
            TypeTable::default(),
            vec![vec!["1".into(), "2".into(), "3".into()]],
            request("/a", 0, "default", 0, false),
        );
        assert_eq!(assignment.column_count(), 3);
    }
}
