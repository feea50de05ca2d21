//! Typed fan-out over raw assignment tables.
//!
//! Backends hand back generic string tables; callers want one of five
//! shaped results (full table, table of row maps, single row, single row
//! map, scalar), each in string, int, or double flavor. Rather than one
//! function per shape and type, conversion is a single [`CalibValue`]
//! trait and every accessor is generic over the target cell type.
//!
//! Single-row shapes carry an inference step: 1-D data may be stored
//! column-wise (one row, many columns) or row-wise (one column, many
//! rows). Both are supported; a table with more than one row and more
//! than one column is genuinely 2-D and requesting a 1-D shape from it
//! is a contract violation.

use caldb_types::{Assignment, CaldbError};
use indexmap::IndexMap;

/// A cell type the string table can be converted into.
///
/// Parsing is strict: a numeric target rejects any cell that is not a
/// complete numeric token, instead of silently producing zero.
pub trait CalibValue: Sized {
    /// Human-readable target name used in conversion errors.
    const TARGET: &'static str;

    fn parse_cell(column: &str, raw: &str) -> Result<Self, CaldbError>;
}

impl CalibValue for String {
    const TARGET: &'static str = "string";

    fn parse_cell(_column: &str, raw: &str) -> Result<Self, CaldbError> {
        Ok(raw.to_string())
    }
}

impl CalibValue for i64 {
    const TARGET: &'static str = "int";

    fn parse_cell(column: &str, raw: &str) -> Result<Self, CaldbError> {
        raw.trim().parse().map_err(|_| conversion::<Self>(column, raw))
    }
}

impl CalibValue for f64 {
    const TARGET: &'static str = "double";

    fn parse_cell(column: &str, raw: &str) -> Result<Self, CaldbError> {
        raw.trim().parse().map_err(|_| conversion::<Self>(column, raw))
    }
}

fn conversion<T: CalibValue>(column: &str, raw: &str) -> CaldbError {
    CaldbError::Conversion {
        column: column.to_string(),
        value: raw.to_string(),
        target: T::TARGET,
    }
}

/// Full table as rows of column-name -> value maps, column order kept.
pub fn mapped_rows<T: CalibValue>(
    assignment: &Assignment,
) -> Result<Vec<IndexMap<String, T>>, CaldbError> {
    ensure_rows(assignment)?;
    let names = named_columns(assignment)?;
    assignment
        .rows()
        .iter()
        .map(|row| {
            names
                .iter()
                .zip(row.iter())
                .map(|(name, cell)| Ok((name.to_string(), T::parse_cell(name, cell)?)))
                .collect()
        })
        .collect()
}

/// Full table as rows of plain value vectors.
pub fn row_vectors<T: CalibValue>(assignment: &Assignment) -> Result<Vec<Vec<T>>, CaldbError> {
    ensure_rows(assignment)?;
    assignment
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(index, cell)| T::parse_cell(&index.to_string(), cell))
                .collect()
        })
        .collect()
}

/// 1-D result as a column-name -> value map.
pub fn single_row_map<T: CalibValue>(
    assignment: &Assignment,
) -> Result<IndexMap<String, T>, CaldbError> {
    single_row_cells(assignment)?
        .into_iter()
        .map(|(name, cell)| Ok((name.clone(), T::parse_cell(&name, &cell)?)))
        .collect()
}

/// 1-D result as a plain value vector.
pub fn single_row<T: CalibValue>(assignment: &Assignment) -> Result<Vec<T>, CaldbError> {
    single_row_cells(assignment)?
        .into_iter()
        .map(|(name, cell)| T::parse_cell(&name, &cell))
        .collect()
}

/// A single constant: element zero of the flattened 1-D result.
///
/// When the underlying data holds more than one value this takes the
/// first one in flattened order; it does not error.
pub fn scalar<T: CalibValue>(assignment: &Assignment) -> Result<T, CaldbError> {
    let mut cells = single_row_cells(assignment)?;
    if cells.is_empty() {
        return Err(CaldbError::contract(
            "dataset has no values; a scalar was requested",
        ));
    }
    let (name, cell) = cells.remove(0);
    T::parse_cell(&name, &cell)
}

/// Shared row/column inference for the single-row shapes.
///
/// Exactly one row is read column-wise, pairing cells with their real
/// column names. One column over many rows is read row-wise, with
/// synthesized `v0000, v0001, ...` names in row order. The 4-digit
/// padding repeats its width past index 9999, a known naming-collision
/// risk inherited from the data model.
fn single_row_cells(assignment: &Assignment) -> Result<Vec<(String, String)>, CaldbError> {
    ensure_rows(assignment)?;
    let rows = assignment.rows();
    let column_count = rows[0].len();

    if rows.len() > 1 && column_count > 1 {
        return Err(CaldbError::contract(format!(
            "dataset is a {}x{} table; a 1-D shape was requested",
            rows.len(),
            column_count
        )));
    }

    if rows.len() > 1 {
        // Row-wise storage: one column, many rows.
        return rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let cell = row.first().ok_or_else(|| {
                    CaldbError::contract(format!("row {index} of a row-wise dataset is empty"))
                })?;
                Ok((format!("v{index:04}"), cell.clone()))
            })
            .collect();
    }

    // Column-wise storage: a single row paired with real column names.
    let names = named_columns(assignment)?;
    Ok(names
        .iter()
        .zip(rows[0].iter())
        .map(|(name, cell)| (name.to_string(), cell.clone()))
        .collect())
}

fn ensure_rows(assignment: &Assignment) -> Result<(), CaldbError> {
    if assignment.row_count() == 0 {
        return Err(CaldbError::contract(format!(
            "dataset '{}' has zero rows; found datasets are never empty",
            assignment.type_table().full_path
        )));
    }
    Ok(())
}

fn named_columns(assignment: &Assignment) -> Result<Vec<&str>, CaldbError> {
    let names = assignment.column_names();
    if names.is_empty() {
        return Err(CaldbError::contract(format!(
            "dataset '{}' was fetched without column metadata",
            assignment.type_table().full_path
        )));
    }
    let width = assignment.rows().first().map(Vec::len).unwrap_or(0);
    if names.len() != width {
        return Err(CaldbError::contract(format!(
            "dataset '{}' declares {} columns but rows have {} cells",
            assignment.type_table().full_path,
            names.len(),
            width
        )));
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use caldb_types::{Column, ResolvedRequest, TypeTable};

    fn assignment(columns: &[&str], rows: &[&[&str]]) -> Assignment {
        let table = TypeTable {
            full_path: "/test/table".into(),
            columns: columns.iter().map(|c| Column::new(*c, "string")).collect(),
        };
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect();
        let request = ResolvedRequest {
            path: "/test/table".into(),
            run: 0,
            variation: "default".into(),
            time: 0,
            load_columns: !columns.is_empty(),
        };
        Assignment::new(table, rows, request)
    }

    #[test]
    fn column_wise_single_row_pairs_real_names() {
        let a = assignment(&["A", "B"], &[&["1", "2"]]);
        let map = single_row_map::<i64>(&a).unwrap();
        assert_eq!(map.get("A"), Some(&1));
        assert_eq!(map.get("B"), Some(&2));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn row_wise_single_column_synthesizes_names() {
        let a = assignment(&["value"], &[&["x"], &["y"], &["z"]]);
        let map = single_row_map::<String>(&a).unwrap();
        let pairs: Vec<(&str, &str)> = map.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(pairs, vec![("v0000", "x"), ("v0001", "y"), ("v0002", "z")]);
    }

    #[test]
    fn two_dimensional_table_rejects_single_row_shapes() {
        let a = assignment(&["A", "B"], &[&["1", "2"], &["3", "4"]]);
        assert!(matches!(
            single_row_map::<String>(&a),
            Err(CaldbError::ContractViolation { .. })
        ));
        assert!(matches!(
            single_row::<String>(&a),
            Err(CaldbError::ContractViolation { .. })
        ));
        assert!(matches!(
            scalar::<String>(&a),
            Err(CaldbError::ContractViolation { .. })
        ));
    }

    #[test]
    fn zero_rows_is_a_contract_violation_everywhere() {
        let a = assignment(&["A"], &[]);
        assert!(matches!(mapped_rows::<String>(&a), Err(CaldbError::ContractViolation { .. })));
        assert!(matches!(row_vectors::<String>(&a), Err(CaldbError::ContractViolation { .. })));
        assert!(matches!(single_row::<String>(&a), Err(CaldbError::ContractViolation { .. })));
        assert!(matches!(scalar::<String>(&a), Err(CaldbError::ContractViolation { .. })));
    }

    #[test]
    fn strict_numeric_parsing_propagates_conversion_errors() {
        let a = assignment(&["A", "B"], &[&["1", "oops"]]);
        let error = single_row_map::<i64>(&a).unwrap_err();
        match error {
            CaldbError::Conversion { column, value, target } => {
                assert_eq!(column, "B");
                assert_eq!(value, "oops");
                assert_eq!(target, "int");
            }
            other => panic!("expected conversion error, got {other:?}"),
        }
    }

    #[test]
    fn doubles_parse_strictly_but_accept_scientific_notation() {
        let a = assignment(&["A"], &[&["1.5e3"]]);
        assert_eq!(single_row::<f64>(&a).unwrap(), vec![1500.0]);

        let bad = assignment(&["A"], &[&["1.5 apples"]]);
        assert!(matches!(single_row::<f64>(&bad), Err(CaldbError::Conversion { .. })));
    }

    #[test]
    fn full_table_shapes_convert_every_cell() {
        let a = assignment(&["A", "B"], &[&["1", "2"], &["3", "4"]]);
        let rows = row_vectors::<i64>(&a).unwrap();
        assert_eq!(rows, vec![vec![1, 2], vec![3, 4]]);

        let maps = mapped_rows::<f64>(&a).unwrap();
        assert_eq!(maps.len(), 2);
        assert_eq!(maps[1].get("A"), Some(&3.0));
    }

    #[test]
    fn scalar_takes_element_zero() {
        let a = assignment(&["A", "B", "C"], &[&["7", "8", "9"]]);
        assert_eq!(scalar::<i64>(&a).unwrap(), 7);

        let row_wise = assignment(&["value"], &[&["first"], &["second"]]);
        assert_eq!(scalar::<String>(&row_wise).unwrap(), "first");
    }

    #[test]
    fn mapped_rows_without_column_metadata_is_an_error() {
        let a = assignment(&[], &[&["1", "2"]]);
        assert!(matches!(
            mapped_rows::<String>(&a),
            Err(CaldbError::ContractViolation { .. })
        ));
    }

    #[test]
    fn single_cell_table_works_for_every_single_row_shape() {
        let a = assignment(&["only"], &[&["42"]]);
        assert_eq!(scalar::<i64>(&a).unwrap(), 42);
        assert_eq!(single_row::<i64>(&a).unwrap(), vec![42]);
        assert_eq!(single_row_map::<i64>(&a).unwrap().get("only"), Some(&42));
    }
}
