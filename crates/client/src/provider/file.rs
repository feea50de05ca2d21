//! Local file-system backend.
//!
//! Stores one JSON document per constants table below a root directory:
//! the table at `/fcal/gains` lives in `<root>/fcal/gains.json`. Each
//! document declares its columns once and per-variation lists of
//! assignments bounded by run ranges and stamped with a validity time:
//!
//! ```json
//! {
//!   "columns": [{ "name": "gain", "column_type": "double" }],
//!   "variations": {
//!     "default": [
//!       { "run_min": 0, "run_max": 999, "time": 1700000000, "rows": [["1.02"]] }
//!     ]
//!   }
//! }
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use caldb_types::{Assignment, CaldbError, Column, ResolvedRequest, TypeTable};
use serde::Deserialize;
use tracing::debug;

use super::{Provider, glob_to_regex};

/// Variation every lookup falls back to when the requested variation has
/// no matching assignment.
const DEFAULT_VARIATION: &str = "default";

/// On-disk table document.
#[derive(Debug, Deserialize)]
struct TableDocument {
    #[serde(default)]
    columns: Vec<Column>,
    variations: indexmap::IndexMap<String, Vec<AssignmentEntry>>,
}

/// One stored assignment: rows valid for a run range, stamped with the
/// time the constants became valid.
#[derive(Debug, Deserialize)]
struct AssignmentEntry {
    #[serde(default)]
    run_min: i64,
    /// Inclusive upper bound; open-ended when absent.
    run_max: Option<i64>,
    #[serde(default)]
    time: i64,
    rows: Vec<Vec<String>>,
}

impl AssignmentEntry {
    fn covers_run(&self, run: i64) -> bool {
        run >= self.run_min && self.run_max.is_none_or(|max| run <= max)
    }
}

/// Backend reading constants from a directory of JSON table documents.
///
/// The connection string is the root directory, with or without a
/// `file://` prefix.
#[derive(Debug, Default)]
pub struct FileProvider {
    root: Option<PathBuf>,
    connection_string: String,
}

impl FileProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn root(&self) -> Result<&Path, CaldbError> {
        self.root
            .as_deref()
            .ok_or_else(|| CaldbError::provider("file provider is not connected"))
    }

    fn table_file(&self, path: &str) -> Result<PathBuf, CaldbError> {
        let relative = path.trim_start_matches('/');
        Ok(self.root()?.join(format!("{relative}.json")))
    }

    fn load_document(&self, path: &str) -> Result<Option<TableDocument>, CaldbError> {
        let file = self.table_file(path)?;
        if !file.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&file)
            .map_err(|e| CaldbError::provider(format!("cannot read '{}': {e}", file.display())))?;
        let document = serde_json::from_str(&content)
            .map_err(|e| CaldbError::provider(format!("malformed table '{}': {e}", file.display())))?;
        Ok(Some(document))
    }

    /// Picks the matching assignment: run range must cover the run, the
    /// validity time must not exceed the constraint when one is present,
    /// and among the survivors the newest validity time wins.
    fn select_entry<'a>(
        entries: &'a [AssignmentEntry],
        run: i64,
        time: Option<i64>,
    ) -> Option<&'a AssignmentEntry> {
        entries
            .iter()
            .filter(|entry| entry.covers_run(run))
            .filter(|entry| time.is_none_or(|limit| entry.time <= limit))
            .max_by_key(|entry| entry.time)
    }
}

impl Provider for FileProvider {
    fn connect(&mut self, connection_string: &str) -> Result<(), CaldbError> {
        let raw = connection_string
            .strip_prefix("file://")
            .unwrap_or(connection_string);
        let root = PathBuf::from(raw);
        if !root.is_dir() {
            return Err(CaldbError::provider(format!(
                "'{}' is not a directory",
                root.display()
            )));
        }
        debug!(root = %root.display(), "file provider connected");
        self.root = Some(root);
        self.connection_string = connection_string.to_string();
        Ok(())
    }

    fn disconnect(&mut self) {
        self.root = None;
    }

    fn is_connected(&self) -> bool {
        self.root.is_some()
    }

    fn connection_string(&self) -> String {
        self.connection_string.clone()
    }

    fn get_assignment(
        &mut self,
        run: i64,
        path: &str,
        variation: &str,
        time: Option<i64>,
        load_columns: bool,
    ) -> Result<Option<Assignment>, CaldbError> {
        let Some(document) = self.load_document(path)? else {
            return Ok(None);
        };

        let mut selected = document
            .variations
            .get(variation)
            .and_then(|entries| Self::select_entry(entries, run, time));
        // Named variations without a matching assignment fall back to the
        // default variation chain.
        if selected.is_none() && variation != DEFAULT_VARIATION {
            selected = document
                .variations
                .get(DEFAULT_VARIATION)
                .and_then(|entries| Self::select_entry(entries, run, time));
        }
        let Some(entry) = selected else {
            return Ok(None);
        };

        let table = TypeTable {
            full_path: path.to_string(),
            columns: if load_columns { document.columns.clone() } else { Vec::new() },
        };
        let request = ResolvedRequest {
            path: path.to_string(),
            run,
            variation: variation.to_string(),
            time: time.unwrap_or(0),
            load_columns,
        };
        Ok(Some(Assignment::new(table, entry.rows.clone(), request)))
    }

    fn search_type_tables(&mut self, pattern: &str) -> Result<Vec<TypeTable>, CaldbError> {
        let matcher = glob_to_regex(pattern)?;
        let root = self.root()?.to_path_buf();
        let mut files = Vec::new();
        collect_json_files(&root, &mut files)?;

        let mut tables = Vec::new();
        for file in files {
            let relative = file
                .strip_prefix(&root)
                .map_err(|e| CaldbError::provider(e.to_string()))?;
            let full_path = format!(
                "/{}",
                relative.with_extension("").to_string_lossy().replace('\\', "/")
            );
            if !matcher.is_match(&full_path) {
                continue;
            }
            tables.push(TypeTable {
                full_path,
                columns: Vec::new(),
            });
        }
        tables.sort_by(|a, b| a.full_path.cmp(&b.full_path));
        Ok(tables)
    }
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), CaldbError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| CaldbError::provider(format!("cannot list '{}': {e}", dir.display())))?;
    for entry in entries {
        let entry = entry.map_err(|e| CaldbError::provider(e.to_string()))?;
        let path = entry.path();
        if path.is_dir() {
            collect_json_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    Ok(())
}
