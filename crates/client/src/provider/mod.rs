//! Data provider contract and shipped backends.
//!
//! A [`Provider`] executes the actual fetch for a fully resolved request.
//! The client owns exactly one boxed provider behind its connection guard;
//! implementations do not need their own locking. Two backends ship with
//! the crate: [`FileProvider`] for a local directory of JSON tables and
//! [`HttpProvider`] for a networked constants service.

mod file;
mod http;

pub use file::FileProvider;
pub use http::HttpProvider;

use caldb_types::{Assignment, CaldbError, TypeTable};
use std::fmt;

/// Backend contract for fetching calibration constants.
///
/// `get_assignment` reports a missing dataset as `Ok(None)`; every other
/// failure is an error. `time` carries the request's time constraint when
/// one applies — `None` is the time-less lookup, preserving the
/// distinction from an explicit `time = 0`.
pub trait Provider: Send + fmt::Debug {
    /// Establishes the connection and stores the connection string.
    fn connect(&mut self, connection_string: &str) -> Result<(), CaldbError>;

    /// Drops the connection. The stored connection string survives so the
    /// guard can reconnect later.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// The configured connection string, empty when never connected.
    fn connection_string(&self) -> String;

    /// Fetches the assignment for `(run, path, variation, time)`.
    ///
    /// `load_columns` controls whether column metadata is loaded with the
    /// data; shapes that pair cells with column names need it.
    fn get_assignment(
        &mut self,
        run: i64,
        path: &str,
        variation: &str,
        time: Option<i64>,
        load_columns: bool,
    ) -> Result<Option<Assignment>, CaldbError>;

    /// Lists constants type tables whose full path matches a glob pattern
    /// (`*` and `?` wildcards).
    fn search_type_tables(&mut self, pattern: &str) -> Result<Vec<TypeTable>, CaldbError>;
}

/// Compiles a `*`/`?` glob into a full-match regex.
pub(crate) fn glob_to_regex(pattern: &str) -> Result<regex::Regex, CaldbError> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    regex::Regex::new(&expr)
        .map_err(|e| CaldbError::provider(format!("invalid search pattern '{pattern}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matches_wildcards() {
        let re = glob_to_regex("/fcal/*").unwrap();
        assert!(re.is_match("/fcal/gains"));
        assert!(re.is_match("/fcal/pedestals/run1"));
        assert!(!re.is_match("/bcal/gains"));
    }

    #[test]
    fn glob_escapes_regex_metacharacters() {
        let re = glob_to_regex("/a+b/?").unwrap();
        assert!(re.is_match("/a+b/c"));
        assert!(!re.is_match("/ab/c"));
    }
}
