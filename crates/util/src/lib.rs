//! Parsing helpers for calibration request namepaths.
//!
//! A namepath is the compact request string callers hand to the client:
//!
//! ```text
//! /path/to/data[:run][:variation][:time]
//! ```
//!
//! Any of the three trailing segments may be omitted or left empty, in
//! which case the client substitutes its defaults at resolution time.
//! `/path/to/data::mc` selects the `mc` variation with the default run,
//! `/path/to/data:::2029` pins only the time.

mod time;

pub use time::parse_time_token;

use caldb_types::{CaldbError, RequestFields};

/// Parses a namepath into its four addressable dimensions.
///
/// Empty optional segments come back as `None`; defaults are not applied
/// here. Fails only on structurally malformed input: an empty path, more
/// than three trailing segments, a non-numeric run, or an unparseable
/// time token.
pub fn parse_request(namepath: &str) -> Result<RequestFields, CaldbError> {
    let trimmed = namepath.trim();
    let segments: Vec<&str> = trimmed.split(':').collect();
    if segments.len() > 4 {
        return Err(CaldbError::parse(format!(
            "namepath '{trimmed}' has more than three qualifier segments"
        )));
    }

    let path = segments[0];
    if path.is_empty() {
        return Err(CaldbError::parse("namepath has an empty data path"));
    }

    let run = match segments.get(1).copied().filter(|s| !s.is_empty()) {
        Some(raw) => Some(parse_run(raw)?),
        None => None,
    };
    let variation = segments
        .get(2)
        .copied()
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let time = match segments.get(3).copied().filter(|s| !s.is_empty()) {
        Some(raw) => Some(parse_time_token(raw)?),
        None => None,
    };

    Ok(RequestFields {
        path: path.to_string(),
        run,
        variation,
        time,
    })
}

fn parse_run(raw: &str) -> Result<i64, CaldbError> {
    let run: i64 = raw
        .parse()
        .map_err(|_| CaldbError::parse(format!("run segment '{raw}' is not an integer")))?;
    if run < 0 {
        return Err(CaldbError::parse(format!("run segment '{raw}' is negative")));
    }
    Ok(run)
}

/// Prefixes the path with `/` when it is not already absolute.
pub fn make_absolute(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Strips a single leading `/`; listing callers expect separator-free names.
pub fn strip_root(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_path() {
        let fields = parse_request("/path/to/data").unwrap();
        assert_eq!(fields.path, "/path/to/data");
        assert_eq!(fields.run, None);
        assert_eq!(fields.variation, None);
        assert_eq!(fields.time, None);
    }

    #[test]
    fn parses_full_namepath() {
        let fields = parse_request("/path/to/data:100:mc:1700000000").unwrap();
        assert_eq!(fields.run, Some(100));
        assert_eq!(fields.variation.as_deref(), Some("mc"));
        assert_eq!(fields.time, Some(1_700_000_000));
    }

    #[test]
    fn empty_segments_mean_not_present() {
        let fields = parse_request("/path/to/data::mc").unwrap();
        assert_eq!(fields.run, None);
        assert_eq!(fields.variation.as_deref(), Some("mc"));
        assert_eq!(fields.time, None);

        let fields = parse_request("/path/to/data:::1700000000").unwrap();
        assert_eq!(fields.run, None);
        assert_eq!(fields.variation, None);
        assert_eq!(fields.time, Some(1_700_000_000));
    }

    #[test]
    fn rejects_malformed_namepaths() {
        assert!(parse_request(":5:mc").is_err());
        assert!(parse_request("/p:abc").is_err());
        assert!(parse_request("/p:-3").is_err());
        assert!(parse_request("/p:1:mc:2029:extra").is_err());
        assert!(parse_request("/p:::not-a-time").is_err());
    }

    #[test]
    fn trims_surrounding_whitespace_only() {
        let fields = parse_request("  /path/to/data:7  ").unwrap();
        assert_eq!(fields.path, "/path/to/data");
        assert_eq!(fields.run, Some(7));
    }

    #[test]
    fn path_helpers() {
        assert_eq!(make_absolute("a/b"), "/a/b");
        assert_eq!(make_absolute("/a/b"), "/a/b");
        assert_eq!(strip_root("/a/b"), "a/b");
        assert_eq!(strip_root("a/b"), "a/b");
    }
}
