//! Networked backend for a REST constants service.
//!
//! The connection string is the service base URL. Lookups hit
//! `GET {base}/api/assignment` with the resolved request as query
//! parameters; the service answers `{ "columns": [...], "rows": [[...]] }`,
//! or 404 when no dataset matches. Table listing hits
//! `GET {base}/api/tables?pattern=...`.
//!
//! The client API is blocking, so the provider drives reqwest on its own
//! tokio runtime.

use caldb_types::{Assignment, CaldbError, Column, ResolvedRequest, TypeTable};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::Provider;

/// Wire format of an assignment response.
#[derive(Debug, Deserialize)]
struct AssignmentPayload {
    #[serde(default)]
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

/// Backend talking to a remote constants service over HTTP.
#[derive(Debug, Default)]
pub struct HttpProvider {
    base: Option<Url>,
    connection_string: String,
    runtime: Option<tokio::runtime::Runtime>,
    http: reqwest::Client,
}

impl HttpProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn base(&self) -> Result<&Url, CaldbError> {
        self.base
            .as_ref()
            .ok_or_else(|| CaldbError::provider("http provider is not connected"))
    }

    fn endpoint(&self, segment: &str) -> Result<Url, CaldbError> {
        let mut url = self.base()?.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| CaldbError::provider("connection string URL cannot have segments"))?;
            path.pop_if_empty();
            path.push("api");
            path.push(segment);
        }
        Ok(url)
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<Option<T>, CaldbError> {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| CaldbError::provider("http provider is not connected"))?;
        let client = self.http.clone();
        runtime.block_on(async move {
            let response = client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| CaldbError::provider(format!("network error for {url}: {e}")))?;
            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let text = response.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(CaldbError::provider(format!(
                    "HTTP {} from {url}: {text}",
                    status.as_u16()
                )));
            }
            serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| CaldbError::provider(format!("malformed response from {url}: {e}")))
        })
    }
}

impl Provider for HttpProvider {
    fn connect(&mut self, connection_string: &str) -> Result<(), CaldbError> {
        let base = Url::parse(connection_string)
            .map_err(|e| CaldbError::provider(format!("invalid base URL '{connection_string}': {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(CaldbError::provider(format!(
                "unsupported URL scheme '{}'",
                base.scheme()
            )));
        }
        if self.runtime.is_none() {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| CaldbError::provider(format!("runtime init failed: {e}")))?;
            self.runtime = Some(runtime);
        }
        debug!(base = %base, "http provider connected");
        self.base = Some(base);
        self.connection_string = connection_string.to_string();
        Ok(())
    }

    fn disconnect(&mut self) {
        self.base = None;
    }

    fn is_connected(&self) -> bool {
        self.base.is_some()
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
        let mut url = self.endpoint("assignment")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("path", path);
            query.append_pair("run", &run.to_string());
            query.append_pair("variation", variation);
            query.append_pair("columns", if load_columns { "true" } else { "false" });
            if let Some(limit) = time {
                query.append_pair("time", &limit.to_string());
            }
        }

        let Some(payload) = self.get_json::<AssignmentPayload>(url)? else {
            return Ok(None);
        };

        let rows = payload
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();
        let table = TypeTable {
            full_path: path.to_string(),
            columns: payload.columns,
        };
        let request = ResolvedRequest {
            path: path.to_string(),
            run,
            variation: variation.to_string(),
            time: time.unwrap_or(0),
            load_columns,
        };
        Ok(Some(Assignment::new(table, rows, request)))
    }

    fn search_type_tables(&mut self, pattern: &str) -> Result<Vec<TypeTable>, CaldbError> {
        let mut url = self.endpoint("tables")?;
        url.query_pairs_mut().append_pair("pattern", pattern);
        self.get_json::<Vec<TypeTable>>(url)?
            .ok_or_else(|| CaldbError::provider("table listing endpoint reported not found"))
    }
}

/// Cells arrive as JSON scalars; everything is carried as a string table.
fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_validates_scheme() {
        let mut provider = HttpProvider::new();
        assert!(provider.connect("ftp://example.com").is_err());
        assert!(provider.connect("not a url").is_err());
        assert!(provider.connect("http://localhost:8080/caldb").is_ok());
        assert!(provider.is_connected());
        assert_eq!(provider.connection_string(), "http://localhost:8080/caldb");
    }

    #[test]
    fn endpoint_joins_below_the_base_path() {
        let mut provider = HttpProvider::new();
        provider.connect("http://localhost:8080/caldb/").unwrap();
        let url = provider.endpoint("assignment").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/caldb/api/assignment");
    }

    #[test]
    fn cells_are_stringified() {
        assert_eq!(cell_to_string(Value::String("x".into())), "x");
        assert_eq!(cell_to_string(serde_json::json!(1.5)), "1.5");
        assert_eq!(cell_to_string(serde_json::json!(7)), "7");
    }
}
