//! The calibration client: request resolution and caching.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicI64, Ordering},
    },
    time::Instant,
};

use caldb_types::{Assignment, CacheKey, CaldbError, RequestFields, ResolvedRequest};
use caldb_util::{make_absolute, parse_request, strip_root};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use tracing::{debug, info, warn};

use crate::{
    cache::AssignmentCache,
    connection::ConnectionGuard,
    provider::Provider,
    shape::{self, CalibValue},
};

/// Monotonic clock origin shared by every client in the process.
static CLOCK_ORIGIN: Lazy<Instant> = Lazy::new(Instant::now);

fn monotonic_seconds() -> i64 {
    CLOCK_ORIGIN.elapsed().as_secs() as i64
}

/// Default request dimensions applied when a namepath leaves them unset.
#[derive(Clone, Debug)]
struct RequestDefaults {
    run: i64,
    variation: String,
    time: i64,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            run: 0,
            variation: "default".into(),
            time: 0,
        }
    }
}

/// Client-side resolver for calibration constants.
///
/// Owns a pluggable [`Provider`] behind a connection guard and a
/// per-client [`AssignmentCache`]. All methods take `&self` and are safe
/// to call from multiple threads; the cache mutex is held across the
/// whole cache-check-or-fetch sequence, so at most one provider fetch is
/// in flight per client. That serialization is deliberate: calibration
/// workloads are read-mostly and low-QPS, and it keeps the cache
/// consistent without a second synchronization layer.
#[derive(Debug)]
pub struct CalibClient {
    defaults: RequestDefaults,
    guard: Mutex<ConnectionGuard>,
    cache: Mutex<AssignmentCache>,
    last_activity: AtomicI64,
}

impl CalibClient {
    /// A client with the standard defaults: run 0, variation `default`,
    /// no time constraint.
    pub fn new(provider: Box<dyn Provider>) -> Self {
        Self::with_defaults(provider, 0, "default", 0)
    }

    /// A client with caller-chosen request defaults.
    pub fn with_defaults(
        provider: Box<dyn Provider>,
        default_run: i64,
        default_variation: impl Into<String>,
        default_time: i64,
    ) -> Self {
        Self {
            defaults: RequestDefaults {
                run: default_run,
                variation: default_variation.into(),
                time: default_time,
            },
            guard: Mutex::new(ConnectionGuard::new(provider)),
            cache: Mutex::new(AssignmentCache::new()),
            last_activity: AtomicI64::new(0),
        }
    }

    /// Connects the underlying provider.
    pub fn connect(&self, connection_string: &str) -> Result<(), CaldbError> {
        self.touch_activity();
        self.guard.lock().expect("connection lock").connect(connection_string)
    }

    pub fn disconnect(&self) {
        self.guard.lock().expect("connection lock").disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.guard.lock().expect("connection lock").is_connected()
    }

    /// The provider's configured connection string, empty when no connect
    /// call ever succeeded.
    pub fn connection_string(&self) -> String {
        self.guard.lock().expect("connection lock").connection_string()
    }

    /// Reconnects using the stored connection string; fails with a
    /// configuration error when none was ever stored.
    pub fn reconnect(&self) -> Result<(), CaldbError> {
        self.touch_activity();
        self.guard.lock().expect("connection lock").reconnect()
    }

    /// Toggles the automatic reconnect performed before each resolution.
    pub fn set_auto_reconnect(&self, enabled: bool) {
        self.guard.lock().expect("connection lock").set_auto_reconnect(enabled);
    }

    /// Toggles the assignment cache at runtime. While disabled every
    /// resolution reaches the provider.
    pub fn set_cache_enabled(&self, enabled: bool) {
        self.cache.lock().expect("cache lock").set_enabled(enabled);
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.cache.lock().expect("cache lock").is_enabled()
    }

    /// Seconds (monotonic, process-relative) of the last attempted access.
    pub fn last_activity_time(&self) -> i64 {
        self.last_activity.load(Ordering::Relaxed)
    }

    /// Resolves a namepath to an assignment handle.
    ///
    /// Returns `Ok(None)` when the backend knows no such dataset; every
    /// other failure is an error. Successful fetches are cached under the
    /// fully resolved request, so explicit and default-filled namepaths
    /// for the same dataset share one entry.
    pub fn resolve(
        &self,
        namepath: &str,
        load_columns: bool,
    ) -> Result<Option<Arc<Assignment>>, CaldbError> {
        self.touch_activity();

        let fields = parse_request(namepath)?;
        let resolved = self.fill_defaults(fields, load_columns);

        self.guard.lock().expect("connection lock").check()?;

        // One mutex across lookup and fetch: the price is serialized
        // provider calls, the payoff is that no thread can observe a torn
        // cache state or duplicate an in-flight fetch.
        let mut cache = self.cache.lock().expect("cache lock");
        let key = CacheKey::from(&resolved);
        if let Some(hit) = cache.get(&key) {
            debug!(cache_key = %key, "assignment cache hit");
            return Ok(Some(hit));
        }
        debug!(cache_key = %key, "assignment cache miss");

        let fetched = {
            let mut guard = self.guard.lock().expect("connection lock");
            guard.provider_mut().get_assignment(
                resolved.run,
                &resolved.path,
                &resolved.variation,
                resolved.time_constraint(),
                resolved.load_columns,
            )
        };
        let fetched = match fetched {
            Ok(value) => value,
            Err(error) => {
                warn!(cache_key = %key, "provider fetch failed: {error}");
                return Err(error);
            }
        };

        let Some(assignment) = fetched else {
            debug!(cache_key = %key, "dataset not found");
            return Ok(None);
        };
        if assignment.row_count() == 0 {
            return Err(CaldbError::contract(format!(
                "provider returned a zero-row dataset for '{}'",
                resolved.path
            )));
        }

        info!(
            cache_key = %key,
            rows = assignment.row_count(),
            columns = assignment.column_count(),
            "assignment fetched"
        );
        let handle = Arc::new(assignment);
        cache.put(key, Arc::clone(&handle));
        Ok(Some(handle))
    }

    /// Full table as rows of plain value vectors.
    pub fn get_table<T: CalibValue>(&self, namepath: &str) -> Result<Option<Vec<Vec<T>>>, CaldbError> {
        self.shaped(namepath, false, shape::row_vectors)
    }

    /// Full table as rows of column-name -> value maps.
    pub fn get_table_maps<T: CalibValue>(
        &self,
        namepath: &str,
    ) -> Result<Option<Vec<IndexMap<String, T>>>, CaldbError> {
        self.shaped(namepath, true, shape::mapped_rows)
    }

    /// 1-D result as a plain value vector (column-wise or row-wise data).
    pub fn get_row<T: CalibValue>(&self, namepath: &str) -> Result<Option<Vec<T>>, CaldbError> {
        self.shaped(namepath, true, shape::single_row)
    }

    /// 1-D result as a column-name -> value map.
    pub fn get_row_map<T: CalibValue>(
        &self,
        namepath: &str,
    ) -> Result<Option<IndexMap<String, T>>, CaldbError> {
        self.shaped(namepath, true, shape::single_row_map)
    }

    /// A single constant: element zero of the flattened 1-D result.
    pub fn get_value<T: CalibValue>(&self, namepath: &str) -> Result<Option<T>, CaldbError> {
        self.shaped(namepath, true, shape::scalar)
    }

    /// Every known dataset path, leading path separator stripped.
    pub fn list_namepaths(&self) -> Result<Vec<String>, CaldbError> {
        self.search_namepaths("*")
    }

    /// Dataset paths matching a `*`/`?` glob, leading separator stripped.
    pub fn search_namepaths(&self, pattern: &str) -> Result<Vec<String>, CaldbError> {
        self.touch_activity();
        let mut guard = self.guard.lock().expect("connection lock");
        guard.check()?;
        let tables = guard.provider_mut().search_type_tables(pattern)?;
        Ok(tables
            .into_iter()
            .map(|table| strip_root(&table.full_path).to_string())
            .collect())
    }

    fn shaped<T, F>(&self, namepath: &str, load_columns: bool, adapt: F) -> Result<Option<T>, CaldbError>
    where
        F: FnOnce(&Assignment) -> Result<T, CaldbError>,
    {
        match self.resolve(namepath, load_columns)? {
            None => Ok(None),
            Some(assignment) => adapt(&assignment).map(Some),
        }
    }

    fn fill_defaults(&self, fields: RequestFields, load_columns: bool) -> ResolvedRequest {
        ResolvedRequest {
            path: make_absolute(&fields.path),
            run: fields.run.unwrap_or(self.defaults.run),
            variation: fields
                .variation
                .unwrap_or_else(|| self.defaults.variation.clone()),
            time: fields.time.unwrap_or(self.defaults.time),
            load_columns,
        }
    }

    /// Stamps the attempted-access time. Called before the cache and
    /// backend steps so it records attempts, not just successes.
    fn touch_activity(&self) {
        self.last_activity.store(monotonic_seconds(), Ordering::Relaxed);
    }
}
