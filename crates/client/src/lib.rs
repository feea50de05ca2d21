//! Client-side resolver for named, versioned calibration constants.
//!
//! Callers hand the client a compact request namepath
//! (`/path/to/data[:run][:variation][:time]`); the client parses it,
//! substitutes defaults, guards the backend connection, consults a
//! per-client cache, and finally asks a pluggable [`Provider`] for the
//! raw string table. The typed fan-out in [`shape`] turns that table into
//! the shape a caller asked for: full table, table of row maps, single
//! row, single row map, or scalar, each as string, int, or double.
//!
//! ```no_run
//! use caldb_client::{CalibClient, provider::FileProvider};
//!
//! let client = CalibClient::new(Box::new(FileProvider::new()));
//! client.connect("/var/lib/caldb")?;
//! let gains: Vec<f64> = client.get_row("/fcal/gains:1200")?.unwrap();
//! # Ok::<(), caldb_types::CaldbError>(())
//! ```

mod cache;
mod client;
mod connection;
pub mod provider;
pub mod shape;

pub use cache::AssignmentCache;
pub use client::CalibClient;
pub use connection::ConnectionGuard;
pub use provider::Provider;
pub use shape::CalibValue;
