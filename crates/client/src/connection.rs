//! Connection lifecycle guard.

use caldb_types::CaldbError;
use tracing::debug;

use crate::provider::Provider;

/// Tracks connection state for the owned provider and enforces the
/// reconnect policy before any backend access.
///
/// State machine: `Disconnected -> Connected` via `connect`;
/// `reconnect` is a no-op success when already connected and otherwise
/// re-dials the stored connection string; `disconnect` returns to
/// `Disconnected` but keeps the string for a later reconnect.
#[derive(Debug)]
pub struct ConnectionGuard {
    provider: Box<dyn Provider>,
    auto_reconnect: bool,
}

impl ConnectionGuard {
    pub fn new(provider: Box<dyn Provider>) -> Self {
        Self {
            provider,
            auto_reconnect: true,
        }
    }

    pub fn connect(&mut self, connection_string: &str) -> Result<(), CaldbError> {
        self.provider.connect(connection_string)?;
        debug!(connection_string, "connected");
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.provider.disconnect();
        debug!("disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.provider.is_connected()
    }

    /// The provider's configured connection string, empty when no connect
    /// call ever succeeded.
    pub fn connection_string(&self) -> String {
        self.provider.connection_string()
    }

    pub fn set_auto_reconnect(&mut self, enabled: bool) {
        self.auto_reconnect = enabled;
    }

    pub fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    /// Re-establishes the connection using the stored connection string.
    ///
    /// Succeeds immediately when already connected. An empty stored
    /// string means no connect ever happened; that is a configuration
    /// error, not something to retry.
    pub fn reconnect(&mut self) -> Result<(), CaldbError> {
        if self.is_connected() {
            return Ok(());
        }
        let connection_string = self.connection_string();
        if connection_string.is_empty() {
            return Err(CaldbError::configuration(
                "cannot reconnect: no connection string stored; call connect first",
            ));
        }
        debug!(connection_string, "reconnecting");
        self.connect(&connection_string)
    }

    /// Pre-access check: reconnect when allowed, fail fast otherwise.
    pub fn check(&mut self) -> Result<(), CaldbError> {
        if self.is_connected() {
            return Ok(());
        }
        if !self.auto_reconnect {
            return Err(CaldbError::configuration(
                "not connected to the data source and auto-reconnect is disabled",
            ));
        }
        self.reconnect()
    }

    pub fn provider_mut(&mut self) -> &mut dyn Provider {
        self.provider.as_mut()
    }
}
