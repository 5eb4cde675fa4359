//! Error types for hardware access.

use thiserror::Error;

/// Errors surfaced by hardware reads and writes.
///
/// These are degraded-but-non-fatal conditions: callers are expected to reuse
/// the last good value, raise an observable error flag, and keep running.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// The device did not respond on the bus.
    #[error("device `{0}` is disconnected")]
    Disconnected(&'static str),
    /// The device responded but its signal has not refreshed recently.
    #[error("signal from device `{0}` is stale")]
    StaleSignal(&'static str),
}
