//! Process-wide tracing setup shared by every keystone binary and test suite.

/// Initialize JSON logging for a service process.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize human-readable logging captured by the test harness.
pub fn init_for_tests() {
    tracing::init_for_tests();
}

/// Subscriber configuration (filters, formatters).
pub mod tracing;
