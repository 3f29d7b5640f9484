//! Utility modules.

/// Log truncation for upstream response bodies.
pub mod log_sanitizer;
