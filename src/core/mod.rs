/// Core Module for gpkgio
///
/// Shared infrastructure for the accessor layer: the crate-wide error
/// type and `Result` alias live here.
pub mod error;

// Re-export commonly used types for convenience
pub use error::{GpkgError, Result};
