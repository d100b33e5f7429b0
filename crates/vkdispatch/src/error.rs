//! Loader error types.

use ash::vk;
use thiserror::Error;

/// Errors raised while building the dispatch tiers.
///
/// Absent optional symbols are never reported here; they show up as `None`
/// slots in the tables.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// No candidate library could be mapped.
    ///
    /// `failures` lists every candidate with its own error; `source` is the
    /// error from the last one tried.
    #[error("Failed to load Vulkan library ({failures})")]
    Load {
        failures: String,
        #[source]
        source: libloading::Error,
    },

    /// A mandatory bootstrap symbol is absent from the library.
    #[error("Required symbol missing from Vulkan library: {0}")]
    SymbolMissing(String),

    /// A tier was built from a lower tier that lacks its hinge symbol.
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// An optional function needed by a helper was not resolved.
    #[error("Function not available: {0}")]
    FunctionUnavailable(String),

    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, LoaderError>;
