//! Output formatting
//!
//! Human-readable text or JSON, selected by global flags.

mod formatter;

pub use formatter::Formatter;

/// Output settings taken from the global command-line flags
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Emit JSON instead of text
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Suppress everything except errors
    pub quiet: bool,
}
