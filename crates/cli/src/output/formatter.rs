//! Output formatter for human-readable and JSON output
//!
//! Regular output goes to stdout; errors, warnings and retry diagnostics go
//! to stderr so that JSON on stdout stays machine-readable.

use console::Style;
use serde::Serialize;

use super::OutputConfig;

/// Color theme for styled output
#[derive(Debug, Clone)]
pub struct Theme {
    /// Backend names - bold
    pub name: Style,
    /// Progress bars - cyan
    pub bar: Style,
    /// Success messages - green
    pub success: Style,
    /// Error messages - red
    pub error: Style,
    /// Warning messages - yellow
    pub warning: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            name: Style::new().bold(),
            bar: Style::new().cyan(),
            success: Style::new().green(),
            error: Style::new().red(),
            warning: Style::new().yellow(),
        }
    }
}

impl Theme {
    /// Returns a theme with no styling (for no-color mode)
    pub fn plain() -> Self {
        Self {
            name: Style::new(),
            bar: Style::new(),
            success: Style::new(),
            error: Style::new(),
            warning: Style::new(),
        }
    }
}

/// Formatter for CLI output
///
/// When JSON mode is enabled, stdout carries only JSON documents.
#[derive(Debug, Clone)]
pub struct Formatter {
    config: OutputConfig,
    theme: Theme,
}

impl Formatter {
    pub fn new(config: OutputConfig) -> Self {
        let theme = if config.no_color || config.json {
            Theme::plain()
        } else {
            Theme::default()
        };
        Self { config, theme }
    }

    pub fn is_json(&self) -> bool {
        self.config.json
    }

    pub fn colors_enabled(&self) -> bool {
        !self.config.no_color && !self.config.json
    }

    /// Spinners and other transient output are only drawn for humans
    pub fn show_progress(&self) -> bool {
        !self.config.quiet && !self.config.json
    }

    // ========== Style helper methods ==========

    pub fn style_name(&self, text: &str) -> String {
        self.theme.name.apply_to(text).to_string()
    }

    pub fn style_bar(&self, text: &str) -> String {
        self.theme.bar.apply_to(text).to_string()
    }

    // ========== Output methods ==========

    /// Output a success message
    pub fn success(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }

        let checkmark = self.theme.success.apply_to("✓");
        println!("{checkmark} {message}");
    }

    /// Output an error message
    ///
    /// Errors are always printed, even in quiet mode.
    pub fn error(&self, message: &str) {
        if self.config.json {
            let error = serde_json::json!({ "error": message });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&error).unwrap_or_else(|_| message.to_string())
            );
        } else {
            let cross = self.theme.error.apply_to("✗");
            eprintln!("{cross} {message}");
        }
    }

    /// Output error detail lines (chains, response bodies)
    ///
    /// Printed even in quiet and JSON mode; the caller decides whether
    /// detail is wanted at all.
    pub fn detail(&self, message: &str) {
        eprintln!("{message}");
    }

    /// Output a warning message
    pub fn warning(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }

        let warn_icon = self.theme.warning.apply_to("⚠");
        eprintln!("{warn_icon} {message}");
    }

    /// Output JSON directly
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error serializing output: {e}"),
        }
    }

    /// Print a line of text (respects quiet and JSON mode)
    pub fn println(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }
        println!("{message}");
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(OutputConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatter_default() {
        let formatter = Formatter::default();
        assert!(!formatter.is_json());
        assert!(formatter.colors_enabled());
        assert!(formatter.show_progress());
    }

    #[test]
    fn test_formatter_json_mode() {
        let formatter = Formatter::new(OutputConfig {
            json: true,
            ..Default::default()
        });
        assert!(formatter.is_json());
        assert!(!formatter.colors_enabled());
        assert!(!formatter.show_progress());
    }

    #[test]
    fn test_plain_theme_leaves_text_untouched() {
        let formatter = Formatter::new(OutputConfig {
            no_color: true,
            ..Default::default()
        });
        assert!(!formatter.colors_enabled());
        assert_eq!(formatter.style_name("photos"), "photos");
        assert_eq!(formatter.style_bar("[==  ]"), "[==  ]");
    }
}
