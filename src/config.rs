//! Run configuration for a [`Suite`](crate::Suite).
//!
//! Defaults come from the environment so a test binary can be made chatty
//! without code changes:
//!
//! - `TF_VERBOSE`: `1`, `true`, `yes` or `on` prints a line per sub-test.
//! - `TF_COLOR`: `always`, `never` or `auto` (colour only when stderr is a TTY).

use serde::Serialize;
use termcolor::ColorChoice;

pub const VERBOSE_VAR: &str = "TF_VERBOSE";
pub const COLOR_VAR: &str = "TF_COLOR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SuiteConfig {
    /// Print `=== RUN` / `--- PASS` / `--- FAIL` lines as sub-tests run.
    pub verbose: bool,
    pub use_colors: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            use_colors: atty::is(atty::Stream::Stderr),
        }
    }
}

impl SuiteConfig {
    /// Reads `TF_VERBOSE` and `TF_COLOR`, falling back to the defaults for
    /// unset or unrecognised values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let verbose = std::env::var(VERBOSE_VAR)
            .ok()
            .and_then(|v| parse_flag(&v))
            .unwrap_or(defaults.verbose);
        let use_colors = std::env::var(COLOR_VAR)
            .ok()
            .and_then(|v| parse_color(&v))
            .unwrap_or(defaults.use_colors);
        Self {
            verbose,
            use_colors,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub(crate) fn color_choice(&self) -> ColorChoice {
        if self.use_colors {
            ColorChoice::Always
        } else {
            ColorChoice::Never
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn parse_color(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "always" => Some(true),
        "never" => Some(false),
        "auto" => Some(atty::is(atty::Stream::Stderr)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag(" Yes "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn colour_modes() {
        assert_eq!(parse_color("ALWAYS"), Some(true));
        assert_eq!(parse_color("never"), Some(false));
        assert_eq!(parse_color("sometimes"), None);
    }

    #[test]
    fn builders_override_fields() {
        let config = SuiteConfig::default().verbose(true).colors(false);
        assert!(config.verbose);
        assert_eq!(config.color_choice(), ColorChoice::Never);
        assert_eq!(config.colors(true).color_choice(), ColorChoice::Always);
    }
}
