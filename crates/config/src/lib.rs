//! Shared configuration for Pane
//!
//! This crate provides the single source of truth for window defaults,
//! size hints and the environment switches read by the engine and the
//! test harness.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default window width in pixels
pub const DEFAULT_WIDTH: u32 = 480;

/// Default window height in pixels
pub const DEFAULT_HEIGHT: u32 = 320;

/// Default window title
pub const DEFAULT_TITLE: &str = "pane";

/// Environment variable selecting the renderer backend
pub const BACKEND_ENV: &str = "PANE_BACKEND";

/// Environment variable overriding the per-test watchdog budget
pub const TIMEOUT_ENV: &str = "PANE_TEST_TIMEOUT_MS";

/// Wall-clock budget for a single harness test
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// How the window reacts to a requested size.
///
/// The numeric values are part of the C ABI (`WEBVIEW_HINT_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeHint {
    /// Width and height are the current size
    #[default]
    None,
    /// Width and height are the minimum bounds
    Min,
    /// Width and height are the maximum bounds
    Max,
    /// Window size can not be changed by the user
    Fixed,
}

impl SizeHint {
    /// Convert from the raw C value, `None` for anything out of range
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Min),
            2 => Some(Self::Max),
            3 => Some(Self::Fixed),
            _ => None,
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Min => 1,
            Self::Max => 2,
            Self::Fixed => 3,
        }
    }
}

/// Initial window settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Window width in logical pixels
    pub width: u32,
    /// Window height in logical pixels
    pub height: u32,
    /// Sizing behaviour applied with the dimensions
    pub hint: SizeHint,
    /// Enable the renderer's developer tools
    pub debug: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            hint: SizeHint::None,
            debug: false,
        }
    }
}

impl WindowConfig {
    /// Create a window config with the given dimensions
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Renderer backend used by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Platform window with the system web renderer
    #[default]
    Native,
    /// No window; scripted pages for tests and CI machines without a display
    Headless,
}

impl BackendKind {
    /// Parse from environment variable PANE_BACKEND
    pub fn from_env() -> Self {
        Self::parse(std::env::var(BACKEND_ENV).ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("headless") => Self::Headless,
            _ => Self::Native,
        }
    }
}

/// Watchdog budget, from PANE_TEST_TIMEOUT_MS when set and valid
pub fn timeout_from_env() -> Duration {
    parse_timeout(std::env::var(TIMEOUT_ENV).ok().as_deref())
}

fn parse_timeout(value: Option<&str>) -> Duration {
    value
        .and_then(|ms| ms.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_TIMEOUT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WindowConfig::default();
        assert_eq!(config.width, DEFAULT_WIDTH);
        assert_eq!(config.height, DEFAULT_HEIGHT);
        assert_eq!(config.title, DEFAULT_TITLE);
        assert_eq!(config.hint, SizeHint::None);
        assert!(!config.debug);
    }

    #[test]
    fn test_size_hint_raw_values() {
        for hint in [SizeHint::None, SizeHint::Min, SizeHint::Max, SizeHint::Fixed] {
            assert_eq!(SizeHint::from_raw(hint.as_raw()), Some(hint));
        }
        assert_eq!(SizeHint::from_raw(4), None);
        assert_eq!(SizeHint::from_raw(-1), None);
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!(BackendKind::parse(None), BackendKind::Native);
        assert_eq!(BackendKind::parse(Some("headless")), BackendKind::Headless);
        assert_eq!(BackendKind::parse(Some("native")), BackendKind::Native);
        assert_eq!(BackendKind::parse(Some("bogus")), BackendKind::Native);
    }

    #[test]
    fn test_timeout_parse() {
        assert_eq!(parse_timeout(None), DEFAULT_TIMEOUT);
        assert_eq!(parse_timeout(Some("250")), Duration::from_millis(250));
        assert_eq!(parse_timeout(Some("0")), DEFAULT_TIMEOUT);
        assert_eq!(parse_timeout(Some("soon")), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: WindowConfig = serde_json::from_str(r#"{"title":"Test","hint":"fixed"}"#)
            .expect("config should parse");
        assert_eq!(config.title, "Test");
        assert_eq!(config.hint, SizeHint::Fixed);
        assert_eq!(config.width, DEFAULT_WIDTH);
    }
}
