//! Process-wide capture configuration
//!
//! The configuration is read once, either from an explicit [`install`] call
//! made early in `main`, or lazily from the environment the first time an
//! error is constructed:
//!
//! - `ERRTRAIL_MAX_DEPTH`: maximum number of call frames recorded per error
//! - `ERRTRAIL_CAPTURE`: `fresh` (default), `reuse` or `off`

use once_cell::sync::OnceCell;
use std::str::FromStr;

/// Default number of call frames recorded per error
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Environment variable overriding [`Config::max_depth`]
pub const ENV_MAX_DEPTH: &str = "ERRTRAIL_MAX_DEPTH";

/// Environment variable overriding [`Config::capture`]
pub const ENV_CAPTURE: &str = "ERRTRAIL_CAPTURE";

static CONFIG: OnceCell<Config> = OnceCell::new();

/// How a wrapping layer obtains its call stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapturePolicy {
    /// Every wrapping layer records its own call stack
    #[default]
    Fresh,
    /// Wrapping an error that already carries a call stack clones that
    /// stack instead of recording a new one
    Reuse,
    /// Never record call stacks
    Off,
}

impl CapturePolicy {
    /// Returns the policy as the string accepted by [`ENV_CAPTURE`]
    pub fn as_str(&self) -> &'static str {
        match self {
            CapturePolicy::Fresh => "fresh",
            CapturePolicy::Reuse => "reuse",
            CapturePolicy::Off => "off",
        }
    }
}

impl FromStr for CapturePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fresh" => Ok(CapturePolicy::Fresh),
            "reuse" => Ok(CapturePolicy::Reuse),
            "off" | "none" | "0" => Ok(CapturePolicy::Off),
            other => Err(format!("unknown capture policy '{}'", other)),
        }
    }
}

/// Call stack capture settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of frames recorded per error
    pub max_depth: usize,
    /// Whether and how wrapping layers record call stacks
    pub capture: CapturePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            capture: CapturePolicy::Fresh,
        }
    }
}

impl Config {
    /// Build a configuration from the environment, falling back to defaults
    /// for unset or malformed values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        if let Some(raw) = lookup(ENV_MAX_DEPTH) {
            match raw.trim().parse::<usize>() {
                Ok(depth) => config.max_depth = depth,
                Err(err) => tracing::warn!(
                    var = ENV_MAX_DEPTH,
                    value = %raw,
                    error = %err,
                    "ignoring malformed configuration value"
                ),
            }
        }

        if let Some(raw) = lookup(ENV_CAPTURE) {
            match raw.parse::<CapturePolicy>() {
                Ok(policy) => config.capture = policy,
                Err(err) => tracing::warn!(
                    var = ENV_CAPTURE,
                    value = %raw,
                    error = %err,
                    "ignoring malformed configuration value"
                ),
            }
        }

        config
    }

    /// Set the maximum capture depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the capture policy
    pub fn with_capture(mut self, capture: CapturePolicy) -> Self {
        self.capture = capture;
        self
    }
}

/// Install the process-wide configuration.
///
/// Returns the rejected configuration if one was already installed or had
/// already been initialized from the environment.
pub fn install(config: Config) -> Result<(), Config> {
    CONFIG.set(config)
}

/// The active configuration, initialized from the environment on first use.
pub fn current() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config, Config::default());
        assert_eq!(config.max_depth, 100);
        assert_eq!(config.capture, CapturePolicy::Fresh);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup(&[
            (ENV_MAX_DEPTH, "12"),
            (ENV_CAPTURE, "Reuse"),
        ]));
        assert_eq!(config.max_depth, 12);
        assert_eq!(config.capture, CapturePolicy::Reuse);
    }

    #[test]
    fn test_malformed_values_are_ignored() {
        let config = Config::from_lookup(lookup(&[
            (ENV_MAX_DEPTH, "lots"),
            (ENV_CAPTURE, "sometimes"),
        ]));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_builder() {
        let config = Config::default()
            .with_max_depth(5)
            .with_capture(CapturePolicy::Off);
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.capture.as_str(), "off");
    }
}
