//! Preview configuration
//!
//! Defaults reproduce the product behaviour: an 800ms quiet period,
//! `App.tsx` as entry, `index.css` as stylesheet and the React 18 UMD
//! runtime compiled in-browser by Babel standalone.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// UI runtime, DOM renderer and in-browser compiler, in load order
pub const DEFAULT_RUNTIME_SCRIPTS: [&str; 3] = [
    "https://unpkg.com/react@18/umd/react.development.js",
    "https://unpkg.com/react-dom@18/umd/react-dom.development.js",
    "https://unpkg.com/@babel/standalone/babel.min.js",
];

/// Names destructured from the runtime ahead of the user source
pub const DEFAULT_HOOK_NAMES: [&str; 9] = [
    "useState",
    "useEffect",
    "useRef",
    "useMemo",
    "useCallback",
    "useReducer",
    "useContext",
    "useLayoutEffect",
    "Fragment",
];

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Debounce quiet period in milliseconds
    pub quiet_period_ms: u64,
    /// Exact file name of the entry component
    pub entry_file: String,
    /// Exact file name of the stylesheet
    pub stylesheet_file: String,
    /// Exactly three script URLs: runtime, renderer, compiler
    pub runtime_scripts: Vec<String>,
    pub hook_names: Vec<String>,
    /// Id of the mount element inside the document
    pub mount_id: String,
    /// Remove ES import statements before normalizing exports
    pub strip_imports: bool,
}

impl PreviewConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_quiet_period(mut self, period: Duration) -> Self {
        self.quiet_period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_entry_file(mut self, name: impl Into<String>) -> Self {
        self.entry_file = name.into();
        self
    }

    #[must_use]
    pub fn with_stylesheet_file(mut self, name: impl Into<String>) -> Self {
        self.stylesheet_file = name.into();
        self
    }

    #[must_use]
    pub fn with_strip_imports(mut self, strip: bool) -> Self {
        self.strip_imports = strip;
        self
    }

    /// Quiet period as a `Duration`
    #[inline]
    #[must_use]
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quiet_period_ms == 0 {
            return Err(ConfigError::Invalid("quiet_period_ms must be positive".into()));
        }
        if self.entry_file.trim().is_empty() {
            return Err(ConfigError::Invalid("entry_file must not be empty".into()));
        }
        if self.mount_id.trim().is_empty() {
            return Err(ConfigError::Invalid("mount_id must not be empty".into()));
        }
        if self.runtime_scripts.len() != 3 {
            return Err(ConfigError::Invalid(format!(
                "runtime_scripts needs exactly 3 entries (runtime, renderer, compiler), got {}",
                self.runtime_scripts.len()
            )));
        }
        Ok(())
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: 800,
            entry_file: "App.tsx".to_string(),
            stylesheet_file: "index.css".to_string(),
            runtime_scripts: DEFAULT_RUNTIME_SCRIPTS.iter().map(ToString::to_string).collect(),
            hook_names: DEFAULT_HOOK_NAMES.iter().map(ToString::to_string).collect(),
            mount_id: "root".to_string(),
            strip_imports: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_product_behaviour() {
        let config = PreviewConfig::default();
        assert_eq!(config.quiet_period(), Duration::from_millis(800));
        assert_eq!(config.entry_file, "App.tsx");
        assert_eq!(config.stylesheet_file, "index.css");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = PreviewConfig::from_toml_str("quiet_period_ms = 250\nstrip_imports = true\n").unwrap();
        assert_eq!(config.quiet_period_ms, 250);
        assert!(config.strip_imports);
        assert_eq!(config.entry_file, "App.tsx");
    }

    #[test]
    fn rejects_wrong_script_count() {
        let err = PreviewConfig::from_toml_str("runtime_scripts = [\"a.js\"]").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_quiet_period() {
        let config = PreviewConfig::new().with_quiet_period(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "entry_file = \"Main.jsx\"").unwrap();
        let config = PreviewConfig::load(file.path()).unwrap();
        assert_eq!(config.entry_file, "Main.jsx");
    }

    #[test]
    fn garbage_toml_is_a_parse_error() {
        assert!(matches!(
            PreviewConfig::from_toml_str("quiet_period_ms = ["),
            Err(ConfigError::Parse(_))
        ));
    }
}
