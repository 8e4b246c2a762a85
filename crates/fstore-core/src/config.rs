use crate::error::{FsError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_THRESHOLD: u64 = 5;
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Engine configuration.
///
/// `threshold` is the sighting count at which a value (or key) stops being
/// stored inline and is replaced by a reference. `debug` only changes log
/// verbosity; it never affects compacted output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub threshold: u64,
    pub key_compression: bool,
    pub debug: bool,
    /// Maximum number of nested arrays/objects accepted in one document.
    pub max_depth: usize,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_key_compression(mut self, enabled: bool) -> Self {
        self.key_compression = enabled;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(FsError::InvalidConfig("threshold must be at least 1".into()));
        }
        if self.max_depth == 0 {
            return Err(FsError::InvalidConfig("max_depth must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            key_compression: false,
            debug: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.threshold, DEFAULT_THRESHOLD);
        assert!(!cfg.key_compression);
        assert!(!cfg.debug);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let cfg = EngineConfig::new()
            .with_threshold(2)
            .with_key_compression(true)
            .with_debug(true)
            .with_max_depth(8);
        assert_eq!(cfg.threshold, 2);
        assert!(cfg.key_compression);
        assert!(cfg.debug);
        assert_eq!(cfg.max_depth, 8);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let err = EngineConfig::new().with_threshold(0).validate().unwrap_err();
        assert!(matches!(err, FsError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err = EngineConfig::new().with_max_depth(0).validate().unwrap_err();
        assert!(matches!(err, FsError::InvalidConfig(_)));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"threshold": 3}"#).unwrap();
        assert_eq!(cfg.threshold, 3);
        assert!(!cfg.key_compression);
        assert_eq!(cfg.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_json_roundtrip() {
        let cfg = EngineConfig::new().with_key_compression(true);
        let text = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(cfg, back);
    }
}
