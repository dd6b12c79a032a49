//! Engine configuration.
//!
//! All knobs are fixed for the lifetime of a session: the worker pool does not
//! grow or shrink, and the batching policy never adapts at run time.

use std::path::Path;

use ngramdb_common::{Error, Result, verify_arg};
use serde::{Deserialize, Serialize};

/// Default minimum document length (in bytes) before a document is split
/// across workers.
pub const DEFAULT_SPLIT_THRESHOLD: usize = 64 * 1024;

/// Default number of fragments a large document is split into.
pub const DEFAULT_FRAGMENT_WORKERS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Number of long-lived worker threads.
    pub pool_size: usize,
    /// Number of parallel pipelines a flushed batch of queries is split into.
    pub parallelism: usize,
    /// Number of fragments a single large document is split into.
    pub fragment_workers: usize,
    /// Documents shorter than this many bytes are always scanned in one piece.
    pub split_threshold: usize,
}

impl EngineConfig {
    /// A configuration that performs every scan on the calling thread.
    ///
    /// The pool still owns one worker; it simply never gets a second pipeline
    /// or a document fragment.
    pub fn sequential() -> EngineConfig {
        EngineConfig {
            pool_size: 1,
            parallelism: 1,
            fragment_workers: 1,
            split_threshold: usize::MAX,
        }
    }

    pub fn validate(&self) -> Result<()> {
        verify_arg!(pool_size, self.pool_size > 0);
        verify_arg!(parallelism, self.parallelism > 0);
        verify_arg!(fragment_workers, self.fragment_workers > 0);
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<EngineConfig> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| Error::config("<inline>", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<EngineConfig> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        let config: EngineConfig = serde_json::from_str(&json)
            .map_err(|e| Error::config(path.display().to_string(), e))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let pool_size = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8);
        EngineConfig {
            pool_size,
            parallelism: pool_size,
            fragment_workers: DEFAULT_FRAGMENT_WORKERS,
            split_threshold: DEFAULT_SPLIT_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use ngramdb_common::ErrorKind;

    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert!(config.pool_size >= 1);
        assert_eq!(config.parallelism, config.pool_size);
        EngineConfig::sequential().validate().unwrap();
    }

    #[test]
    fn test_zero_values_rejected() {
        let config = EngineConfig {
            parallelism: 0,
            ..EngineConfig::sequential()
        };
        match config.validate().unwrap_err().kind() {
            ErrorKind::InvalidArgument { name, .. } => assert_eq!(name, "parallelism"),
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn test_from_json() {
        let config =
            EngineConfig::from_json_str(r#"{ "pool_size": 3, "split_threshold": 10 }"#).unwrap();
        assert_eq!(config.pool_size, 3);
        assert_eq!(config.split_threshold, 10);
        assert_eq!(config.fragment_workers, DEFAULT_FRAGMENT_WORKERS);

        let err = EngineConfig::from_json_str(r#"{ "pool_sise": 3 }"#).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Config { .. }));

        let err = EngineConfig::from_json_str(r#"{ "fragment_workers": 0 }"#).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "pool_size": 2, "parallelism": 2 }}"#).unwrap();
        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.pool_size, 2);
        assert_eq!(config.parallelism, 2);

        let err = EngineConfig::from_json_file("/nonexistent/ngramdb.json").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Io { .. }));
    }
}
