//! Storage Configuration
//!
//! Configuration for the log and its segments.
//!
//! ## Options
//!
//! - **max_store_bytes**: roll the active segment when its store file
//!   reaches this size (default: 1 GiB)
//! - **max_index_bytes**: roll when the index reaches this size; also the
//!   capacity each index file is pre-grown to while open (default: 10 MiB)
//! - **initial_offset**: base offset of the first segment when creating a
//!   fresh log (default: 0)
//!
//! ## Usage
//!
//! ```ignore
//! use streamlog_storage::{Config, SegmentConfig};
//!
//! // Small segments for tests
//! let config = Config {
//!     segment: SegmentConfig {
//!         max_store_bytes: 1024,
//!         max_index_bytes: 1024,
//!         ..Default::default()
//!     },
//! };
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub segment: SegmentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Maximum store file size in bytes before rolling (default: 1 GiB)
    #[serde(default = "default_max_store_bytes")]
    pub max_store_bytes: u64,

    /// Maximum index size in bytes before rolling; each open index file is
    /// pre-grown to this capacity (default: 10 MiB)
    #[serde(default = "default_max_index_bytes")]
    pub max_index_bytes: u64,

    /// Base offset of the first segment in a fresh log (default: 0)
    #[serde(default)]
    pub initial_offset: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_store_bytes: default_max_store_bytes(),
            max_index_bytes: default_max_index_bytes(),
            initial_offset: 0,
        }
    }
}

fn default_max_store_bytes() -> u64 {
    1024 * 1024 * 1024 // 1 GiB
}

fn default_max_index_bytes() -> u64 {
    10 * 1024 * 1024 // 10 MiB
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.segment.max_store_bytes, 1024 * 1024 * 1024);
        assert_eq!(config.segment.max_index_bytes, 10 * 1024 * 1024);
        assert_eq!(config.segment.initial_offset, 0);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"segment": {"max_store_bytes": 4096}}"#).unwrap();
        assert_eq!(config.segment.max_store_bytes, 4096);
        assert_eq!(config.segment.max_index_bytes, 10 * 1024 * 1024);
        assert_eq!(config.segment.initial_offset, 0);
    }
}
