use serde::Deserialize;

/// Minimum byte distance for a `seek_to` to count as a jump (4 MB).
pub const SEEK_THRESHOLD_BYTES: u64 = 4 * 1024 * 1024;

/// Number of trailing chunks fetched at open; MP4 moov atoms often live at the end.
pub const TAIL_PREFETCH_CHUNKS: usize = 4;

/// Download permits reserved for chunks a reader is blocked on.
pub const URGENT_PERMITS: usize = 2;

/// Per-chunk transport retries before the chunk is reported as failed.
pub const MAX_FETCH_RETRIES: u32 = 3;

/// Configuration shared by the media backends.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Size of each download chunk in bytes.
    pub chunk_size: u64,
    /// Maximum number of concurrent download tasks.
    pub max_concurrency: u32,
    /// Directory used for on-disk cache files.
    pub cache_dir: String,
    /// Read-ahead buffer used by local file inputs.
    pub file_buffer_size: usize,
    /// Chunks scheduled for background download past the read position.
    pub prefetch_ahead_chunks: usize,
    /// Chunks kept in flight around a seek target; others are aborted.
    pub seek_window_chunks: usize,
    /// Period of the network statistics sampler.
    pub stats_interval_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2 * 1024 * 1024, // 2 MB
            max_concurrency: 6,
            cache_dir: std::env::temp_dir()
                .join("ma_media_io")
                .to_string_lossy()
                .into_owned(),
            file_buffer_size: 64 * 1024,
            prefetch_ahead_chunks: 20,
            seek_window_chunks: 32,
            stats_interval_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let cfg: InputConfig =
            serde_json::from_str(r#"{"chunk_size": 65536, "cache_dir": "/tmp/x"}"#).unwrap();
        assert_eq!(cfg.chunk_size, 65536);
        assert_eq!(cfg.cache_dir, "/tmp/x");
        assert_eq!(cfg.max_concurrency, 6);
        assert_eq!(cfg.file_buffer_size, 64 * 1024);
    }
}
