// Media streamed over HTTP range requests into an on-disk chunk cache.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{InputContext, MediaData, MediaLifecycle, NetStats};
use crate::config::{InputConfig, TAIL_PREFETCH_CHUNKS};
use crate::engine::{DiskCache, Downloader, TransferStats};
use crate::error::{MediaSourceOpenError, OpenFailure, Result};
use crate::input::{CachedInput, SeekableInput};
use crate::source::{HttpRangeSource, RangeSource};

static NEXT_CACHE_ID: AtomicU64 = AtomicU64::new(0);

/// Progressive download of a remote resource.
///
/// Chunks are fetched in the background starting at open; inputs read what
/// is cached and wait for the rest.
pub struct HttpMediaData {
    source: Arc<HttpRangeSource>,
    content_type: String,
    cache: Arc<DiskCache>,
    downloader: Arc<Downloader>,
    stats: Arc<TransferStats>,
    stats_tx: Arc<watch::Sender<NetStats>>,
    sampler_token: CancellationToken,
    lifecycle: MediaLifecycle,
    config: InputConfig,
}

impl HttpMediaData {
    /// Probe `url` and start downloading its head and tail.
    ///
    /// Fails with [`OpenFailure::NoMatchingFile`] when the server does not
    /// serve the resource and with [`OpenFailure::UnsupportedVideoSource`]
    /// when it cannot serve byte ranges of a known length.
    pub async fn open(
        url: impl Into<String>,
        headers: HashMap<String, String>,
        config: InputConfig,
    ) -> std::result::Result<Self, MediaSourceOpenError> {
        let source = Arc::new(HttpRangeSource::new(url, headers));
        let info = source.probe().await.map_err(|e| {
            MediaSourceOpenError::new(OpenFailure::NoMatchingFile)
                .with_message(format!("probe of {} failed", source.url()))
                .with_cause(Box::<dyn std::error::Error + Send + Sync>::from(e))
        })?;

        if !info.supports_range {
            return Err(MediaSourceOpenError::new(OpenFailure::UnsupportedVideoSource)
                .with_message("server does not support range requests"));
        }
        let content_length = match info.content_length {
            Some(len) if len > 0 => len,
            _ => {
                return Err(MediaSourceOpenError::new(OpenFailure::UnsupportedVideoSource)
                    .with_message("server did not report a content length"))
            }
        };
        info!(
            "http media probed: {} bytes, type={}",
            content_length, info.content_type
        );

        let name = format!(
            "media-{}-{}",
            std::process::id(),
            NEXT_CACHE_ID.fetch_add(1, Ordering::Relaxed)
        );
        let cache = DiskCache::create(
            Path::new(&config.cache_dir),
            &name,
            content_length,
            config.chunk_size,
        )
        .map_err(|e| {
            MediaSourceOpenError::new(OpenFailure::NoMatchingFile)
                .with_message(format!("cannot allocate cache in {}", config.cache_dir))
                .with_cause(Box::<dyn std::error::Error + Send + Sync>::from(e))
        })?;
        let cache = Arc::new(cache);

        let stats = Arc::new(TransferStats::new());
        let downloader = Arc::new(Downloader::new(
            source.clone() as Arc<dyn RangeSource>,
            cache.clone(),
            config.max_concurrency,
            stats.clone(),
        ));

        // Players read the head first and often jump to the tail for the index.
        let total_chunks = cache.total_chunks();
        downloader.start_prefetch(0);
        downloader.prefetch_range(
            total_chunks.saturating_sub(TAIL_PREFETCH_CHUNKS),
            total_chunks,
        );

        let stats_tx = Arc::new(watch::Sender::new(NetStats::UNKNOWN));
        let sampler_token = CancellationToken::new();
        spawn_stats_sampler(
            stats.clone(),
            stats_tx.clone(),
            sampler_token.clone(),
            Duration::from_millis(config.stats_interval_ms.max(1)),
        );

        Ok(Self {
            source,
            content_type: info.content_type,
            cache,
            downloader,
            stats,
            stats_tx,
            sampler_token,
            lifecycle: MediaLifecycle::default(),
            config,
        })
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn cached_bytes(&self) -> u64 {
        self.cache.cached_bytes()
    }

    /// Bytes handed to inputs so far.
    pub fn served_bytes(&self) -> u64 {
        self.stats.total_served()
    }

    /// Chunk fetches currently holding a download permit.
    pub fn active_downloads(&self) -> u32 {
        self.stats.active_workers()
    }

    /// Point subsequent fetches at a refreshed URL or credentials.
    pub fn update_auth(&self, new_url: String, new_headers: HashMap<String, String>) {
        self.source.update_auth(new_url, new_headers);
    }

    fn shutdown(&self) {
        self.sampler_token.cancel();
        self.downloader.shutdown();
        self.stats_tx.send_replace(NetStats::UNKNOWN);
    }
}

fn spawn_stats_sampler(
    stats: Arc<TransferStats>,
    tx: Arc<watch::Sender<NetStats>>,
    token: CancellationToken,
    period: Duration,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let sample = stats.sample();
                    if sample != NetStats::UNKNOWN {
                        tx.send_replace(sample);
                    }
                }
            }
        }
        debug!("stats sampler stopped");
    });
}

#[async_trait]
impl MediaData for HttpMediaData {
    async fn file_length(&self) -> Result<Option<u64>> {
        Ok(Some(self.cache.content_length()))
    }

    async fn create_input(&self, ctx: &InputContext) -> Result<Box<dyn SeekableInput>> {
        let (closer, lease) = self.lifecycle.admit(ctx)?;
        let mut input = CachedInput::new(
            self.cache.clone(),
            self.downloader.clone(),
            self.stats.clone(),
            self.config.prefetch_ahead_chunks,
            self.config.seek_window_chunks,
            closer,
            Some(lease),
        );
        // Ready once the first byte is readable.
        input.seek_to(0).await?;
        Ok(Box::new(input))
    }

    async fn close(&self) {
        if self.lifecycle.close() {
            self.shutdown();
            info!(
                "http media closed, downloaded {} bytes",
                self.stats.total_downloaded()
            );
        }
    }

    fn network_stats(&self) -> watch::Receiver<NetStats> {
        self.stats_tx.subscribe()
    }

    fn is_cache_finished(&self) -> watch::Receiver<bool> {
        self.downloader.subscribe_complete()
    }

    fn is_progressive(&self) -> bool {
        true
    }
}

impl Drop for HttpMediaData {
    fn drop(&mut self) {
        self.shutdown();
    }
}
