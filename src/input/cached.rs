// Input over a resource that is still being downloaded into a `DiskCache`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{check_read_args, check_seek_target, unless_closed, InputCloser, SeekableInput, EOF};
use crate::config::SEEK_THRESHOLD_BYTES;
use crate::engine::{DiskCache, Downloader, TransferStats};
use crate::error::{InputError, Result};
use crate::media::SlotLease;

/// Reads are served straight from the cache when the bytes are present and
/// otherwise wait for the downloader to fetch the chunk under the cursor.
pub struct CachedInput {
    cache: Arc<DiskCache>,
    downloader: Arc<Downloader>,
    stats: Arc<TransferStats>,
    position: u64,
    prefetch_ahead_chunks: usize,
    seek_window_chunks: usize,
    closer: InputCloser,
    lease: Option<SlotLease>,
}

impl CachedInput {
    pub(crate) fn new(
        cache: Arc<DiskCache>,
        downloader: Arc<Downloader>,
        stats: Arc<TransferStats>,
        prefetch_ahead_chunks: usize,
        seek_window_chunks: usize,
        closer: InputCloser,
        lease: Option<SlotLease>,
    ) -> Self {
        Self {
            cache,
            downloader,
            stats,
            position: 0,
            prefetch_ahead_chunks,
            seek_window_chunks,
            closer,
            lease,
        }
    }

    async fn wait_for_byte(&self, offset: u64) -> Result<()> {
        let index = self.cache.chunk_of(offset);
        let downloader = &self.downloader;
        unless_closed(&self.closer, async move {
            downloader
                .wait_for_chunk(index)
                .await
                .map_err(InputError::transport)
        })
        .await
    }

    fn prefetch_after(&self, offset: u64) {
        let next = self.cache.chunk_of(offset) + 1;
        self.downloader
            .prefetch_range(next, next + self.prefetch_ahead_chunks);
    }
}

#[async_trait]
impl SeekableInput for CachedInput {
    fn position(&self) -> u64 {
        self.position
    }

    fn size(&self) -> u64 {
        self.cache.content_length()
    }

    async fn seek_to(&mut self, position: u64) -> Result<()> {
        self.closer.ensure_open()?;
        check_seek_target(position, self.size())?;

        if position.abs_diff(self.position) > SEEK_THRESHOLD_BYTES {
            let first = self.cache.chunk_of(position);
            debug!("seek jump {} -> {}, refocusing downloads", self.position, position);
            self.downloader
                .abort_outside_window(first, first + self.seek_window_chunks);
        }

        if position < self.size() && !self.cache.has_byte(position) {
            self.wait_for_byte(position).await?;
        }
        self.position = position;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8], offset: usize, length: usize) -> Result<i64> {
        self.closer.ensure_open()?;
        check_read_args(buf, offset, length)?;
        if self.position >= self.size() {
            return Ok(EOF);
        }

        let dst = &mut buf[offset..offset + length];
        let mut n = self.cache.copy_from(self.position, dst);
        if n == 0 {
            self.wait_for_byte(self.position).await?;
            n = self.cache.copy_from(self.position, dst);
            if n == 0 {
                return Err(InputError::transport(anyhow::anyhow!(
                    "byte {} missing after download",
                    self.position
                )));
            }
        }

        self.position += n as u64;
        self.stats.record_served(n as u64);
        self.prefetch_after(self.position);
        Ok(n as i64)
    }

    fn close(&mut self) {
        self.closer.close();
        self.lease = None;
    }

    fn closer(&self) -> InputCloser {
        self.closer.clone()
    }
}
