// Multi-connection chunk downloader; fetches byte ranges into the disk cache in parallel.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use tokio::sync::{watch, Notify, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::cache::DiskCache;
use super::stats::TransferStats;
use crate::config::{MAX_FETCH_RETRIES, URGENT_PERMITS};
use crate::source::traits::{RangeSource, AUTH_REJECTED};

/// Bookkeeping for a chunk that is being fetched.
#[derive(Clone)]
struct InFlight {
    cancel: CancellationToken,
    done: Arc<Notify>,
}

pub struct Downloader {
    source: Arc<dyn RangeSource>,
    cache: Arc<DiskCache>,
    stats: Arc<TransferStats>,
    urgent_semaphore: Arc<Semaphore>,
    background_semaphore: Arc<Semaphore>,
    in_flight: Arc<Mutex<Vec<Option<InFlight>>>>,
    shutdown_token: CancellationToken,
    complete_tx: Arc<watch::Sender<bool>>,
}

impl Downloader {
    pub fn new(
        source: Arc<dyn RangeSource>,
        cache: Arc<DiskCache>,
        max_concurrency: u32,
        stats: Arc<TransferStats>,
    ) -> Self {
        let background_permits = (max_concurrency as usize)
            .saturating_sub(URGENT_PERMITS)
            .max(1);
        let (complete_tx, _) = watch::channel(cache.is_complete());
        Self {
            source,
            in_flight: Arc::new(Mutex::new(vec![None; cache.total_chunks()])),
            cache,
            stats,
            urgent_semaphore: Arc::new(Semaphore::new(URGENT_PERMITS)),
            background_semaphore: Arc::new(Semaphore::new(background_permits)),
            shutdown_token: CancellationToken::new(),
            complete_tx: Arc::new(complete_tx),
        }
    }

    /// Flips to `true` once every chunk is stored.
    pub fn subscribe_complete(&self) -> watch::Receiver<bool> {
        self.complete_tx.subscribe()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Cancel all in-flight downloads and refuse new ones.
    pub fn shutdown(&self) {
        if self.shutdown_token.is_cancelled() {
            return;
        }
        self.shutdown_token.cancel();
        for entry in self.in_flight.lock().iter().flatten() {
            entry.cancel.cancel();
        }
        info!(
            "downloader shut down, {} of {} bytes cached",
            self.cache.cached_bytes(),
            self.cache.content_length()
        );
    }

    /// Idempotent: fetch a chunk with background priority.
    pub fn start_prefetch(&self, index: usize) {
        self.start_download(index, Arc::clone(&self.background_semaphore), false);
    }

    /// Idempotent: fetch a chunk on the permits reserved for blocked readers.
    pub fn start_urgent(&self, index: usize) {
        self.start_download(index, Arc::clone(&self.urgent_semaphore), true);
    }

    /// Prefetch every chunk in `[start, end)`.
    pub fn prefetch_range(&self, start: usize, end: usize) {
        for i in start..end.min(self.cache.total_chunks()) {
            self.start_prefetch(i);
        }
    }

    /// Cancel in-flight downloads outside `[start, end)`.
    pub fn abort_outside_window(&self, start: usize, end: usize) {
        let in_flight = self.in_flight.lock();
        for (i, entry) in in_flight.iter().enumerate() {
            if (start..end).contains(&i) {
                continue;
            }
            if let Some(entry) = entry {
                entry.cancel.cancel();
            }
        }
    }

    fn start_download(&self, index: usize, semaphore: Arc<Semaphore>, urgent: bool) {
        if self.shutdown_token.is_cancelled()
            || index >= self.cache.total_chunks()
            || self.cache.has_chunk(index)
        {
            return;
        }

        let entry = {
            let mut in_flight = self.in_flight.lock();
            if in_flight[index].is_some() {
                return;
            }
            let entry = InFlight {
                cancel: self.shutdown_token.child_token(),
                done: Arc::new(Notify::new()),
            };
            in_flight[index] = Some(entry.clone());
            entry
        };

        let task = ChunkTask {
            index,
            source: Arc::clone(&self.source),
            cache: Arc::clone(&self.cache),
            stats: Arc::clone(&self.stats),
            cancel: entry.cancel.clone(),
            urgent,
        };
        let in_flight = Arc::clone(&self.in_flight);
        let complete_tx = Arc::clone(&self.complete_tx);

        tokio::spawn(async move {
            if let Err(e) = task.run(semaphore).await {
                warn!("chunk {} failed: {}", index, e);
            }
            if task.cache.is_complete() {
                complete_tx.send_if_modified(|done| !std::mem::replace(done, true));
            }

            // Clear the slot before waking waiters so a waiter that missed the
            // wakeup sees the chunk as no longer in flight.
            in_flight.lock()[index] = None;
            entry.done.notify_waiters();
        });
    }

    /// Wait until the chunk is stored, starting an urgent fetch if needed.
    ///
    /// Fails if the fetch failed, was cancelled or the downloader shut down.
    pub async fn wait_for_chunk(&self, index: usize) -> Result<()> {
        if self.cache.has_chunk(index) {
            return Ok(());
        }
        self.start_urgent(index);

        let done = self.in_flight.lock()[index]
            .as_ref()
            .map(|entry| Arc::clone(&entry.done));
        if let Some(done) = done {
            let notified = done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let still_running = self.in_flight.lock()[index]
                .as_ref()
                .is_some_and(|entry| Arc::ptr_eq(&entry.done, &done));
            if still_running && !self.cache.has_chunk(index) {
                notified.await;
            }
        }

        if self.cache.has_chunk(index) {
            Ok(())
        } else {
            Err(anyhow!("chunk {} could not be downloaded", index))
        }
    }
}

struct ChunkTask {
    index: usize,
    source: Arc<dyn RangeSource>,
    cache: Arc<DiskCache>,
    stats: Arc<TransferStats>,
    cancel: CancellationToken,
    urgent: bool,
}

impl ChunkTask {
    async fn run(&self, semaphore: Arc<Semaphore>) -> Result<()> {
        let priority = if self.urgent { "urgent" } else { "background" };

        let _permit = tokio::select! {
            permit = semaphore.acquire_owned() => permit.map_err(|e| anyhow!("{}", e))?,
            _ = self.cancel.cancelled() => {
                debug!("chunk {} cancelled while waiting for {} permit", self.index, priority);
                return Ok(());
            }
        };
        debug!("chunk {} acquired {} permit", self.index, priority);

        self.stats.increment_workers();
        let result = self.fetch_with_retry().await;
        self.stats.decrement_workers();
        result
    }

    async fn fetch_with_retry(&self) -> Result<()> {
        let start = self.cache.chunk_start(self.index);
        let end = start + self.cache.chunk_len(self.index) as u64 - 1;

        for attempt in 0..=MAX_FETCH_RETRIES {
            let fetched = tokio::select! {
                res = self.source.fetch_range(start, end) => res,
                _ = self.cancel.cancelled() => {
                    debug!("chunk {} cancelled during fetch", self.index);
                    return Ok(());
                }
            };

            match fetched {
                Ok(data) => {
                    self.cache.put_chunk(self.index, &data)?;
                    self.stats.record_downloaded(data.len() as u64);
                    debug!("chunk {} downloaded ({} bytes)", self.index, data.len());
                    return Ok(());
                }
                Err(e) if e.to_string().contains(AUTH_REJECTED) && attempt < MAX_FETCH_RETRIES => {
                    warn!("chunk {} auth rejected (attempt {}), refreshing", self.index, attempt);
                    if let Err(re) = self.source.refresh_auth().await {
                        warn!("refresh_auth failed: {}", re);
                    }
                }
                Err(e) if attempt < MAX_FETCH_RETRIES => {
                    warn!("chunk {} fetch failed (attempt {}): {}", self.index, attempt, e);
                    let backoff = Duration::from_millis(500 * (attempt as u64 + 1));
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = self.cancel.cancelled() => return Ok(()),
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
