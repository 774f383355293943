// Media resources that hand out one seekable input at a time.

pub mod file;
pub mod http;
pub mod memory;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::{InputError, Result};
use crate::input::{InputCloser, SeekableInput};

pub use file::FileMediaData;
pub use http::HttpMediaData;
pub use memory::BytesMediaData;

/// Transfer rates in bytes per second. `-1` means unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetStats {
    pub download_speed: i64,
    pub upload_rate: i64,
}

impl NetStats {
    pub const UNKNOWN_RATE: i64 = -1;

    pub const UNKNOWN: NetStats = NetStats {
        download_speed: Self::UNKNOWN_RATE,
        upload_rate: Self::UNKNOWN_RATE,
    };
}

impl Default for NetStats {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

/// Execution context for `create_input`.
///
/// Cancelling `cancel` closes every input created with this context.
#[derive(Debug, Clone, Default)]
pub struct InputContext {
    pub cancel: CancellationToken,
}

impl InputContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

/// A single media resource.
#[async_trait]
pub trait MediaData: Send + Sync {
    /// Total length, or `None` when it cannot be known (live streams).
    async fn file_length(&self) -> Result<Option<u64>>;

    /// Open a new input once the resource is ready to be read.
    ///
    /// Fails with [`InputError::Busy`] while an input previously created by
    /// this media is still open.
    async fn create_input(&self, ctx: &InputContext) -> Result<Box<dyn SeekableInput>>;

    /// Release every resource owned by the media, including background
    /// transfers. Idempotent.
    async fn close(&self);

    /// Observational transfer rates.
    fn network_stats(&self) -> watch::Receiver<NetStats>;

    /// Becomes `true` once every byte is stored locally.
    fn is_cache_finished(&self) -> watch::Receiver<bool>;

    /// Whether bytes may still be arriving after the input is opened.
    fn is_progressive(&self) -> bool {
        false
    }
}

/// Single-slot ownership of a media's live input.
#[derive(Debug, Clone, Default)]
pub struct InputSlot {
    taken: Arc<AtomicBool>,
}

impl InputSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Result<SlotLease> {
        if self
            .taken
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(InputError::Busy);
        }
        Ok(SlotLease {
            taken: Arc::clone(&self.taken),
        })
    }

    pub fn is_taken(&self) -> bool {
        self.taken.load(Ordering::Acquire)
    }
}

/// Held by an open input; releases the slot when dropped.
#[derive(Debug)]
pub struct SlotLease {
    taken: Arc<AtomicBool>,
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        self.taken.store(false, Ordering::Release);
    }
}

/// Closed flag, input slot and the closer of the live input of one media.
#[derive(Debug, Default)]
pub(crate) struct MediaLifecycle {
    slot: InputSlot,
    closed: AtomicBool,
    active: Mutex<Option<InputCloser>>,
}

impl MediaLifecycle {
    /// Reserve the slot for a new input created under `ctx`.
    ///
    /// The closed check and the registration happen under the `active` lock,
    /// so a concurrent `close` either rejects the input or closes it.
    pub(crate) fn admit(&self, ctx: &InputContext) -> Result<(InputCloser, SlotLease)> {
        let mut active = self.active.lock();
        if self.is_closed() {
            return Err(InputError::Closed);
        }
        let lease = self.slot.try_acquire()?;
        let closer = InputCloser::child_of(&ctx.cancel);
        *active = Some(closer.clone());
        Ok((closer, lease))
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark closed and close the live input. Returns `false` if already closed.
    pub(crate) fn close(&self) -> bool {
        let mut active = self.active.lock();
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(closer) = active.take() {
            closer.close();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_is_exclusive_until_lease_dropped() {
        let slot = InputSlot::new();
        let lease = slot.try_acquire().unwrap();
        assert!(slot.is_taken());
        assert!(matches!(slot.try_acquire(), Err(InputError::Busy)));
        drop(lease);
        assert!(!slot.is_taken());
        assert!(slot.try_acquire().is_ok());
    }

    #[test]
    fn closing_lifecycle_closes_live_input() {
        let lifecycle = MediaLifecycle::default();
        let (closer, _lease) = lifecycle.admit(&InputContext::default()).unwrap();
        assert!(lifecycle.close());
        assert!(closer.is_closed());
        assert!(!lifecycle.close());
        assert!(matches!(
            lifecycle.admit(&InputContext::default()),
            Err(InputError::Closed)
        ));
    }

    #[test]
    fn admitted_input_never_outlives_concurrent_close() {
        for _ in 0..500 {
            let lifecycle = Arc::new(MediaLifecycle::default());
            let barrier = Arc::new(std::sync::Barrier::new(2));

            let opener = {
                let lifecycle = lifecycle.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    lifecycle.admit(&InputContext::default())
                })
            };
            barrier.wait();
            assert!(lifecycle.close());

            match opener.join().unwrap() {
                Ok((closer, _lease)) => assert!(closer.is_closed()),
                Err(e) => assert!(matches!(e, InputError::Closed)),
            }
        }
    }

    #[test]
    fn net_stats_default_is_unknown() {
        let stats = NetStats::default();
        assert_eq!(stats.download_speed, -1);
        assert_eq!(stats.upload_rate, -1);
    }
}
