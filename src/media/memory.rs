use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;

use super::{InputContext, MediaData, MediaLifecycle, NetStats};
use crate::error::Result;
use crate::input::{BytesInput, SeekableInput};

/// Media whose bytes are already in memory.
pub struct BytesMediaData {
    data: Bytes,
    lifecycle: MediaLifecycle,
    stats_tx: watch::Sender<NetStats>,
    finished_tx: watch::Sender<bool>,
}

impl BytesMediaData {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            lifecycle: MediaLifecycle::default(),
            stats_tx: watch::Sender::new(NetStats::UNKNOWN),
            finished_tx: watch::Sender::new(true),
        }
    }
}

#[async_trait]
impl MediaData for BytesMediaData {
    async fn file_length(&self) -> Result<Option<u64>> {
        Ok(Some(self.data.len() as u64))
    }

    async fn create_input(&self, ctx: &InputContext) -> Result<Box<dyn SeekableInput>> {
        let (closer, lease) = self.lifecycle.admit(ctx)?;
        Ok(Box::new(BytesInput::with_closer(
            self.data.clone(),
            closer,
            Some(lease),
        )))
    }

    async fn close(&self) {
        self.lifecycle.close();
    }

    fn network_stats(&self) -> watch::Receiver<NetStats> {
        self.stats_tx.subscribe()
    }

    fn is_cache_finished(&self) -> watch::Receiver<bool> {
        self.finished_tx.subscribe()
    }
}
