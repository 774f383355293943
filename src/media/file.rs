use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use super::{InputContext, MediaData, MediaLifecycle, NetStats};
use crate::config::InputConfig;
use crate::error::{MediaSourceOpenError, OpenFailure, Result};
use crate::input::{FileInput, SeekableInput};

/// Media backed by a file on the local filesystem.
pub struct FileMediaData {
    path: PathBuf,
    buffer_size: usize,
    lifecycle: MediaLifecycle,
    stats_tx: watch::Sender<NetStats>,
    finished_tx: watch::Sender<bool>,
}

impl FileMediaData {
    /// Fails with [`OpenFailure::NoMatchingFile`] if `path` is not a readable file.
    pub async fn open(
        path: impl AsRef<Path>,
        config: &InputConfig,
    ) -> std::result::Result<Self, MediaSourceOpenError> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path).await.map_err(|e| {
            MediaSourceOpenError::new(OpenFailure::NoMatchingFile)
                .with_message(format!("cannot stat {}", path.display()))
                .with_cause(e)
        })?;
        if !meta.is_file() {
            return Err(MediaSourceOpenError::new(OpenFailure::NoMatchingFile)
                .with_message(format!("{} is not a regular file", path.display())));
        }
        debug!("file media path={} len={}", path.display(), meta.len());

        Ok(Self {
            path: path.to_owned(),
            buffer_size: config.file_buffer_size,
            lifecycle: MediaLifecycle::default(),
            stats_tx: watch::Sender::new(NetStats::UNKNOWN),
            finished_tx: watch::Sender::new(true),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MediaData for FileMediaData {
    async fn file_length(&self) -> Result<Option<u64>> {
        let meta = tokio::fs::metadata(&self.path).await?;
        Ok(Some(meta.len()))
    }

    async fn create_input(&self, ctx: &InputContext) -> Result<Box<dyn SeekableInput>> {
        let (closer, lease) = self.lifecycle.admit(ctx)?;
        let input = FileInput::open_with(&self.path, self.buffer_size, closer, Some(lease)).await?;
        Ok(Box::new(input))
    }

    async fn close(&self) {
        if self.lifecycle.close() {
            debug!("file media closed path={}", self.path.display());
        }
    }

    fn network_stats(&self) -> watch::Receiver<NetStats> {
        self.stats_tx.subscribe()
    }

    fn is_cache_finished(&self) -> watch::Receiver<bool> {
        self.finished_tx.subscribe()
    }
}
