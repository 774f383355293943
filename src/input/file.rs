// Local file input with a read-ahead buffer serving the non-suspending fast path.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

use super::{check_read_args, check_seek_target, unless_closed, InputCloser, SeekableInput, EOF};
use crate::error::{InputError, Result};
use crate::media::SlotLease;

pub struct FileInput {
    file: Option<File>,
    path: PathBuf,
    size: u64,
    position: u64,
    /// Offset the underlying file cursor is at.
    file_pos: u64,
    buffer: Vec<u8>,
    buffer_start: u64,
    buffer_capacity: usize,
    closer: InputCloser,
    lease: Option<SlotLease>,
}

impl FileInput {
    pub async fn open(path: impl AsRef<Path>, buffer_capacity: usize) -> Result<Self> {
        Self::open_with(path.as_ref(), buffer_capacity, InputCloser::new(), None).await
    }

    pub(crate) async fn open_with(
        path: &Path,
        buffer_capacity: usize,
        closer: InputCloser,
        lease: Option<SlotLease>,
    ) -> Result<Self> {
        if buffer_capacity == 0 {
            return Err(InputError::invalid("buffer capacity must be > 0"));
        }
        let file = File::open(path).await?;
        let size = file.metadata().await?.len();
        debug!("file input opened path={} size={}", path.display(), size);

        Ok(Self {
            file: Some(file),
            path: path.to_owned(),
            size,
            position: 0,
            file_pos: 0,
            buffer: Vec::with_capacity(buffer_capacity),
            buffer_start: 0,
            buffer_capacity,
            closer,
            lease,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes of the buffer at or after `position`.
    fn buffered(&self) -> &[u8] {
        let end = self.buffer_start + self.buffer.len() as u64;
        if self.position < self.buffer_start || self.position >= end {
            return &[];
        }
        &self.buffer[(self.position - self.buffer_start) as usize..]
    }

    async fn fill(&mut self) -> Result<usize> {
        let file = self.file.as_mut().ok_or(InputError::Closed)?;
        let position = self.position;
        let capacity = self.buffer_capacity;
        let buffer = &mut self.buffer;
        let file_pos = &mut self.file_pos;

        let n = unless_closed(&self.closer, async {
            if *file_pos != position {
                file.seek(SeekFrom::Start(position)).await?;
                *file_pos = position;
            }
            buffer.resize(capacity, 0);
            let n = file.read(&mut buffer[..]).await?;
            buffer.truncate(n);
            *file_pos += n as u64;
            Ok::<usize, InputError>(n)
        })
        .await;

        match n {
            Ok(n) => {
                self.buffer_start = position;
                Ok(n)
            }
            Err(e) => {
                self.buffer.clear();
                Err(e)
            }
        }
    }
}

#[async_trait]
impl SeekableInput for FileInput {
    fn position(&self) -> u64 {
        self.position
    }

    fn size(&self) -> u64 {
        self.size
    }

    // Every byte of a local file is available, so seeking never waits.
    async fn seek_to(&mut self, position: u64) -> Result<()> {
        self.closer.ensure_open()?;
        check_seek_target(position, self.size)?;
        self.position = position;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8], offset: usize, length: usize) -> Result<i64> {
        self.closer.ensure_open()?;
        check_read_args(buf, offset, length)?;
        if self.position >= self.size {
            return Ok(EOF);
        }

        if self.buffered().is_empty() && self.fill().await? == 0 {
            // File shrank underneath us.
            return Ok(EOF);
        }

        let available = self.buffered();
        let n = length.min(available.len());
        buf[offset..offset + n].copy_from_slice(&available[..n]);
        self.position += n as u64;
        Ok(n as i64)
    }

    fn close(&mut self) {
        self.closer.close();
        if self.file.take().is_some() {
            debug!("file input closed path={}", self.path.display());
        }
        self.buffer = Vec::new();
        self.lease = None;
    }

    fn closer(&self) -> InputCloser {
        self.closer.clone()
    }
}
