use async_trait::async_trait;
use bytes::Bytes;

use super::{check_read_args, check_seek_target, InputCloser, SeekableInput, EOF};
use crate::error::Result;
use crate::media::SlotLease;

/// Input over bytes that are fully resident in memory. Never suspends.
pub struct BytesInput {
    data: Bytes,
    position: u64,
    closer: InputCloser,
    lease: Option<SlotLease>,
}

impl BytesInput {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self::with_closer(data.into(), InputCloser::new(), None)
    }

    pub(crate) fn with_closer(data: Bytes, closer: InputCloser, lease: Option<SlotLease>) -> Self {
        Self {
            data,
            position: 0,
            closer,
            lease,
        }
    }
}

#[async_trait]
impl SeekableInput for BytesInput {
    fn position(&self) -> u64 {
        self.position
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn seek_to(&mut self, position: u64) -> Result<()> {
        self.closer.ensure_open()?;
        check_seek_target(position, self.size())?;
        self.position = position;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8], offset: usize, length: usize) -> Result<i64> {
        self.closer.ensure_open()?;
        check_read_args(buf, offset, length)?;

        let start = self.position as usize;
        if start >= self.data.len() {
            return Ok(EOF);
        }
        let n = length.min(self.data.len() - start);
        buf[offset..offset + n].copy_from_slice(&self.data[start..start + n]);
        self.position += n as u64;
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
