// Accumulating reads layered on `SeekableInput::read`.

use async_trait::async_trait;

use super::{SeekableInput, EOF};
use crate::error::{InputError, Result};

/// Convenience reads available on every [`SeekableInput`].
///
/// These rely on `read` never returning `0`; a source that does so breaks the
/// contract and is not guarded against here.
#[async_trait]
pub trait SeekableInputExt: SeekableInput {
    /// A single `read` of at most `max_length` bytes, trimmed to what was
    /// returned. Empty at end of stream. A short result does not imply EOF.
    async fn read_bytes(&mut self, max_length: usize) -> Result<Vec<u8>> {
        if max_length == 0 {
            self.closer().ensure_open()?;
            return Ok(Vec::new());
        }
        let mut buf = vec![0u8; max_length];
        let n = self.read(&mut buf, 0, max_length).await?;
        if n == EOF {
            return Ok(Vec::new());
        }
        buf.truncate(n as usize);
        Ok(buf)
    }

    /// Read from the current position to the end, as sized by
    /// `bytes_remaining` at call time.
    async fn read_all_bytes(&mut self) -> Result<Vec<u8>> {
        let remaining = self.bytes_remaining();
        let total = usize::try_from(remaining).map_err(|_| {
            InputError::invalid(format!("{} remaining bytes do not fit in memory", remaining))
        })?;
        let mut buf = vec![0u8; total];
        let mut filled = 0;
        while filled < total {
            let n = self.read(&mut buf, filled, total - filled).await?;
            if n == EOF {
                break;
            }
            filled += n as usize;
        }
        if total == 0 {
            // Surface a closed input even when there is nothing left to read.
            let mut probe = [0u8; 1];
            self.read(&mut probe, 0, 1).await?;
        }
        buf.truncate(filled);
        Ok(buf)
    }

    /// Read exactly `n` bytes, failing with [`InputError::UnexpectedEof`] if
    /// the stream ends first.
    async fn read_exact_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            let got = self.read(&mut buf, filled, n - filled).await?;
            if got == EOF {
                return Err(InputError::UnexpectedEof {
                    read: filled as u64,
                    requested: n as u64,
                });
            }
            filled += got as usize;
        }
        Ok(buf)
    }
}

impl<T: SeekableInput + ?Sized> SeekableInputExt for T {}
