// Asynchronous random-access byte inputs.

pub mod cached;
pub mod empty;
pub mod file;
pub mod helpers;
pub mod memory;

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{InputError, Result};

pub use cached::CachedInput;
pub use empty::EmptySeekableInput;
pub use file::FileInput;
pub use helpers::SeekableInputExt;
pub use memory::BytesInput;

/// Returned by [`SeekableInput::read`] at end of stream.
pub const EOF: i64 = -1;

/// A seekable byte source whose bytes may not all be resident yet.
///
/// The getters are cheap and never suspend, so a decode loop can poll them at
/// high frequency. `seek_to` and `read` may suspend until data is available.
///
/// Not safe for concurrent use: mutating operations take `&mut self`. Use
/// [`SeekableInput::closer`] to close the input from another context.
#[async_trait]
pub trait SeekableInput: Send {
    /// Current absolute offset. Valid after close.
    fn position(&self) -> u64;

    /// `size - position`. Valid after close.
    fn bytes_remaining(&self) -> u64 {
        self.size().saturating_sub(self.position())
    }

    /// Total length of the resource, fixed for the lifetime of the input.
    fn size(&self) -> u64;

    /// Move to `position`, suspending until the byte there can be read.
    ///
    /// Fails with [`InputError::InvalidArgument`] if `position > size` and
    /// with [`InputError::Closed`] after close.
    async fn seek_to(&mut self, position: u64) -> Result<()>;

    /// Copy up to `length` bytes into `buf[offset..offset + length]`.
    ///
    /// Returns the number of bytes copied (at least 1) or [`EOF`]. Suspends
    /// until at least one byte is available but never waits to fill `length`;
    /// a short read does not mean end of stream.
    async fn read(&mut self, buf: &mut [u8], offset: usize, length: usize) -> Result<i64>;

    /// Release the underlying resource. Idempotent.
    fn close(&mut self);

    /// Handle that closes this input from another logical context.
    fn closer(&self) -> InputCloser;

    fn is_closed(&self) -> bool {
        self.closer().is_closed()
    }
}

#[async_trait]
impl<T: SeekableInput + ?Sized> SeekableInput for Box<T> {
    fn position(&self) -> u64 {
        (**self).position()
    }

    fn bytes_remaining(&self) -> u64 {
        (**self).bytes_remaining()
    }

    fn size(&self) -> u64 {
        (**self).size()
    }

    async fn seek_to(&mut self, position: u64) -> Result<()> {
        (**self).seek_to(position).await
    }

    async fn read(&mut self, buf: &mut [u8], offset: usize, length: usize) -> Result<i64> {
        (**self).read(buf, offset, length).await
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn closer(&self) -> InputCloser {
        (**self).closer()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}

/// Shared closed flag of an input.
///
/// Cancelling the token marks the input closed; suspended reads and seeks
/// select on [`InputCloser::closed`] and unwind with [`InputError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct InputCloser {
    token: CancellationToken,
}

impl InputCloser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closer that also fires when `parent` is cancelled.
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
        }
    }

    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the input is closed.
    pub async fn closed(&self) {
        self.token.cancelled().await
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(InputError::Closed)
        } else {
            Ok(())
        }
    }
}

/// Run `fut` unless the input gets closed first.
pub(crate) async fn unless_closed<T, F>(closer: &InputCloser, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = closer.closed() => Err(InputError::Cancelled),
        res = fut => res,
    }
}

/// Validate the arguments shared by every `read` implementation.
pub(crate) fn check_read_args(buf: &[u8], offset: usize, length: usize) -> Result<()> {
    if length == 0 {
        return Err(InputError::invalid("length must be > 0"));
    }
    match offset.checked_add(length) {
        Some(end) if end <= buf.len() => Ok(()),
        _ => Err(InputError::invalid(format!(
            "offset {} + length {} exceeds buffer of {} bytes",
            offset,
            length,
            buf.len()
        ))),
    }
}

pub(crate) fn check_seek_target(position: u64, size: u64) -> Result<()> {
    if position > size {
        return Err(InputError::invalid(format!(
            "position {} is past the end ({} bytes)",
            position, size
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_args_reject_overflowing_ranges() {
        let buf = [0u8; 8];
        assert!(check_read_args(&buf, 0, 8).is_ok());
        assert!(check_read_args(&buf, 4, 4).is_ok());
        assert!(matches!(
            check_read_args(&buf, 4, 5),
            Err(InputError::InvalidArgument(_))
        ));
        assert!(matches!(
            check_read_args(&buf, usize::MAX, 2),
            Err(InputError::InvalidArgument(_))
        ));
        assert!(matches!(
            check_read_args(&buf, 0, 0),
            Err(InputError::InvalidArgument(_))
        ));
    }

    #[test]
    fn child_closer_follows_parent() {
        let parent = CancellationToken::new();
        let closer = InputCloser::child_of(&parent);
        assert!(closer.ensure_open().is_ok());
        parent.cancel();
        assert!(closer.is_closed());
        assert!(matches!(closer.ensure_open(), Err(InputError::Closed)));
    }
}
