// Synchronous pull-callback bridge for native playback engines.

pub mod blocking;
pub mod ffi;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::input::{SeekableInput, EOF};

pub use blocking::{block_on, BlockingReader};

/// Callback shape of a native engine that pulls bytes synchronously.
///
/// The engine calls `on_open` first, then any number of `on_read` and
/// `on_seek`, then `on_close`. Calls never overlap.
pub trait CallbackMedia: Send {
    fn on_get_size(&self) -> u64;
    fn on_open(&mut self) -> bool;
    /// Bytes written into `buf`, or `-1` when no more bytes will come.
    fn on_read(&mut self, buf: &mut [u8]) -> i64;
    fn on_seek(&mut self, offset: u64) -> bool;
    fn on_close(&mut self);
}

type CloseNotification = Box<dyn FnOnce() + Send>;

/// Exposes a [`SeekableInput`] through [`CallbackMedia`], blocking the engine
/// thread on `runtime` while the input suspends.
///
/// Every read failure is reported to the engine as `-1`, the same value as
/// end of stream, because the callback contract has no error channel. Seek
/// failures are logged and reported as success.
pub struct CallbackMediaAdapter {
    input: Box<dyn SeekableInput>,
    runtime: Handle,
    on_close: Option<CloseNotification>,
}

impl CallbackMediaAdapter {
    pub fn new(
        input: Box<dyn SeekableInput>,
        runtime: Handle,
        on_close: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            input,
            runtime,
            on_close: Some(Box::new(on_close)),
        }
    }

    pub fn input(&self) -> &dyn SeekableInput {
        self.input.as_ref()
    }
}

impl CallbackMedia for CallbackMediaAdapter {
    fn on_get_size(&self) -> u64 {
        self.input.size()
    }

    fn on_open(&mut self) -> bool {
        match block_on(&self.runtime, self.input.seek_to(0)) {
            Ok(()) => true,
            Err(e) => {
                warn!("callback media open failed: {}", e);
                false
            }
        }
    }

    fn on_read(&mut self, buf: &mut [u8]) -> i64 {
        if buf.is_empty() {
            return 0;
        }
        let len = buf.len();
        match block_on(&self.runtime, self.input.read(buf, 0, len)) {
            Ok(n) => n,
            Err(e) => {
                debug!("callback media read failed, reporting end of stream: {}", e);
                EOF
            }
        }
    }

    fn on_seek(&mut self, offset: u64) -> bool {
        if let Err(e) = block_on(&self.runtime, self.input.seek_to(offset)) {
            warn!("callback media seek to {} failed: {}", offset, e);
        }
        true
    }

    fn on_close(&mut self) {
        if let Some(notify) = self.on_close.take() {
            self.input.close();
            notify();
        }
    }
}
