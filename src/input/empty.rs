use async_trait::async_trait;

use super::{InputCloser, SeekableInput, EOF};
use crate::error::Result;

/// Input over zero bytes. Every read is end of stream.
#[derive(Debug, Default)]
pub struct EmptySeekableInput {
    closer: InputCloser,
}

impl EmptySeekableInput {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SeekableInput for EmptySeekableInput {
    fn position(&self) -> u64 {
        0
    }

    fn bytes_remaining(&self) -> u64 {
        0
    }

    fn size(&self) -> u64 {
        0
    }

    // Positions cannot be negative, so there is nothing left to validate.
    async fn seek_to(&mut self, _position: u64) -> Result<()> {
        self.closer.ensure_open()
    }

    async fn read(&mut self, _buf: &mut [u8], _offset: usize, _length: usize) -> Result<i64> {
        self.closer.ensure_open()?;
        Ok(EOF)
    }

    fn close(&mut self) {
        self.closer.close();
    }

    fn closer(&self) -> InputCloser {
        self.closer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InputError;

    #[tokio::test]
    async fn reads_eof_until_closed() {
        let mut input = EmptySeekableInput::new();
        let mut buf = [0u8; 4];
        assert_eq!(input.read(&mut buf, 0, 4).await.unwrap(), EOF);
        input.seek_to(0).await.unwrap();
        assert_eq!(input.size(), 0);
        assert_eq!(input.bytes_remaining(), 0);

        input.close();
        input.close();
        assert_eq!(input.position(), 0);
        assert!(matches!(
            input.read(&mut buf, 0, 4).await,
            Err(InputError::Closed)
        ));
        assert!(matches!(input.seek_to(0).await, Err(InputError::Closed)));
    }

    #[tokio::test]
    async fn close_from_another_thread_is_visible() {
        let mut input = EmptySeekableInput::new();
        let closer = input.closer();
        std::thread::spawn(move || closer.close()).join().unwrap();
        assert!(input.is_closed());
        assert!(matches!(input.seek_to(0).await, Err(InputError::Closed)));
    }
}
