use async_trait::async_trait;

use ma_media_io::error::{InputError, Result};
use ma_media_io::input::{InputCloser, SeekableInput, SeekableInputExt, EOF};

/// Source that hands out at most `per_read` bytes per call.
struct ChunkyInput {
    data: Vec<u8>,
    position: u64,
    per_read: usize,
    reads: usize,
    closer: InputCloser,
}

impl ChunkyInput {
    fn new(len: usize, per_read: usize) -> Self {
        Self {
            data: (0..len).map(|i| i as u8).collect(),
            position: 0,
            per_read,
            reads: 0,
            closer: InputCloser::new(),
        }
    }
}

#[async_trait]
impl SeekableInput for ChunkyInput {
    fn position(&self) -> u64 {
        self.position
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn seek_to(&mut self, position: u64) -> Result<()> {
        if self.closer.is_closed() {
            return Err(InputError::Closed);
        }
        self.position = position;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8], offset: usize, length: usize) -> Result<i64> {
        if self.closer.is_closed() {
            return Err(InputError::Closed);
        }
        self.reads += 1;
        let start = self.position as usize;
        if start >= self.data.len() {
            return Ok(EOF);
        }
        let n = length.min(self.per_read).min(self.data.len() - start);
        buf[offset..offset + n].copy_from_slice(&self.data[start..start + n]);
        self.position += n as u64;
        Ok(n as i64)
    }

    fn close(&mut self) {
        self.closer.close();
    }

    fn closer(&self) -> InputCloser {
        self.closer.clone()
    }
}

#[tokio::test]
async fn test_read_all_bytes_one_byte_per_read() {
    let mut input = ChunkyInput::new(64, 1);
    let all = input.read_all_bytes().await.unwrap();
    assert_eq!(all, (0..64).map(|i| i as u8).collect::<Vec<_>>());
    assert_eq!(input.reads, 64);
    assert_eq!(input.bytes_remaining(), 0);
}

#[tokio::test]
async fn test_read_all_bytes_stops_when_full() {
    // 10 bytes at 3 per read: 3 + 3 + 3 + 1, no trailing EOF read needed.
    let mut input = ChunkyInput::new(10, 3);
    let all = input.read_all_bytes().await.unwrap();
    assert_eq!(all.len(), 10);
    assert_eq!(input.reads, 4);
}

#[tokio::test]
async fn test_read_all_bytes_from_middle() {
    let mut input = ChunkyInput::new(10, 4);
    input.seek_to(7).await.unwrap();
    assert_eq!(input.read_all_bytes().await.unwrap(), vec![7, 8, 9]);
}

#[tokio::test]
async fn test_read_all_bytes_on_closed_input() {
    let mut input = ChunkyInput::new(10, 4);
    input.close();
    assert!(matches!(
        input.read_all_bytes().await,
        Err(InputError::Closed)
    ));
}

#[tokio::test]
async fn test_read_bytes_is_single_short_read() {
    let mut input = ChunkyInput::new(10, 3);
    assert_eq!(input.read_bytes(8).await.unwrap(), vec![0, 1, 2]);
    assert_eq!(input.reads, 1);

    input.seek_to(10).await.unwrap();
    assert!(input.read_bytes(8).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_read_exact_bytes_accumulates() {
    let mut input = ChunkyInput::new(10, 3);
    assert_eq!(input.read_exact_bytes(7).await.unwrap(), vec![0, 1, 2, 3, 4, 5, 6]);
    assert_eq!(input.position(), 7);
}

#[tokio::test]
async fn test_read_exact_bytes_reports_short_count() {
    let mut input = ChunkyInput::new(5, 2);
    match input.read_exact_bytes(8).await {
        Err(InputError::UnexpectedEof { read, requested }) => {
            assert_eq!(read, 5);
            assert_eq!(requested, 8);
        }
        other => panic!("expected UnexpectedEof, got {:?}", other.map(|v| v.len())),
    }
}

#[tokio::test]
async fn test_read_bytes_zero_length_checks_closed() {
    let mut input = ChunkyInput::new(10, 3);
    assert!(input.read_bytes(0).await.unwrap().is_empty());
    assert_eq!(input.reads, 0);

    input.close();
    assert!(matches!(input.read_bytes(0).await, Err(InputError::Closed)));
}
