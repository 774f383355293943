use std::future::Future;
use std::io::{self, Read, Seek, SeekFrom};

use tokio::runtime::{Handle, RuntimeFlavor};

use crate::input::{SeekableInput, EOF};

/// Drive `fut` to completion on `handle`, blocking the calling thread.
///
/// Engine threads are usually outside the runtime. When called from a
/// multi-thread runtime worker the worker is handed off with `block_in_place`.
/// Any other runtime context cannot block in place, so the future is driven
/// on a scoped helper thread instead.
pub fn block_on<F>(handle: &Handle, fut: F) -> F::Output
where
    F: Future + Send,
    F::Output: Send,
{
    match Handle::try_current() {
        Ok(current) if current.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| handle.block_on(fut))
        }
        Ok(_) => std::thread::scope(|s| {
            match s.spawn(|| handle.block_on(fut)).join() {
                Ok(out) => out,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }),
        Err(_) => handle.block_on(fut),
    }
}

/// `std::io::Read + Seek` view of a [`SeekableInput`] for engines that take a
/// plain reader. Unlike the callback adapter, errors keep their kind.
pub struct BlockingReader<I: SeekableInput> {
    input: I,
    runtime: Handle,
}

impl<I: SeekableInput> BlockingReader<I> {
    pub fn new(input: I, runtime: Handle) -> Self {
        Self { input, runtime }
    }

    pub fn get_ref(&self) -> &I {
        &self.input
    }

    pub fn into_inner(self) -> I {
        self.input
    }
}

impl<I: SeekableInput> Read for BlockingReader<I> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let len = buf.len();
        let n = block_on(&self.runtime, self.input.read(buf, 0, len))?;
        Ok(if n == EOF { 0 } else { n as usize })
    }
}

impl<I: SeekableInput> Seek for BlockingReader<I> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::End(delta) => self.input.size().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.input.position().checked_add_signed(delta),
        }
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "seek before start"))?;

        block_on(&self.runtime, self.input.seek_to(target))?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::BytesInput;

    #[test]
    fn reader_reads_and_seeks_from_plain_thread() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let input = BytesInput::new((0u8..100).collect::<Vec<_>>());
        let mut reader = BlockingReader::new(input, rt.handle().clone());

        let mut head = [0u8; 4];
        reader.read_exact(&mut head).unwrap();
        assert_eq!(head, [0, 1, 2, 3]);

        assert_eq!(reader.seek(SeekFrom::End(-2)).unwrap(), 98);
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, vec![98, 99]);

        assert_eq!(reader.seek(SeekFrom::Current(-10)).unwrap(), 90);
        let err = reader.seek(SeekFrom::Current(-1000)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        let err = reader.seek(SeekFrom::Start(500)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
