// Chunked on-disk store for a progressively downloaded resource.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, Result};
use bitvec::prelude::*;
use memmap2::MmapMut;
use parking_lot::RwLock;

/// Memory-mapped backing file plus a bitmap of which chunks are complete.
pub struct DiskCache {
    mmap: RwLock<MmapMut>,
    present: RwLock<BitVec>,
    chunk_size: u64,
    content_length: u64,
    total_chunks: usize,
    path: PathBuf,
    cached_bytes: AtomicU64,
}

impl DiskCache {
    /// Create `<cache_dir>/<name>.cache`, sized to `content_length`.
    pub fn create(cache_dir: &Path, name: &str, content_length: u64, chunk_size: u64) -> Result<Self> {
        if content_length == 0 {
            return Err(anyhow!("content_length must be > 0"));
        }
        if chunk_size == 0 {
            return Err(anyhow!("chunk_size must be > 0"));
        }

        fs::create_dir_all(cache_dir)?;
        let path = cache_dir.join(format!("{}.cache", name));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.set_len(content_length)?;

        // SAFETY: the file was just created and is owned exclusively by this cache.
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        let total_chunks = content_length.div_ceil(chunk_size) as usize;

        Ok(Self {
            mmap: RwLock::new(mmap),
            present: RwLock::new(bitvec![0; total_chunks]),
            chunk_size,
            content_length,
            total_chunks,
            path,
            cached_bytes: AtomicU64::new(0),
        })
    }

    /// Store a complete chunk. `data` must be exactly `chunk_len(index)` bytes.
    pub fn put_chunk(&self, index: usize, data: &[u8]) -> Result<()> {
        if index >= self.total_chunks {
            return Err(anyhow!(
                "chunk {} out of range (total {})",
                index,
                self.total_chunks
            ));
        }
        let expected = self.chunk_len(index);
        if data.len() != expected {
            return Err(anyhow!(
                "chunk {} has {} bytes, expected {}",
                index,
                data.len(),
                expected
            ));
        }

        let offset = self.chunk_start(index) as usize;
        self.mmap.write()[offset..offset + data.len()].copy_from_slice(data);

        let mut present = self.present.write();
        if !present[index] {
            present.set(index, true);
            self.cached_bytes
                .fetch_add(data.len() as u64, Ordering::Relaxed);
        }
        Ok(())
    }

    pub fn has_chunk(&self, index: usize) -> bool {
        index < self.total_chunks && self.present.read()[index]
    }

    /// Whether the byte at `offset` is stored.
    pub fn has_byte(&self, offset: u64) -> bool {
        offset < self.content_length && self.has_chunk(self.chunk_of(offset))
    }

    /// Number of contiguous stored bytes starting at `offset`.
    pub fn contiguous_from(&self, offset: u64) -> u64 {
        if offset >= self.content_length {
            return 0;
        }
        let first = self.chunk_of(offset);
        let present = self.present.read();
        if !present[first] {
            return 0;
        }

        let mut end = self.chunk_start(first) + self.chunk_len(first) as u64;
        for i in (first + 1)..self.total_chunks {
            if !present[i] {
                break;
            }
            end += self.chunk_len(i) as u64;
        }
        end - offset
    }

    /// Copy stored bytes starting at `offset` into `dst`. Returns the count
    /// copied, limited by `dst.len()` and the contiguous stored span.
    pub fn copy_from(&self, offset: u64, dst: &mut [u8]) -> usize {
        let n = (self.contiguous_from(offset) as usize).min(dst.len());
        if n > 0 {
            let start = offset as usize;
            dst[..n].copy_from_slice(&self.mmap.read()[start..start + n]);
        }
        n
    }

    /// Read `[start, end)`, or `None` if any overlapping chunk is missing.
    pub fn read_range(&self, start: u64, end: u64) -> Option<Vec<u8>> {
        if start >= end || end > self.content_length || self.contiguous_from(start) < end - start {
            return None;
        }
        Some(self.mmap.read()[start as usize..end as usize].to_vec())
    }

    pub fn is_complete(&self) -> bool {
        self.cached_bytes() == self.content_length
    }

    pub fn chunk_of(&self, offset: u64) -> usize {
        (offset / self.chunk_size) as usize
    }

    pub fn chunk_start(&self, index: usize) -> u64 {
        index as u64 * self.chunk_size
    }

    /// Byte length of a chunk; the last one may be shorter than `chunk_size`.
    pub fn chunk_len(&self, index: usize) -> usize {
        if index + 1 < self.total_chunks {
            return self.chunk_size as usize;
        }
        match self.content_length % self.chunk_size {
            0 => self.chunk_size as usize,
            rem => rem as usize,
        }
    }

    pub fn total_chunks(&self) -> usize {
        self.total_chunks
    }

    pub fn cached_bytes(&self) -> u64 {
        self.cached_bytes.load(Ordering::Relaxed)
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }
}

impl Drop for DiskCache {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
