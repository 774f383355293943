use ma_media_io::engine::cache::DiskCache;

const MB: u64 = 1024 * 1024;

#[test]
fn test_disk_cache_put_and_copy() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskCache::create(dir.path(), "c1", 10 * MB, 2 * MB).unwrap();

    assert_eq!(cache.total_chunks(), 5);
    assert!(!cache.has_chunk(0));
    assert!(!cache.has_byte(0));

    let data = vec![0xABu8; 2 * MB as usize];
    cache.put_chunk(0, &data).unwrap();

    assert!(cache.has_chunk(0));
    assert!(cache.has_byte(2 * MB - 1));
    assert!(!cache.has_byte(2 * MB));

    // Copy is capped by the contiguous stored span.
    let mut dst = vec![0u8; 3 * MB as usize];
    assert_eq!(cache.copy_from(MB, &mut dst), MB as usize);
    assert!(dst[..MB as usize].iter().all(|&b| b == 0xAB));

    // Nothing stored at the start of chunk 1.
    assert_eq!(cache.copy_from(2 * MB, &mut dst), 0);
    assert_eq!(cache.cached_bytes(), 2 * MB);
}

#[test]
fn test_disk_cache_contiguous_from() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskCache::create(dir.path(), "c2", 10 * MB, 2 * MB).unwrap();

    for i in 0..3 {
        cache.put_chunk(i, &vec![i as u8; 2 * MB as usize]).unwrap();
    }

    assert_eq!(cache.contiguous_from(0), 6 * MB);
    assert_eq!(cache.contiguous_from(MB), 5 * MB);
    assert_eq!(cache.contiguous_from(6 * MB), 0);
    assert_eq!(cache.contiguous_from(10 * MB), 0);

    let range = cache.read_range(2 * MB - 2, 2 * MB + 2).unwrap();
    assert_eq!(range, vec![0, 0, 1, 1]);
    assert!(cache.read_range(5 * MB, 7 * MB).is_none());
}

#[test]
fn test_disk_cache_last_chunk_shorter_and_completion() {
    let dir = tempfile::tempdir().unwrap();
    // 5 MB with 2 MB chunks => 2, 2, 1 MB.
    let cache = DiskCache::create(dir.path(), "c3", 5 * MB, 2 * MB).unwrap();

    assert_eq!(cache.total_chunks(), 3);
    assert_eq!(cache.chunk_len(0), 2 * MB as usize);
    assert_eq!(cache.chunk_len(2), MB as usize);

    // Wrong length is rejected.
    assert!(cache.put_chunk(2, &vec![0u8; 2 * MB as usize]).is_err());
    assert!(cache.put_chunk(3, &[0u8; 1]).is_err());

    cache.put_chunk(2, &vec![0xCDu8; MB as usize]).unwrap();
    assert!(!cache.is_complete());
    cache.put_chunk(0, &vec![1u8; 2 * MB as usize]).unwrap();
    cache.put_chunk(1, &vec![2u8; 2 * MB as usize]).unwrap();
    assert!(cache.is_complete());

    // Re-storing a chunk does not double count.
    cache.put_chunk(1, &vec![2u8; 2 * MB as usize]).unwrap();
    assert_eq!(cache.cached_bytes(), 5 * MB);
}

#[test]
fn test_disk_cache_removes_file_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskCache::create(dir.path(), "c4", MB, MB).unwrap();
    let path = dir.path().join("c4.cache");
    assert!(path.exists());
    drop(cache);
    assert!(!path.exists());
}
