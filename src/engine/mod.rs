// Progressive download engine: chunk cache, parallel downloader, transfer stats.

pub mod cache;
pub mod downloader;
pub mod stats;

pub use cache::DiskCache;
pub use downloader::Downloader;
pub use stats::TransferStats;
