// Byte-range transports feeding the chunk downloader.

pub mod http_source;
pub mod traits;

pub use http_source::HttpRangeSource;
pub use traits::{RangeSource, SourceInfo};
