use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// What a probe learned about the remote resource.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    /// Total length, `None` when the server did not report one.
    pub content_length: Option<u64>,
    pub content_type: String,
    pub supports_range: bool,
}

/// Random-access transport: fetch inclusive byte ranges of a remote resource.
#[async_trait]
pub trait RangeSource: Send + Sync {
    async fn probe(&self) -> Result<SourceInfo>;

    /// Fetch bytes `[start, end]` (inclusive).
    async fn fetch_range(&self, start: u64, end: u64) -> Result<Bytes>;

    /// Called after the server rejected credentials.
    async fn refresh_auth(&self) -> Result<()> {
        Ok(())
    }
}

/// Marker placed in errors that should trigger [`RangeSource::refresh_auth`].
pub const AUTH_REJECTED: &str = "auth_rejected";
