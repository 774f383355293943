use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::{debug, warn};

use super::traits::{RangeSource, SourceInfo, AUTH_REJECTED};

/// HTTP transport issuing `Range: bytes=a-b` requests.
pub struct HttpRangeSource {
    client: Client,
    url: RwLock<String>,
    headers: RwLock<HashMap<String, String>>,
}

impl HttpRangeSource {
    pub fn new(url: impl Into<String>, headers: HashMap<String, String>) -> Self {
        Self {
            client: Client::new(),
            url: RwLock::new(url.into()),
            headers: RwLock::new(headers),
        }
    }

    pub fn url(&self) -> String {
        self.url.read().clone()
    }

    /// Replace the URL and headers (e.g. after a token refresh). Empty values are ignored.
    pub fn update_auth(&self, new_url: String, new_headers: HashMap<String, String>) {
        if !new_url.trim().is_empty() {
            *self.url.write() = new_url;
        }
        if !new_headers.is_empty() {
            *self.headers.write() = new_headers;
        }
    }

    fn request(&self, range: &str) -> RequestBuilder {
        let mut req = self.client.get(self.url.read().as_str());
        for (k, v) in self.headers.read().iter() {
            req = req.header(k.as_str(), v.as_str());
        }
        req.header(RANGE, range)
    }
}

fn is_auth_rejection(status: StatusCode) -> bool {
    matches!(status.as_u16(), 401 | 403 | 412)
}

fn header_str<'a>(resp: &'a reqwest::Response, name: reqwest::header::HeaderName) -> Option<&'a str> {
    resp.headers().get(name).and_then(|v| v.to_str().ok())
}

#[async_trait]
impl RangeSource for HttpRangeSource {
    async fn probe(&self) -> Result<SourceInfo> {
        let resp = self.request("bytes=0-0").send().await?;
        let status = resp.status();
        debug!("http probe status={}", status.as_u16());

        if is_auth_rejection(status) {
            warn!("http probe auth rejected status={}", status.as_u16());
            return Err(anyhow!("{}: HTTP {}", AUTH_REJECTED, status.as_u16()));
        }
        if !status.is_success() {
            warn!("http probe failed status={}", status.as_u16());
            return Err(anyhow!("probe failed: HTTP {}", status.as_u16()));
        }

        // 206 carries the total in `Content-Range: bytes 0-0/<total>`; `*` means unknown.
        let supports_range = status == StatusCode::PARTIAL_CONTENT;
        let content_length = if supports_range {
            header_str(&resp, CONTENT_RANGE)
                .and_then(|v| v.rsplit('/').next())
                .and_then(|v| v.parse::<u64>().ok())
        } else {
            header_str(&resp, CONTENT_LENGTH).and_then(|v| v.parse::<u64>().ok())
        };
        let content_type = header_str(&resp, CONTENT_TYPE)
            .unwrap_or("application/octet-stream")
            .to_string();

        Ok(SourceInfo {
            content_length,
            content_type,
            supports_range,
        })
    }

    async fn fetch_range(&self, start: u64, end: u64) -> Result<Bytes> {
        let range = format!("bytes={}-{}", start, end);
        let resp = self.request(&range).send().await?;
        let status = resp.status();

        if is_auth_rejection(status) {
            warn!(
                "http fetch auth rejected status={} range={}",
                status.as_u16(),
                range
            );
            return Err(anyhow!("{}: HTTP {}", AUTH_REJECTED, status.as_u16()));
        }
        if status != StatusCode::PARTIAL_CONTENT {
            warn!(
                "http fetch failed status={} range={}",
                status.as_u16(),
                range
            );
            return Err(anyhow!("fetch_range failed: HTTP {}", status.as_u16()));
        }

        Ok(resp.bytes().await?)
    }
}
