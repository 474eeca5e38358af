use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::cmp::min;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::constants::{DEFAULT_DL_CHUNK_SIZE, DEFAULT_HEADERS, DEFAULT_MAX_RETRIES};
use crate::stream::Stream;
use crate::structs::VideoError;
use crate::utils::{with_cancel, wrap_with_retry};

pub struct NonLiveStreamOptions {
    pub client: Option<reqwest_middleware::ClientWithMiddleware>,
    pub link: String,
    /// Total size of the resource; `0` disables range requests and the whole
    /// body is fetched with one plain GET.
    pub content_length: u64,
    pub dl_chunk_size: u64,
    /// First byte to request.
    pub start: u64,
    /// Last byte to request (inclusive); `0` means up to the end.
    pub end: u64,
    pub max_retries: u32,
    /// Abort signal; in-flight chunk reads stop when it fires.
    pub cancel: Option<CancellationToken>,
}

impl Default for NonLiveStreamOptions {
    fn default() -> Self {
        NonLiveStreamOptions {
            client: None,
            link: String::new(),
            content_length: 0,
            dl_chunk_size: DEFAULT_DL_CHUNK_SIZE,
            start: 0,
            end: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            cancel: None,
        }
    }
}

/// Chunked range downloader for progressive and adaptive formats.
///
/// Each `chunk()` call fetches one `dl_chunk_size` window. A failed window is
/// retried up to `max_retries` times with a linear backoff of
/// `attempt x 1 second` before the error surfaces.
pub struct NonLiveStream {
    link: String,
    content_length: u64,
    dl_chunk_size: u64,
    max_retries: u32,

    cursor: RwLock<u64>,
    done: RwLock<bool>,
    start_static: u64,
    end_limit: u64,

    client: reqwest_middleware::ClientWithMiddleware,
    cancel: CancellationToken,
}

impl NonLiveStream {
    pub fn new(options: NonLiveStreamOptions) -> Result<Self, VideoError> {
        let client = match options.client {
            Some(client) => client,
            None => {
                let client = reqwest::Client::builder()
                    .build()
                    .map_err(VideoError::Reqwest)?;
                wrap_with_retry(client, options.max_retries)
            }
        };

        let end_limit = if options.end > 0 {
            options.end
        } else {
            options.content_length.saturating_sub(1)
        };

        Ok(Self {
            client,
            link: options.link,
            content_length: options.content_length,
            dl_chunk_size: options.dl_chunk_size.max(1),
            max_retries: options.max_retries,
            cursor: RwLock::new(options.start),
            done: RwLock::new(false),
            start_static: options.start,
            end_limit,
            cancel: options.cancel.unwrap_or_default(),
        })
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    async fn fetch_range(&self, start: u64, end: Option<u64>) -> Result<Bytes, VideoError> {
        let mut headers = DEFAULT_HEADERS.clone();

        if let Some(end) = end {
            headers.insert(
                reqwest::header::RANGE,
                format!("bytes={start}-{end}")
                    .parse()
                    .map_err(|_| VideoError::DownloadError("invalid range header".to_string()))?,
            );
        }

        let mut response = self
            .client
            .get(&self.link)
            .headers(headers)
            .send()
            .await
            .map_err(VideoError::ReqwestMiddleware)?
            .error_for_status()
            .map_err(VideoError::Reqwest)?;

        let mut buf = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(VideoError::Reqwest)? {
            buf.extend(chunk);
        }

        Ok(buf.into())
    }

    async fn fetch_with_retries(&self, start: u64, end: Option<u64>) -> Result<Bytes, VideoError> {
        let mut attempt = 0u32;

        loop {
            match self.fetch_range(start, end).await {
                Ok(bytes) => return Ok(bytes),
                Err(err) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        return Err(err);
                    }
                    tracing::debug!(attempt, "chunk fetch failed, retrying: {err}");
                    tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
                }
            }
        }
    }

    async fn next_chunk(&self) -> Result<Option<Bytes>, VideoError> {
        if *self.done.read().await {
            // Reset so the stream can be replayed from its start bound.
            *self.done.write().await = false;
            *self.cursor.write().await = self.start_static;
            return Ok(None);
        }

        // Unknown length: one plain GET carries the whole body.
        if self.content_length == 0 {
            let bytes = self.fetch_with_retries(0, None).await?;
            *self.done.write().await = true;
            return Ok(Some(bytes));
        }

        let start = *self.cursor.read().await;
        if start > self.end_limit {
            *self.cursor.write().await = self.start_static;
            return Ok(None);
        }

        let end = min(start + self.dl_chunk_size - 1, self.end_limit);
        let bytes = self.fetch_with_retries(start, Some(end)).await?;

        if end >= self.end_limit {
            *self.done.write().await = true;
        } else {
            *self.cursor.write().await = end + 1;
        }

        Ok(Some(bytes))
    }
}

#[async_trait]
impl Stream for NonLiveStream {
    async fn chunk(&self) -> Result<Option<Bytes>, VideoError> {
        with_cancel(&self.cancel, self.next_chunk()).await
    }

    fn content_length(&self) -> usize {
        self.content_length as usize
    }
}
