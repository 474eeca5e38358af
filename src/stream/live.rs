use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

use tokio_util::sync::CancellationToken;

use crate::constants::{DEFAULT_HEADERS, DEFAULT_MAX_RETRIES};
use crate::hls::{get_hls_playlist, HlsRequestOptions};
use crate::stream::encryption::Encryption;
use crate::stream::Stream;
use crate::structs::VideoError;
use crate::utils::{make_absolute_url, with_cancel, wrap_with_retry};

/// Playlist refresh interval in milliseconds.
const REFRESH_MILLIS: u128 = 20000;

pub struct LiveStreamOptions {
    pub client: Option<reqwest_middleware::ClientWithMiddleware>,
    pub stream_url: String,
    /// Abort signal; segment fetches and refresh waits stop when it fires.
    pub cancel: Option<CancellationToken>,
}

#[derive(Clone, Debug)]
struct LiveSegment {
    url: url::Url,
    byte_range: Option<String>,
    discon_seq: u64,
    seq: u64,
    encryption: Encryption,
}

/// Segmented (HLS) stream: follows the media playlist, downloading and
/// decrypting segments in order until the playlist ends.
pub struct LiveStream {
    client: reqwest_middleware::ClientWithMiddleware,
    stream_url: String,
    cancel: CancellationToken,

    last_refresh: RwLock<u128>,
    segments: RwLock<Vec<LiveSegment>>,
    is_end: RwLock<bool>,
    last_seg: RwLock<Option<(u64, u64)>>,
}

impl LiveStream {
    pub fn new(options: LiveStreamOptions) -> Result<Self, VideoError> {
        let client = match options.client {
            Some(client) => client,
            None => {
                let client = reqwest::Client::builder()
                    .build()
                    .map_err(VideoError::Reqwest)?;
                wrap_with_retry(client, DEFAULT_MAX_RETRIES)
            }
        };

        Ok(Self {
            client,
            stream_url: options.stream_url,
            cancel: options.cancel.unwrap_or_default(),
            last_refresh: RwLock::new(0),
            segments: RwLock::new(vec![]),
            is_end: RwLock::new(false),
            last_seg: RwLock::new(None),
        })
    }

    async fn is_end(&self) -> bool {
        *self.is_end.read().await
    }

    async fn refresh_playlist(&self) -> Result<(), VideoError> {
        let options = HlsRequestOptions {
            client: Some(self.client.clone()),
            headers: None,
        };
        let media_playlist = get_hls_playlist(&self.stream_url, &options).await?;

        let mut discon_offset = 0;
        let mut encryption = Encryption::None;

        for (seq, segment) in (media_playlist.media_sequence..).zip(media_playlist.segments.iter())
        {
            if segment.discontinuity {
                discon_offset += 1;
            }
            let discon_seq = media_playlist.discontinuity_sequence + discon_offset;

            // Skip segments already handed out
            if let Some(last) = *self.last_seg.read().await {
                if last >= (discon_seq, seq) {
                    continue;
                }
            }

            if let Some(key) = &segment.key {
                encryption = Encryption::new(key, &self.stream_url, seq)?;
            }

            *self.last_seg.write().await = Some((discon_seq, seq));

            let url = make_absolute_url(&self.stream_url, &segment.uri)?;

            let byte_range = segment.byte_range.as_ref().map(|range| {
                let start = range.offset.unwrap_or(0);
                let end = start + range.length.saturating_sub(1);
                format!("bytes={start}-{end}")
            });

            let entry = LiveSegment {
                url,
                byte_range,
                discon_seq,
                seq,
                encryption: encryption.clone(),
            };

            let mut segments = self.segments.write().await;
            if !segments
                .iter()
                .any(|x| (x.discon_seq, x.seq) == (entry.discon_seq, entry.seq))
            {
                segments.push(entry);
            }
        }

        *self.last_refresh.write().await = now_millis();

        if media_playlist.end_list {
            *self.is_end.write().await = true;
        }

        Ok(())
    }

    async fn pop_front(&self) -> Option<LiveSegment> {
        let mut segments = self.segments.write().await;
        if segments.is_empty() {
            None
        } else {
            Some(segments.remove(0))
        }
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

#[async_trait]
impl Stream for LiveStream {
    async fn chunk(&self) -> Result<Option<Bytes>, VideoError> {
        with_cancel(&self.cancel, self.next_chunk()).await
    }
}

impl LiveStream {
    async fn next_chunk(&self) -> Result<Option<Bytes>, VideoError> {
        if self.is_end().await && self.segments.read().await.is_empty() {
            return Ok(None);
        }

        let since_refresh = now_millis().saturating_sub(*self.last_refresh.read().await);

        // Wait out the refresh window when the playlist has nothing new yet.
        if since_refresh < REFRESH_MILLIS
            && self.segments.read().await.is_empty()
            && !self.is_end().await
        {
            tokio::time::sleep(Duration::from_millis(
                (REFRESH_MILLIS - since_refresh) as u64,
            ))
            .await;
        }

        if now_millis().saturating_sub(*self.last_refresh.read().await) >= REFRESH_MILLIS
            && !self.is_end().await
        {
            self.refresh_playlist().await?;
        }

        let Some(segment) = self.pop_front().await else {
            // Nothing arrived this round; hand back an empty buffer
            return Ok(Some(Bytes::new()));
        };

        let mut headers = DEFAULT_HEADERS.clone();
        if let Some(range) = &segment.byte_range {
            if let Ok(value) = range.parse() {
                headers.insert(reqwest::header::RANGE, value);
            }
        }

        let mut response = self
            .client
            .get(segment.url.as_str())
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

        let decrypted = segment.encryption.decrypt(&self.client, &buf).await?;

        Ok(Some(Bytes::from(decrypted)))
    }
}
