mod encryption;
#[cfg(feature = "live")]
mod live;
mod non_live;

pub use encryption::Encryption;
#[cfg(feature = "live")]
pub use live::{LiveStream, LiveStreamOptions};
pub use non_live::{NonLiveStream, NonLiveStreamOptions};

use async_trait::async_trait;
use bytes::Bytes;
use std::io::Write;
use std::time::Instant;

use crate::structs::{DownloadProgress, VideoError, VideoFormat};

#[async_trait]
pub trait Stream {
    /// Stream a chunk of the [`u8`] bytes
    ///
    /// When the bytes has been exhausted, this will return `None`.
    async fn chunk(&self) -> Result<Option<Bytes>, VideoError>;

    /// Content length of the stream
    ///
    /// If stream is [`LiveStream`] returns always `0`
    fn content_length(&self) -> usize {
        0
    }
}

/// Drain a stream into `writer`; returns the number of bytes written.
pub async fn download<W: Write + Send>(
    stream: &(dyn Stream + Send + Sync),
    writer: &mut W,
) -> Result<u64, VideoError> {
    let mut written = 0u64;

    while let Some(chunk) = stream.chunk().await? {
        writer
            .write_all(&chunk)
            .map_err(|e| VideoError::DownloadError(e.to_string()))?;
        written += chunk.len() as u64;
    }

    Ok(written)
}

/// Like [`download`], invoking `callback` after every chunk with the running
/// totals and an average transfer speed.
pub async fn download_with_progress<W, F>(
    stream: &(dyn Stream + Send + Sync),
    writer: &mut W,
    mut callback: F,
) -> Result<u64, VideoError>
where
    W: Write + Send,
    F: FnMut(DownloadProgress) + Send,
{
    let total = stream.content_length() as u64;
    let started = Instant::now();
    let mut downloaded = 0u64;

    while let Some(chunk) = stream.chunk().await? {
        writer
            .write_all(&chunk)
            .map_err(|e| VideoError::DownloadError(e.to_string()))?;
        downloaded += chunk.len() as u64;

        let elapsed = started.elapsed().as_secs_f64();
        let speed_bytes_per_sec = if elapsed > 0.0 {
            (downloaded as f64 / elapsed) as u64
        } else {
            0
        };

        callback(DownloadProgress {
            total,
            downloaded,
            speed_bytes_per_sec,
        });
    }

    Ok(downloaded)
}

/// `true` when the format should be consumed through the HLS path.
pub(crate) fn is_segmented(format: &VideoFormat) -> bool {
    format.is_hls || (format.is_live && format.content_length.is_none())
}
