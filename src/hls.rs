use bytes::Bytes;
use m3u8_rs::{parse_master_playlist, parse_media_playlist, MasterPlaylist, MediaPlaylist};
use reqwest_middleware::ClientWithMiddleware;

use crate::constants::{DEFAULT_HEADERS, DEFAULT_MAX_RETRIES};
use crate::structs::VideoError;
use crate::utils::{get_html, wrap_with_retry};

/// Transport options for the playlist and segment helpers.
#[derive(Default)]
pub struct HlsRequestOptions {
    pub client: Option<ClientWithMiddleware>,
    pub headers: Option<reqwest::header::HeaderMap>,
}

fn client_of(options: &HlsRequestOptions) -> Result<ClientWithMiddleware, VideoError> {
    if let Some(client) = options.client.clone() {
        return Ok(client);
    }

    let client = reqwest::Client::builder()
        .default_headers(DEFAULT_HEADERS.clone())
        .build()
        .map_err(VideoError::Reqwest)?;

    Ok(wrap_with_retry(client, DEFAULT_MAX_RETRIES))
}

/// Fetch and parse an HLS master playlist.
pub async fn get_hls_master(
    url: &str,
    options: &HlsRequestOptions,
) -> Result<MasterPlaylist, VideoError> {
    let client = client_of(options)?;
    let body = get_html(&client, url, options.headers.as_ref()).await?;

    Ok(parse_master_playlist(body.as_bytes())
        .map_err(|e| VideoError::M3U8ParseError(e.to_string()))?
        .1)
}

/// Fetch and parse an HLS media playlist.
pub async fn get_hls_playlist(
    url: &str,
    options: &HlsRequestOptions,
) -> Result<MediaPlaylist, VideoError> {
    let client = client_of(options)?;
    let body = get_html(&client, url, options.headers.as_ref()).await?;

    Ok(parse_media_playlist(body.as_bytes())
        .map_err(|e| VideoError::M3U8ParseError(e.to_string()))?
        .1)
}

/// Fetch the raw bytes of one media segment.
pub async fn get_hls_segment(
    url: &str,
    options: &HlsRequestOptions,
) -> Result<Bytes, VideoError> {
    let client = client_of(options)?;

    let request = if let Some(headers) = options.headers.as_ref() {
        client.get(url).headers(headers.clone())
    } else {
        client.get(url)
    };

    let response = request
        .send()
        .await
        .map_err(VideoError::ReqwestMiddleware)?
        .error_for_status()
        .map_err(VideoError::Reqwest)?;

    response.bytes().await.map_err(VideoError::Reqwest)
}
