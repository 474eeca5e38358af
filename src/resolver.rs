use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, COOKIE, ORIGIN, REFERER,
    USER_AGENT,
};
use reqwest_middleware::ClientWithMiddleware;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::auth::{self, AuthBundle};
use crate::clients::{self, InnertubeClientConfig};
use crate::constants::{DEFAULT_MAX_RETRIES, DEFAULT_USER_AGENT, ORIGIN_URL};
use crate::player::{PlayerAcquirer, PlayerSnapshot};
use crate::pot::{PotClient, TokenProvider};
use crate::rewrite::{RewriteBatch, UrlRole};
#[cfg(feature = "live")]
use crate::stream::{LiveStream, LiveStreamOptions};
use crate::stream::{NonLiveStream, NonLiveStreamOptions, Stream as StreamTrait};
use crate::structs::{
    ClientOptions, PlayerResponse, Video, VideoError, VideoFormat,
};
use crate::utils::{add_format_meta, get_random_v6_ip, get_video_id, with_cancel};

/// Handle over the whole stream-resolution pipeline.
///
/// Owns the impersonation transport, the player snapshot (built once and
/// shared until [`refresh_player`](Client::refresh_player)), the token
/// provider and the identifiers captured along the way. Cheap to keep around;
/// resolve as many videos as you like through one instance.
pub struct Client {
    http: ClientWithMiddleware,
    options: ClientOptions,
    auth: Option<AuthBundle>,
    token_provider: TokenProvider,
    acquirer: PlayerAcquirer,
    player: RwLock<Option<Arc<PlayerSnapshot>>>,
    player_build: Mutex<()>,
    visitor_data: RwLock<Option<String>>,
    data_sync_id: RwLock<Option<String>>,
    cancel: CancellationToken,
}

impl Client {
    pub fn new(options: ClientOptions) -> Result<Self, VideoError> {
        let auth = resolve_auth(&options)?;

        let http = match options.request_options.client.clone() {
            Some(client) => client,
            None => {
                let mut headers = HeaderMap::new();
                let user_agent = options.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
                headers.insert(
                    USER_AGENT,
                    HeaderValue::from_str(user_agent).map_err(|_| VideoError::CookieError)?,
                );
                let accept_language = options
                    .accept_language
                    .as_deref()
                    .unwrap_or("en-US,en;q=0.5");
                headers.insert(
                    reqwest::header::ACCEPT_LANGUAGE,
                    HeaderValue::from_str(accept_language).map_err(|_| VideoError::CookieError)?,
                );

                let mut builder = reqwest::Client::builder().default_headers(headers);

                if let Some(proxy) = &options.request_options.proxy {
                    builder = builder.proxy(proxy.clone());
                }

                if let Some(ipv6_block) = &options.request_options.ipv6_block {
                    let ipv6 = get_random_v6_ip(ipv6_block)?;
                    builder = builder.local_address(ipv6);
                }

                builder.build().map_err(VideoError::Reqwest)?
            }
        };

        let max_retries = options
            .request_options
            .max_retries
            .unwrap_or(DEFAULT_MAX_RETRIES);
        let http = crate::utils::wrap_with_retry(http, max_retries);

        let token_provider = if let Some(token) = options.po_token.clone() {
            TokenProvider::Static { token }
        } else if let Some(url) = options.pot_server_url.clone() {
            TokenProvider::Oracle(PotClient::new(url)?)
        } else {
            TokenProvider::Disabled
        };

        let visitor_data = auth.as_ref().and_then(|a| a.visitor_id());

        Ok(Client {
            http,
            auth,
            token_provider,
            acquirer: PlayerAcquirer::new()?,
            player: RwLock::new(None),
            player_build: Mutex::new(()),
            visitor_data: RwLock::new(visitor_data),
            data_sync_id: RwLock::new(None),
            cancel: CancellationToken::new(),
            options,
        })
    }

    /// Resolve a video id or watch URL into a [`Video`] with fetchable URLs.
    pub async fn get_video(&self, id_or_url: impl AsRef<str>) -> Result<Video, VideoError> {
        let input = id_or_url.as_ref();
        let video_id =
            get_video_id(input).ok_or_else(|| VideoError::InvalidInput(input.to_string()))?;

        let snapshot = self.current_player().await?;
        let oracle_up = self.token_provider.is_available(&self.cancel).await;

        let mut last_error = VideoError::ApiRejected {
            status: "NO_CLIENT_ATTEMPTED".to_string(),
            reason: None,
        };

        for config in self.client_order() {
            if config.requires_auth && !self.is_authenticated() {
                tracing::debug!(client = config.name, "skipped: requires authentication");
                continue;
            }

            if config.requires_gvs_token() && !oracle_up {
                tracing::debug!(client = config.name, "skipped: token oracle unreachable");
                last_error =
                    VideoError::TokenUnavailable("oracle required by client but unreachable".into());
                continue;
            }

            match self
                .try_client(config, &video_id, &snapshot, oracle_up)
                .await
            {
                Ok(video) => return Ok(video),
                Err(VideoError::Cancelled) => return Err(VideoError::Cancelled),
                Err(err) => {
                    if self.options.debug {
                        tracing::debug!(client = config.name, "client rejected: {err}");
                    }
                    last_error = err;
                }
            }
        }

        Err(VideoError::AllClientsFailed {
            last: Box::new(last_error),
        })
    }

    /// Force the next resolve to download a fresh player script.
    pub async fn refresh_player(&self) {
        *self.player.write().await = None;
    }

    pub async fn set_visitor_data(&self, visitor_data: impl Into<String>) {
        *self.visitor_data.write().await = Some(visitor_data.into());
    }

    pub async fn visitor_data(&self) -> Option<String> {
        self.visitor_data.read().await.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.as_ref().map(AuthBundle::is_logged_in).unwrap_or(false)
    }

    /// Fire this token to abort every in-flight request of the client.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn token_provider(&self) -> &TokenProvider {
        &self.token_provider
    }

    /// Turn a resolved format into a chunked byte stream. HLS formats come
    /// back as a segment-following stream, everything else as a range
    /// downloader.
    pub async fn stream(
        &self,
        format: &VideoFormat,
    ) -> Result<Box<dyn StreamTrait + Send + Sync>, VideoError> {
        if format.url.is_empty() {
            return Err(VideoError::FormatNotFound);
        }

        if crate::stream::is_segmented(format) {
            #[cfg(feature = "live")]
            {
                let stream = LiveStream::new(LiveStreamOptions {
                    client: Some(self.http.clone()),
                    stream_url: format.url.clone(),
                    cancel: Some(self.cancel.clone()),
                })?;
                return Ok(Box::new(stream));
            }
            #[cfg(not(feature = "live"))]
            {
                return Err(VideoError::LiveStreamNotSupported);
            }
        }

        let stream = self.range_stream(format, 0, 0).await?;
        Ok(Box::new(stream))
    }

    /// Range-bounded variant: `[start, end]` inclusive, `end == 0` meaning
    /// to the end of the resource. The returned stream also knows the
    /// content length.
    pub async fn stream_with_range(
        &self,
        format: &VideoFormat,
        start: u64,
        end: u64,
    ) -> Result<NonLiveStream, VideoError> {
        if format.url.is_empty() {
            return Err(VideoError::FormatNotFound);
        }

        self.range_stream(format, start, end).await
    }

    /// Drain a format into `writer`; returns the number of bytes written.
    pub async fn download<W: std::io::Write + Send>(
        &self,
        format: &VideoFormat,
        writer: &mut W,
    ) -> Result<u64, VideoError> {
        let stream = self.stream(format).await?;
        crate::stream::download(stream.as_ref(), writer).await
    }

    /// Like [`download`](Client::download) with a per-chunk progress callback.
    pub async fn download_with_progress<W, F>(
        &self,
        format: &VideoFormat,
        writer: &mut W,
        callback: F,
    ) -> Result<u64, VideoError>
    where
        W: std::io::Write + Send,
        F: FnMut(crate::structs::DownloadProgress) + Send,
    {
        let stream = self.stream(format).await?;
        crate::stream::download_with_progress(stream.as_ref(), writer, callback).await
    }

    async fn range_stream(
        &self,
        format: &VideoFormat,
        start: u64,
        end: u64,
    ) -> Result<NonLiveStream, VideoError> {
        let content_length = match format.content_length {
            Some(len) if len > 0 => len,
            _ => {
                // Fall back to asking the stream server directly.
                let response = with_cancel(&self.cancel, async {
                    self.http
                        .get(&format.url)
                        .send()
                        .await
                        .map_err(VideoError::ReqwestMiddleware)
                })
                .await?;

                response.content_length().unwrap_or(0)
            }
        };

        NonLiveStream::new(NonLiveStreamOptions {
            client: Some(self.http.clone()),
            link: format.url.clone(),
            content_length,
            dl_chunk_size: crate::constants::DEFAULT_DL_CHUNK_SIZE,
            start,
            end,
            max_retries: self
                .options
                .request_options
                .max_retries
                .unwrap_or(DEFAULT_MAX_RETRIES),
            cancel: Some(self.cancel.clone()),
        })
    }

    /// Build-once access to the player snapshot: readers see either nothing
    /// or a completely extracted snapshot, and only one builder runs.
    async fn current_player(&self) -> Result<Arc<PlayerSnapshot>, VideoError> {
        if let Some(snapshot) = self.player.read().await.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let _guard = self.player_build.lock().await;

        if let Some(snapshot) = self.player.read().await.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let acquired = self.acquirer.acquire(&self.cancel).await?;

        if let Some(visitor_data) = acquired.visitor_data {
            let mut slot = self.visitor_data.write().await;
            if slot.is_none() {
                *slot = Some(visitor_data);
            }
        }

        let snapshot = Arc::new(acquired.snapshot);
        *self.player.write().await = Some(Arc::clone(&snapshot));

        tracing::debug!(
            player_id = snapshot.player_id(),
            sts = snapshot.signature_timestamp(),
            "player snapshot published"
        );

        Ok(snapshot)
    }

    fn client_order(&self) -> Vec<&'static InnertubeClientConfig> {
        if let Some(names) = &self.options.client_order {
            let order: Vec<_> = names
                .iter()
                .filter_map(|name| clients::lookup(name))
                .collect();
            if !order.is_empty() {
                return order;
            }
        }

        if self.is_authenticated() {
            if self.options.premium {
                clients::premium_order()
            } else {
                clients::authenticated_order()
            }
        } else {
            clients::anonymous_order()
        }
    }

    async fn try_client(
        &self,
        config: &'static InnertubeClientConfig,
        video_id: &str,
        snapshot: &Arc<PlayerSnapshot>,
        oracle_up: bool,
    ) -> Result<Video, VideoError> {
        let visitor_data = self.visitor_data.read().await.clone();

        let mut body = json!({
            "context": config.context_json(
                visitor_data.as_deref(),
                self.options.accept_language.as_deref().unwrap_or("en"),
            ),
            "videoId": video_id,
            "playbackContext": {
                "contentPlaybackContext": {
                    "signatureTimestamp": snapshot.signature_timestamp(),
                    "html5Preference": "HTML5_PREF_WANTS"
                }
            },
            "racyCheckOk": true,
            "contentCheckOk": true,
        });

        // A failed mint is not fatal; the request may still be admitted.
        if config.wants_player_token() && oracle_up {
            match self.token_provider.get_token(video_id, &self.cancel).await {
                Ok(token) => {
                    body["serviceIntegrityDimensions"] = json!({ "poToken": token });
                }
                Err(err) => {
                    tracing::debug!(client = config.name, "player token mint failed: {err}");
                }
            }
        }

        let headers = self.api_headers(config, visitor_data.as_deref())?;
        let url = format!("https://{}/youtubei/v1/player?prettyPrint=false", config.host);

        let response_text = with_cancel(&self.cancel, async {
            let response = self
                .http
                .post(&url)
                .headers(headers)
                .json(&body)
                .send()
                .await
                .map_err(VideoError::ReqwestMiddleware)?;

            response
                .text()
                .await
                .map_err(|_x| VideoError::BodyCannotParsed)
        })
        .await?;

        // Logged-in responses reveal the session identifier here; the
        // visitor identifier also rides along when we have none yet.
        if self.data_sync_id.read().await.is_none() {
            if let Some(data_sync_id) = auth::extract_data_sync_id_from_response(&response_text) {
                *self.data_sync_id.write().await = Some(data_sync_id);
            }
        }
        if self.visitor_data.read().await.is_none() {
            if let Some(visitor) = auth::extract_visitor_from_html(&response_text) {
                *self.visitor_data.write().await = Some(visitor);
            }
        }

        let player_response: PlayerResponse = serde_json::from_str(&response_text)?;

        let status = player_response
            .playability_status
            .as_ref()
            .and_then(|x| x.status.clone())
            .unwrap_or_else(|| "UNKNOWN".to_string());

        if status != "OK" {
            let reason = player_response
                .playability_status
                .as_ref()
                .and_then(|x| x.reason.clone());
            return Err(VideoError::ApiRejected { status, reason });
        }

        let data_sync_id = self.data_sync_id.read().await.clone();
        let visitor_data = self.visitor_data.read().await.clone();

        let gvs_token = if config.wants_gvs_token() && oracle_up {
            match self
                .token_provider
                .get_gvs_token(
                    visitor_data.as_deref().unwrap_or(""),
                    data_sync_id.as_deref().unwrap_or(""),
                    &self.cancel,
                )
                .await
            {
                Ok(token) => Some(token),
                Err(err) => {
                    tracing::debug!(client = config.name, "GVS token mint failed: {err}");
                    None
                }
            }
        } else {
            None
        };

        Ok(assemble_video(
            snapshot,
            video_id,
            player_response,
            gvs_token.as_deref(),
            visitor_data,
            data_sync_id,
        ))
    }

    fn api_headers(
        &self,
        config: &InnertubeClientConfig,
        visitor_data: Option<&str>,
    ) -> Result<HeaderMap, VideoError> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ORIGIN, HeaderValue::from_static(ORIGIN_URL));
        headers.insert(REFERER, HeaderValue::from_static("https://www.youtube.com/"));

        if let Ok(name) = HeaderValue::from_str(&config.context_id.to_string()) {
            headers.insert(HeaderName::from_static("x-youtube-client-name"), name);
        }
        if let Ok(version) = HeaderValue::from_str(config.version) {
            headers.insert(HeaderName::from_static("x-youtube-client-version"), version);
        }

        let user_agent = config
            .user_agent
            .or(self.options.user_agent.as_deref())
            .unwrap_or(DEFAULT_USER_AGENT);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent).map_err(|_| VideoError::CookieError)?,
        );

        if let Some(visitor_data) = visitor_data {
            if let Ok(value) = HeaderValue::from_str(visitor_data) {
                headers.insert(HeaderName::from_static("x-goog-visitor-id"), value);
            }
        }

        if let Some(auth) = self.auth.as_ref().filter(|a| a.is_logged_in()) {
            if config.supports_cookies {
                headers.insert(
                    COOKIE,
                    HeaderValue::from_str(&auth.cookie_header())
                        .map_err(|_| VideoError::CookieError)?,
                );

                if let Some(authorization) = auth.authorization_header(ORIGIN_URL) {
                    headers.insert(
                        AUTHORIZATION,
                        HeaderValue::from_str(&authorization)
                            .map_err(|_| VideoError::CookieError)?,
                    );
                }

                headers.insert(
                    HeaderName::from_static("x-origin"),
                    HeaderValue::from_static(ORIGIN_URL),
                );
            }
        }

        Ok(headers)
    }
}

fn resolve_auth(options: &ClientOptions) -> Result<Option<AuthBundle>, VideoError> {
    if let Some(auth) = options.auth.clone() {
        return Ok(Some(auth));
    }
    if let Some(path) = &options.cookie_file {
        return AuthBundle::from_cookie_file(path).map(Some);
    }
    if let Some(path) = &options.cookie_json_file {
        return AuthBundle::from_json_file(path).map(Some);
    }
    if let Some(header) = &options.cookie_header {
        return Ok(Some(AuthBundle::from_cookie_header(header)));
    }
    Ok(None)
}

/// Turn an admitted player response into the final [`Video`].
///
/// Pure assembly: every format URL runs through the rewrite pipeline, one
/// per-format failure skips that format only, and positions are preserved
/// with respect to `formats` then `adaptiveFormats`.
fn assemble_video(
    snapshot: &PlayerSnapshot,
    video_id: &str,
    player_response: PlayerResponse,
    gvs_token: Option<&str>,
    visitor_data: Option<String>,
    data_sync_id: Option<String>,
) -> Video {
    let details = player_response.video_details.unwrap_or_default();
    let streaming = player_response.streaming_data;

    let mut batch = RewriteBatch::new(snapshot);

    let mut formats: Vec<VideoFormat> = Vec::new();
    let mut hls_manifest_url = None;
    let mut dash_manifest_url = None;

    if let Some(streaming) = streaming {
        let raw_formats: Vec<_> = streaming
            .formats
            .unwrap_or_default()
            .into_iter()
            .chain(streaming.adaptive_formats.unwrap_or_default())
            .collect();

        for raw in &raw_formats {
            // Entries with neither a URL nor a cipher cannot be fetched.
            if raw.url.is_none() && raw.signature_cipher.is_none() && raw.cipher.is_none() {
                continue;
            }

            let Some(mut format) = VideoFormat::from_raw(raw) else {
                continue;
            };

            match batch.rewrite_format(raw, gvs_token) {
                Ok(url) => {
                    format.url = url;
                    add_format_meta(&mut format);
                    formats.push(format);
                }
                Err(err) => {
                    tracing::debug!(itag = raw.itag, "format skipped: {err}");
                }
            }
        }

        hls_manifest_url = streaming
            .hls_manifest_url
            .map(|u| batch.rewrite_url(&u, UrlRole::Manifest, gvs_token));
        dash_manifest_url = streaming
            .dash_manifest_url
            .map(|u| batch.rewrite_url(&u, UrlRole::Manifest, gvs_token));
    }

    Video {
        id: details
            .video_id
            .clone()
            .unwrap_or_else(|| video_id.to_string()),
        title: details.title.clone().unwrap_or_default(),
        author: details.author.clone().unwrap_or_default(),
        channel_id: details.channel_id.clone().unwrap_or_default(),
        length_seconds: details
            .length_seconds
            .as_deref()
            .and_then(|x| x.parse().ok())
            .unwrap_or(0),
        view_count: details
            .view_count
            .as_deref()
            .and_then(|x| x.parse().ok())
            .unwrap_or(0),
        is_live: details
            .is_live_content
            .or(details.is_live)
            .unwrap_or(false),
        is_private: details.is_private.unwrap_or(false),
        thumbnails: details
            .thumbnail
            .and_then(|t| t.thumbnails)
            .unwrap_or_default(),
        formats,
        hls_manifest_url,
        dash_manifest_url,
        visitor_data,
        data_sync_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYER_FIXTURE: &str = concat!(
        r#"var GxU={"#,
        r#"Dv0:function(a){a.reverse()},"#,
        r#"q8:function(a,b){a.splice(0,b)},"#,
        r#"tR:function(a,b){var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c}};"#,
        "\n",
        r#"kWa=function(a){a=a.split("");GxU.Dv0(a,1);GxU.q8(a,2);return a.join("")};"#,
        "\n",
        r#"var sig=function(c){a.set("alr","yes");c&&(c=kWa(decodeURIComponent(c)))};"#,
        "\n",
        r#"var mfn=function(a){var b=a.split("");b.reverse();var c={go:function(d){d.push("Z")}};c.go(b);return b.join("")};"#,
        "\n",
        r#"e.j&&(f=e.get("n"))&&(f=mfn(f),e.set("n",f));"#,
        "\n",
        r#"var cfg={signatureTimestamp:19834};"#,
    );

    fn response_fixture() -> PlayerResponse {
        serde_json::from_str(
            r#"{
                "playabilityStatus": {"status": "OK"},
                "videoDetails": {
                    "videoId": "dQw4w9WgXcQ",
                    "title": "Test Video",
                    "author": "Test Author",
                    "channelId": "UC123",
                    "lengthSeconds": "212",
                    "viewCount": "1000000",
                    "isLiveContent": false,
                    "isPrivate": false,
                    "thumbnail": {"thumbnails": [{"width": 120, "height": 90, "url": "https://i.example/default.jpg"}]}
                },
                "streamingData": {
                    "hlsManifestUrl": "https://manifest.example/api/manifest/hls_variant/x/",
                    "formats": [
                        {
                            "itag": 18,
                            "mimeType": "video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"",
                            "bitrate": 500000,
                            "qualityLabel": "360p",
                            "audioQuality": "AUDIO_QUALITY_LOW",
                            "contentLength": "1000",
                            "url": "https://r.example/videoplayback?id=18&n=abc"
                        }
                    ],
                    "adaptiveFormats": [
                        {
                            "itag": 251,
                            "mimeType": "audio/webm; codecs=\"opus\"",
                            "bitrate": 160000,
                            "audioQuality": "AUDIO_QUALITY_MEDIUM",
                            "contentLength": "2000",
                            "signatureCipher": "s=abcdefgh&sp=sig&url=https%3A%2F%2Fr.example%2Fvideoplayback%3Fid%3D251%26n%3Dabc"
                        },
                        {
                            "itag": 137,
                            "mimeType": "video/mp4; codecs=\"avc1.640028\"",
                            "bitrate": 2500000,
                            "qualityLabel": "1080p",
                            "contentLength": "3000"
                        }
                    ]
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn assemble_rewrites_every_format() {
        let snapshot = PlayerSnapshot::from_script(
            "https://www.youtube.com/s/player/0badcafe/base.js",
            PLAYER_FIXTURE,
        );

        let video = assemble_video(
            &snapshot,
            "dQw4w9WgXcQ",
            response_fixture(),
            Some("TOKEN"),
            Some("visitor".into()),
            None,
        );

        assert_eq!(video.id, "dQw4w9WgXcQ");
        assert_eq!(video.title, "Test Video");
        assert_eq!(video.length_seconds, 212);
        assert_eq!(video.view_count, 1_000_000);

        // The format without url and cipher is dropped; order is preserved.
        assert_eq!(video.formats.len(), 2);
        assert_eq!(video.formats[0].itag, 18);
        assert_eq!(video.formats[1].itag, 251);

        for format in &video.formats {
            assert!(!format.url.contains("&s="), "{}", format.url);
            assert!(!format.url.contains("?s="), "{}", format.url);
            assert!(!format.url.contains("sp="), "{}", format.url);
            assert!(format.url.contains("pot=TOKEN"), "{}", format.url);
            assert!(format.url.contains("n=cbaZ"), "{}", format.url);
        }

        // Cipher format got its deciphered signature appended.
        assert!(video.formats[1].url.contains("sig=fedcba"));

        // Manifest URLs carry the path-attached token.
        assert_eq!(
            video.hls_manifest_url.as_deref(),
            Some("https://manifest.example/api/manifest/hls_variant/x/pot/TOKEN")
        );

        // Meta flags derived from the parsed fields.
        assert!(video.formats[0].has_video && video.formats[0].has_audio);
        assert!(!video.formats[1].has_video && video.formats[1].has_audio);
    }

    #[test]
    fn assemble_without_token_leaves_urls_bare() {
        let snapshot = PlayerSnapshot::from_script(
            "https://www.youtube.com/s/player/0badcafe/base.js",
            PLAYER_FIXTURE,
        );

        let video = assemble_video(
            &snapshot,
            "dQw4w9WgXcQ",
            response_fixture(),
            None,
            None,
            None,
        );

        for format in &video.formats {
            assert!(!format.url.contains("pot="), "{}", format.url);
        }
        assert!(!video.hls_manifest_url.as_deref().unwrap().contains("/pot/"));
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_any_network() {
        let client = Client::new(ClientOptions::default()).unwrap();
        let err = client.get_video("definitely not a video").await;
        assert!(matches!(err, Err(VideoError::InvalidInput(_))));
    }

    #[test]
    fn order_selection_follows_auth_state() {
        let anonymous = Client::new(ClientOptions::default()).unwrap();
        let order: Vec<&str> = anonymous.client_order().iter().map(|c| c.name).collect();
        assert_eq!(order, ["ANDROID", "WEB", "TVHTML5"]);

        let authenticated = Client::new(ClientOptions {
            cookie_header: Some("SID=x; SAPISID=y".to_string()),
            ..Default::default()
        })
        .unwrap();
        let order: Vec<&str> = authenticated
            .client_order()
            .iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(
            order,
            ["TVHTML5_SIMPLY_EMBEDDED_PLAYER", "WEB_EMBEDDED_PLAYER", "WEB"]
        );

        let premium = Client::new(ClientOptions {
            cookie_header: Some("SID=x; SAPISID=y".to_string()),
            premium: true,
            ..Default::default()
        })
        .unwrap();
        let order: Vec<&str> = premium.client_order().iter().map(|c| c.name).collect();
        assert_eq!(order, ["TVHTML5_SIMPLY_EMBEDDED_PLAYER", "WEB_CREATOR", "WEB"]);

        let overridden = Client::new(ClientOptions {
            client_order: Some(vec!["IOS".to_string(), "WEB".to_string()]),
            ..Default::default()
        })
        .unwrap();
        let order: Vec<&str> = overridden.client_order().iter().map(|c| c.name).collect();
        assert_eq!(order, ["IOS", "WEB"]);
    }

    #[test]
    fn authenticated_headers_carry_auth_trio() {
        let client = Client::new(ClientOptions {
            cookie_header: Some("SID=x; __Secure-3PAPISID=hash".to_string()),
            ..Default::default()
        })
        .unwrap();

        let config = clients::lookup("WEB").unwrap();
        let headers = client.api_headers(config, Some("visitor")).unwrap();

        assert_eq!(
            headers.get(COOKIE).unwrap().to_str().unwrap(),
            "SID=x; __Secure-3PAPISID=hash"
        );
        assert!(headers
            .get(AUTHORIZATION)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("SAPISIDHASH "));
        assert_eq!(
            headers.get("x-origin").unwrap().to_str().unwrap(),
            ORIGIN_URL
        );
        assert_eq!(
            headers.get("x-youtube-client-name").unwrap().to_str().unwrap(),
            "1"
        );
    }

    #[test]
    fn cookie_free_clients_never_send_cookies() {
        let client = Client::new(ClientOptions {
            cookie_header: Some("SID=x; __Secure-3PAPISID=hash".to_string()),
            ..Default::default()
        })
        .unwrap();

        let config = clients::lookup("ANDROID").unwrap();
        let headers = client.api_headers(config, None).unwrap();

        assert!(headers.get(COOKIE).is_none());
        assert!(headers.get(AUTHORIZATION).is_none());
    }
}
