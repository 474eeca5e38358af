use mime::Mime;
use serde::{
    de::{Error, Unexpected},
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::{path::PathBuf, str::FromStr};

use crate::auth::AuthBundle;

/// A fully resolved video: metadata plus the playable format list.
///
/// Every URL in [`formats`](Video::formats) (and the manifest URLs) has
/// already been passed through signature decipher, n-parameter solve and
/// proof-of-origin token attachment; they can be fetched as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(rename = "channelId")]
    pub channel_id: String,
    #[serde(rename = "lengthSeconds")]
    pub length_seconds: u64,
    #[serde(rename = "viewCount")]
    pub view_count: u64,
    #[serde(rename = "isLive")]
    pub is_live: bool,
    #[serde(rename = "isPrivate")]
    pub is_private: bool,
    pub thumbnails: Vec<Thumbnail>,
    pub formats: Vec<VideoFormat>,
    #[serde(rename = "hlsManifestUrl")]
    pub hls_manifest_url: Option<String>,
    #[serde(rename = "dashManifestUrl")]
    pub dash_manifest_url: Option<String>,
    #[serde(rename = "visitorData")]
    pub visitor_data: Option<String>,
    #[serde(rename = "dataSyncId")]
    pub data_sync_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoFormat {
    /// Video format itag number
    pub itag: u64,
    /// Video format mime type
    #[serde(rename = "mimeType")]
    pub mime_type: MimeType,
    /// Rewritten, directly fetchable URL
    pub url: String,
    pub bitrate: u64,
    #[serde(rename = "averageBitrate")]
    pub average_bitrate: Option<u64>,
    #[serde(rename = "contentLength")]
    pub content_length: Option<u64>,
    pub width: Option<u64>,  // VIDEO ONLY
    pub height: Option<u64>, // VIDEO ONLY
    pub fps: Option<u64>,    // VIDEO ONLY
    pub quality: Option<String>,
    #[serde(rename = "qualityLabel")]
    pub quality_label: Option<String>,
    #[serde(rename = "audioQuality")]
    pub audio_quality: Option<String>, // AUDIO ONLY
    #[serde(rename = "audioChannels")]
    pub audio_channels: Option<u8>, // AUDIO ONLY
    #[serde(rename = "audioSampleRate")]
    pub audio_sample_rate: Option<String>, // AUDIO ONLY
    #[serde(rename = "audioBitrate")]
    pub audio_bitrate: Option<u64>,
    #[serde(rename = "initRange")]
    pub init_range: Option<RangeObject>, // ADAPTIVE ONLY
    #[serde(rename = "indexRange")]
    pub index_range: Option<RangeObject>, // ADAPTIVE ONLY
    #[serde(rename = "approxDurationMs")]
    pub approx_duration_ms: Option<String>,
    /// Video format has video or not
    #[serde(rename = "hasVideo")]
    pub has_video: bool,
    /// Video format has audio or not
    #[serde(rename = "hasAudio")]
    pub has_audio: bool,
    /// Video is live or not
    #[serde(rename = "isLive")]
    pub is_live: bool,
    /// Video format is HLS or not
    #[serde(rename = "isHLS")]
    pub is_hls: bool,
    /// Video format is DashMPD or not
    #[serde(rename = "isDashMPD")]
    pub is_dash_mpd: bool,
}

impl VideoFormat {
    /// Build a format from the raw API entry. The URL is left empty; the
    /// resolver fills it in after rewriting.
    pub(crate) fn from_raw(value: &RawFormat) -> Option<Self> {
        let mime_type = value.mime_type.clone()?;

        Some(Self {
            itag: value.itag.unwrap_or_default(),
            mime_type,
            url: String::new(),
            bitrate: value.bitrate.unwrap_or_default(),
            average_bitrate: value.average_bitrate,
            content_length: value
                .content_length
                .as_deref()
                .and_then(|x| x.parse::<u64>().ok()),
            width: value.width,
            height: value.height,
            fps: value.fps,
            quality: value.quality.clone(),
            quality_label: value.quality_label.clone(),
            audio_quality: value.audio_quality.clone(),
            audio_channels: value.audio_channels,
            audio_sample_rate: value.audio_sample_rate.clone(),
            audio_bitrate: value.audio_bitrate,
            init_range: value.init_range.clone(),
            index_range: value.index_range.clone(),
            approx_duration_ms: value.approx_duration_ms.clone(),
            has_video: false,
            has_audio: false,
            is_live: false,
            is_hls: false,
            is_dash_mpd: false,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeObject {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub width: u64,
    pub height: u64,
    pub url: String,
}

/// Format filter used by [`choose_format`](crate::choose_format).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VideoSearchOptions {
    /// Video & Audio
    VideoAudio,
    /// Only Video
    Video,
    /// Only Audio
    Audio,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VideoQuality {
    Highest,
    Lowest,
    HighestAudio,
    LowestAudio,
    HighestVideo,
    LowestVideo,
}

/// Format selection options
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoOptions {
    pub quality: VideoQuality,
    pub filter: VideoSearchOptions,
}

impl Default for VideoOptions {
    fn default() -> Self {
        VideoOptions {
            quality: VideoQuality::Highest,
            filter: VideoSearchOptions::Audio,
        }
    }
}

/// Transport-level knobs shared by every request the client makes.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    /// [`reqwest::Client`] to use on requests. If provided, `proxy` and
    /// `ipv6_block` are ignored.
    pub client: Option<reqwest::Client>,
    /// [`reqwest::Proxy`] to use on requests
    pub proxy: Option<reqwest::Proxy>,
    /// Custom IPv6 block, e.g. `"2001:4::/48"`; a random address inside the
    /// block is bound as the local address.
    pub ipv6_block: Option<String>,
    /// Override the default number of retries per web request.
    /// Default is [`crate::constants::DEFAULT_MAX_RETRIES`].
    pub max_retries: Option<u32>,
}

/// Options for [`Client::new`](crate::Client::new).
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// Proof-of-origin token oracle endpoint.
    /// Default is [`crate::constants::DEFAULT_POT_SERVER_URL`].
    pub pot_server_url: Option<String>,
    /// Statically configured proof-of-origin token; replaces the oracle.
    pub po_token: Option<String>,
    /// User agent for requests without a per-client override
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
    /// Override the default innertube client order with the named clients
    pub client_order: Option<Vec<String>>,
    /// Select the premium client order when authenticated
    pub premium: bool,
    /// Log every intermediate admission failure
    pub debug: bool,
    /// Pre-built cookie bundle; takes precedence over the loader paths below
    pub auth: Option<AuthBundle>,
    /// Netscape cookie file (tab separated) to load
    pub cookie_file: Option<PathBuf>,
    /// Browser JSON cookie export to load
    pub cookie_json_file: Option<PathBuf>,
    /// Raw `Cookie` header string to load
    pub cookie_header: Option<String>,
    pub request_options: RequestOptions,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            pot_server_url: Some(crate::constants::DEFAULT_POT_SERVER_URL.to_string()),
            po_token: None,
            user_agent: None,
            accept_language: None,
            client_order: None,
            premium: false,
            debug: false,
            auth: None,
            cookie_file: None,
            cookie_json_file: None,
            cookie_header: None,
            request_options: RequestOptions::default(),
        }
    }
}

/// Per-chunk download progress passed to
/// [`download_with_progress`](crate::stream::download_with_progress).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DownloadProgress {
    pub total: u64,
    pub downloaded: u64,
    pub speed_bytes_per_sec: u64,
}

#[derive(thiserror::Error, Debug)]
pub enum VideoError {
    /// Identifier parse failed
    #[error("Not a valid video id or watch URL: {0}")]
    InvalidInput(String),
    /// No acquisition source yielded a player script
    #[error("No source yielded a player script URL")]
    PlayerUnavailable,
    /// Player script downloaded but a required artifact could not be located
    #[error("Player script could not be parsed: {0}")]
    PlayerParseFailed(String),
    /// Token oracle unreachable or returned an error/empty token
    #[error("Proof-of-origin token unavailable: {0}")]
    TokenUnavailable(String),
    /// `playabilityStatus.status` was not `"OK"`
    #[error("API rejected playback ({status}): {}", .reason.as_deref().unwrap_or("no reason given"))]
    ApiRejected {
        status: String,
        reason: Option<String>,
    },
    /// Every client in the chosen order was rejected
    #[error("All innertube clients failed: {last}")]
    AllClientsFailed { last: Box<VideoError> },
    /// Signature cipher blob carried no `url` field
    #[error("Malformed signature cipher")]
    CipherFailed,
    /// Caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,
    /// Reqwest error
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    /// ReqwestMiddleware error
    #[error(transparent)]
    ReqwestMiddleware(#[from] reqwest_middleware::Error),
    /// URL cannot parsed
    #[error(transparent)]
    URLParseError(#[from] url::ParseError),
    /// JSON body cannot parsed
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    /// Body cannot parsed
    #[error("Body cannot parsed")]
    BodyCannotParsed,
    /// Format not found
    #[error("Format not found")]
    FormatNotFound,
    /// Invalid IPv6 format
    #[error("Invalid IPv6 format")]
    InvalidIPv6Format,
    /// Invalid IPv6 subnet
    #[error("Invalid IPv6 subnet")]
    InvalidIPv6Subnet,
    /// M3U8 parse error
    #[error("M3U8 Parse Error: {0}")]
    M3U8ParseError(String),
    /// Download error
    #[error("Download Error: {0}")]
    DownloadError(String),
    /// Encryption error
    #[error("Encryption Error: {0}")]
    EncryptionError(String),
    /// Decryption error
    #[error("Decryption Error: {0}")]
    DecryptionError(String),
    /// Hex decode error
    #[error(transparent)]
    HexError(#[from] hex::FromHexError),
    /// Downloading live streams not supported, compile with `live` feature to enable
    #[error("Downloading live streams not supported, compile with `live` feature to enable")]
    LiveStreamNotSupported,
    /// Provided cookie contains invalid header value characters. Only visible ASCII characters (32-127) are permitted.
    #[error("Provided cookie contains invalid header value characters. Only visible ASCII characters (32-127) are permitted")]
    CookieError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeType {
    pub mime: Mime,
    /// Mime container
    pub container: String,
    /**
     * Mime codec parameters

     **Mime type:** [`mime::AUDIO`] or [`mime::VIDEO`] => contains 1 element and its audio/video codec

     **Mime type:** [`mime::VIDEO`] => if contains 2 element, first is video and second is audio codec
    */
    pub codecs: Vec<String>,
    /// Video codec parameter
    pub video_codec: Option<String>,
    /// Audio codec parameter
    pub audio_codec: Option<String>,
}

impl Serialize for MimeType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = format!(
            r#"{}/{}; codecs="{}""#,
            self.mime.type_(),
            self.mime.subtype(),
            self.codecs.join(", "),
        );

        s.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MimeType {
    fn deserialize<D>(deserializer: D) -> Result<MimeType, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        let mime: Mime = Mime::from_str(&s).map_err(|_| {
            D::Error::invalid_value(
                Unexpected::Str(&s),
                &r#"valid mime type format must be `(\w+/\w+);\scodecs="([a-zA-Z-0-9.,\s]*)"`"#,
            )
        })?;

        let codecs: Vec<String> = mime
            .get_param("codecs")
            .map(|x| x.as_str().split(", ").map(|x| x.to_string()).collect())
            .unwrap_or_default();

        let container: String = mime.subtype().to_string();

        let video_codec = if mime.type_() == mime::VIDEO {
            codecs.first().cloned()
        } else {
            None
        };

        let audio_codec = if mime.type_() == mime::AUDIO {
            codecs.first().cloned()
        } else {
            codecs.get(1).cloned()
        };

        Ok(MimeType {
            mime,
            container,
            codecs,
            video_codec,
            audio_codec,
        })
    }
}

// Raw wire model of the `/youtubei/v1/player` response. Only the fields the
// resolver reads are declared; everything else is ignored.

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PlayerResponse {
    #[serde(rename = "playabilityStatus")]
    pub playability_status: Option<PlayabilityStatus>,
    #[serde(rename = "streamingData")]
    pub streaming_data: Option<StreamingData>,
    #[serde(rename = "videoDetails")]
    pub video_details: Option<RawVideoDetails>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayabilityStatus {
    pub status: Option<String>,
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamingData {
    #[serde(rename = "dashManifestUrl")]
    pub dash_manifest_url: Option<String>,
    #[serde(rename = "hlsManifestUrl")]
    pub hls_manifest_url: Option<String>,
    pub formats: Option<Vec<RawFormat>>,
    #[serde(rename = "adaptiveFormats")]
    pub adaptive_formats: Option<Vec<RawFormat>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawFormat {
    pub itag: Option<u64>,
    #[serde(rename = "mimeType")]
    pub mime_type: Option<MimeType>,
    pub bitrate: Option<u64>,
    #[serde(rename = "averageBitrate")]
    pub average_bitrate: Option<u64>,
    pub width: Option<u64>,
    pub height: Option<u64>,
    pub fps: Option<u64>,
    #[serde(rename = "initRange")]
    pub init_range: Option<RangeObject>,
    #[serde(rename = "indexRange")]
    pub index_range: Option<RangeObject>,
    #[serde(rename = "contentLength")]
    pub content_length: Option<String>,
    pub quality: Option<String>,
    #[serde(rename = "qualityLabel")]
    pub quality_label: Option<String>,
    #[serde(rename = "audioQuality")]
    pub audio_quality: Option<String>,
    #[serde(rename = "audioChannels")]
    pub audio_channels: Option<u8>,
    #[serde(rename = "audioSampleRate")]
    pub audio_sample_rate: Option<String>,
    #[serde(rename = "audioBitrate")]
    pub audio_bitrate: Option<u64>,
    #[serde(rename = "approxDurationMs")]
    pub approx_duration_ms: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "signatureCipher")]
    pub signature_cipher: Option<String>,
    pub cipher: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct RawVideoDetails {
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    #[serde(rename = "channelId")]
    pub channel_id: Option<String>,
    #[serde(rename = "lengthSeconds")]
    pub length_seconds: Option<String>,
    #[serde(rename = "viewCount")]
    pub view_count: Option<String>,
    #[serde(rename = "isLiveContent")]
    pub is_live_content: Option<bool>,
    #[serde(rename = "isLive")]
    pub is_live: Option<bool>,
    #[serde(rename = "isPrivate")]
    pub is_private: Option<bool>,
    pub thumbnail: Option<RawThumbnails>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct RawThumbnails {
    pub thumbnails: Option<Vec<Thumbnail>>,
}
