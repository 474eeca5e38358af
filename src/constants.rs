use once_cell::sync::Lazy;
use std::time::Duration;

pub const BASE_URL: &str = "https://www.youtube.com/watch?v=";

pub const ORIGIN_URL: &str = "https://www.youtube.com";

pub const EMBED_URL: &str = "https://www.youtube.com/embed/";

pub const IFRAME_API_URL: &str = "https://www.youtube.com/iframe_api";

/// Any public, never-deleted video works here; the watch page is only fetched
/// to discover the current player script.
pub const PLAYER_PROBE_VIDEO_ID: &str = "jNQXAC9IVRw";

pub const DEFAULT_POT_SERVER_URL: &str = "http://127.0.0.1:4416";

/// Fallback lifetime for proof-of-origin tokens when the oracle response
/// carries no usable `expiresAt`.
pub const DEFAULT_POT_TTL: Duration = Duration::from_secs(5 * 60 * 60);

pub const POT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_DL_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

pub const VALID_QUERY_DOMAINS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "gaming.youtube.com",
];

pub const AUDIO_ENCODING_RANKS: &[&str] = &["mp4a", "mp3", "vorbis", "aac", "opus", "flac"];
pub const VIDEO_ENCODING_RANKS: &[&str] = &[
    "mp4v",
    "avc1",
    "Sorenson H.283",
    "MPEG-4 Visual",
    "VP8",
    "VP9",
    "H.264",
];

pub(crate) const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

pub(crate) static DEFAULT_HEADERS: Lazy<reqwest::header::HeaderMap> = Lazy::new(|| {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        DEFAULT_USER_AGENT.parse().unwrap(),
    );
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        "en-US,en;q=0.5".parse().unwrap(),
    );

    headers
});

pub(crate) static IPV6_REGEX: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(r#"^(([0-9a-f]{1,4}:)(:[0-9a-f]{1,4}){1,6}|([0-9a-f]{1,4}:){1,2}(:[0-9a-f]{1,4}){1,5}|([0-9a-f]{1,4}:){1,3}(:[0-9a-f]{1,4}){1,4}|([0-9a-f]{1,4}:){1,4}(:[0-9a-f]{1,4}){1,3}|([0-9a-f]{1,4}:){1,5}(:[0-9a-f]{1,4}){1,2}|([0-9a-f]{1,4}:){1,6}(:[0-9a-f]{1,4})|([0-9a-f]{1,4}:){1,7}(([0-9a-f]{1,4})|:))/(1[0-1]\d|12[0-8]|\d{1,2})$"#).unwrap()
});

pub(crate) static PARSE_INT_REGEX: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r#"(?m)^\s*((\-|\+)?[0-9]+)\s*"#).unwrap());
