use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use reqwest_middleware::ClientWithMiddleware;
use std::{
    cmp::Ordering,
    future::Future,
    net::{IpAddr, Ipv6Addr},
    time::Duration,
};
use tokio_util::sync::CancellationToken;

use crate::{
    constants::{
        AUDIO_ENCODING_RANKS, IPV6_REGEX, PARSE_INT_REGEX, VALID_QUERY_DOMAINS,
        VIDEO_ENCODING_RANKS,
    },
    structs::{VideoError, VideoFormat, VideoOptions, VideoQuality, VideoSearchOptions},
};

/// Excavate video id from URLs or id with Regex
pub fn get_video_id(url_or_id: &str) -> Option<String> {
    static URL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://").unwrap());

    if validate_id(url_or_id.trim()) {
        Some(url_or_id.trim().to_string())
    } else if URL_REGEX.is_match(url_or_id.trim()) {
        get_url_video_id(url_or_id)
    } else {
        None
    }
}

pub fn validate_id(id: &str) -> bool {
    static ID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9-_]{11}$").unwrap());
    ID_REGEX.is_match(id)
}

fn get_url_video_id(url: &str) -> Option<String> {
    static VALID_PATH_DOMAINS: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)(?:^|\W)(?:youtube(?:-nocookie)?\.com/(?:.*[?&]v=|v/|shorts/|e(?:mbed)?/|[^/]+/.+/)|youtu\.be/)([\w-]{11})")
        .unwrap()
    });

    let parsed = url::Url::parse(url.trim()).ok()?;

    let known_host = parsed
        .host_str()
        .map(|host| VALID_QUERY_DOMAINS.iter().any(|domain| *domain == host))
        .unwrap_or(false);

    if known_host {
        if let Some(id) = parsed.query_pairs().find_map(|(key, value)| {
            if key == "v" {
                Some(value.to_string())
            } else {
                None
            }
        }) {
            let id: String = id.chars().take(11).collect();
            return Some(id).filter(|id| validate_id(id));
        }
    }

    if let Some(captures) = VALID_PATH_DOMAINS.captures(url.trim()) {
        if let Some(id) = captures.get(1).map(|m| m.as_str().to_string()) {
            return Some(id).filter(|id| validate_id(id));
        }
    }

    None
}

pub(crate) fn between<'a>(haystack: &'a str, left: &'a str, right: &'a str) -> &'a str {
    let pos: usize;

    if let Some(matched) = haystack.find(left) {
        pos = matched + left.len();
    } else {
        return "";
    }

    let remaining_haystack = &haystack[pos..];

    if let Some(matched) = remaining_haystack.find(right) {
        &haystack[pos..pos + matched]
    } else {
        ""
    }
}

// State-machine scanner: returns the prefix of `mixed_js` that forms one
// balanced brace/bracket/paren group, skipping strings, comments and regex
// literals. None when the input never balances.
pub(crate) fn cut_after_js(mixed_js: &str) -> Option<&str> {
    let bytes = mixed_js.as_bytes();

    let mut index = 0;
    let mut nest = 0i64;
    let mut last_significant: Option<u8> = None;

    while nest > 0 || index == 0 {
        if index >= bytes.len() {
            return None;
        }
        let char = bytes[index];
        match char {
            b'{' | b'[' | b'(' => nest += 1,
            b'}' | b']' | b')' => nest -= 1,
            // Skip strings
            b'"' | b'\'' | b'`' => {
                index += 1;
                while index < bytes.len() && bytes[index] != char {
                    if bytes[index] == b'\\' {
                        index += 1;
                    }
                    index += 1;
                }
                if index >= bytes.len() {
                    return None;
                }
            }
            // Skip comments
            b'/' if index + 1 < bytes.len() && bytes[index + 1] == b'*' => {
                index += 2;
                while index + 1 < bytes.len() && !(bytes[index] == b'*' && bytes[index + 1] == b'/')
                {
                    index += 1;
                }
                if index + 1 >= bytes.len() {
                    return None;
                }
                index += 2;
                continue;
            }
            // Skip regexes
            b'/' if last_significant
                .as_ref()
                .map(|x| !x.is_ascii_alphanumeric())
                .unwrap_or(false) =>
            {
                index += 1;
                while index < bytes.len() && bytes[index] != char {
                    if bytes[index] == b'\\' {
                        index += 1;
                    }
                    index += 1;
                }
                if index >= bytes.len() {
                    return None;
                }
            }
            // Save the last significant character for the regex check
            a if !a.is_ascii_whitespace() => last_significant = Some(a),
            _ => (),
        }
        index += 1;
    }
    if index == 1 {
        return None;
    }
    Some(&mixed_js[0..index])
}

pub(crate) async fn get_html(
    client: &ClientWithMiddleware,
    url: impl Into<String>,
    headers: Option<&reqwest::header::HeaderMap>,
) -> Result<String, VideoError> {
    let request = if let Some(some_headers) = headers {
        client.get(url.into()).headers(some_headers.clone())
    } else {
        client.get(url.into())
    }
    .send()
    .await
    .map_err(VideoError::ReqwestMiddleware)?;

    request
        .text()
        .await
        .map_err(|_x| VideoError::BodyCannotParsed)
}

/// Race `fut` against the caller's cancellation signal.
pub(crate) async fn with_cancel<F, T>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, VideoError>
where
    F: Future<Output = Result<T, VideoError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(VideoError::Cancelled),
        res = fut => res,
    }
}

// The API answers throttling and admission hiccups with 4xx as often as
// 5xx, so any error status is worth another attempt.
struct RetryErrorStatuses;

impl reqwest_retry::RetryableStrategy for RetryErrorStatuses {
    fn handle(
        &self,
        result: &reqwest_middleware::Result<reqwest::Response>,
    ) -> Option<reqwest_retry::Retryable> {
        match result {
            Ok(response) if response.status().is_success() => None,
            Ok(response)
                if response.status().is_client_error()
                    || response.status().is_server_error() =>
            {
                Some(reqwest_retry::Retryable::Transient)
            }
            Ok(_) => Some(reqwest_retry::Retryable::Fatal),
            Err(error) => reqwest_retry::default_on_request_failure(error),
        }
    }
}

/// Wrap a plain reqwest client with the shared retry middleware.
pub(crate) fn wrap_with_retry(
    client: reqwest::Client,
    max_retries: u32,
) -> ClientWithMiddleware {
    let retry_policy = reqwest_retry::policies::ExponentialBackoff::builder()
        .retry_bounds(Duration::from_millis(1000), Duration::from_millis(30000))
        .build_with_max_retries(max_retries);

    reqwest_middleware::ClientBuilder::new(client)
        .with(
            reqwest_retry::RetryTransientMiddleware::new_with_policy_and_strategy(
                retry_policy,
                RetryErrorStatuses,
            ),
        )
        .build()
}

pub(crate) fn make_absolute_url(base: &str, url: &str) -> Result<url::Url, VideoError> {
    match url::Url::parse(url) {
        Ok(u) => Ok(u),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base_url = url::Url::parse(base).map_err(VideoError::URLParseError)?;
            Ok(base_url.join(url)?)
        }
        Err(e) => Err(VideoError::URLParseError(e)),
    }
}

pub(crate) fn add_format_meta(format: &mut VideoFormat) {
    static REGEX_IS_LIVE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\bsource[/=]yt_live_broadcast\b").unwrap());
    static REGEX_IS_HLS: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"/manifest/hls_(variant|playlist)/").unwrap());
    static REGEX_IS_DASHMPD: Lazy<Regex> = Lazy::new(|| Regex::new(r"/manifest/dash/").unwrap());

    if format.quality_label.is_some() || format.width.is_some() {
        format.has_video = true;
    }

    if format.audio_quality.is_some()
        || format.audio_channels.is_some()
        || format.audio_bitrate.is_some()
    {
        format.has_audio = true;
    }

    if REGEX_IS_LIVE.is_match(&format.url) {
        format.is_live = true;
    }

    if REGEX_IS_HLS.is_match(&format.url) {
        format.is_hls = true;
    }

    if REGEX_IS_DASHMPD.is_match(&format.url) {
        format.is_dash_mpd = true;
    }
}

pub(crate) fn filter_formats(formats: &mut Vec<VideoFormat>, options: &VideoSearchOptions) {
    match options {
        VideoSearchOptions::Audio => {
            formats.retain(|x| (!x.has_video && x.has_audio) || x.is_live);
        }
        VideoSearchOptions::Video => {
            formats.retain(|x| (x.has_video && !x.has_audio) || x.is_live);
        }
        _ => {
            formats.retain(|x| (x.has_video && x.has_audio) || x.is_live);
        }
    }
}

/// Try to get format with [`VideoOptions`] filter
pub fn choose_format<'a>(
    formats: &'a [VideoFormat],
    options: &'a VideoOptions,
) -> Result<VideoFormat, VideoError> {
    let filter = &options.filter;
    let mut formats = formats.to_owned();

    filter_formats(&mut formats, filter);

    if formats.iter().any(|x| x.is_hls) {
        formats.retain(|fmt| (fmt.is_hls) || !(fmt.is_live));
    }

    formats.sort_by(sort_formats);
    match &options.quality {
        VideoQuality::Highest => {
            filter_formats(&mut formats, filter);

            let return_format = formats.first().ok_or(VideoError::FormatNotFound)?;

            Ok(return_format.clone())
        }
        VideoQuality::Lowest => {
            filter_formats(&mut formats, filter);

            let return_format = formats.last().ok_or(VideoError::FormatNotFound)?;

            Ok(return_format.clone())
        }
        VideoQuality::HighestAudio => {
            filter_formats(&mut formats, &VideoSearchOptions::Audio);
            formats.sort_by(sort_formats_by_audio);

            let return_format = formats.first().ok_or(VideoError::FormatNotFound)?;

            Ok(return_format.clone())
        }
        VideoQuality::LowestAudio => {
            filter_formats(&mut formats, &VideoSearchOptions::Audio);
            formats.sort_by(sort_formats_by_audio);

            let return_format = formats.last().ok_or(VideoError::FormatNotFound)?;

            Ok(return_format.clone())
        }
        VideoQuality::HighestVideo => {
            filter_formats(&mut formats, &VideoSearchOptions::Video);
            formats.sort_by(sort_formats_by_video);

            let return_format = formats.first().ok_or(VideoError::FormatNotFound)?;

            Ok(return_format.clone())
        }
        VideoQuality::LowestVideo => {
            filter_formats(&mut formats, &VideoSearchOptions::Video);
            formats.sort_by(sort_formats_by_video);

            let return_format = formats.last().ok_or(VideoError::FormatNotFound)?;

            Ok(return_format.clone())
        }
    }
}

fn sort_formats_by<F>(a: &VideoFormat, b: &VideoFormat, sort_by: &[F]) -> Ordering
where
    F: Fn(&VideoFormat) -> i32,
{
    sort_by
        .iter()
        .map(|func| func(b).cmp(&func(a)))
        .find(|&order| order != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

fn quality_label_rank(form: &VideoFormat) -> i32 {
    let quality_label = form.quality_label.clone().unwrap_or_default();

    PARSE_INT_REGEX
        .captures(&quality_label)
        .and_then(|x| x.get(0))
        .map(|x| x.as_str())
        .and_then(|x| x.trim().parse::<i32>().ok())
        .unwrap_or(0i32)
}

fn video_encoding_rank(form: &VideoFormat) -> i32 {
    VIDEO_ENCODING_RANKS
        .iter()
        .position(|enc| form.mime_type.codecs.join(", ").contains(enc))
        .map(|x| x as i32)
        .unwrap_or(-1)
}

fn audio_encoding_rank(form: &VideoFormat) -> i32 {
    AUDIO_ENCODING_RANKS
        .iter()
        .position(|enc| form.mime_type.codecs.join(", ").contains(enc))
        .map(|x| x as i32)
        .unwrap_or(-1)
}

pub(crate) fn sort_formats_by_video(a: &VideoFormat, b: &VideoFormat) -> Ordering {
    sort_formats_by(
        a,
        b,
        [
            quality_label_rank,
            |form: &VideoFormat| form.bitrate as i32,
            video_encoding_rank,
        ]
        .as_ref(),
    )
}

pub(crate) fn sort_formats_by_audio(a: &VideoFormat, b: &VideoFormat) -> Ordering {
    sort_formats_by(
        a,
        b,
        [
            |form: &VideoFormat| form.audio_bitrate.unwrap_or(0) as i32,
            audio_encoding_rank,
        ]
        .as_ref(),
    )
}

pub(crate) fn sort_formats(a: &VideoFormat, b: &VideoFormat) -> Ordering {
    sort_formats_by(
        a,
        b,
        [
            // Formats with both video and audio are ranked highest.
            |form: &VideoFormat| form.is_hls as i32,
            |form: &VideoFormat| form.is_dash_mpd as i32,
            |form: &VideoFormat| (form.has_video && form.has_audio) as i32,
            |form: &VideoFormat| form.has_video as i32,
            |form: &VideoFormat| (form.content_length.unwrap_or(0) > 0) as i32,
            quality_label_rank,
            |form: &VideoFormat| form.bitrate as i32,
            |form: &VideoFormat| form.audio_bitrate.unwrap_or(0) as i32,
            video_encoding_rank,
            audio_encoding_rank,
        ]
        .as_ref(),
    )
}

/// Pick a random address inside an IPv6 block, e.g. `"2001:4::/48"`.
/// Prefix bits stay fixed, host bits are randomized.
pub fn get_random_v6_ip(block: impl Into<String>) -> Result<IpAddr, VideoError> {
    let block: String = block.into();

    if !IPV6_REGEX.is_match(&block) {
        return Err(VideoError::InvalidIPv6Format);
    }

    let (addr, prefix) = block.split_once('/').ok_or(VideoError::InvalidIPv6Format)?;

    let prefix_len: u32 = prefix.parse().map_err(|_x| VideoError::InvalidIPv6Subnet)?;
    if !(24..=128).contains(&prefix_len) {
        return Err(VideoError::InvalidIPv6Subnet);
    }

    let base = addr
        .parse::<Ipv6Addr>()
        .map_err(|_x| VideoError::InvalidIPv6Format)?;

    let mut rng = rand::thread_rng();
    let mut segments = base.segments();

    for (i, segment) in segments.iter_mut().enumerate() {
        // How much of this 16-bit group the prefix still covers.
        let fixed_bits = prefix_len.saturating_sub(16 * i as u32).min(16);
        if fixed_bits == 16 {
            continue;
        }

        let host_mask = u16::MAX >> fixed_bits;
        *segment = (*segment & !host_mask) | (rng.gen::<u16>() & host_mask);
    }

    Ok(IpAddr::from(segments))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cut_after_js_simple_and_trailing() {
        assert_eq!(
            cut_after_js(r#"{"a": 1, "b": 1}"#).unwrap_or(""),
            r#"{"a": 1, "b": 1}"#
        );
        assert_eq!(
            cut_after_js(r#"{"a": 1, "b": 1}abcd"#).unwrap_or(""),
            r#"{"a": 1, "b": 1}"#
        );
    }

    #[test]
    fn cut_after_js_strings() {
        assert_eq!(
            cut_after_js(r#"{"a": "}1", "b": 1}abcd"#).unwrap_or(""),
            r#"{"a": "}1", "b": 1}"#
        );
        assert_eq!(
            cut_after_js(r#"{"a": '}1', "b": 1}abcd"#).unwrap_or(""),
            r#"{"a": '}1', "b": 1}"#
        );
        assert_eq!(
            cut_after_js(r#"{"a": `}1`, "b": 1}abcd"#).unwrap_or(""),
            r#"{"a": `}1`, "b": 1}"#
        );
        assert_eq!(
            cut_after_js(r#"{"a": "\"}1", "b": 1}abcd"#).unwrap_or(""),
            r#"{"a": "\"}1", "b": 1}"#
        );
    }

    #[test]
    fn cut_after_js_regex_literals() {
        assert_eq!(
            cut_after_js(r#"{"a": "\"}1", "b": 1, "c": /[0-9]}}\/}/}abcd"#).unwrap_or(""),
            r#"{"a": "\"}1", "b": 1, "c": /[0-9]}}\/}/}"#
        );
        assert_eq!(
            cut_after_js(r#"{"a": "\"}1", "b": 1, "c": [4/6, /[0-9]}}\/}/]}abcd"#).unwrap_or(""),
            r#"{"a": "\"}1", "b": 1, "c": [4/6, /[0-9]}}\/}/]}"#
        );
    }

    #[test]
    fn cut_after_js_function_bodies() {
        let body = r#"{var b=a.split("");b.reverse();return b.join("")}"#;
        assert_eq!(cut_after_js(&format!("{body};c=5;")).unwrap_or(""), body);

        let with_try = r#"{"a": "\"1", "b": 1, "c": () => { try { /* do sth */ } catch (e) { a = [2+3] }; return 5}}"#;
        assert_eq!(
            cut_after_js(&format!("{with_try}abcd")).unwrap_or(""),
            with_try
        );
    }

    #[test]
    fn cut_after_js_unbalanced() {
        assert!(cut_after_js("abcd]}").is_none());
        assert!(cut_after_js(r#"{"a": 1,{ "b": 1}"#).is_none());
        assert!(cut_after_js("{unterminated \"string}").is_none());
    }

    #[test]
    fn random_v6_keeps_the_network_prefix() {
        for _ in 0..100 {
            let ip = get_random_v6_ip("2001:4::/32").unwrap();
            let IpAddr::V6(ip) = ip else {
                panic!("expected an IPv6 address");
            };

            let segments = ip.segments();
            assert_eq!(segments[0], 0x2001);
            assert_eq!(segments[1], 0x0004);
        }
    }

    #[test]
    fn random_v6_partial_group_prefix() {
        // /36 pins the first four bits of the third group.
        let ip = get_random_v6_ip("2001:4:f000::/36").unwrap();
        let IpAddr::V6(ip) = ip else {
            panic!("expected an IPv6 address");
        };

        assert_eq!(ip.segments()[2] & 0xf000, 0xf000);
    }

    #[test]
    fn random_v6_rejects_bad_blocks() {
        assert!(matches!(
            get_random_v6_ip("not an ip"),
            Err(VideoError::InvalidIPv6Format)
        ));
        assert!(matches!(
            get_random_v6_ip("2001:4::/8"),
            Err(VideoError::InvalidIPv6Subnet)
        ));
    }
}
